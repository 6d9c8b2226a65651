use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::error::PipelineError;

/// Key holding the state-wide total, skipped when iterating districts
pub const TOTAL_KEY: &str = "Gesamt";

/// Inhabitants per normalized district name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationTable {
    inhabitants: BTreeMap<String, u64>,
}

/// Nordrhein-Westfalen, 31.12.2019
const NRW_INHABITANTS: [(&str, u64); 54] = [
    ("Bielefeld", 334_195),
    ("Bochum", 365_587),
    ("Bonn", 329_673),
    ("Borken", 370_676),
    ("Bottrop", 117_565),
    ("Coesfeld", 220_586),
    ("Dortmund", 588_250),
    ("Duisburg", 498_686),
    ("Düren", 263_722),
    ("Düsseldorf", 621_877),
    ("Ennepe-Ruhr-Kreis", 324_296),
    ("Essen", 582_760),
    ("Euskirchen", 192_840),
    ("Gelsenkirchen", 259_645),
    ("Gütersloh", 364_938),
    ("Hagen", 188_814),
    ("Hamm", 179_916),
    ("Heinsberg", 254_322),
    ("Herford", 250_783),
    ("Herne", 156_449),
    ("Hochsauerlandkreis", 260_475),
    ("Höxter", 140_667),
    ("Kleve", 310_974),
    ("Krefeld", 227_417),
    ("Köln", 1_087_863),
    ("Leverkusen", 163_729),
    ("Lippe", 348_391),
    ("Mettmann", 485_684),
    ("Minden-Lübbecke", 310_710),
    ("Märkischer Kreis", 412_120),
    ("Mönchengladbach", 261_034),
    ("Mülheim an der Ruhr", 170_632),
    ("Münster", 315_293),
    ("Oberbergischer Kreis", 272_471),
    ("Oberhausen", 210_829),
    ("Olpe", 134_775),
    ("Paderborn", 307_839),
    ("Recklinghausen", 615_261),
    ("Remscheid", 111_338),
    ("Rhein-Erft-Kreis", 470_089),
    ("Rhein-Kreis Neuss", 451_730),
    ("Rhein-Sieg-Kreis", 600_764),
    ("Rheinisch-Bergischer Kreis", 283_455),
    ("Siegen-Wittgenstein", 278_210),
    ("Soest", 301_902),
    ("Solingen", 159_360),
    ("Steinfurt", 448_651),
    ("Städteregion Aachen", 556_631),
    ("Unna", 394_782),
    ("Viersen", 298_935),
    ("Warendorf", 277_783),
    ("Wesel", 459_809),
    ("Wuppertal", 355_100),
    (TOTAL_KEY, 17_950_283),
];

impl PopulationTable {
    pub fn new(inhabitants: BTreeMap<String, u64>) -> Result<Self, PipelineError> {
        if let Some((name, _)) = inhabitants.iter().find(|(_, count)| **count == 0) {
            return Err(PipelineError::InvalidPopulationTable(format!(
                "district '{}' has no inhabitants",
                name
            )));
        }
        Ok(Self { inhabitants })
    }

    /// Built-in table for Nordrhein-Westfalen
    pub fn nrw() -> Self {
        Self {
            inhabitants: NRW_INHABITANTS
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
        }
    }

    /// Parse a `name,inhabitants` CSV with a header row
    pub fn from_csv(reader: impl Read) -> Result<Self, PipelineError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let mut inhabitants = BTreeMap::new();
        for (i, result) in csv.records().enumerate() {
            let record = result.map_err(|e| {
                PipelineError::InvalidPopulationTable(format!("row {}: {e}", i + 1))
            })?;

            if record.len() < 2 {
                return Err(PipelineError::InvalidPopulationTable(format!(
                    "row {} has {} columns, expected 2",
                    i + 1,
                    record.len()
                )));
            }

            let count: u64 = record[1].trim().replace('.', "").parse().map_err(|_| {
                PipelineError::InvalidPopulationTable(format!(
                    "row {}: '{}' is not a number",
                    i + 1,
                    &record[1]
                ))
            })?;
            inhabitants.insert(record[0].trim().to_string(), count);
        }

        Self::new(inhabitants)
    }

    /// Load from a CSV file, or fall back to the built-in table
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::nrw());
        };

        let file = File::open(path)
            .with_context(|| format!("Failed to open population table: {}", path.display()))?;
        let table = Self::from_csv(file)
            .with_context(|| format!("Failed to parse population table: {}", path.display()))?;

        info!(path = %path.display(), districts = table.len(), "Loaded population table");

        Ok(table)
    }

    pub fn get(&self, district: &str) -> Option<u64> {
        self.inhabitants.get(district).copied()
    }

    /// Districts in ascending name order, without the total
    pub fn districts(&self) -> impl Iterator<Item = (&str, u64)> {
        self.inhabitants
            .iter()
            .filter(|(name, _)| name.as_str() != TOTAL_KEY)
            .map(|(name, count)| (name.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.districts().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nrw_table() {
        let table = PopulationTable::nrw();
        assert_eq!(table.len(), 53);
        assert_eq!(table.get("Köln"), Some(1_087_863));
        assert_eq!(table.get(TOTAL_KEY), Some(17_950_283));
        assert!(table.districts().all(|(name, _)| name != TOTAL_KEY));
    }

    #[test]
    fn test_nrw_districts_sum_to_total() {
        let table = PopulationTable::nrw();
        let sum: u64 = table.districts().map(|(_, count)| count).sum();
        assert_eq!(Some(sum), table.get(TOTAL_KEY));
    }

    #[test]
    fn test_from_csv() {
        let csv = "name,inhabitants\nKöln,1.087.863\nBonn,329673\nGesamt,1417536\n";
        let table = PopulationTable::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Köln"), Some(1_087_863));
        let names: Vec<_> = table.districts().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Bonn", "Köln"]);
    }

    #[test]
    fn test_from_csv_rejects_zero_and_garbage() {
        assert!(PopulationTable::from_csv("name,inhabitants\nKöln,0\n".as_bytes()).is_err());
        assert!(PopulationTable::from_csv("name,inhabitants\nKöln,viele\n".as_bytes()).is_err());
    }
}
