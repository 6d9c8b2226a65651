use std::collections::BTreeMap;

use tracing::debug;

use super::{in_window, latest_publication_date};
use crate::error::PipelineError;
use crate::models::FilteredCase;
use crate::normalize;
use crate::population::PopulationTable;
use crate::report::{Cell, Table};

/// Cases per district in the trailing window
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictRow {
    pub name: String,
    pub count: usize,
    /// Cases per 100,000 inhabitants
    pub rate: f64,
}

/// Count cases per district over `window_days` ending at the latest
/// publication date, normalized by population.
///
/// Every district of the population table is present, sorted by name.
pub fn district_rates(
    cases: &[FilteredCase],
    population: &PopulationTable,
    federal_state: &str,
    window_days: i64,
) -> Result<Vec<DistrictRow>, PipelineError> {
    let mut rows: BTreeMap<String, DistrictRow> = population
        .districts()
        .map(|(name, _)| {
            (
                name.to_string(),
                DistrictRow {
                    name: name.to_string(),
                    count: 0,
                    rate: 0.0,
                },
            )
        })
        .collect();

    let Some(anchor) = latest_publication_date(cases) else {
        return Ok(rows.into_values().collect());
    };

    for case in in_window(cases, anchor, window_days) {
        let Some(residence) = case.record.residence_in(federal_state) else {
            debug!(court = %case.court, case_number = %case.case_number, "No residence in region");
            continue;
        };

        let name = normalize::district(residence.district_name());
        let inhabitants = population
            .get(&name)
            .ok_or_else(|| PipelineError::UnknownDistrict(name.clone()))?;

        let row = rows.get_mut(&name).ok_or_else(|| PipelineError::UnknownDistrict(name.clone()))?;
        row.count += 1;
        row.rate += 1.0 / inhabitants as f64 * 100_000.0;
    }

    Ok(rows.into_values().collect())
}

/// Districts as rows with a count column and a per-100,000 column
pub fn district_table(rows: &[DistrictRow], label: &str) -> Table {
    let mut table = Table::new(
        "Name",
        vec![label.to_string(), format!("{} pro 100.000 Einwohner", label)],
    );
    for row in rows {
        table.push_row(
            row.name.clone(),
            vec![Cell::from(row.count), Cell::from(row.rate)],
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{case_on, date};
    use crate::population::TOTAL_KEY;

    const NRW: &str = "Nordrhein-Westfalen";

    fn small_table() -> PopulationTable {
        PopulationTable::new(
            [("Köln", 200_000), ("Bonn", 100_000), (TOTAL_KEY, 300_000)]
                .into_iter()
                .map(|(n, c)| (n.to_string(), c))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_every_district_present_and_sorted() {
        let rows = district_rates(&[], &PopulationTable::nrw(), NRW, 30).unwrap();
        assert_eq!(rows.len(), 53);
        assert!(rows.iter().all(|r| r.count == 0 && r.rate == 0.0));
        assert!(rows.windows(2).all(|w| w[0].name < w[1].name));
        assert!(rows.iter().all(|r| r.name != TOTAL_KEY));
    }

    #[test]
    fn test_rates_in_window() {
        let cases = vec![
            case_on(date(2021, 3, 15), "Köln, Stadt"),
            case_on(date(2021, 3, 1), "Köln, Stadt"),
            // exactly 30 days before the anchor, outside the window
            case_on(date(2021, 2, 13), "Bonn, Stadt"),
        ];

        let rows = district_rates(&cases, &small_table(), NRW, 30).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Bonn");
        assert_eq!(rows[0].count, 0);
        assert_eq!(rows[0].rate, 0.0);
        assert_eq!(rows[1].name, "Köln");
        assert_eq!(rows[1].count, 2);
        assert!((rows[1].rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_district_is_an_error() {
        let cases = vec![case_on(date(2021, 3, 15), "Atlantis")];
        let err = district_rates(&cases, &small_table(), NRW, 30).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownDistrict(name) if name == "Atlantis"));
    }

    #[test]
    fn test_district_table_columns() {
        let rows = vec![DistrictRow {
            name: "Bonn".to_string(),
            count: 1,
            rate: 1.0,
        }];
        let table = district_table(&rows, "Insolvenzverfahren");
        assert_eq!(
            table.columns(),
            &[
                "Insolvenzverfahren".to_string(),
                "Insolvenzverfahren pro 100.000 Einwohner".to_string()
            ]
        );
        assert_eq!(table.row("Bonn").unwrap(), &[Cell::Int(1), Cell::Float(1.0)]);
    }
}
