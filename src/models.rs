use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Partition of the record store by debtor category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsolvencyType {
    /// Private individuals ("ik" proceedings)
    Private,
    /// Regular and corporate proceedings ("in")
    Regular,
}

impl InsolvencyType {
    pub const ALL: [InsolvencyType; 2] = [InsolvencyType::Private, InsolvencyType::Regular];

    /// Directory code used by the record store
    pub fn code(self) -> &'static str {
        match self {
            InsolvencyType::Private => "ik",
            InsolvencyType::Regular => "in",
        }
    }
}

impl fmt::Display for InsolvencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Proceeding category, one case stream per source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaseKind {
    #[serde(rename = "verfahreneroeffnet")]
    ProceedingOpened,
    #[serde(rename = "abweisungmangelsmasse")]
    DismissedForLackOfAssets,
    #[serde(rename = "sicherungsmassnahmen")]
    PrecautionaryMeasures,
}

impl CaseKind {
    pub const ALL: [CaseKind; 3] = [
        CaseKind::ProceedingOpened,
        CaseKind::DismissedForLackOfAssets,
        CaseKind::PrecautionaryMeasures,
    ];

    /// Key of the case stream in a source file
    pub fn key(self) -> &'static str {
        match self {
            CaseKind::ProceedingOpened => "verfahreneroeffnet",
            CaseKind::DismissedForLackOfAssets => "abweisungmangelsmasse",
            CaseKind::PrecautionaryMeasures => "sicherungsmassnahmen",
        }
    }

    /// Column header used in the published reports
    pub fn label(self) -> &'static str {
        match self {
            CaseKind::ProceedingOpened => "Insolvenzverfahren",
            CaseKind::DismissedForLackOfAssets => "Abweisungen mangels Masse",
            CaseKind::PrecautionaryMeasures => "Sicherungsmaßnahmen",
        }
    }
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Federal state of a district
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederalState {
    #[serde(rename = "bundesland-name")]
    pub name: String,
}

/// Administrative district a residence belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    #[serde(rename = "kreis-name")]
    pub name: String,
    #[serde(rename = "kreis-bundesland")]
    pub federal_state: FederalState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipality {
    #[serde(rename = "gemeinde-kreis")]
    pub district: District,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Street {
    #[serde(rename = "street-gemeinde")]
    pub municipality: Municipality,
}

/// Residence of a debtor, resolved down to district and federal state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residence {
    #[serde(rename = "geolocation-street")]
    pub street: Street,
}

impl Residence {
    pub fn district(&self) -> &District {
        &self.street.municipality.district
    }

    pub fn district_name(&self) -> &str {
        &self.district().name
    }

    pub fn federal_state(&self) -> &str {
        &self.district().federal_state.name
    }

    /// Exact match on the federal state name
    pub fn is_in(&self, federal_state: &str) -> bool {
        self.federal_state() == federal_state
    }
}

/// One announcement as it appears in a source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(rename = "courtcase-court", default)]
    pub court: Option<String>,
    #[serde(rename = "courtcase-aktenzeichen", default)]
    pub case_number: Option<String>,
    #[serde(rename = "courtcase-residences", default)]
    pub residences: Vec<Residence>,
    #[serde(rename = "courtcase-is-company", default)]
    pub is_company: Option<bool>,
}

impl CaseRecord {
    /// First residence located in the given federal state
    pub fn residence_in(&self, federal_state: &str) -> Option<&Residence> {
        self.residences.iter().find(|r| r.is_in(federal_state))
    }
}

/// Contents of one dated source file, one stream per case kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(default)]
    pub verfahreneroeffnet: Vec<CaseRecord>,
    #[serde(default)]
    pub abweisungmangelsmasse: Vec<CaseRecord>,
    #[serde(default)]
    pub sicherungsmassnahmen: Vec<CaseRecord>,
}

impl SourceFile {
    pub fn cases(&self, kind: CaseKind) -> &[CaseRecord] {
        match kind {
            CaseKind::ProceedingOpened => &self.verfahreneroeffnet,
            CaseKind::DismissedForLackOfAssets => &self.abweisungmangelsmasse,
            CaseKind::PrecautionaryMeasures => &self.sicherungsmassnahmen,
        }
    }
}

/// A record that passed region filtering and deduplication
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredCase {
    pub kind: CaseKind,
    pub court: String,
    pub case_number: String,
    pub publication_date: NaiveDate,
    pub record: CaseRecord,
}

impl FilteredCase {
    pub fn residences(&self) -> &[Residence] {
        &self.record.residences
    }

    pub fn is_company(&self) -> Option<bool> {
        self.record.is_company
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_file() {
        let json = r#"{
            "verfahreneroeffnet": [
                {
                    "courtcase-court": "Amtsgericht Essen",
                    "courtcase-aktenzeichen": "160 IK 12/21",
                    "courtcase-residences": [
                        {
                            "geolocation-street": {
                                "street-gemeinde": {
                                    "gemeinde-kreis": {
                                        "kreis-name": "Essen, Stadt",
                                        "kreis-bundesland": {"bundesland-name": "Nordrhein-Westfalen"}
                                    }
                                }
                            }
                        }
                    ]
                }
            ]
        }"#;

        let file: SourceFile = serde_json::from_str(json).unwrap();
        let cases = file.cases(CaseKind::ProceedingOpened);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].court.as_deref(), Some("Amtsgericht Essen"));
        assert_eq!(cases[0].residences[0].district_name(), "Essen, Stadt");
        assert!(cases[0].residences[0].is_in("Nordrhein-Westfalen"));
        assert!(file.cases(CaseKind::PrecautionaryMeasures).is_empty());
    }

    #[test]
    fn test_missing_residences_defaults_to_empty() {
        let json = r#"{"courtcase-court": "AG Bonn", "courtcase-aktenzeichen": "1 IN 2/21"}"#;
        let record: CaseRecord = serde_json::from_str(json).unwrap();
        assert!(record.residences.is_empty());
        assert_eq!(record.is_company, None);
    }

    #[test]
    fn test_residence_in_picks_first_match() {
        let record = fixtures::record(
            "AG",
            "1",
            vec![
                fixtures::residence("Hamburg", "Hamburg"),
                fixtures::residence("Bochum", "Nordrhein-Westfalen"),
                fixtures::residence("Herne", "Nordrhein-Westfalen"),
            ],
        );
        let residence = record.residence_in("Nordrhein-Westfalen").unwrap();
        assert_eq!(residence.district_name(), "Bochum");
        assert!(record.residence_in("Bayern").is_none());
    }
}
