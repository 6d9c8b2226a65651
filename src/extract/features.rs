use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::PipelineError;

/// One announcement as read from a `.jsonl` source line
pub type JsonRecord = Map<String, Value>;

/// Flat feature record with keys in ascending order
pub type FeatureRecord = BTreeMap<String, Value>;

static ZIPCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{5}\b").expect("valid regex"));

static DATE_OF_BIRTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)geb(?:\.|oren) (?:am )?(\d{2}\.\d{2}\.\d{4})\b").expect("valid regex")
});

/// Proceeding type between the last `<digit>_` and `.htm` of a legacy file name
static PROCEEDING_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d_([^\d]*)\.htm$").expect("valid regex"));

static PROCEEDING_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}\.\d{2}\.\d{4})$").expect("valid regex"));

const BOILERPLATE_PREFIX: &str = "öffentliche bekanntmachung";

/// Fields dropped from every feature record
const DROPPED_FIELDS: [&str; 4] = ["description", "url", "_type", "format"];

/// Layout of the scraped record, resolved once per record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape<'a> {
    /// "alt": proceeding type encoded in the scraped file name
    Legacy { file_name: &'a str },
    /// "neu": proceeding type given as a `kind` field
    Current { kind: &'a str },
}

impl<'a> SourceShape<'a> {
    pub fn resolve(record: &'a JsonRecord) -> Result<Self, PipelineError> {
        let legacy = || {
            str_field(record, "file_name")
                .map(|file_name| SourceShape::Legacy { file_name })
                .ok_or(PipelineError::MissingField("file_name"))
        };
        let current = || {
            str_field(record, "kind")
                .map(|kind| SourceShape::Current { kind })
                .ok_or(PipelineError::MissingField("kind"))
        };

        match str_field(record, "format") {
            Some("alt") => legacy(),
            Some("neu") => current(),
            _ if record.contains_key("file_name") => legacy(),
            _ => current(),
        }
    }

    pub fn proceeding_type(&self) -> Option<String> {
        match self {
            SourceShape::Legacy { file_name } => PROCEEDING_TYPE_RE
                .captures(file_name)
                .map(|c| c[1].to_string()),
            SourceShape::Current { kind } => Some(kind.replace(' ', "_")),
        }
    }

    /// Raw field that carried the proceeding type
    fn raw_field(&self) -> &'static str {
        match self {
            SourceShape::Legacy { .. } => "file_name",
            SourceShape::Current { .. } => "kind",
        }
    }
}

/// Derive features from one announcement and merge them with its fields
pub fn extract_features(record: &JsonRecord) -> Result<FeatureRecord, PipelineError> {
    let description =
        str_field(record, "description").ok_or(PipelineError::MissingField("description"))?;
    let case_nr = str_field(record, "case_nr").ok_or(PipelineError::MissingField("case_nr"))?;
    let shape = SourceShape::resolve(record)?;

    let mut features = FeatureRecord::new();
    features.insert("zipcode".into(), opt(zipcode(description)));
    features.insert("date_of_birth".into(), opt_date(date_of_birth(description)));
    features.insert("kind".into(), opt(debtor_kind(case_nr).map(str::to_string)));
    features.insert("type_of_proceeding".into(), opt(shape.proceeding_type()));
    features.insert("date_of_proceeding".into(), opt_date(date_of_proceeding(description)));
    features.insert("description_hash".into(), Value::String(fingerprint(description)));

    for (key, value) in record {
        if key == shape.raw_field() || DROPPED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let key = if key == "date" {
            "date_of_publication"
        } else {
            key.as_str()
        };
        features.insert(key.to_string(), value.clone());
    }

    Ok(features)
}

/// First five-digit token in the text
pub fn zipcode(description: &str) -> Option<String> {
    ZIPCODE_RE.find(description).map(|m| m.as_str().to_string())
}

pub fn date_of_birth(description: &str) -> Option<NaiveDate> {
    let captures = DATE_OF_BIRTH_RE.captures(description)?;
    parse_german_date(&captures[1])
}

/// Trailing `DD.MM.YYYY` of the text
pub fn date_of_proceeding(description: &str) -> Option<NaiveDate> {
    let captures = PROCEEDING_DATE_RE.captures(description.trim_end())?;
    parse_german_date(&captures[1])
}

/// `ik` marks private individuals, `in` everything else; `ik` wins
pub fn debtor_kind(case_nr: &str) -> Option<&'static str> {
    let case_nr = case_nr.to_lowercase();
    if case_nr.contains("ik") {
        Some("ik")
    } else if case_nr.contains("in") {
        Some("in")
    } else {
        None
    }
}

/// MD5 of the description reduced to lower-case alphanumerics, without the
/// leading boilerplate phrase
pub fn fingerprint(description: &str) -> String {
    let lower = description.to_lowercase();
    let body = lower.strip_prefix(BOILERPLATE_PREFIX).unwrap_or(&lower);
    let normalized: String = body.trim().chars().filter(|c| c.is_alphanumeric()).collect();
    format!("{:x}", md5::compute(normalized.as_bytes()))
}

fn parse_german_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%d.%m.%Y").ok()
}

fn str_field<'a>(record: &'a JsonRecord, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn opt(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

fn opt_date(value: Option<NaiveDate>) -> Value {
    opt(value.map(|d| d.format("%Y-%m-%d").to_string()))
}
