use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use csv::StringRecord;
use tracing::{debug, info};

use crate::report::{Cell, Table};

const FEDERAL_STATES: [&str; 2] = ["Nordrhein-Westfalen", "nw"];
const OPENING_TYPES: [&str; 3] = [
    "Eröffnungen",
    "Eroeffnung",
    "Eroeffnung_Insolvenzverfahren",
];

/// Counts over the exported feature files
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    /// Private cases in the target region
    pub all: usize,
    /// Left after dropping repeated fingerprints
    pub fingerprinted: usize,
    /// Proceeding openings among those
    pub openings: usize,
    /// Openings per week, keyed by the Monday of the week
    pub weekly: Table,
}

/// Weekly proceeding openings for private debtors in Nordrhein-Westfalen
pub fn analyze(output_dir: &Path) -> Result<AnalysisSummary> {
    let pattern = output_dir.join("*.csv");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("Non UTF-8 output path: {}", output_dir.display()))?;

    let mut paths = Vec::new();
    for entry in glob::glob(pattern).context("Invalid export glob")? {
        paths.push(entry.context("Failed to read export directory entry")?);
    }
    paths.sort();

    let mut rows = Vec::new();
    for path in &paths {
        rows.extend(read_rows(path)?);
    }

    let summary = summarize(rows);
    info!(
        files = paths.len(),
        all = summary.all,
        fingerprinted = summary.fingerprinted,
        openings = summary.openings,
        weeks = summary.weekly.len(),
        "Analyzed extracted features"
    );

    Ok(summary)
}

/// Exported row reduced to the columns the analysis looks at
#[derive(Debug, Clone, Default)]
struct FeatureRow {
    federal_state: String,
    kind: String,
    description_hash: String,
    type_of_proceeding: String,
    date_of_publication: String,
}

fn read_rows(path: &Path) -> Result<Vec<FeatureRow>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new().delimiter(b';').from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let columns = [
        column("federal_state"),
        column("kind"),
        column("description_hash"),
        column("type_of_proceeding"),
        column("date_of_publication"),
    ];

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Invalid CSV row in {}", path.display()))?;
        let field = |i: usize| value(&record, columns[i]);
        rows.push(FeatureRow {
            federal_state: field(0),
            kind: field(1),
            description_hash: field(2),
            type_of_proceeding: field(3),
            date_of_publication: field(4),
        });
    }

    debug!(path = %path.display(), rows = rows.len(), "Read exported features");

    Ok(rows)
}

fn value(record: &StringRecord, column: Option<usize>) -> String {
    column
        .and_then(|i| record.get(i))
        .unwrap_or_default()
        .to_string()
}

fn summarize(rows: Vec<FeatureRow>) -> AnalysisSummary {
    let private: Vec<FeatureRow> = rows
        .into_iter()
        .filter(|r| FEDERAL_STATES.contains(&r.federal_state.as_str()) && r.kind == "ik")
        .collect();
    let all = private.len();

    let mut seen = HashSet::new();
    let unique: Vec<FeatureRow> = private
        .into_iter()
        .filter(|r| seen.insert(r.description_hash.clone()))
        .collect();
    let fingerprinted = unique.len();

    let openings: Vec<NaiveDate> = unique
        .iter()
        .filter(|r| OPENING_TYPES.contains(&r.type_of_proceeding.as_str()))
        .filter_map(|r| publication_day(&r.date_of_publication))
        .collect();

    let mut per_week: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in &openings {
        *per_week.entry(week_start(*date)).or_default() += 1;
    }

    let mut weekly = Table::new("Woche", vec!["Eröffnungen".to_string()]);
    for (monday, count) in per_week {
        weekly.push_row(monday.to_string(), vec![Cell::from(count)]);
    }

    AnalysisSummary {
        all,
        fingerprinted,
        openings: openings.len(),
        weekly,
    }
}

/// Publication dates may carry a time component
fn publication_day(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}
