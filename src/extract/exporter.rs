use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use super::features::FeatureRecord;

/// Write feature records as `;`-separated CSV to `<output_dir>/<source name>.csv`.
///
/// The header is the sorted union of all keys; absent and null values are empty.
pub fn export_cases(
    cases: &[FeatureRecord],
    source_path: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    let source_name = source_path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid source file name: {}", source_path.display()))?;
    let export_path = output_dir.join(format!("{}.csv", source_name));

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let content = to_csv(cases)?;
    fs::write(&export_path, content)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    debug!(path = %export_path.display(), rows = cases.len(), "Exported features");

    Ok(export_path)
}

fn to_csv(cases: &[FeatureRecord]) -> Result<Vec<u8>> {
    let columns: BTreeSet<&str> = cases
        .iter()
        .flat_map(|c| c.keys().map(String::as_str))
        .collect();

    let mut csv = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    csv.write_record(&columns).context("CSV write error")?;
    for case in cases {
        let fields = columns
            .iter()
            .map(|column| case.get(*column).map(field_text).unwrap_or_default());
        csv.write_record(fields).context("CSV write error")?;
    }

    csv.into_inner()
        .map_err(|e| anyhow::anyhow!("CSV flush error: {}", e.error()))
}

fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
