use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use super::features::JsonRecord;

/// Scraped `.jsonl` files in a directory, sorted by path
pub fn list_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = input_dir.join("*.jsonl");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("Non UTF-8 input path: {}", input_dir.display()))?;

    let mut files = Vec::new();
    for entry in glob::glob(pattern).context("Invalid input glob")? {
        files.push(entry.context("Failed to read input directory entry")?);
    }
    files.sort();

    debug!(dir = %input_dir.display(), files = files.len(), "Listed extraction inputs");

    Ok(files)
}

/// Read one JSON object per non-empty line, preserving order
pub fn read_cases(path: &Path) -> Result<Vec<JsonRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut cases = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON at {}:{}", path.display(), i + 1))?;
        match value {
            Value::Object(record) => cases.push(record),
            _ => anyhow::bail!("Line {} of {} is not a JSON object", i + 1, path.display()),
        }
    }

    Ok(cases)
}
