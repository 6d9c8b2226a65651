//! Feature extraction over scraped announcement files.
//!
//! Each `.jsonl` file is read, every record turned into a flat feature record
//! and the result written as one CSV per input file.

pub mod analysis;
pub mod exporter;
pub mod features;
pub mod loader;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::ExtractConfig;

pub use analysis::{analyze, AnalysisSummary};
pub use exporter::export_cases;
pub use features::{extract_features, FeatureRecord, JsonRecord, SourceShape};
pub use loader::{list_files, read_cases};

/// Files handled by one extraction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub processed: usize,
    pub failed: usize,
}

/// Extract one input file and write its export, returning the export path
pub fn handle_file(path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let cases = read_cases(path)?;

    let features = cases
        .iter()
        .enumerate()
        .map(|(i, case)| {
            extract_features(case)
                .with_context(|| format!("Record {} of {}", i + 1, path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let export_path = export_cases(&features, path, output_dir)?;

    info!(
        source = %path.display(),
        export = %export_path.display(),
        cases = features.len(),
        "Extracted features"
    );

    Ok(export_path)
}

/// Extract every input file one after another
pub fn run(config: &ExtractConfig) -> Result<ExtractSummary> {
    let files = list_files(&config.input_dir)?;
    let mut summary = ExtractSummary::default();

    for path in &files {
        match handle_file(path, &config.output_dir) {
            Ok(_) => summary.processed += 1,
            Err(e) => {
                error!(
                    source = %path.display(),
                    error = %format!("{:#}", e),
                    "Extraction failed"
                );
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

/// Extract input files on blocking tasks, at most `workers` at a time
pub async fn run_concurrent(config: &ExtractConfig) -> Result<ExtractSummary> {
    let files = list_files(&config.input_dir)?;
    let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
    let output_dir = Arc::new(config.output_dir.clone());

    info!(files = files.len(), workers = config.workers, "Starting extraction");

    let mut tasks = JoinSet::new();
    for path in files {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Extraction semaphore closed")?;
        let output_dir = Arc::clone(&output_dir);

        tasks.spawn_blocking(move || {
            let _permit = permit;
            let result = handle_file(&path, &output_dir);
            (path, result)
        });
    }

    let mut summary = ExtractSummary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(_))) => summary.processed += 1,
            Ok((path, Err(e))) => {
                error!(
                    source = %path.display(),
                    error = %format!("{:#}", e),
                    "Extraction failed"
                );
                summary.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "Extraction task panicked");
                summary.failed += 1;
            }
        }
    }

    info!(
        processed = summary.processed,
        failed = summary.failed,
        "Extraction complete"
    );

    Ok(summary)
}
