use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use super::{EmitOutcome, ReportEmitter, Table};

/// Writes reports as CSV files into a directory.
///
/// Unchanged output is not rewritten. Changed output is also copied into a
/// `<YYYY-MM-DD>/` archive folder when archiving is enabled.
pub struct LocalEmitter {
    base_path: PathBuf,
    archive: bool,
}

impl LocalEmitter {
    pub fn new(base_path: impl AsRef<Path>, archive: bool) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).with_context(|| {
            format!("Failed to create report directory: {}", base_path.display())
        })?;

        info!(path = %base_path.display(), archive, "Initialized report directory");

        Ok(Self { base_path, archive })
    }

    fn report_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    fn archive_path(&self, name: &str) -> PathBuf {
        let stamp = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        self.base_path.join(stamp).join(name)
    }

    fn write(path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, content)
            .with_context(|| format!("Failed to write report: {}", path.display()))
    }
}

impl ReportEmitter for LocalEmitter {
    fn emit(&self, table: &Table, name: &str) -> Result<EmitOutcome> {
        let content = table.to_csv()?;
        let path = self.report_path(name);

        if let Ok(previous) = fs::read(&path) {
            if previous == content {
                debug!(report = name, "Report unchanged");
                return Ok(EmitOutcome::Unchanged);
            }
        }

        Self::write(&path, &content)?;

        if self.archive {
            Self::write(&self.archive_path(name), &content)?;
        }

        info!(report = name, rows = table.len(), "Report written");

        Ok(EmitOutcome::Written)
    }
}
