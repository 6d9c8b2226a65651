use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::RecordStore;
use crate::models::{InsolvencyType, SourceFile};

/// Record store backed by a local clone of the source bucket.
///
/// Files live under `<base>/<type code>/<YYYY-MM-DD...>.json`.
pub struct LocalRecordStore {
    base_path: PathBuf,
}

impl LocalRecordStore {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        if !base_path.is_dir() {
            anyhow::bail!("Record store directory not found: {}", base_path.display());
        }

        info!(path = %base_path.display(), "Initialized local record store");

        Ok(Self { base_path })
    }

    fn partition_path(&self, insolvency_type: InsolvencyType) -> PathBuf {
        self.base_path.join(insolvency_type.code())
    }
}

impl RecordStore for LocalRecordStore {
    fn list(&self, insolvency_type: InsolvencyType) -> Result<Vec<String>> {
        let dir = self.partition_path(insolvency_type);
        let mut names = Vec::new();

        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to list record store: {}", dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();

        debug!(insolvency_type = %insolvency_type, files = names.len(), "Listed source files");

        Ok(names)
    }

    fn load(&self, insolvency_type: InsolvencyType, file_name: &str) -> Result<SourceFile> {
        let path = self.partition_path(insolvency_type).join(file_name);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read source file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse source file: {}", path.display()))
    }
}
