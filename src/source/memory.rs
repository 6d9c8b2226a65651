use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};

use super::RecordStore;
use crate::models::{InsolvencyType, SourceFile};

/// In-memory record store, keyed by file name per insolvency type
#[derive(Default)]
pub struct MemoryRecordStore {
    files: BTreeMap<(InsolvencyType, String), SourceFile>,
    loads: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        insolvency_type: InsolvencyType,
        file_name: impl Into<String>,
        file: SourceFile,
    ) {
        self.files.insert((insolvency_type, file_name.into()), file);
    }

    /// Number of `load` calls served so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl RecordStore for MemoryRecordStore {
    fn list(&self, insolvency_type: InsolvencyType) -> Result<Vec<String>> {
        Ok(self
            .files
            .keys()
            .filter(|(t, _)| *t == insolvency_type)
            .map(|(_, name)| name.clone())
            .collect())
    }

    fn load(&self, insolvency_type: InsolvencyType, file_name: &str) -> Result<SourceFile> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.files
            .get(&(insolvency_type, file_name.to_string()))
            .cloned()
            .with_context(|| format!("Source file not found: {}/{}", insolvency_type, file_name))
    }
}
