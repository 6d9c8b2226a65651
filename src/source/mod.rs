pub mod local;
pub mod memory;

pub use local::LocalRecordStore;
pub use memory::MemoryRecordStore;

use anyhow::Result;
use chrono::NaiveDate;

use crate::error::PipelineError;
use crate::models::{InsolvencyType, SourceFile};

/// Trait for record store backends
pub trait RecordStore: Send + Sync {
    /// List source file names for an insolvency type, sorted ascending
    fn list(&self, insolvency_type: InsolvencyType) -> Result<Vec<String>>;

    /// Load and parse a single source file
    fn load(&self, insolvency_type: InsolvencyType, file_name: &str) -> Result<SourceFile>;
}

/// Publication date encoded in the first 10 characters of a source file name
pub fn publication_date(file_name: &str) -> Result<NaiveDate, PipelineError> {
    file_name
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| PipelineError::InvalidFileName(file_name.to_string()))
}
