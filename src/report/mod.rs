pub mod local;
pub mod memory;
pub mod table;

pub use local::LocalEmitter;
pub use memory::MemoryEmitter;
pub use table::{Cell, Table};

use anyhow::Result;

/// Result of handing a table to an emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Output was new or differed from the previous version
    Written,
    /// Previous output was byte-identical; nothing was written
    Unchanged,
}

/// Trait for report persistence backends
pub trait ReportEmitter: Send + Sync {
    /// Publish a table under a destination name such as `regular_by_week_merged.csv`
    fn emit(&self, table: &Table, name: &str) -> Result<EmitOutcome>;
}
