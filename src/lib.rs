pub mod aggregate;
pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod notifications;
pub mod population;
pub mod producers;
pub mod report;
pub mod source;

pub use batch::{BatchRunner, BatchSummary};
pub use config::Config;
pub use error::PipelineError;
pub use filter::{CaseFilter, FilterCache, FilterOutcome, FilterStats};
pub use models::*;
pub use notifications::NotificationService;
pub use population::PopulationTable;
pub use producers::{Producer, RunContext};
pub use report::{Cell, EmitOutcome, LocalEmitter, ReportEmitter, Table};
pub use source::{LocalRecordStore, RecordStore};
