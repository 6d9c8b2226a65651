use thiserror::Error;

use crate::models::{CaseKind, InsolvencyType};

/// Failures of the filter, aggregation and extraction steps.
///
/// These are never retried: a malformed record means the source data has to be
/// fixed upstream.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed {kind} record in '{file}' ({insolvency_type}): missing '{field}'")]
    MalformedRecord {
        insolvency_type: InsolvencyType,
        kind: CaseKind,
        file: String,
        field: &'static str,
    },
    #[error("source file name '{0}' does not start with an ISO date")]
    InvalidFileName(String),
    #[error("district '{0}' is not in the population table")]
    UnknownDistrict(String),
    #[error("extraction record is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid population table: {0}")]
    InvalidPopulationTable(String),
}
