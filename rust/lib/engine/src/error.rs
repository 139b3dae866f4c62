use thiserror::Error;

use crudgen_codegen::{ArtifactKind, SectionError, Violations};
use crudgen_history::HistoryError;
use crudgen_schema::SchemaError;

use crate::rollback::RollbackReport;
use crate::workspace::WorkspaceError;

/// Stable error code constants.
///
/// Clients match on `code` from `{"code": "BUSY", "message": "..."}`.
/// Codes never change; messages may be reworded.
pub mod error_code {
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const EMISSION_FAILED: &str = "EMISSION_FAILED";
    pub const CONFLICT: &str = "CONFLICT";
    pub const BUSY: &str = "BUSY";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ROLLBACK_INCOMPLETE: &str = "ROLLBACK_INCOMPLETE";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// Every way a generator operation can fail.
#[derive(Error, Debug)]
pub enum GenError {
    /// The request does not describe a valid entity. Nothing was written.
    #[error("{0}")]
    Validation(Violations),

    /// An emitter or its write failed. Earlier artifacts stay on disk and
    /// are listed in the partial manifest `manifest_id`.
    #[error("{artifact} emission failed: {message}")]
    Emission {
        artifact: ArtifactKind,
        message: String,
        manifest_id: u64,
    },

    /// Another entity owns the route, menu entry or table. Nothing was written.
    #[error("{0}")]
    Conflict(String),

    /// A generation for the same struct name is in flight.
    #[error("{0}")]
    Busy(String),

    #[error("{0}")]
    NotFound(String),

    /// At least one rollback category failed; the others were attempted.
    #[error("{0}")]
    Rollback(RollbackReport),

    #[error("{0}")]
    Storage(String),
}

impl GenError {
    pub fn error_code(&self) -> &'static str {
        match self {
            GenError::Validation(_) => error_code::VALIDATION_FAILED,
            GenError::Emission { .. } => error_code::EMISSION_FAILED,
            GenError::Conflict(_) => error_code::CONFLICT,
            GenError::Busy(_) => error_code::BUSY,
            GenError::NotFound(_) => error_code::NOT_FOUND,
            GenError::Rollback(_) => error_code::ROLLBACK_INCOMPLETE,
            GenError::Storage(_) => error_code::STORAGE_ERROR,
        }
    }

    /// Structured payload for clients, beyond the message.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            GenError::Validation(violations) => serde_json::to_value(violations).ok(),
            GenError::Emission {
                artifact,
                manifest_id,
                ..
            } => Some(serde_json::json!({
                "artifact": artifact,
                "manifestId": manifest_id,
            })),
            GenError::Rollback(report) => serde_json::to_value(report).ok(),
            _ => None,
        }
    }
}

impl From<HistoryError> for GenError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::NotFound(id) => {
                GenError::NotFound(format!("history record {} not found", id))
            }
            other => GenError::Storage(other.to_string()),
        }
    }
}

impl From<SchemaError> for GenError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::TableNotFound(table) => {
                GenError::NotFound(format!("table {} not found", table))
            }
            other => GenError::Storage(other.to_string()),
        }
    }
}

impl From<WorkspaceError> for GenError {
    fn from(e: WorkspaceError) -> Self {
        GenError::Storage(e.to_string())
    }
}

/// Map a shared-file error found while checking a run.
pub(crate) fn section_error(path: &str, e: SectionError) -> GenError {
    match e {
        SectionError::Conflict { key, owner } => GenError::Conflict(format!(
            "{}: section '{}' is already owned by {}",
            path, key, owner
        )),
        other => GenError::Storage(format!("{}: {}", path, other)),
    }
}
