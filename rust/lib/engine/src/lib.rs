/// crudgen engine - runs generations against a project workspace
///
/// Ties the emitters to the filesystem, the history store and the schema
/// catalog, and enforces the per-entity and shared-file exclusion rules.

pub mod config;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod rollback;
pub mod workspace;

pub use config::{ConfigError, GeneratorConfig, Layout, RollbackConfig, StorageConfig};
pub use error::{error_code, GenError};
pub use lock::{GenerationLocks, NameToken, SectionClaim};
pub use orchestrator::{Generator, HistoryPage, Stage};
pub use rollback::{
    RollbackCategory, RollbackFailure, RollbackFlags, RollbackReport, RollbackRequest,
};
pub use workspace::{FsWorkspace, Workspace, WorkspaceError};
