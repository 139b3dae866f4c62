pub mod error;
pub mod manifest;
pub mod memory;
pub mod redb_store;
pub mod traits;

pub use error::HistoryError;
pub use manifest::{Failure, GenerationManifest, HistoryRecord, ManifestSummary, SectionRecord};
pub use memory::MemoryHistory;
pub use redb_store::RedbHistory;
pub use traits::HistoryStore;
