use crate::error::HistoryError;
use crate::manifest::{GenerationManifest, HistoryRecord};

/// HistoryStore persists generation manifests.
///
/// Ids are assigned by the store and increase monotonically, so "newest
/// first" is descending id order.
pub trait HistoryStore: Send + Sync {
    /// Store a manifest and return its id.
    fn insert(&self, manifest: GenerationManifest) -> Result<u64, HistoryError>;

    /// Fetch one record. Returns HistoryError::NotFound if absent.
    fn get(&self, id: u64) -> Result<HistoryRecord, HistoryError>;

    /// One page of records, newest first, plus the total record count.
    /// Pages are 1-based; page 0 is treated as page 1.
    fn list(&self, page: usize, page_size: usize) -> Result<(Vec<HistoryRecord>, usize), HistoryError>;

    /// Remove the record only. Returns HistoryError::NotFound if absent.
    fn delete(&self, id: u64) -> Result<(), HistoryError>;

    /// Stamp the record as rolled back at `at` (RFC 3339).
    fn mark_rolled_back(&self, id: u64, at: &str) -> Result<(), HistoryError>;

    /// Every record for `table_name`, newest first.
    fn for_table(&self, table_name: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
        let (all, _) = self.list(1, usize::MAX)?;
        Ok(all
            .into_iter()
            .filter(|r| r.manifest.table_name == table_name)
            .collect())
    }
}

/// Offset of a 1-based page, saturating.
pub(crate) fn page_offset(page: usize, page_size: usize) -> usize {
    page.max(1).saturating_sub(1).saturating_mul(page_size)
}
