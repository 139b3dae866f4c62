use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::HistoryError;
use crate::manifest::{GenerationManifest, HistoryRecord};
use crate::traits::{page_offset, HistoryStore};

/// MemoryHistory keeps records in process memory. Used by tests and by
/// one-shot CLI runs without a history database.
#[derive(Default)]
pub struct MemoryHistory {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    records: BTreeMap<u64, HistoryRecord>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> HistoryError {
    HistoryError::Storage("history lock poisoned".into())
}

impl HistoryStore for MemoryHistory {
    fn insert(&self, manifest: GenerationManifest) -> Result<u64, HistoryError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.insert(
            id,
            HistoryRecord {
                id,
                manifest,
                rolled_back_at: None,
            },
        );
        Ok(id)
    }

    fn get(&self, id: u64) -> Result<HistoryRecord, HistoryError> {
        let inner = self.inner.read().map_err(poisoned)?;
        inner
            .records
            .get(&id)
            .cloned()
            .ok_or(HistoryError::NotFound(id))
    }

    fn list(&self, page: usize, page_size: usize) -> Result<(Vec<HistoryRecord>, usize), HistoryError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let records = inner
            .records
            .values()
            .rev()
            .skip(page_offset(page, page_size))
            .take(page_size)
            .cloned()
            .collect();
        Ok((records, inner.records.len()))
    }

    fn delete(&self, id: u64) -> Result<(), HistoryError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or(HistoryError::NotFound(id))
    }

    fn mark_rolled_back(&self, id: u64, at: &str) -> Result<(), HistoryError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(HistoryError::NotFound(id))?;
        record.rolled_back_at = Some(at.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::sample;

    #[test]
    fn list_is_newest_first_and_paged() {
        let store = MemoryHistory::new();
        for name in ["A", "B", "C"] {
            store.insert(sample(name, "t")).unwrap();
        }

        let (page, total) = store.list(1, 2).unwrap();
        assert_eq!(total, 3);
        let names: Vec<_> = page.iter().map(|r| r.manifest.struct_name.as_str()).collect();
        assert_eq!(names, ["C", "B"]);

        let (page, _) = store.list(2, 2).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].manifest.struct_name, "A");

        let (page, total) = store.list(5, 2).unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 3);
    }

    #[test]
    fn delete_and_mark() {
        let store = MemoryHistory::new();
        let id = store.insert(sample("A", "a")).unwrap();
        store.mark_rolled_back(id, "2024-02-02T00:00:00Z").unwrap();
        assert_eq!(
            store.get(id).unwrap().rolled_back_at.as_deref(),
            Some("2024-02-02T00:00:00Z")
        );

        store.delete(id).unwrap();
        assert!(matches!(store.get(id), Err(HistoryError::NotFound(_))));
        assert!(matches!(store.delete(id), Err(HistoryError::NotFound(_))));

        // Ids are never reused.
        assert_eq!(store.insert(sample("B", "b")).unwrap(), id + 1);
    }

    #[test]
    fn for_table_filters() {
        let store = MemoryHistory::new();
        store.insert(sample("A", "shared")).unwrap();
        store.insert(sample("B", "other")).unwrap();
        store.insert(sample("C", "shared")).unwrap();
        let names: Vec<_> = store
            .for_table("shared")
            .unwrap()
            .into_iter()
            .map(|r| r.manifest.struct_name)
            .collect();
        assert_eq!(names, ["C", "A"]);
    }
}
