use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::HistoryError;
use crate::manifest::{GenerationManifest, HistoryRecord};
use crate::traits::{page_offset, HistoryStore};

const MANIFESTS: TableDefinition<u64, &[u8]> = TableDefinition::new("manifests");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");
const NEXT_ID: &str = "next_id";

/// RedbHistory is a HistoryStore backed by redb. Records are stored as
/// JSON under their id.
pub struct RedbHistory {
    db: Arc<Database>,
}

fn storage<E: std::fmt::Display>(e: E) -> HistoryError {
    HistoryError::Storage(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<HistoryRecord, HistoryError> {
    serde_json::from_slice(bytes).map_err(|e| HistoryError::Serialization(e.to_string()))
}

fn encode(record: &HistoryRecord) -> Result<Vec<u8>, HistoryError> {
    serde_json::to_vec(record).map_err(|e| HistoryError::Serialization(e.to_string()))
}

impl RedbHistory {
    /// Open or create a history database at the given path.
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        let db = Database::create(path).map_err(storage)?;

        // Ensure both tables exist.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _manifests = write_txn.open_table(MANIFESTS).map_err(storage)?;
            let _meta = write_txn.open_table(META).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        tracing::debug!(path = %path.display(), "opened history database");
        Ok(Self { db: Arc::new(db) })
    }
}

impl HistoryStore for RedbHistory {
    fn insert(&self, manifest: GenerationManifest) -> Result<u64, HistoryError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        let id = {
            let mut meta = write_txn.open_table(META).map_err(storage)?;
            let id = meta
                .get(NEXT_ID)
                .map_err(storage)?
                .map(|v| v.value())
                .unwrap_or(1);
            meta.insert(NEXT_ID, id + 1).map_err(storage)?;

            let record = HistoryRecord {
                id,
                manifest,
                rolled_back_at: None,
            };
            let bytes = encode(&record)?;
            let mut table = write_txn.open_table(MANIFESTS).map_err(storage)?;
            table.insert(id, bytes.as_slice()).map_err(storage)?;
            id
        };
        write_txn.commit().map_err(storage)?;
        Ok(id)
    }

    fn get(&self, id: u64) -> Result<HistoryRecord, HistoryError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(MANIFESTS).map_err(storage)?;
        let bytes = table
            .get(id)
            .map_err(storage)?
            .map(|value| value.value().to_vec());
        match bytes {
            Some(bytes) => decode(&bytes),
            None => Err(HistoryError::NotFound(id)),
        }
    }

    fn list(&self, page: usize, page_size: usize) -> Result<(Vec<HistoryRecord>, usize), HistoryError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(MANIFESTS).map_err(storage)?;
        let total = table.len().map_err(storage)? as usize;

        let mut records = Vec::new();
        let iter = table.iter().map_err(storage)?;
        for entry in iter.rev().skip(page_offset(page, page_size)).take(page_size) {
            let (_, value) = entry.map_err(storage)?;
            records.push(decode(value.value())?);
        }
        Ok((records, total))
    }

    fn delete(&self, id: u64) -> Result<(), HistoryError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        let removed = {
            let mut table = write_txn.open_table(MANIFESTS).map_err(storage)?;
            let removed = table.remove(id).map_err(storage)?.is_some();
            removed
        };
        if !removed {
            write_txn.abort().map_err(storage)?;
            return Err(HistoryError::NotFound(id));
        }
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn mark_rolled_back(&self, id: u64, at: &str) -> Result<(), HistoryError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(MANIFESTS).map_err(storage)?;
            let existing = table.get(id).map_err(storage)?.map(|v| v.value().to_vec());
            let Some(bytes) = existing else {
                drop(table);
                write_txn.abort().map_err(storage)?;
                return Err(HistoryError::NotFound(id));
            };
            let mut record = decode(&bytes)?;
            record.rolled_back_at = Some(at.to_string());
            let bytes = encode(&record)?;
            table.insert(id, bytes.as_slice()).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::sample;

    fn open() -> (tempfile::TempDir, RedbHistory) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbHistory::open(&dir.path().join("history.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn insert_get_list() {
        let (_dir, store) = open();
        let a = store.insert(sample("A", "a")).unwrap();
        let b = store.insert(sample("B", "b")).unwrap();
        assert_eq!((a, b), (1, 2));

        assert_eq!(store.get(a).unwrap().manifest, sample("A", "a"));

        let (page, total) = store.list(1, 10).unwrap();
        assert_eq!(total, 2);
        let ids: Vec<_> = page.iter().map(|r| r.id).collect();
        assert_eq!(ids, [2, 1]);

        let (page, _) = store.list(2, 1).unwrap();
        assert_eq!(page[0].id, 1);
    }

    #[test]
    fn delete_and_mark_rolled_back() {
        let (_dir, store) = open();
        let id = store.insert(sample("A", "a")).unwrap();

        store.mark_rolled_back(id, "2024-03-03T00:00:00Z").unwrap();
        assert!(store.get(id).unwrap().rolled_back_at.is_some());
        assert!(matches!(
            store.mark_rolled_back(99, "x"),
            Err(HistoryError::NotFound(99))
        ));

        store.delete(id).unwrap();
        assert!(matches!(store.delete(id), Err(HistoryError::NotFound(_))));
        assert_eq!(store.list(1, 10).unwrap().1, 0);
    }

    #[test]
    fn delete_removes_only_that_record() {
        let (_dir, store) = open();
        let a = store.insert(sample("A", "a")).unwrap();
        let b = store.insert(sample("B", "b")).unwrap();

        store.delete(a).unwrap();
        assert!(matches!(store.get(a), Err(HistoryError::NotFound(_))));
        assert_eq!(store.get(b).unwrap().manifest.struct_name, "B");
        assert!(matches!(store.delete(a), Err(HistoryError::NotFound(_))));
        assert_eq!(store.list(1, 10).unwrap().1, 1);
    }

    #[test]
    fn ids_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.redb");
        {
            let store = RedbHistory::open(&path).unwrap();
            store.insert(sample("A", "a")).unwrap();
        }
        let store = RedbHistory::open(&path).unwrap();
        assert_eq!(store.insert(sample("B", "b")).unwrap(), 2);
        assert_eq!(store.get(1).unwrap().manifest.struct_name, "A");
    }
}
