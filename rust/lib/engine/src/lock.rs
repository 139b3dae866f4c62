use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::GenError;

/// Exclusion for generator runs.
///
/// Holds one token per struct name currently being generated or rolled
/// back, plus a single lock every edit of a shared file (route registry,
/// menu) goes through. Section keys a run is about to write are reserved
/// for it until the run ends.
#[derive(Default)]
pub struct GenerationLocks {
    active: Mutex<HashSet<String>>,
    shared: Mutex<()>,
    reserved: Mutex<HashMap<(String, String), String>>,
}

/// Held for the duration of a run; releases the name on drop.
pub struct NameToken<'a> {
    locks: &'a GenerationLocks,
    name: String,
}

impl NameToken<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NameToken<'_> {
    fn drop(&mut self) {
        self.locks.active_set().remove(&self.name);
    }
}

/// A section key reserved for one owner; released on drop.
pub struct SectionClaim<'a> {
    locks: &'a GenerationLocks,
    path: String,
    key: String,
}

impl SectionClaim<'_> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for SectionClaim<'_> {
    fn drop(&mut self) {
        self.locks
            .reserved_map()
            .remove(&(std::mem::take(&mut self.path), std::mem::take(&mut self.key)));
    }
}

impl GenerationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`. Returns GenError::Busy if it is already claimed.
    pub fn acquire(&self, name: &str) -> Result<NameToken<'_>, GenError> {
        if !self.active_set().insert(name.to_string()) {
            return Err(GenError::Busy(format!(
                "a generation or rollback for {} is already in progress",
                name
            )));
        }
        Ok(NameToken {
            locks: self,
            name: name.to_string(),
        })
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active_set().contains(name)
    }

    /// Serialize a shared-file edit.
    pub fn shared(&self) -> MutexGuard<'_, ()> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reserve section `key` in the shared file at `path` for `owner`.
    /// Returns GenError::Conflict while another run holds it.
    pub fn reserve(&self, path: &str, key: &str, owner: &str) -> Result<SectionClaim<'_>, GenError> {
        let mut reserved = self.reserved_map();
        let slot = (path.to_string(), key.to_string());
        if let Some(holder) = reserved.get(&slot) {
            return Err(GenError::Conflict(format!(
                "{}: section '{}' is being generated by {}",
                path, key, holder
            )));
        }
        reserved.insert(slot, owner.to_string());
        Ok(SectionClaim {
            locks: self,
            path: path.to_string(),
            key: key.to_string(),
        })
    }

    fn reserved_map(&self) -> MutexGuard<'_, HashMap<(String, String), String>> {
        self.reserved.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn active_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn second_claim_is_busy_until_release() {
        let locks = GenerationLocks::new();
        let token = locks.acquire("Product").unwrap();
        assert!(locks.is_active("Product"));
        assert!(matches!(locks.acquire("Product"), Err(GenError::Busy(_))));
        assert!(locks.acquire("Category").is_ok());

        drop(token);
        assert!(!locks.is_active("Product"));
        assert_eq!(locks.acquire("Product").unwrap().name(), "Product");
    }

    #[test]
    fn reserved_section_conflicts_until_claim_drops() {
        let locks = GenerationLocks::new();
        let claim = locks.reserve("routes.go", "items", "Product").unwrap();
        assert_eq!((claim.path(), claim.key()), ("routes.go", "items"));

        let err = locks.reserve("routes.go", "items", "Item").err().unwrap();
        assert!(matches!(err, GenError::Conflict(_)));
        assert!(err.to_string().contains("being generated by Product"));
        assert!(locks.reserve("menu.ts", "items", "Item").is_ok());

        drop(claim);
        assert!(locks.reserve("routes.go", "items", "Item").is_ok());
    }

    #[test]
    fn shared_lock_serializes_threads() {
        let locks = Arc::new(GenerationLocks::new());
        let counter = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let locks = Arc::clone(&locks);
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    let _guard = locks.shared();
                    counter.lock().unwrap().push(i);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.lock().unwrap().len(), 4);
    }
}
