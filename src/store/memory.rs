//! In-memory table store.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::store::{TableRecord, TableStore};

/// A table held in memory. `put_all` builds the replacement map without holding
/// the lock and swaps it in with a single pointer store.
#[derive(Debug)]
pub struct MemoryStore<R> {
    table: RwLock<Option<Arc<HashMap<String, R>>>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: TableRecord> MemoryStore<R> {
    /// An unbuilt table.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(None),
            _record: PhantomData,
        }
    }

    /// A built table holding `records` (later duplicates win).
    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.key().to_string(), r))
            .collect();
        Self {
            table: RwLock::new(Some(Arc::new(map))),
            _record: PhantomData,
        }
    }

    fn snapshot(&self) -> Result<Arc<HashMap<String, R>>, StoreError> {
        self.table
            .read()
            .clone()
            .ok_or(StoreError::TableMissing { table: R::TABLE })
    }
}

impl<R: TableRecord> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TableRecord> TableStore for MemoryStore<R> {
    type Record = R;

    fn get(&self, key: &str) -> Result<Option<R>, StoreError> {
        Ok(self.snapshot()?.get(key).cloned())
    }

    fn put_all(&self, records: Vec<R>) -> Result<usize, StoreError> {
        let map: HashMap<String, R> = records
            .into_iter()
            .map(|r| (r.key().to_string(), r))
            .collect();
        let n = map.len();
        *self.table.write() = Some(Arc::new(map));
        tracing::debug!(table = R::TABLE, rows = n, "replaced in-memory table");
        Ok(n)
    }

    fn drop_table(&self) -> Result<(), StoreError> {
        *self.table.write() = None;
        Ok(())
    }

    fn len(&self) -> Result<Option<usize>, StoreError> {
        Ok(self.table.read().as_ref().map(|m| m.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RaceDistribution, SurnameRecord};

    fn record(name: &str) -> SurnameRecord {
        SurnameRecord {
            surname: name.to_string(),
            distribution: RaceDistribution::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap(),
        }
    }

    #[test]
    fn unbuilt_table_reports_missing() {
        let store = MemoryStore::<SurnameRecord>::new();
        assert!(matches!(store.get("SMITH"), Err(StoreError::TableMissing { .. })));
        assert_eq!(store.len().unwrap(), None);
    }

    #[test]
    fn put_all_replaces_previous_content() {
        let store = MemoryStore::with_records([record("SMITH"), record("JONES")]);
        assert_eq!(store.put_all(vec![record("GARCIA")]).unwrap(), 1);
        assert!(store.get("SMITH").unwrap().is_none());
        assert!(store.get("GARCIA").unwrap().is_some());
    }

    #[test]
    fn old_snapshot_survives_swap() {
        let store = MemoryStore::with_records([record("SMITH")]);
        let before = store.snapshot().unwrap();
        store.put_all(vec![record("JONES")]).unwrap();
        assert!(before.contains_key("SMITH"));
        assert!(!store.snapshot().unwrap().contains_key("SMITH"));
    }

    #[test]
    fn drop_table_makes_lookups_fail() {
        let store = MemoryStore::with_records([record("SMITH")]);
        store.drop_table().unwrap();
        assert!(store.get("SMITH").is_err());
    }
}
