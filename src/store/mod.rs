//! Table storage.
//!
//! The statistical core only needs three operations from storage: keyed `get`,
//! atomic bulk replace (`put_all`) and `drop_table`. Two implementations live here:
//!
//! - `MemoryStore`: a lock-protected map, swapped wholesale on rebuild
//! - `SqliteStore`: a SQLite table rebuilt inside a single transaction
//!
//! Both guarantee that readers observe either the previous complete table or the
//! new complete table, never a partial build.

use crate::domain::{GeographyRecord, RaceDistribution, SurnameRecord};
use crate::error::StoreError;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{BuildInfo, SqliteStore};

/// A record persisted as `key + six probability columns`.
pub trait TableRecord: Clone + Send + Sync + 'static {
    /// Table name.
    const TABLE: &'static str;
    /// Key column name.
    const KEY_COLUMN: &'static str;

    fn new(key: String, distribution: RaceDistribution) -> Self;
    fn key(&self) -> &str;
    fn distribution(&self) -> &RaceDistribution;
}

impl TableRecord for SurnameRecord {
    const TABLE: &'static str = "surname_probabilities";
    const KEY_COLUMN: &'static str = "surname";

    fn new(key: String, distribution: RaceDistribution) -> Self {
        SurnameRecord {
            surname: key,
            distribution,
        }
    }

    fn key(&self) -> &str {
        &self.surname
    }

    fn distribution(&self) -> &RaceDistribution {
        &self.distribution
    }
}

impl TableRecord for GeographyRecord {
    const TABLE: &'static str = "geography_probabilities";
    const KEY_COLUMN: &'static str = "geo_id";

    fn new(key: String, distribution: RaceDistribution) -> Self {
        GeographyRecord {
            geo_id: key,
            distribution,
        }
    }

    fn key(&self) -> &str {
        &self.geo_id
    }

    fn distribution(&self) -> &RaceDistribution {
        &self.distribution
    }
}

/// Storage collaborator for one table.
///
/// Implementations must be safe to share between threads: batch queries call `get`
/// concurrently.
pub trait TableStore: Send + Sync {
    type Record: TableRecord;

    /// Exact-match lookup. `Ok(None)` means the key is absent from a built table.
    fn get(&self, key: &str) -> Result<Option<Self::Record>, StoreError>;

    /// Atomically replace the whole table with `records`. Returns the row count.
    fn put_all(&self, records: Vec<Self::Record>) -> Result<usize, StoreError>;

    /// Remove the table. Subsequent `get` calls fail with `TableMissing`.
    fn drop_table(&self) -> Result<(), StoreError>;

    /// Number of rows, or `None` if the table has not been built.
    fn len(&self) -> Result<Option<usize>, StoreError>;
}
