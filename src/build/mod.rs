//! Table builders.
//!
//! Both builders follow the same shape:
//!
//! 1. stream source rows (already tokenized by an `io` adapter)
//! 2. skip rows that carry no information (empty key, zero count)
//! 3. turn every remaining row into a validated `RaceDistribution`
//! 4. hand the complete record set to the store's atomic `put_all`
//!
//! Nothing is written until every row has been processed, so an aborted build
//! leaves the previous table authoritative.

use std::collections::HashSet;

use crate::domain::ErrorPolicy;
use crate::error::{BuildError, DataIntegrityError};

pub mod geography;
pub mod surname;

pub use geography::build_geography_table;
pub use surname::build_surname_table;

/// A row rejected during a build run with `ErrorPolicy::Skip`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// 1-based position in the source sequence.
    pub record: usize,
    pub key: Option<String>,
    pub error: DataIntegrityError,
}

/// What a finished build did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub table: &'static str,
    pub rows_read: usize,
    pub rows_written: usize,
    /// Rows skipped because they carry no information (empty key, zero count).
    pub rows_empty: usize,
    pub row_errors: Vec<RowError>,
}

/// Shared bookkeeping for the two builders: error policy and duplicate keys.
struct Collector<T> {
    policy: ErrorPolicy,
    records: Vec<T>,
    seen: HashSet<String>,
    report: BuildReport,
}

impl<T> Collector<T> {
    fn new(table: &'static str, policy: ErrorPolicy) -> Self {
        Self {
            policy,
            records: Vec::new(),
            seen: HashSet::new(),
            report: BuildReport {
                table,
                ..BuildReport::default()
            },
        }
    }

    /// Accept a record unless its key was already seen.
    fn accept(&mut self, record: usize, key: &str, item: T) -> Result<(), BuildError> {
        if !self.seen.insert(key.to_string()) {
            let key = key.to_string();
            return self.reject(record, Some(key.clone()), DataIntegrityError::DuplicateKey { key });
        }
        self.records.push(item);
        Ok(())
    }

    fn reject(&mut self, record: usize, key: Option<String>, error: DataIntegrityError) -> Result<(), BuildError> {
        match self.policy {
            ErrorPolicy::Abort => Err(BuildError::Integrity {
                record,
                key,
                source: error,
            }),
            ErrorPolicy::Skip => {
                tracing::warn!(
                    table = self.report.table,
                    record,
                    key = key.as_deref().unwrap_or(""),
                    "skipping row: {error}"
                );
                self.report.row_errors.push(RowError { record, key, error });
                Ok(())
            }
        }
    }

    fn finish(self) -> Result<(Vec<T>, BuildReport), BuildError> {
        if self.records.is_empty() {
            return Err(BuildError::Empty {
                table: self.report.table,
            });
        }
        Ok((self.records, self.report))
    }
}
