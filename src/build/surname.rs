//! Surname table builder.

use crate::build::{BuildReport, Collector};
use crate::domain::{BuildOptions, RawRow, SuppressionPolicy, SurnameRecord};
use crate::error::{BuildError, DataIntegrityError};
use crate::lookup::normalize_surname;
use crate::reconstruct::reconstruct;
use crate::store::{TableRecord, TableStore};

/// Turn one census row into a record.
///
/// Returns `Ok(None)` for rows that are skipped rather than rejected: an empty
/// surname or a zero count.
pub fn surname_record(row: &RawRow, policy: SuppressionPolicy) -> Result<Option<SurnameRecord>, DataIntegrityError> {
    let surname = normalize_surname(&row.name);
    if surname.is_empty() || row.count == 0 {
        return Ok(None);
    }
    if row.count < 0 {
        return Err(DataIntegrityError::NegativeCount { count: row.count });
    }
    let distribution = reconstruct(&row.percentages, policy)?;
    Ok(Some(SurnameRecord {
        surname,
        distribution,
    }))
}

/// Rebuild the surname table from a lazy sequence of census rows.
///
/// Source errors (rows the adapter could not tokenize) are handled by the same
/// error policy as integrity errors found here.
pub fn build_surname_table<S, I>(store: &S, rows: I, options: &BuildOptions) -> Result<BuildReport, BuildError>
where
    S: TableStore<Record = SurnameRecord>,
    I: IntoIterator<Item = Result<RawRow, DataIntegrityError>>,
{
    tracing::info!(
        table = SurnameRecord::TABLE,
        suppression = ?options.suppression,
        on_error = ?options.on_error,
        "building surname table"
    );
    let mut collector = Collector::new(SurnameRecord::TABLE, options.on_error);

    for (idx, row) in rows.into_iter().enumerate() {
        let record = idx + 1;
        collector.report.rows_read += 1;

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                collector.reject(record, None, e)?;
                continue;
            }
        };

        match surname_record(&row, options.suppression) {
            Ok(Some(rec)) => {
                let key = rec.surname.clone();
                collector.accept(record, &key, rec)?
            }
            Ok(None) => {
                tracing::debug!(record, name = %row.name, count = row.count, "skipping empty surname row");
                collector.report.rows_empty += 1;
            }
            Err(e) => collector.reject(record, Some(row.name.clone()), e)?,
        }
    }

    let (records, mut report) = collector.finish()?;
    report.rows_written = store.put_all(records)?;
    tracing::info!(
        table = report.table,
        read = report.rows_read,
        written = report.rows_written,
        empty = report.rows_empty,
        rejected = report.row_errors.len(),
        "surname table built"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorPolicy, PercentField, Race};
    use crate::store::MemoryStore;

    use PercentField::{Suppressed as S, Value as V};

    fn row(name: &str, count: i64, percentages: [PercentField; 6]) -> RawRow {
        RawRow {
            name: name.to_string(),
            count,
            percentages,
        }
    }

    fn rows() -> Vec<RawRow> {
        vec![
            row("SMITH", 2_376_206, [V(73.35), V(22.22), V(0.40), V(0.85), V(1.63), V(1.55)]),
            row(" garcia ", 858_289, [V(5.38), V(0.45), V(1.41), V(0.47), V(0.26), V(92.03)]),
            row("ZYWICKI", 100, [V(96.0), S, S, S, S, V(2.0)]),
        ]
    }

    #[test]
    fn builds_one_record_per_surname() {
        let store = MemoryStore::<SurnameRecord>::new();
        let report =
            build_surname_table(&store, rows().into_iter().map(Ok), &BuildOptions::default()).unwrap();

        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_written, 3);
        assert!(report.row_errors.is_empty());

        let garcia = store.get("GARCIA").unwrap().unwrap();
        assert_eq!(garcia.distribution.get(Race::Hispanic), 0.9203);

        let zywicki = store.get("ZYWICKI").unwrap().unwrap();
        assert_eq!(zywicki.distribution.get(Race::Black), 0.005);
        assert_eq!(zywicki.distribution.get(Race::Multiracial), 0.005);
    }

    #[test]
    fn empty_name_and_zero_count_are_skipped() {
        let store = MemoryStore::<SurnameRecord>::new();
        let mut input = rows();
        input.push(row("   ", 10, [S; 6]));
        input.push(row("NOBODY", 0, [S; 6]));

        let report = build_surname_table(&store, input.into_iter().map(Ok), &BuildOptions::default()).unwrap();
        assert_eq!(report.rows_empty, 2);
        assert_eq!(report.rows_written, 3);
        assert!(store.get("NOBODY").unwrap().is_none());
    }

    #[test]
    fn integrity_error_aborts_without_writing() {
        let store = MemoryStore::with_records([SurnameRecord {
            surname: "OLD".into(),
            distribution: crate::domain::RaceDistribution::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap(),
        }]);
        let mut input = rows();
        input.insert(1, row("BROKEN", 50, [V(99.0), V(5.0), S, S, S, S]));

        let err = build_surname_table(&store, input.into_iter().map(Ok), &BuildOptions::default()).unwrap_err();
        match err {
            BuildError::Integrity { record, key, source } => {
                assert_eq!(record, 2);
                assert_eq!(key.as_deref(), Some("BROKEN"));
                assert!(matches!(source, DataIntegrityError::NegativeRemainder { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.get("OLD").unwrap().is_some());
        assert!(store.get("SMITH").unwrap().is_none());
    }

    #[test]
    fn skip_policy_collects_errors_and_continues() {
        let store = MemoryStore::<SurnameRecord>::new();
        let options = BuildOptions {
            on_error: ErrorPolicy::Skip,
            ..BuildOptions::default()
        };
        let input = vec![
            Ok(rows()[0].clone()),
            Err(DataIntegrityError::Malformed {
                message: "bad count".into(),
            }),
            Ok(row("NEGATIVE", -5, [S; 6])),
            Ok(row("smith", 10, [S; 6])),
        ];

        let report = build_surname_table(&store, input, &options).unwrap();
        assert_eq!(report.rows_written, 1);
        assert_eq!(report.row_errors.len(), 3);
        assert!(matches!(report.row_errors[1].error, DataIntegrityError::NegativeCount { count: -5 }));
        assert!(matches!(report.row_errors[2].error, DataIntegrityError::DuplicateKey { .. }));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let store = MemoryStore::<SurnameRecord>::new();
        build_surname_table(&store, rows().into_iter().map(Ok), &BuildOptions::default()).unwrap();
        let first = store.get("SMITH").unwrap();
        build_surname_table(&store, rows().into_iter().map(Ok), &BuildOptions::default()).unwrap();

        assert_eq!(store.len().unwrap(), Some(3));
        assert_eq!(store.get("SMITH").unwrap(), first);
    }

    #[test]
    fn source_with_no_usable_rows_fails() {
        let store = MemoryStore::<SurnameRecord>::new();
        let err = build_surname_table(&store, vec![Ok(row("", 1, [S; 6]))], &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::Empty { .. }));
        assert_eq!(store.len().unwrap(), None);
    }
}
