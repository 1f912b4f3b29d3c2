//! Geography table builder.
//!
//! Each geographic unit's race counts become a distribution by `count / total`,
//! rounded to stored precision. Rounded values are re-apportioned with the
//! largest-remainder method only when independent rounding leaves the sum outside
//! tolerance. Units with a zero total are left out of the table so lookups report
//! them as not found.

use crate::build::{BuildReport, Collector};
use crate::domain::{
    BuildOptions, GeoCounts, GeographyRecord, PROBABILITY_DECIMALS, RACE_COUNT, Race, RaceDistribution,
    SUM_TOLERANCE,
};
use crate::error::{BuildError, DataIntegrityError};
use crate::lookup::normalize_geo_id;
use crate::math::{largest_remainder, round_all};
use crate::store::{TableRecord, TableStore};

/// Normalize raw counts into a stored-precision distribution.
///
/// Returns `Ok(None)` when the total is zero.
pub fn counts_to_distribution(counts: &[f64; RACE_COUNT]) -> Result<Option<RaceDistribution>, DataIntegrityError> {
    for race in Race::ALL {
        let c = counts[race.index()];
        if !c.is_finite() || c < 0.0 {
            return Err(DataIntegrityError::InvalidCount { race, value: c });
        }
    }

    let total: f64 = counts.iter().sum();
    if total == 0.0 {
        return Ok(None);
    }

    let shares = counts.map(|c| c / total);
    let rounded = settle_rounding(round_all(&shares, PROBABILITY_DECIMALS), counts, SUM_TOLERANCE);
    Ok(Some(RaceDistribution::new(rounded)?))
}

/// Replace independently rounded shares with a largest-remainder apportionment of
/// `counts` when their sum drifts more than `tolerance` from 1.
///
/// Safety net: six shares at five decimals drift by at most 3e-5.
fn settle_rounding(rounded: [f64; RACE_COUNT], counts: &[f64; RACE_COUNT], tolerance: f64) -> [f64; RACE_COUNT] {
    let sum: f64 = rounded.iter().sum();
    if (sum - 1.0).abs() <= tolerance {
        return rounded;
    }
    tracing::debug!(sum, "rounded shares drifted, re-apportioning");
    largest_remainder(counts, PROBABILITY_DECIMALS).unwrap_or(rounded)
}

/// Turn one counts row into a record; `Ok(None)` for an empty id or zero total.
pub fn geography_record(row: &GeoCounts) -> Result<Option<GeographyRecord>, DataIntegrityError> {
    let geo_id = normalize_geo_id(&row.geo_id);
    if geo_id.is_empty() {
        return Ok(None);
    }
    Ok(counts_to_distribution(&row.counts)?.map(|distribution| GeographyRecord {
        geo_id,
        distribution,
    }))
}

/// Rebuild the geography table from a lazy sequence of count rows.
pub fn build_geography_table<S, I>(store: &S, rows: I, options: &BuildOptions) -> Result<BuildReport, BuildError>
where
    S: TableStore<Record = GeographyRecord>,
    I: IntoIterator<Item = Result<GeoCounts, DataIntegrityError>>,
{
    tracing::info!(table = GeographyRecord::TABLE, on_error = ?options.on_error, "building geography table");
    let mut collector = Collector::new(GeographyRecord::TABLE, options.on_error);

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

        match geography_record(&row) {
            Ok(Some(rec)) => {
                let key = rec.geo_id.clone();
                collector.accept(record, &key, rec)?
            }
            Ok(None) => {
                tracing::debug!(record, geo_id = %row.geo_id, "skipping geography row with no population");
                collector.report.rows_empty += 1;
            }
            Err(e) => collector.reject(record, Some(row.geo_id.clone()), e)?,
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
        "geography table built"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorPolicy;
    use crate::store::MemoryStore;

    fn counts(id: &str, counts: [f64; 6]) -> GeoCounts {
        GeoCounts {
            geo_id: id.to_string(),
            counts,
        }
    }

    #[test]
    fn counts_normalize_exactly() {
        let d = counts_to_distribution(&[600.0, 200.0, 50.0, 20.0, 30.0, 100.0])
            .unwrap()
            .unwrap();
        assert_eq!(d.values(), &[0.6, 0.2, 0.05, 0.02, 0.03, 0.1]);
    }

    #[test]
    fn zero_total_has_no_distribution() {
        assert_eq!(counts_to_distribution(&[0.0; 6]).unwrap(), None);
    }

    #[test]
    fn negative_count_is_rejected() {
        let err = counts_to_distribution(&[10.0, -1.0, 0.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, DataIntegrityError::InvalidCount { race: Race::Black, .. }));
    }

    #[test]
    fn uneven_counts_stay_within_tolerance() {
        let d = counts_to_distribution(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]).unwrap().unwrap();
        assert!((d.sum() - 1.0).abs() < 1e-4);
        let d = counts_to_distribution(&[7.0, 3.0, 11.0, 0.0, 13.0, 1.0]).unwrap().unwrap();
        assert!((d.sum() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn drifted_rounding_is_reapportioned() {
        let counts = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let drifted = [0.33, 0.33, 0.33, 0.0, 0.0, 0.0];
        let settled = settle_rounding(drifted, &counts, SUM_TOLERANCE);
        assert_eq!(settled, [0.33334, 0.33333, 0.33333, 0.0, 0.0, 0.0]);

        let close = [0.33333, 0.33333, 0.33333, 0.0, 0.0, 0.0];
        assert_eq!(settle_rounding(close, &counts, SUM_TOLERANCE), close);
    }

    #[test]
    fn build_skips_empty_units_and_pads_ids() {
        let store = MemoryStore::<GeographyRecord>::new();
        let rows = vec![
            Ok(counts("2134", [600.0, 200.0, 50.0, 20.0, 30.0, 100.0])),
            Ok(counts("99999", [0.0; 6])),
            Ok(counts("", [1.0; 6])),
        ];

        let report = build_geography_table(&store, rows, &BuildOptions::default()).unwrap();
        assert_eq!(report.rows_written, 1);
        assert_eq!(report.rows_empty, 2);
        assert!(store.get("02134").unwrap().is_some());
        assert!(store.get("99999").unwrap().is_none());
    }

    #[test]
    fn duplicate_geo_ids_abort_by_default() {
        let store = MemoryStore::<GeographyRecord>::new();
        let rows = vec![
            Ok(counts("02134", [1.0; 6])),
            Ok(counts("2134", [1.0; 6])),
        ];
        let err = build_geography_table(&store, rows.clone(), &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::Integrity { record: 2, .. }));

        let skip = BuildOptions {
            on_error: ErrorPolicy::Skip,
            ..BuildOptions::default()
        };
        let report = build_geography_table(&store, rows, &skip).unwrap();
        assert_eq!(report.rows_written, 1);
        assert_eq!(report.row_errors.len(), 1);
    }
}
