//! Reporting utilities: batch summaries and formatted terminal output.

use serde::Serialize;

use crate::domain::{PosteriorResult, RACE_COUNT, RaceShares, Status};

pub mod format;

pub use format::*;

/// Aggregate view of a batch run.
///
/// `expected_counts` is the sum of posterior probabilities per race over the valid
/// records (the BISG estimate of how many individuals in the batch belong to each
/// group); `mean_shares` divides it by the number of valid records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub surname_not_found: usize,
    pub geography_not_found: usize,
    pub both_not_found: usize,
    pub undefined: usize,
    pub expected_counts: RaceShares,
    pub mean_shares: Option<RaceShares>,
}

impl BatchSummary {
    pub fn flagged(&self) -> usize {
        self.total - self.valid
    }
}

/// Summarize a batch of results.
pub fn summarize(results: &[PosteriorResult]) -> BatchSummary {
    let mut sums = [0.0; RACE_COUNT];
    let mut summary = BatchSummary {
        total: results.len(),
        valid: 0,
        surname_not_found: 0,
        geography_not_found: 0,
        both_not_found: 0,
        undefined: 0,
        expected_counts: sums.into(),
        mean_shares: None,
    };

    for r in results {
        match r.status {
            Status::Valid => summary.valid += 1,
            Status::SurnameNotFound => summary.surname_not_found += 1,
            Status::GeographyNotFound => summary.geography_not_found += 1,
            Status::BothNotFound => summary.both_not_found += 1,
            Status::Undefined => summary.undefined += 1,
        }
        if let Some(d) = &r.distribution {
            for (sum, v) in sums.iter_mut().zip(d.values()) {
                *sum += v;
            }
        }
    }

    summary.expected_counts = sums.into();
    if summary.valid > 0 {
        let n = summary.valid as f64;
        summary.mean_shares = Some(sums.map(|s| s / n).into());
    }
    summary
}
