//! Batch estimation.
//!
//! Each query is independent, so the batch is a parallel map. Results come back
//! in input order: row N of the output corresponds to row N of the input.
//! Per-record misses and undefined posteriors are carried in each result's
//! status; only a storage failure aborts the batch.

use rayon::prelude::*;

use crate::domain::{GeographyRecord, ModelKind, PosteriorResult, QueryRecord, SurnameRecord};
use crate::error::StoreError;
use crate::lookup::Lookup;
use crate::models::estimate;
use crate::store::TableStore;

/// Estimate every query in parallel, preserving input order.
pub fn run_batch<S, G>(
    lookup: &Lookup<'_, S, G>,
    model: ModelKind,
    queries: &[QueryRecord],
) -> Result<Vec<PosteriorResult>, StoreError>
where
    S: TableStore<Record = SurnameRecord>,
    G: TableStore<Record = GeographyRecord>,
{
    tracing::info!(model = model.display_name(), records = queries.len(), "running batch");
    let results: Vec<PosteriorResult> = queries
        .par_iter()
        .map(|q| estimate(lookup, model, q))
        .collect::<Result<_, _>>()?;

    let valid = results.iter().filter(|r| r.is_valid()).count();
    tracing::info!(valid, flagged = results.len() - valid, "batch complete");
    Ok(results)
}
