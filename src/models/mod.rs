//! Estimation models: surname-only, geography-only and BISG.
//!
//! `estimate` is the per-record entry point used by single queries and by the
//! batch processor. It never fails on a miss or an undefined posterior; those
//! become the result's `Status`. Only storage failures are errors.

use crate::domain::{
    GeographyRecord, ModelKind, PosteriorResult, QueryRecord, Status, SurnameRecord,
};
use crate::error::StoreError;
use crate::lookup::Lookup;
use crate::store::TableStore;

pub mod bisg;

pub use bisg::{combine, combine_values};

/// Produce the estimate for one query under `model`.
pub fn estimate<S, G>(
    lookup: &Lookup<'_, S, G>,
    model: ModelKind,
    query: &QueryRecord,
) -> Result<PosteriorResult, StoreError>
where
    S: TableStore<Record = SurnameRecord>,
    G: TableStore<Record = GeographyRecord>,
{
    let surname = if model.needs_surname() {
        lookup.lookup_surname(&query.surname)?
    } else {
        None
    };
    let geography = if model.needs_geography() {
        lookup.lookup_geography(&query.geo_id)?
    } else {
        None
    };

    let result = match model {
        ModelKind::Surname => match surname {
            Some(d) => PosteriorResult::valid(query, model, d),
            None => PosteriorResult::invalid(query, model, Status::SurnameNotFound),
        },
        ModelKind::Geography => match geography {
            Some(d) => PosteriorResult::valid(query, model, d),
            None => PosteriorResult::invalid(query, model, Status::GeographyNotFound),
        },
        ModelKind::Bisg => match (surname, geography) {
            (Some(s), Some(g)) => match combine(&s, &g) {
                Ok(d) => PosteriorResult::valid(query, model, d),
                Err(_) => {
                    tracing::debug!(surname = %query.surname, geo_id = %query.geo_id, "undefined posterior");
                    PosteriorResult::invalid(query, model, Status::Undefined)
                }
            },
            (None, Some(_)) => PosteriorResult::invalid(query, model, Status::SurnameNotFound),
            (Some(_), None) => PosteriorResult::invalid(query, model, Status::GeographyNotFound),
            (None, None) => PosteriorResult::invalid(query, model, Status::BothNotFound),
        },
    };
    Ok(result)
}
