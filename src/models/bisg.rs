//! Bayesian Improved Surname Geocoding.
//!
//! Assuming surname and geography are conditionally independent given race,
//!
//! ```text
//! P(r | s, g) = P(r | s) · P(r | g) / Σ_r' P(r' | s) · P(r' | g)
//! ```
//!
//! i.e. the elementwise product of the two conditional distributions,
//! renormalized. The product is symmetric, so the argument order does not matter.

use nalgebra::Vector6;

use crate::domain::{RACE_COUNT, RaceDistribution};
use crate::error::{CombineError, Side};

/// Combine a surname-conditioned and a geography-conditioned distribution.
///
/// Fails with `UndefinedPosterior` when no race has nonzero probability under
/// both inputs.
pub fn combine(surname: &RaceDistribution, geography: &RaceDistribution) -> Result<RaceDistribution, CombineError> {
    let s = Vector6::from(*surname.values());
    let g = Vector6::from(*geography.values());

    let product = s.component_mul(&g);
    let total = product.sum();
    if !(total > 0.0) {
        return Err(CombineError::UndefinedPosterior);
    }

    let posterior = product / total;
    let mut values = [0.0; RACE_COUNT];
    for (slot, v) in values.iter_mut().zip(posterior.iter()) {
        *slot = *v;
    }

    // Non-negative inputs and a positive total always normalize cleanly.
    RaceDistribution::new(values).map_err(|_| CombineError::UndefinedPosterior)
}

/// Validate raw probability vectors, then combine them.
pub fn combine_values(
    surname: [f64; RACE_COUNT],
    geography: [f64; RACE_COUNT],
) -> Result<RaceDistribution, CombineError> {
    let s = RaceDistribution::new(surname).map_err(|source| CombineError::InvalidInput {
        side: Side::Surname,
        source,
    })?;
    let g = RaceDistribution::new(geography).map_err(|source| CombineError::InvalidInput {
        side: Side::Geography,
        source,
    })?;
    combine(&s, &g)
}
