//! Reconstruction of suppressed census percentages.
//!
//! The census surname table redacts small cells with `(S)`. For each row the
//! percentage mass not accounted for by the published fields is handed back to
//! the suppressed fields, so that every surname ends up with a complete
//! distribution:
//!
//! ```text
//! remaining = 100 - Σ known
//! suppressed_i = remaining / k                    (SuppressionPolicy::Even)
//! suppressed_i = remaining * w_i / Σ_{j∈S} w_j    (SuppressionPolicy::Proportional)
//! ```
//!
//! where `w` are the Jirousek & Preucil "other race" allocation weights. The result
//! is scaled to probabilities and rounded to `PROBABILITY_DECIMALS` places.

use crate::domain::{
    PROBABILITY_DECIMALS, PercentField, RACE_COUNT, Race, RaceDistribution, SuppressionPolicy,
};
use crate::error::DataIntegrityError;
use crate::math::round_all;

/// Tolerance (percentage points) for an unsuppressed row summing to 100.
pub const PERCENT_SUM_TOLERANCE: f64 = 0.1;

/// Float noise allowed below zero before `remaining` counts as negative.
const REMAINDER_EPS: f64 = 1e-9;

/// Jirousek & Preucil allocation weights, in `Race::ALL` order
/// (white, black, api, ai_an, multiracial, hispanic).
pub const PROPORTIONAL_WEIGHTS: [f64; RACE_COUNT] = [70.5, 11.3, 7.0, 0.9, 0.8, 11.1];

/// Fill suppressed fields and return the row as percentages (unrounded).
pub fn reconstruct_percentages(
    fields: &[PercentField; RACE_COUNT],
    policy: SuppressionPolicy,
) -> Result<[f64; RACE_COUNT], DataIntegrityError> {
    let mut out = [0.0; RACE_COUNT];
    let mut known_sum = 0.0;
    let mut suppressed = Vec::with_capacity(RACE_COUNT);

    for race in Race::ALL {
        match fields[race.index()] {
            PercentField::Value(v) => {
                if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                    return Err(DataIntegrityError::PercentOutOfRange { race, value: v });
                }
                out[race.index()] = v;
                known_sum += v;
            }
            PercentField::Suppressed => suppressed.push(race),
        }
    }

    if suppressed.is_empty() {
        if (known_sum - 100.0).abs() > PERCENT_SUM_TOLERANCE {
            return Err(DataIntegrityError::UnbalancedPercentages { sum: known_sum });
        }
        return Ok(out);
    }

    let remaining = 100.0 - known_sum;
    if remaining < -REMAINDER_EPS {
        return Err(DataIntegrityError::NegativeRemainder {
            known_sum,
            remaining,
        });
    }
    let remaining = remaining.max(0.0);

    match policy {
        SuppressionPolicy::Even => {
            let share = remaining / suppressed.len() as f64;
            for race in &suppressed {
                out[race.index()] = share;
            }
        }
        SuppressionPolicy::Proportional => {
            let weight_sum: f64 = suppressed.iter().map(|r| PROPORTIONAL_WEIGHTS[r.index()]).sum();
            for race in &suppressed {
                out[race.index()] = remaining * PROPORTIONAL_WEIGHTS[race.index()] / weight_sum;
            }
        }
    }

    Ok(out)
}

/// Reconstruct a row and convert it into a stored-precision distribution.
pub fn reconstruct(
    fields: &[PercentField; RACE_COUNT],
    policy: SuppressionPolicy,
) -> Result<RaceDistribution, DataIntegrityError> {
    let percentages = reconstruct_percentages(fields, policy)?;
    let probabilities = percentages.map(|p| p / 100.0);
    let rounded = round_all(&probabilities, PROBABILITY_DECIMALS);
    Ok(RaceDistribution::new(rounded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DistributionError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use PercentField::{Suppressed as S, Value as V};

    #[test]
    fn unsuppressed_row_is_identity() {
        let fields = [V(73.35), V(22.22), V(0.40), V(0.85), V(1.63), V(1.55)];
        let d = reconstruct(&fields, SuppressionPolicy::Even).unwrap();
        assert_eq!(d.values(), &[0.7335, 0.2222, 0.004, 0.0085, 0.0163, 0.0155]);
    }

    #[test]
    fn unsuppressed_row_must_sum_to_100() {
        let fields = [V(50.0), V(20.0), V(0.0), V(0.0), V(0.0), V(0.0)];
        let err = reconstruct(&fields, SuppressionPolicy::Even).unwrap_err();
        assert!(matches!(err, DataIntegrityError::UnbalancedPercentages { .. }));
    }

    #[test]
    fn suppressed_fields_share_remainder_evenly() {
        let fields = [V(90.0), S, V(4.0), S, V(2.0), V(2.0)];
        let pct = reconstruct_percentages(&fields, SuppressionPolicy::Even).unwrap();
        assert_eq!(pct[Race::Black.index()], 1.0);
        assert_eq!(pct[Race::AiAn.index()], 1.0);

        let d = reconstruct(&fields, SuppressionPolicy::Even).unwrap();
        assert_eq!(d.get(Race::Black), 0.01);
        assert!((d.sum() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn all_suppressed_gets_one_sixth_each() {
        let pct = reconstruct_percentages(&[S; RACE_COUNT], SuppressionPolicy::Even).unwrap();
        for v in pct {
            assert!((v - 100.0 / 6.0).abs() < 1e-12);
        }
        let d = reconstruct(&[S; RACE_COUNT], SuppressionPolicy::Even).unwrap();
        assert!(d.values().iter().all(|v| *v == 0.16667));
    }

    #[test]
    fn negative_remainder_is_an_error() {
        let fields = [V(80.0), V(20.0), V(0.5), S, V(0.0), V(0.0)];
        let err = reconstruct(&fields, SuppressionPolicy::Even).unwrap_err();
        match err {
            DataIntegrityError::NegativeRemainder { remaining, .. } => {
                assert!((remaining + 0.5).abs() < 1e-9)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_known_value_is_an_error() {
        let fields = [V(101.0), S, S, S, S, S];
        assert!(matches!(
            reconstruct(&fields, SuppressionPolicy::Even),
            Err(DataIntegrityError::PercentOutOfRange { race: Race::White, .. })
        ));

        let fields = [V(50.0), V(-1.0), S, S, S, S];
        assert!(matches!(
            reconstruct(&fields, SuppressionPolicy::Even),
            Err(DataIntegrityError::PercentOutOfRange { race: Race::Black, .. })
        ));
    }

    #[test]
    fn proportional_policy_follows_weights() {
        // Only white and hispanic suppressed: split 10 points by 70.5 : 11.1.
        let fields = [S, V(60.0), V(20.0), V(5.0), V(5.0), S];
        let pct = reconstruct_percentages(&fields, SuppressionPolicy::Proportional).unwrap();
        let white = pct[Race::White.index()];
        let hispanic = pct[Race::Hispanic.index()];
        assert!((white + hispanic - 10.0).abs() < 1e-12);
        assert!((white / hispanic - 70.5 / 11.1).abs() < 1e-9);
    }

    #[test]
    fn proportional_policy_with_one_suppressed_matches_even() {
        let fields = [V(60.0), V(20.0), V(5.0), V(5.0), V(5.0), S];
        let even = reconstruct(&fields, SuppressionPolicy::Even).unwrap();
        let prop = reconstruct(&fields, SuppressionPolicy::Proportional).unwrap();
        assert_eq!(even, prop);
    }

    #[test]
    fn random_rows_reconstruct_to_valid_distributions() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let k = rng.gen_range(1..=RACE_COUNT);
            let mut fields = [S; RACE_COUNT];
            // Known mass drawn so that it never exceeds 100.
            let mut budget = 100.0;
            for slot in fields.iter_mut().skip(k) {
                let v: f64 = rng.gen_range(0.0..=budget);
                let v = (v * 100.0).floor() / 100.0;
                budget -= v;
                *slot = V(v);
            }

            let pct = reconstruct_percentages(&fields, SuppressionPolicy::Even).unwrap();
            let first = pct[0];
            assert!(pct[..k].iter().all(|v| *v == first), "suppressed slots must be equal");

            let d = reconstruct(&fields, SuppressionPolicy::Even).unwrap();
            assert!((d.sum() - 1.0).abs() < 1e-4, "sum={}", d.sum());
        }
    }

    #[test]
    fn distribution_error_converts() {
        let err: DataIntegrityError = DistributionError::BadSum { sum: 2.0 }.into();
        assert!(err.to_string().contains("sum to 2"));
    }
}
