//! Deterministic rounding for stored probabilities.
//!
//! Stored values are rounded to a fixed number of decimals so that table builds
//! produce identical content on every platform. When independent rounding of each
//! slot breaks the sum-to-one invariant, `largest_remainder` redistributes the
//! rounding units instead.

/// Round `value` to `decimals` places (half away from zero).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Round every slot independently.
pub fn round_all<const N: usize>(values: &[f64; N], decimals: u32) -> [f64; N] {
    let mut out = [0.0; N];
    for (slot, v) in out.iter_mut().zip(values) {
        *slot = round_to(*v, decimals);
    }
    out
}

/// Round `values` to `decimals` places so that the result sums to exactly one
/// rounding unit total (largest-remainder / Hamilton apportionment).
///
/// The input is first normalized to sum to 1. Leftover units go to the slots with
/// the largest fractional parts; ties go to the lower index. Returns `None` if the
/// input has no positive mass or contains a negative or non-finite value.
pub fn largest_remainder<const N: usize>(values: &[f64; N], decimals: u32) -> Option<[f64; N]> {
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return None;
    }
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let units = 10u64.pow(decimals);
    let mut floors = [0u64; N];
    let mut remainders = [(0usize, 0.0f64); N];
    for i in 0..N {
        let exact = values[i] / total * units as f64;
        // Absorb representation error so 0.6 * 1e5 lands on 60000, not 59999.
        let floor = (exact + 1e-9).floor();
        floors[i] = floor as u64;
        remainders[i] = (i, exact - floor);
    }

    let assigned: u64 = floors.iter().sum();
    let leftover = units.saturating_sub(assigned) as usize;

    remainders.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    for &(idx, _) in remainders.iter().take(leftover) {
        floors[idx] += 1;
    }

    let mut out = [0.0; N];
    for (slot, units_i) in out.iter_mut().zip(floors) {
        *slot = units_i as f64 / units as f64;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_five_places() {
        assert_eq!(round_to(0.123456, 5), 0.12346);
        assert_eq!(round_to(0.6, 5), 0.6);
        assert_eq!(round_to(1.0 / 3.0, 5), 0.33333);
    }

    #[test]
    fn largest_remainder_sums_to_one() {
        let thirds = [1.0, 1.0, 1.0];
        let out = largest_remainder(&thirds, 5).unwrap();
        assert_eq!(out, [0.33334, 0.33333, 0.33333]);
        let units: u64 = out.iter().map(|v| (v * 1e5).round() as u64).sum();
        assert_eq!(units, 100_000);
    }

    #[test]
    fn largest_remainder_keeps_exact_values() {
        let out = largest_remainder(&[600.0, 200.0, 50.0, 20.0, 30.0, 100.0], 5).unwrap();
        assert_eq!(out, [0.6, 0.2, 0.05, 0.02, 0.03, 0.1]);
    }

    #[test]
    fn largest_remainder_rejects_empty_mass() {
        assert!(largest_remainder(&[0.0; 6], 5).is_none());
        assert!(largest_remainder(&[1.0, -1.0, 0.0], 5).is_none());
    }
}
