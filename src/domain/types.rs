//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - produced by the table builders and persisted by a store
//! - passed by value between lookup, combination and batch code
//! - exported to CSV/JSON for callers

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DistributionError;

/// Number of race/ethnicity categories.
pub const RACE_COUNT: usize = 6;

/// Allowed drift of a distribution's sum away from 1.
///
/// Census percentages are published with two decimals, so an unsuppressed row can
/// legitimately sum to 100.01 or 99.98.
pub const SUM_TOLERANCE: f64 = 1e-3;

/// Decimal places kept for stored probabilities.
pub const PROBABILITY_DECIMALS: u32 = 5;

/// The closed set of race/ethnicity categories, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Race {
    White,
    Black,
    Api,
    AiAn,
    Multiracial,
    Hispanic,
}

impl Race {
    pub const ALL: [Race; RACE_COUNT] = [
        Race::White,
        Race::Black,
        Race::Api,
        Race::AiAn,
        Race::Multiracial,
        Race::Hispanic,
    ];

    /// Position in every six-slot array.
    pub fn index(self) -> usize {
        match self {
            Race::White => 0,
            Race::Black => 1,
            Race::Api => 2,
            Race::AiAn => 3,
            Race::Multiracial => 4,
            Race::Hispanic => 5,
        }
    }

    /// Persisted column name.
    pub fn column(self) -> &'static str {
        match self {
            Race::White => "pct_white",
            Race::Black => "pct_black",
            Race::Api => "pct_api",
            Race::AiAn => "pct_ai_an",
            Race::Multiracial => "pct_2_or_more",
            Race::Hispanic => "pct_hispanic",
        }
    }

    /// Short label for terminal output.
    pub fn label(self) -> &'static str {
        match self {
            Race::White => "white",
            Race::Black => "black",
            Race::Api => "api",
            Race::AiAn => "ai_an",
            Race::Multiracial => "multiracial",
            Race::Hispanic => "hispanic",
        }
    }
}

impl std::fmt::Display for Race {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A probability distribution over `Race::ALL`.
///
/// Construction validates the invariant (finite, within `[0, 1]`, sums to 1 within
/// `SUM_TOLERANCE`), so a value of this type is always usable by the combiner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "RaceShares", try_from = "RaceShares")]
pub struct RaceDistribution {
    values: [f64; RACE_COUNT],
}

impl RaceDistribution {
    pub fn new(values: [f64; RACE_COUNT]) -> Result<Self, DistributionError> {
        let mut sum = 0.0;
        for race in Race::ALL {
            let v = values[race.index()];
            if !v.is_finite() {
                return Err(DistributionError::NonFinite { race });
            }
            if !(0.0..=1.0 + SUM_TOLERANCE).contains(&v) {
                return Err(DistributionError::OutOfRange { race, value: v });
            }
            sum += v;
        }
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(DistributionError::BadSum { sum });
        }
        Ok(Self { values })
    }

    pub fn get(&self, race: Race) -> f64 {
        self.values[race.index()]
    }

    pub fn values(&self) -> &[f64; RACE_COUNT] {
        &self.values
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Category with the highest probability (first in storage order on ties).
    pub fn most_likely(&self) -> Race {
        let mut best = Race::White;
        for race in Race::ALL {
            if self.get(race) > self.get(best) {
                best = race;
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (Race, f64)> + '_ {
        Race::ALL.into_iter().map(|r| (r, self.get(r)))
    }
}

/// Named-field form of a distribution, used for (de)serialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaceShares {
    pub white: f64,
    pub black: f64,
    pub api: f64,
    pub ai_an: f64,
    pub multiracial: f64,
    pub hispanic: f64,
}

impl From<RaceDistribution> for RaceShares {
    fn from(d: RaceDistribution) -> Self {
        d.values.into()
    }
}

impl From<[f64; RACE_COUNT]> for RaceShares {
    fn from(values: [f64; RACE_COUNT]) -> Self {
        let [white, black, api, ai_an, multiracial, hispanic] = values;
        Self {
            white,
            black,
            api,
            ai_an,
            multiracial,
            hispanic,
        }
    }
}

impl TryFrom<RaceShares> for RaceDistribution {
    type Error = DistributionError;

    fn try_from(s: RaceShares) -> Result<Self, Self::Error> {
        RaceDistribution::new([s.white, s.black, s.api, s.ai_an, s.multiracial, s.hispanic])
    }
}

/// P(race | surname) for one normalized surname.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurnameRecord {
    pub surname: String,
    pub distribution: RaceDistribution,
}

/// P(race | geography) for one ZCTA/ZIP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographyRecord {
    pub geo_id: String,
    pub distribution: RaceDistribution,
}

/// One percentage cell of a census surname row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentField {
    Value(f64),
    /// Redacted in the source (`(S)`).
    Suppressed,
}

impl PercentField {
    pub fn is_suppressed(self) -> bool {
        matches!(self, PercentField::Suppressed)
    }
}

/// One unreconstructed line of the census surname file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub name: String,
    pub count: i64,
    pub percentages: [PercentField; RACE_COUNT],
}

/// Per-race population counts for one geographic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCounts {
    pub geo_id: String,
    pub counts: [f64; RACE_COUNT],
}

/// One individual to estimate: raw surname and geography keys as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub surname: String,
    pub geo_id: String,
}

impl QueryRecord {
    pub fn new(surname: impl Into<String>, geo_id: impl Into<String>) -> Self {
        Self {
            surname: surname.into(),
            geo_id: geo_id.into(),
        }
    }
}

/// Which estimate to produce for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// P(race | surname) only.
    Surname,
    /// P(race | geography) only.
    Geography,
    /// Bayesian Improved Surname Geocoding: both, combined.
    Bisg,
}

impl ModelKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Surname => "surname",
            ModelKind::Geography => "geography",
            ModelKind::Bisg => "bisg",
        }
    }

    pub fn needs_surname(self) -> bool {
        matches!(self, ModelKind::Surname | ModelKind::Bisg)
    }

    pub fn needs_geography(self) -> bool {
        matches!(self, ModelKind::Geography | ModelKind::Bisg)
    }
}

/// Outcome flag carried by every `PosteriorResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Valid,
    SurnameNotFound,
    GeographyNotFound,
    BothNotFound,
    /// Surname and geography distributions share no support.
    Undefined,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Valid => "valid",
            Status::SurnameNotFound => "surname_not_found",
            Status::GeographyNotFound => "geography_not_found",
            Status::BothNotFound => "both_not_found",
            Status::Undefined => "undefined",
        }
    }
}

/// Estimate for one query. `distribution` is `Some` exactly when `status` is `Valid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorResult {
    pub surname: String,
    pub geo_id: String,
    pub model: ModelKind,
    pub status: Status,
    pub distribution: Option<RaceDistribution>,
}

impl PosteriorResult {
    pub fn valid(query: &QueryRecord, model: ModelKind, distribution: RaceDistribution) -> Self {
        Self {
            surname: query.surname.clone(),
            geo_id: query.geo_id.clone(),
            model,
            status: Status::Valid,
            distribution: Some(distribution),
        }
    }

    pub fn invalid(query: &QueryRecord, model: ModelKind, status: Status) -> Self {
        Self {
            surname: query.surname.clone(),
            geo_id: query.geo_id.clone(),
            model,
            status,
            distribution: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == Status::Valid
    }
}

/// How suppressed census percentages are filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionPolicy {
    /// Split the unaccounted mass evenly across suppressed fields.
    #[default]
    Even,
    /// Split it in proportion to the Jirousek & Preucil "other race" weights.
    Proportional,
}

/// What a table build does with a row that fails integrity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Abort the build; nothing is written.
    #[default]
    Abort,
    /// Record the error in the build report and continue.
    Skip,
}

/// Options shared by both table builders.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub on_error: ErrorPolicy,
    pub suppression: SuppressionPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_rejects_bad_sum() {
        let err = RaceDistribution::new([0.5, 0.1, 0.1, 0.1, 0.1, 0.0]).unwrap_err();
        assert!(matches!(err, DistributionError::BadSum { .. }));
    }

    #[test]
    fn distribution_rejects_above_one() {
        let err = RaceDistribution::new([1.1, -0.1, 0.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, DistributionError::OutOfRange { race: Race::White, .. }));
    }

    #[test]
    fn distribution_rejects_negative_even_when_sum_is_one() {
        let values = [0.6, -0.1, 0.5, 0.0, 0.0, 0.0];
        assert!((values.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        let err = RaceDistribution::new(values).unwrap_err();
        assert!(matches!(err, DistributionError::OutOfRange { race: Race::Black, value } if value < 0.0));
    }

    #[test]
    fn distribution_serializes_with_named_fields() {
        let d = RaceDistribution::new([0.6, 0.2, 0.05, 0.02, 0.03, 0.1]).unwrap();
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(json["white"], 0.6);
        assert_eq!(json["hispanic"], 0.1);

        let back: RaceDistribution = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn deserialize_rejects_invalid_shares() {
        let json = serde_json::json!({
            "white": 0.9, "black": 0.9, "api": 0.0,
            "ai_an": 0.0, "multiracial": 0.0, "hispanic": 0.0
        });
        assert!(serde_json::from_value::<RaceDistribution>(json).is_err());
    }

    #[test]
    fn most_likely_picks_largest() {
        let d = RaceDistribution::new([0.1, 0.2, 0.05, 0.02, 0.03, 0.6]).unwrap();
        assert_eq!(d.most_likely(), Race::Hispanic);
    }
}
