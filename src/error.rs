//! Error taxonomy.
//!
//! - `DistributionError`: a probability vector that is not a valid race distribution
//! - `DataIntegrityError`: a malformed source row seen while building a table
//! - `CombineError`: the Bayesian combiner could not produce a posterior
//! - `StoreError`: the table storage layer failed
//! - `BuildError`: a table build was aborted (old table stays authoritative)
//! - `AppError`: what the binary reports (message + process exit code)
//!
//! Lookup misses are not errors: they are `Option::None` at the lookup layer and a
//! per-record `Status` in query results.

use thiserror::Error;

use crate::domain::Race;

/// Exit code for invalid input (missing files, bad headers, bad flags).
pub const EXIT_INPUT: u8 = 2;
/// Exit code for data problems (integrity errors, no usable rows).
pub const EXIT_DATA: u8 = 3;
/// Exit code for storage and internal failures.
pub const EXIT_INTERNAL: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// A six-slot probability vector failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("probability for {race} is not finite")]
    NonFinite { race: Race },

    #[error("probability for {race} is out of range: {value}")]
    OutOfRange { race: Race, value: f64 },

    #[error("probabilities sum to {sum}, expected 1")]
    BadSum { sum: f64 },
}

/// A source row cannot be turned into a distribution record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataIntegrityError {
    #[error("percentage for {race} is outside [0, 100]: {value}")]
    PercentOutOfRange { race: Race, value: f64 },

    #[error("known percentages sum to {known_sum}, leaving {remaining} for suppressed fields")]
    NegativeRemainder { known_sum: f64, remaining: f64 },

    #[error("unsuppressed percentages sum to {sum}, expected 100")]
    UnbalancedPercentages { sum: f64 },

    #[error("count for {race} is invalid: {value}")]
    InvalidCount { race: Race, value: f64 },

    #[error("negative total count: {count}")]
    NegativeCount { count: i64 },

    #[error("duplicate key '{key}'")]
    DuplicateKey { key: String },

    #[error("malformed row: {message}")]
    Malformed { message: String },

    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

/// Which side of a combination an invalid input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Surname,
    Geography,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Surname => write!(f, "surname"),
            Side::Geography => write!(f, "geography"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombineError {
    #[error("invalid {side} distribution: {source}")]
    InvalidInput {
        side: Side,
        #[source]
        source: DistributionError,
    },

    /// No race has nonzero probability under both distributions.
    #[error("posterior is undefined: surname and geography distributions share no support")]
    UndefinedPosterior,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table '{table}' has not been built")]
    TableMissing { table: &'static str },

    #[error("stored row '{key}' in '{table}' is invalid: {source}")]
    Corrupt {
        table: &'static str,
        key: String,
        #[source]
        source: DistributionError,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("record {record}{}: {source}", key_suffix(.key))]
    Integrity {
        record: usize,
        key: Option<String>,
        #[source]
        source: DataIntegrityError,
    },

    #[error("source produced no usable rows for '{table}'")]
    Empty { table: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(k) => format!(" ('{k}')"),
        None => String::new(),
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let code = match err {
            StoreError::TableMissing { .. } => EXIT_INPUT,
            _ => EXIT_INTERNAL,
        };
        AppError::new(code, err.to_string())
    }
}

impl From<BuildError> for AppError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Store(e) => e.into(),
            other => AppError::new(EXIT_DATA, format!("Build aborted: {other}")),
        }
    }
}
