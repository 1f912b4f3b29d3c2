//! Mathematical utilities: deterministic rounding and apportionment.

pub mod round;

pub use round::*;
