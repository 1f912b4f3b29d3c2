//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - the race categories and the validated `RaceDistribution`
//! - persisted records (`SurnameRecord`, `GeographyRecord`)
//! - transient build inputs (`RawRow`, `GeoCounts`) and query inputs/outputs
//! - build and model options

pub mod types;

pub use types::*;
