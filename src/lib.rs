//! `surgeo` library crate.
//!
//! Bayesian Improved Surname Geocoding: builds P(race | surname) and
//! P(race | geography) tables from census sources and combines them into
//! P(race | surname, geography).
//!
//! The binary (`surgeo`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the builders, lookup layer and combiner are reusable without the CLI

pub mod app;
pub mod batch;
pub mod build;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod lookup;
pub mod math;
pub mod models;
pub mod reconstruct;
pub mod report;
pub mod store;
