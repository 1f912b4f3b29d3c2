//! Input/output helpers.
//!
//! - CSV ingest for table sources and batch queries (`ingest`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
