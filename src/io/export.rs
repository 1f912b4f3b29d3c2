//! Export estimates to CSV or JSON.
//!
//! The CSV has one row per input query, in input order, and is meant to be easy
//! to join back onto the caller's file by row number.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{PROBABILITY_DECIMALS, PosteriorResult, Race};
use crate::error::{AppError, EXIT_INPUT};

/// Write batch results to a CSV file.
///
/// Probability columns are left empty for rows whose status is not `valid`.
pub fn write_results_csv(path: &Path, results: &[PosteriorResult]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results(file, results)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write export CSV '{}': {e}", path.display())))
}

/// Write batch results as CSV to any writer.
pub fn write_results<W: Write>(writer: W, results: &[PosteriorResult]) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["surname", "zcta", "model", "status"];
    header.extend(Race::ALL.iter().map(|r| r.column()));
    out.write_record(&header)?;

    let decimals = PROBABILITY_DECIMALS as usize;
    for r in results {
        let mut row = vec![
            r.surname.clone(),
            r.geo_id.clone(),
            r.model.display_name().to_string(),
            r.status.as_str().to_string(),
        ];
        match &r.distribution {
            Some(d) => row.extend(d.values().iter().map(|p| format!("{p:.decimals$}"))),
            None => row.extend(std::iter::repeat_n(String::new(), Race::ALL.len())),
        }
        out.write_record(&row)?;
    }

    out.flush()?;
    Ok(())
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write JSON: {e}")))
}
