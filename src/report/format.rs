//! Terminal formatting.
//!
//! We keep formatting code in one place so the statistical code stays free of
//! presentation concerns and output changes stay localized.

use crate::build::BuildReport;
use crate::domain::{PosteriorResult, Race, RaceShares};
use crate::report::BatchSummary;
use crate::store::BuildInfo;

/// Format the outcome of a table build.
pub fn format_build_report(report: &BuildReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== surgeo - build {} ===\n", report.table));
    out.push_str(&format!(
        "Rows: read={} | written={} | empty={} | rejected={}\n",
        report.rows_read,
        report.rows_written,
        report.rows_empty,
        report.row_errors.len()
    ));

    if !report.row_errors.is_empty() {
        out.push_str("\nRejected rows:\n");
        for e in report.row_errors.iter().take(20) {
            out.push_str(&format!(
                "  record {:>7} {:<20} {}\n",
                e.record,
                e.key.as_deref().unwrap_or("-"),
                e.error
            ));
        }
        if report.row_errors.len() > 20 {
            out.push_str(&format!("  ... and {} more\n", report.row_errors.len() - 20));
        }
    }
    out
}

/// Format a single estimate as a probability table.
pub fn format_result(result: &PosteriorResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Surname: {} | Geography: {} | Model: {}\n",
        display_key(&result.surname),
        display_key(&result.geo_id),
        result.model.display_name()
    ));
    out.push_str(&format!("Status: {}\n", result.status.as_str()));

    if let Some(d) = &result.distribution {
        let best = d.most_likely();
        out.push('\n');
        for (race, p) in d.iter() {
            let marker = if race == best { " *" } else { "" };
            out.push_str(&format!("  {:<12} {:>8.5}{marker}\n", race.label(), p));
        }
    }
    out
}

/// Format a batch summary.
pub fn format_batch_summary(summary: &BatchSummary) -> String {
    let mut out = String::new();
    out.push_str("=== surgeo - batch summary ===\n");
    out.push_str(&format!(
        "Records: {} | valid={} | flagged={}\n",
        summary.total,
        summary.valid,
        summary.flagged()
    ));
    out.push_str(&format!(
        "Flagged: surname_not_found={} | geography_not_found={} | both_not_found={} | undefined={}\n",
        summary.surname_not_found, summary.geography_not_found, summary.both_not_found, summary.undefined
    ));

    out.push_str("\n  race         expected       mean\n");
    for race in Race::ALL {
        let expected = share(&summary.expected_counts, race);
        let mean = summary
            .mean_shares
            .as_ref()
            .map(|m| format!("{:>10.5}", share(m, race)))
            .unwrap_or_else(|| format!("{:>10}", "-"));
        out.push_str(&format!("  {:<12} {:>8.2} {mean}\n", race.label(), expected));
    }
    out
}

/// Format table status lines for `surgeo status`.
pub fn format_table_status(table: &str, rows: Option<usize>, info: Option<&BuildInfo>) -> String {
    match (rows, info) {
        (None, _) => format!("{table}: not built"),
        (Some(n), Some(info)) => format!("{table}: {n} rows (built {})", info.built_at.format("%Y-%m-%d %H:%M:%S UTC")),
        (Some(n), None) => format!("{table}: {n} rows"),
    }
}

fn share(s: &RaceShares, race: Race) -> f64 {
    match race {
        Race::White => s.white,
        Race::Black => s.black,
        Race::Api => s.api,
        Race::AiAn => s.ai_an,
        Race::Multiracial => s.multiracial,
        Race::Hispanic => s.hispanic,
    }
}

fn display_key(k: &str) -> &str {
    if k.is_empty() { "-" } else { k }
}
