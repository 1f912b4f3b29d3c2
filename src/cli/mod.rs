//! Command-line parsing for `surgeo`.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! table builders and the statistical code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{ErrorPolicy, ModelKind, SuppressionPolicy};

/// Default database file when neither `--db` nor `SURGEO_DB` is set.
pub const DEFAULT_DB: &str = "surgeo.sqlite";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "surgeo", version, about = "Bayesian Improved Surname Geocoding (BISG)")]
pub struct Cli {
    /// SQLite database holding the probability tables.
    #[arg(long, global = true, env = "SURGEO_DB", default_value = DEFAULT_DB)]
    pub db: PathBuf,

    /// Log progress at `info` level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the surname table from a census surname CSV.
    BuildSurnames(BuildSurnamesArgs),
    /// Build the geography table from a per-ZCTA race counts CSV.
    BuildGeography(BuildGeographyArgs),
    /// Estimate race/ethnicity probabilities for one person.
    Query(QueryArgs),
    /// Estimate probabilities for every row of a CSV.
    Batch(BatchArgs),
    /// Show which tables are built and when.
    Status,
    /// Drop a probability table.
    Drop(DropArgs),
}

#[derive(Debug, Args, Clone)]
pub struct BuildSurnamesArgs {
    /// Census surname CSV (`name,count,pctwhite,...,pcthispanic`).
    #[arg(long, value_name = "CSV")]
    pub source: PathBuf,

    /// How suppressed `(S)` percentages are filled in.
    #[arg(long, value_enum, default_value_t = SuppressionPolicy::Even)]
    pub suppression: SuppressionPolicy,

    /// Skip rows that fail validation instead of aborting the build.
    #[arg(long)]
    pub skip_bad_rows: bool,
}

impl BuildSurnamesArgs {
    pub fn error_policy(&self) -> ErrorPolicy {
        error_policy(self.skip_bad_rows)
    }
}

#[derive(Debug, Args, Clone)]
pub struct BuildGeographyArgs {
    /// Geography CSV (`zcta,white,black,api,ai_an,multiracial,hispanic`).
    #[arg(long, value_name = "CSV")]
    pub source: PathBuf,

    /// Skip rows that fail validation instead of aborting the build.
    #[arg(long)]
    pub skip_bad_rows: bool,
}

impl BuildGeographyArgs {
    pub fn error_policy(&self) -> ErrorPolicy {
        error_policy(self.skip_bad_rows)
    }
}

#[derive(Debug, Args, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = "")]
    pub surname: String,

    /// ZCTA / ZIP code.
    #[arg(long, default_value = "")]
    pub zcta: String,

    #[arg(long, value_enum, default_value_t = ModelKind::Bisg)]
    pub model: ModelKind,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// Input CSV with `surname` and `zcta` columns.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Output CSV (one row per input row, same order).
    #[arg(long, value_name = "CSV")]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = ModelKind::Bisg)]
    pub model: ModelKind,

    /// Also write the batch summary as JSON.
    #[arg(long, value_name = "JSON")]
    pub summary: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DropArgs {
    #[arg(long, value_enum)]
    pub table: TableChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableChoice {
    Surname,
    Geography,
    All,
}

fn error_policy(skip: bool) -> ErrorPolicy {
    if skip { ErrorPolicy::Skip } else { ErrorPolicy::Abort }
}
