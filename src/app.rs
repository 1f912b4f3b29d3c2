//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the tracing subscriber
//! - dispatches to the pipeline
//! - prints reports and writes exports

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{BatchArgs, BuildGeographyArgs, BuildSurnamesArgs, Cli, Command, DropArgs, QueryArgs, TableChoice};
use crate::domain::{BuildOptions, GeographyRecord, QueryRecord, SurnameRecord};
use crate::error::{AppError, EXIT_INTERNAL};
use crate::report;

pub mod pipeline;

/// Entry point for the `surgeo` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` may carry SURGEO_DB, so it must be loaded before clap reads the env.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let db = cli.db.as_path();
    tracing::debug!(db = %db.display(), "using database");

    match cli.command {
        Command::BuildSurnames(args) => handle_build_surnames(db, &args),
        Command::BuildGeography(args) => handle_build_geography(db, &args),
        Command::Query(args) => handle_query(db, &args),
        Command::Batch(args) => handle_batch(db, &args),
        Command::Status => handle_status(db),
        Command::Drop(args) => handle_drop(db, &args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn handle_build_surnames(db: &std::path::Path, args: &BuildSurnamesArgs) -> Result<(), AppError> {
    let options = BuildOptions {
        on_error: args.error_policy(),
        suppression: args.suppression,
    };
    let report = pipeline::build_surnames(db, &args.source, &options)?;
    println!("{}", report::format_build_report(&report));
    Ok(())
}

fn handle_build_geography(db: &std::path::Path, args: &BuildGeographyArgs) -> Result<(), AppError> {
    let options = BuildOptions {
        on_error: args.error_policy(),
        ..BuildOptions::default()
    };
    let report = pipeline::build_geography(db, &args.source, &options)?;
    println!("{}", report::format_build_report(&report));
    Ok(())
}

fn handle_query(db: &std::path::Path, args: &QueryArgs) -> Result<(), AppError> {
    let query = QueryRecord::new(args.surname.as_str(), args.zcta.as_str());
    let result = pipeline::query(db, args.model, &query)?;

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to serialize result: {e}")))?;
        println!("{json}");
    } else {
        println!("{}", report::format_result(&result));
    }
    Ok(())
}

fn handle_batch(db: &std::path::Path, args: &BatchArgs) -> Result<(), AppError> {
    let output = pipeline::batch(db, args.model, &args.input)?;

    crate::io::export::write_results_csv(&args.output, &output.results)?;
    if let Some(path) = &args.summary {
        crate::io::export::write_json(path, &output.summary)?;
    }

    println!("{}", report::format_batch_summary(&output.summary));
    Ok(())
}

fn handle_status(db: &std::path::Path) -> Result<(), AppError> {
    println!("Database: {}", db.display());
    for t in pipeline::status(db)? {
        println!("{}", report::format_table_status(t.table, t.rows, t.info.as_ref()));
    }
    Ok(())
}

fn handle_drop(db: &std::path::Path, args: &DropArgs) -> Result<(), AppError> {
    match args.table {
        TableChoice::Surname => pipeline::drop_table::<SurnameRecord>(db),
        TableChoice::Geography => pipeline::drop_table::<GeographyRecord>(db),
        TableChoice::All => {
            pipeline::drop_table::<SurnameRecord>(db)?;
            pipeline::drop_table::<GeographyRecord>(db)
        }
    }
}
