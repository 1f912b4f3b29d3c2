//! Shared pipeline logic behind the CLI commands.
//!
//! Each function opens the stores it needs against one database file, runs one
//! workflow and hands back plain data; `app` decides how to print it.
//!
//! source CSV -> ingest -> build -> SQLite table
//! query CSV -> ingest -> lookup/combine (parallel) -> results + summary

use std::path::Path;

use crate::batch::run_batch;
use crate::build::{BuildReport, build_geography_table, build_surname_table};
use crate::domain::{BuildOptions, GeographyRecord, ModelKind, PosteriorResult, QueryRecord, SurnameRecord};
use crate::error::AppError;
use crate::io::ingest;
use crate::lookup::Lookup;
use crate::models::estimate;
use crate::report::{BatchSummary, summarize};
use crate::store::{BuildInfo, SqliteStore, TableRecord, TableStore};

/// Outputs of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub results: Vec<PosteriorResult>,
    pub summary: BatchSummary,
}

/// Row count and build metadata of one table; `rows` is `None` when unbuilt.
#[derive(Debug, Clone)]
pub struct TableStatus {
    pub table: &'static str,
    pub rows: Option<usize>,
    pub info: Option<BuildInfo>,
}

pub fn build_surnames(db: &Path, source: &Path, options: &BuildOptions) -> Result<BuildReport, AppError> {
    let rows = ingest::surname_rows(source)?;
    let store = SqliteStore::<SurnameRecord>::open(db)?;
    Ok(build_surname_table(&store, rows, options)?)
}

pub fn build_geography(db: &Path, source: &Path, options: &BuildOptions) -> Result<BuildReport, AppError> {
    let rows = ingest::geography_rows(source)?;
    let store = SqliteStore::<GeographyRecord>::open(db)?;
    Ok(build_geography_table(&store, rows, options)?)
}

pub fn query(db: &Path, model: ModelKind, query: &QueryRecord) -> Result<PosteriorResult, AppError> {
    let surnames = SqliteStore::<SurnameRecord>::open(db)?;
    let geographies = SqliteStore::<GeographyRecord>::open(db)?;
    let lookup = Lookup::new(&surnames, &geographies);
    Ok(estimate(&lookup, model, query)?)
}

pub fn batch(db: &Path, model: ModelKind, input: &Path) -> Result<BatchOutput, AppError> {
    let queries = ingest::read_queries(input)?;
    let surnames = SqliteStore::<SurnameRecord>::open(db)?;
    let geographies = SqliteStore::<GeographyRecord>::open(db)?;
    let lookup = Lookup::new(&surnames, &geographies);

    let results = run_batch(&lookup, model, &queries)?;
    let summary = summarize(&results);
    Ok(BatchOutput { results, summary })
}

pub fn status(db: &Path) -> Result<Vec<TableStatus>, AppError> {
    Ok(vec![
        table_status(&SqliteStore::<SurnameRecord>::open(db)?)?,
        table_status(&SqliteStore::<GeographyRecord>::open(db)?)?,
    ])
}

pub fn drop_table<R: TableRecord>(db: &Path) -> Result<(), AppError> {
    let store = SqliteStore::<R>::open(db)?;
    store.drop_table()?;
    tracing::info!(table = R::TABLE, "dropped table");
    Ok(())
}

fn table_status<R: TableRecord>(store: &SqliteStore<R>) -> Result<TableStatus, AppError> {
    Ok(TableStatus {
        table: R::TABLE,
        rows: store.len()?,
        info: store.build_info()?,
    })
}
