//! CSV ingest.
//!
//! Adapters from the three CSV inputs to the domain types the builders and the
//! batch processor consume:
//!
//! - census surname file: `name,count,pctwhite,pctblack,pctapi,pctaian,pct2prace,pcthispanic`
//! - geography counts: `zcta,white,black,api,ai_an,multiracial,hispanic`
//! - batch queries: `surname,zcta`
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level errors** are returned per row, so the build's error policy decides
//!   whether a bad row aborts or is skipped
//! - **Lazy rows** for the table sources, which can be large
//! - **No statistics here**: reconstruction and validation live in `build`
//!
//! Census files are not reliably UTF-8, so every field is decoded as UTF-8 when
//! valid and as latin-1 otherwise.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::{ByteRecord, StringRecord};

use crate::domain::{GeoCounts, PercentField, QueryRecord, RACE_COUNT, RawRow};
use crate::error::{AppError, DataIntegrityError, EXIT_INPUT};

/// Census marker for a redacted percentage.
pub const SUPPRESSED: &str = "(S)";

const SURNAME_KEY: &str = "name";
const SURNAME_COUNT: &str = "count";
const SURNAME_PERCENT_COLUMNS: [&str; RACE_COUNT] =
    ["pctwhite", "pctblack", "pctapi", "pctaian", "pct2prace", "pcthispanic"];

const GEOGRAPHY_KEY: &str = "zcta";
const GEOGRAPHY_COUNT_COLUMNS: [&str; RACE_COUNT] = ["white", "black", "api", "ai_an", "multiracial", "hispanic"];

const QUERY_SURNAME: &str = "surname";
const QUERY_GEOGRAPHY: &str = "zcta";

type HeaderMap = HashMap<String, usize>;

/// Stream census surname rows.
///
/// Only the header is read eagerly; a missing column fails here with exit code 2.
pub fn surname_rows(path: &Path) -> Result<impl Iterator<Item = Result<RawRow, DataIntegrityError>>, AppError> {
    let (reader, header_map) = open_csv(path)?;
    ensure_columns(&header_map, &[SURNAME_KEY, SURNAME_COUNT], path)?;
    ensure_columns(&header_map, &SURNAME_PERCENT_COLUMNS, path)?;

    Ok(reader.into_byte_records().map(move |result| {
        let record = decode_record(&result.map_err(csv_error)?);
        parse_surname_row(&record, &header_map)
    }))
}

/// Stream per-geography race counts.
pub fn geography_rows(path: &Path) -> Result<impl Iterator<Item = Result<GeoCounts, DataIntegrityError>>, AppError> {
    let (reader, header_map) = open_csv(path)?;
    ensure_columns(&header_map, &[GEOGRAPHY_KEY], path)?;
    ensure_columns(&header_map, &GEOGRAPHY_COUNT_COLUMNS, path)?;

    Ok(reader.into_byte_records().map(move |result| {
        let record = decode_record(&result.map_err(csv_error)?);
        parse_geography_row(&record, &header_map)
    }))
}

/// Read a batch query file in full.
///
/// Keys are kept as written; normalization happens at lookup. Missing values
/// become empty keys, which the lookup reports as not found.
pub fn read_queries(path: &Path) -> Result<Vec<QueryRecord>, AppError> {
    let (reader, header_map) = open_csv(path)?;
    ensure_columns(&header_map, &[QUERY_SURNAME, QUERY_GEOGRAPHY], path)?;

    let mut queries = Vec::new();
    for (idx, result) in reader.into_byte_records().enumerate() {
        // +2: header is line 1 and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| {
            AppError::new(EXIT_INPUT, format!("Failed to read '{}' at line {line}: {e}", path.display()))
        })?;
        let record = decode_record(&record);
        let surname = get_optional(&record, &header_map, QUERY_SURNAME).unwrap_or_default();
        let geo_id = get_optional(&record, &header_map, QUERY_GEOGRAPHY).unwrap_or_default();
        queries.push(QueryRecord::new(surname, geo_id));
    }

    tracing::info!(path = %path.display(), records = queries.len(), "read batch input");
    Ok(queries)
}

fn open_csv(path: &Path) -> Result<(csv::Reader<File>, HeaderMap), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .byte_headers()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read CSV headers: {e}")))?;
    let header_map = build_header_map(&decode_record(headers));

    Ok((reader, header_map))
}

fn ensure_columns(header_map: &HeaderMap, names: &[&str], path: &Path) -> Result<(), AppError> {
    for name in names {
        if !header_map.contains_key(*name) {
            return Err(AppError::new(
                EXIT_INPUT,
                format!("Missing required column in '{}': `{name}`", path.display()),
            ));
        }
    }
    Ok(())
}

fn build_header_map(headers: &StringRecord) -> HeaderMap {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_surname_row(record: &StringRecord, header_map: &HeaderMap) -> Result<RawRow, DataIntegrityError> {
    let name = get_optional(record, header_map, SURNAME_KEY).unwrap_or_default().to_string();

    let count = get_required(record, header_map, SURNAME_COUNT)?;
    let count = count
        .replace(',', "")
        .parse::<i64>()
        .map_err(|_| malformed(format!("invalid `count` '{count}'")))?;

    let mut percentages = [PercentField::Suppressed; RACE_COUNT];
    for (slot, column) in percentages.iter_mut().zip(SURNAME_PERCENT_COLUMNS) {
        *slot = parse_percent(get_required(record, header_map, column)?, column)?;
    }

    Ok(RawRow {
        name,
        count,
        percentages,
    })
}

fn parse_geography_row(record: &StringRecord, header_map: &HeaderMap) -> Result<GeoCounts, DataIntegrityError> {
    let geo_id = get_optional(record, header_map, GEOGRAPHY_KEY).unwrap_or_default().to_string();

    let mut counts = [0.0; RACE_COUNT];
    for (slot, column) in counts.iter_mut().zip(GEOGRAPHY_COUNT_COLUMNS) {
        let raw = get_required(record, header_map, column)?;
        *slot = raw
            .replace(',', "")
            .parse::<f64>()
            .map_err(|_| malformed(format!("invalid `{column}` count '{raw}'")))?;
    }

    Ok(GeoCounts { geo_id, counts })
}

fn parse_percent(raw: &str, column: &str) -> Result<PercentField, DataIntegrityError> {
    if raw.eq_ignore_ascii_case(SUPPRESSED) {
        return Ok(PercentField::Suppressed);
    }
    raw.parse::<f64>()
        .map(PercentField::Value)
        .map_err(|_| malformed(format!("invalid `{column}` '{raw}'")))
}

fn get_required<'a>(record: &'a StringRecord, header_map: &HeaderMap, name: &str) -> Result<&'a str, DataIntegrityError> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| malformed(format!("missing column `{name}`")))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed(format!("missing value for `{name}`")))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HeaderMap, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn malformed(message: String) -> DataIntegrityError {
    DataIntegrityError::Malformed { message }
}

fn csv_error(e: csv::Error) -> DataIntegrityError {
    malformed(e.to_string())
}

fn decode_record(record: &ByteRecord) -> StringRecord {
    record.iter().map(decode_field).collect()
}

/// UTF-8 when valid, latin-1 otherwise (each byte is the code point of that value).
fn decode_field(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().copied().map(char::from).collect()),
    }
}
