//! SQLite-backed table store.
//!
//! Schema per table (logical layout shared by both record kinds):
//!
//! ```text
//! <key> TEXT PRIMARY KEY, pct_white REAL, pct_black REAL, pct_api REAL,
//! pct_ai_an REAL, pct_2_or_more REAL, pct_hispanic REAL
//! ```
//!
//! Rebuilds load into `<table>_staging` and swap it in by rename, all inside one
//! transaction, so a concurrent reader on another connection sees either the old
//! table or the new one. A `build_meta` table records when each table was built.

use std::marker::PhantomData;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::domain::{RACE_COUNT, Race, RaceDistribution};
use crate::error::StoreError;
use crate::store::{TableRecord, TableStore};

const META_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS build_meta (
    table_name TEXT PRIMARY KEY,
    built_at TEXT NOT NULL,
    row_count INTEGER NOT NULL
);
"#;

/// When and how large a table build was.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildInfo {
    pub built_at: DateTime<Utc>,
    pub row_count: usize,
}

/// One table in a SQLite database.
///
/// Each store owns its own connection; open one store per reader thread pool if
/// lookups must not contend on the connection mutex.
pub struct SqliteStore<R> {
    conn: Mutex<Connection>,
    _record: PhantomData<fn() -> R>,
}

impl<R: TableRecord> SqliteStore<R> {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(META_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            _record: PhantomData,
        })
    }

    /// Build metadata for this table, if it has been built.
    pub fn build_info(&self) -> Result<Option<BuildInfo>, StoreError> {
        let conn = self.conn.lock();
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT built_at, row_count FROM build_meta WHERE table_name = ?1",
                params![R::TABLE],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.and_then(|(built_at, row_count)| {
            let built_at = DateTime::parse_from_rfc3339(&built_at).ok()?.with_timezone(&Utc);
            Some(BuildInfo {
                built_at,
                row_count: row_count.max(0) as usize,
            })
        }))
    }

    fn table_exists(conn: &Connection, table: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn create_table_sql(table: &str, key_column: &str) -> String {
    let columns: Vec<String> = Race::ALL
        .iter()
        .map(|r| format!("    {} REAL NOT NULL", r.column()))
        .collect();
    format!(
        "CREATE TABLE {table} (\n    {key_column} TEXT PRIMARY KEY,\n{}\n)",
        columns.join(",\n")
    )
}

fn value_columns() -> String {
    Race::ALL.iter().map(|r| r.column()).collect::<Vec<_>>().join(", ")
}

impl<R: TableRecord> TableStore for SqliteStore<R> {
    type Record = R;

    fn get(&self, key: &str) -> Result<Option<R>, StoreError> {
        let conn = self.conn.lock();
        if !Self::table_exists(&conn, R::TABLE)? {
            return Err(StoreError::TableMissing { table: R::TABLE });
        }

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            value_columns(),
            R::TABLE,
            R::KEY_COLUMN
        );
        let values: Option<[f64; RACE_COUNT]> = conn
            .query_row(&sql, params![key], |row| {
                let mut values = [0.0; RACE_COUNT];
                for (i, slot) in values.iter_mut().enumerate() {
                    *slot = row.get(i)?;
                }
                Ok(values)
            })
            .optional()?;

        let Some(values) = values else {
            return Ok(None);
        };
        let distribution = RaceDistribution::new(values).map_err(|source| StoreError::Corrupt {
            table: R::TABLE,
            key: key.to_string(),
            source,
        })?;
        Ok(Some(R::new(key.to_string(), distribution)))
    }

    fn put_all(&self, records: Vec<R>) -> Result<usize, StoreError> {
        let staging = format!("{}_staging", R::TABLE);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {staging};\n{};",
            create_table_sql(&staging, R::KEY_COLUMN)
        ))?;

        {
            let sql = format!(
                "INSERT INTO {staging} ({}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                R::KEY_COLUMN,
                value_columns()
            );
            let mut stmt = tx.prepare(&sql)?;
            for record in &records {
                let v = record.distribution().values();
                stmt.execute(params![record.key(), v[0], v[1], v[2], v[3], v[4], v[5]])?;
            }
        }

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};\nALTER TABLE {staging} RENAME TO {table};",
            table = R::TABLE
        ))?;
        tx.execute(
            "INSERT OR REPLACE INTO build_meta (table_name, built_at, row_count) VALUES (?1, ?2, ?3)",
            params![R::TABLE, Utc::now().to_rfc3339(), records.len() as i64],
        )?;
        tx.commit()?;

        tracing::debug!(table = R::TABLE, rows = records.len(), "replaced SQLite table");
        Ok(records.len())
    }

    fn drop_table(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", R::TABLE))?;
        tx.execute("DELETE FROM build_meta WHERE table_name = ?1", params![R::TABLE])?;
        tx.commit()?;
        Ok(())
    }

    fn len(&self) -> Result<Option<usize>, StoreError> {
        let conn = self.conn.lock();
        if !Self::table_exists(&conn, R::TABLE)? {
            return Ok(None);
        }
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", R::TABLE), [], |row| row.get(0))?;
        Ok(Some(n.max(0) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeographyRecord, SurnameRecord};

    fn geo(id: &str, values: [f64; RACE_COUNT]) -> GeographyRecord {
        GeographyRecord {
            geo_id: id.to_string(),
            distribution: RaceDistribution::new(values).unwrap(),
        }
    }

    #[test]
    fn create_table_sql_lists_all_columns() {
        let sql = create_table_sql("t", "geo_id");
        assert!(sql.contains("geo_id TEXT PRIMARY KEY"));
        for race in Race::ALL {
            assert!(sql.contains(race.column()));
        }
    }

    #[test]
    fn roundtrip_preserves_leading_zeros() {
        let store = SqliteStore::<GeographyRecord>::open_in_memory().unwrap();
        store
            .put_all(vec![geo("02134", [0.6, 0.2, 0.05, 0.02, 0.03, 0.1])])
            .unwrap();

        let rec = store.get("02134").unwrap().unwrap();
        assert_eq!(rec.geo_id, "02134");
        assert_eq!(rec.distribution.get(Race::Hispanic), 0.1);
        assert!(store.get("2134").unwrap().is_none());
    }

    #[test]
    fn rebuild_replaces_rows_and_records_meta() {
        let store = SqliteStore::<GeographyRecord>::open_in_memory().unwrap();
        assert!(store.build_info().unwrap().is_none());
        assert_eq!(store.len().unwrap(), None);

        let uniform = [1.0 / 6.0; RACE_COUNT];
        store.put_all(vec![geo("11111", uniform), geo("22222", uniform)]).unwrap();
        store.put_all(vec![geo("33333", uniform)]).unwrap();

        assert_eq!(store.len().unwrap(), Some(1));
        assert!(store.get("11111").unwrap().is_none());
        assert_eq!(store.build_info().unwrap().unwrap().row_count, 1);
    }

    #[test]
    fn duplicate_key_rolls_back_and_keeps_old_table() {
        let store = SqliteStore::<SurnameRecord>::open_in_memory().unwrap();
        let d = RaceDistribution::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        store
            .put_all(vec![SurnameRecord { surname: "SMITH".into(), distribution: d }])
            .unwrap();

        let dup = vec![
            SurnameRecord { surname: "JONES".into(), distribution: d },
            SurnameRecord { surname: "JONES".into(), distribution: d },
        ];
        assert!(store.put_all(dup).is_err());

        assert!(store.get("SMITH").unwrap().is_some());
        assert!(store.get("JONES").unwrap().is_none());
    }

    #[test]
    fn dropped_table_is_missing() {
        let store = SqliteStore::<SurnameRecord>::open_in_memory().unwrap();
        assert!(matches!(store.get("SMITH"), Err(StoreError::TableMissing { .. })));

        let d = RaceDistribution::new([0.0, 1.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        store
            .put_all(vec![SurnameRecord { surname: "SMITH".into(), distribution: d }])
            .unwrap();
        store.drop_table().unwrap();
        assert!(matches!(store.get("SMITH"), Err(StoreError::TableMissing { .. })));
        assert!(store.build_info().unwrap().is_none());
    }
}
