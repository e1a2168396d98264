use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::Path;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub id: i64,
    pub timestamp: String,
    pub temperature_c: f64,
    pub humidity_percent: f64,
}

/// Append-only sink for readings.
pub trait ReadingStore {
    fn append(
        &mut self,
        timestamp: DateTime<Local>,
        temperature_c: f32,
        humidity_percent: f32,
    ) -> rusqlite::Result<i64>;
}

pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn open<P>(db_path: P) -> rusqlite::Result<SqliteStore>
    where
        P: AsRef<Path>,
    {
        Self::with_connection(Connection::open(db_path.as_ref())?)
    }

    pub fn in_memory() -> rusqlite::Result<SqliteStore> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> rusqlite::Result<SqliteStore> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                temperature_c REAL NOT NULL,
                humidity_percent REAL NOT NULL
            )",
            [],
        )?;

        Ok(SqliteStore { connection })
    }

    /// Newest rows first.
    pub fn recent(&self, limit: usize) -> rusqlite::Result<Vec<LogRow>> {
        let mut statement = self.connection.prepare_cached(
            "SELECT id, timestamp, temperature_c, humidity_percent FROM readings
            ORDER BY id DESC LIMIT ?",
        )?;

        let rows = statement.query_map([limit as i64], |row| {
            Ok(LogRow {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                temperature_c: row.get(2)?,
                humidity_percent: row.get(3)?,
            })
        })?;

        let rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl ReadingStore for SqliteStore {
    fn append(
        &mut self,
        timestamp: DateTime<Local>,
        temperature_c: f32,
        humidity_percent: f32,
    ) -> rusqlite::Result<i64> {
        self.connection
            .prepare_cached(
                "INSERT INTO readings (timestamp, temperature_c, humidity_percent)
                VALUES (?, ?, ?)",
            )?
            .execute(params![
                timestamp.format(TIMESTAMP_FORMAT).to_string(),
                f64::from(temperature_c),
                f64::from(humidity_percent)
            ])?;

        Ok(self.connection.last_insert_rowid())
    }
}
