mod habits;
mod logs;
pub mod queries;
mod schedule;
mod tasks;

use crate::error::UnknownVariant;
use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSummary {
    pub owners: i64,
    pub habits: i64,
    pub habit_logs: i64,
    pub schedule_cards: i64,
    pub active_tasks: i64,
    pub completed_tasks: i64,
    pub last_logged_at: Option<i64>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to configure SQLite busy timeout")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn summary(&self) -> Result<StoreSummary> {
        let count = |sql: &str| -> Result<i64> {
            self.conn
                .query_row(sql, [], |row| row.get(0))
                .with_context(|| format!("Failed to run summary query: {sql}"))
        };

        Ok(StoreSummary {
            owners: count(
                "SELECT COUNT(*) FROM (SELECT owner_id FROM habits UNION SELECT owner_id FROM tasks)",
            )?,
            habits: count("SELECT COUNT(*) FROM habits")?,
            habit_logs: count("SELECT COUNT(*) FROM habit_logs")?,
            schedule_cards: count("SELECT COUNT(*) FROM schedule_cards")?,
            active_tasks: count("SELECT COUNT(*) FROM tasks WHERE status = 'active'")?,
            completed_tasks: count("SELECT COUNT(*) FROM tasks WHERE status = 'completed'")?,
            last_logged_at: self
                .conn
                .query_row("SELECT MAX(completed_at) FROM habit_logs", [], |row| {
                    row.get(0)
                })
                .context("Failed to query latest habit log")?,
        })
    }
}

/// Reads a TEXT column holding the string form of one of the crate's enums.
pub(crate) fn text_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error)))
}

pub(crate) fn optional_text_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        value.parse::<T>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error))
        })
    })
    .transpose()
}
