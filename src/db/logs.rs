use super::Database;
use super::queries::HABIT_LOG_COLUMNS;
use crate::habits::logs::{HabitLog, LogChange};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{OptionalExtension, Row, params};

const MAX_LOG_COUNT: i64 = u32::MAX as i64;

impl Database {
    pub fn log_for(&self, habit_id: i64, date: NaiveDate) -> Result<Option<HabitLog>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {HABIT_LOG_COLUMNS} FROM habit_logs WHERE habit_id = ?1 AND date = ?2"
                ),
                params![habit_id, date],
                map_log,
            )
            .optional()
            .context("Failed to query habit log")
    }

    /// Adds `delta` to the day's count. Returns `None` and leaves the row
    /// untouched when the sum would not fit a `u32`.
    pub fn increment_log(
        &self,
        owner_id: &str,
        habit_id: i64,
        date: NaiveDate,
        delta: u32,
        completed_at: i64,
    ) -> Result<Option<HabitLog>> {
        self.conn
            .query_row(
                &format!(
                    "INSERT INTO habit_logs (habit_id, owner_id, date, count, completed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(habit_id, date)
                     DO UPDATE SET count = count + excluded.count, completed_at = excluded.completed_at
                     WHERE habit_logs.count + excluded.count <= ?6
                     RETURNING {HABIT_LOG_COLUMNS}"
                ),
                params![habit_id, owner_id, date, delta, completed_at, MAX_LOG_COUNT],
                map_log,
            )
            .optional()
            .context("Failed to increment habit log")
    }

    pub fn decrement_log(
        &self,
        habit_id: i64,
        date: NaiveDate,
        delta: u32,
        completed_at: i64,
    ) -> Result<LogChange> {
        let transaction = self
            .conn
            .unchecked_transaction()
            .context("Failed to start transaction")?;

        let existing = transaction
            .query_row(
                &format!(
                    "SELECT {HABIT_LOG_COLUMNS} FROM habit_logs WHERE habit_id = ?1 AND date = ?2"
                ),
                params![habit_id, date],
                map_log,
            )
            .optional()
            .context("Failed to query habit log")?;

        let Some(existing) = existing else {
            return Ok(LogChange::Missing);
        };

        let remaining = i64::from(existing.count) - i64::from(delta);
        let change = if remaining <= 0 {
            transaction
                .execute("DELETE FROM habit_logs WHERE id = ?1", params![existing.id])
                .context("Failed to delete habit log")?;
            LogChange::Removed
        } else {
            transaction
                .execute(
                    "UPDATE habit_logs SET count = ?1, completed_at = ?2 WHERE id = ?3",
                    params![remaining, completed_at, existing.id],
                )
                .context("Failed to update habit log")?;
            LogChange::Updated(HabitLog {
                count: remaining as u32,
                completed_at,
                ..existing
            })
        };

        transaction
            .commit()
            .context("Failed to commit habit log change")?;
        Ok(change)
    }

    pub fn set_log(
        &self,
        owner_id: &str,
        habit_id: i64,
        date: NaiveDate,
        count: u32,
        completed_at: i64,
    ) -> Result<Option<HabitLog>> {
        if count == 0 {
            self.delete_log(habit_id, date)?;
            return Ok(None);
        }

        self.conn
            .query_row(
                &format!(
                    "INSERT INTO habit_logs (habit_id, owner_id, date, count, completed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(habit_id, date)
                     DO UPDATE SET count = excluded.count, completed_at = excluded.completed_at
                     RETURNING {HABIT_LOG_COLUMNS}"
                ),
                params![habit_id, owner_id, date, count, completed_at],
                map_log,
            )
            .map(Some)
            .context("Failed to set habit log")
    }

    pub fn delete_log(&self, habit_id: i64, date: NaiveDate) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM habit_logs WHERE habit_id = ?1 AND date = ?2",
                params![habit_id, date],
            )
            .context("Failed to delete habit log")
    }

    pub fn logs_for_habit(&self, habit_id: i64) -> Result<Vec<HabitLog>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {HABIT_LOG_COLUMNS}
             FROM habit_logs
             WHERE habit_id = ?1
             ORDER BY date ASC"
        ))?;

        let rows = statement
            .query_map(params![habit_id], map_log)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query habit logs")?;

        Ok(rows)
    }

    pub fn logs_for_owner_between(
        &self,
        owner_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitLog>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {HABIT_LOG_COLUMNS}
             FROM habit_logs
             WHERE owner_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC, habit_id ASC"
        ))?;

        let rows = statement
            .query_map(params![owner_id, start, end], map_log)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query habit logs in range")?;

        Ok(rows)
    }
}

fn map_log(row: &Row<'_>) -> rusqlite::Result<HabitLog> {
    Ok(HabitLog {
        id: row.get(0)?,
        habit_id: row.get(1)?,
        date: row.get(2)?,
        count: row.get(3)?,
        completed_at: row.get(4)?,
    })
}
