use super::queries::TASK_COLUMNS;
use super::{Database, optional_text_enum, text_enum};
use crate::tasks::{Task, TaskStatus};
use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};

impl Database {
    pub fn insert_task(&self, task: &Task) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO tasks (owner_id, title, description, status, recurrence, due_date, completed_at, is_terminated, created_at, tags, priority, master_task_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    task.owner_id,
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.recurrence.map(|value| value.as_str()),
                    task.due_date,
                    task.completed_at,
                    task.is_terminated,
                    task.created_at,
                    encode_tags(&task.tags)?,
                    task.priority.map(|value| value.as_str()),
                    task.master_task_id
                ],
            )
            .context("Failed to insert task")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn task(&self, owner_id: &str, id: i64) -> Result<Option<Task>> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner_id = ?2"),
                params![id, owner_id],
                map_task,
            )
            .optional()
            .context("Failed to query task")
    }

    /// Tasks in one status, soonest due first; undated tasks trail.
    pub fn tasks_with_status(&self, owner_id: &str, status: TaskStatus) -> Result<Vec<Task>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS}
             FROM tasks
             WHERE owner_id = ?1 AND status = ?2
             ORDER BY due_date IS NULL, due_date ASC, created_at ASC, id ASC"
        ))?;

        let rows = statement
            .query_map(params![owner_id, status.as_str()], map_task)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query tasks")?;

        Ok(rows)
    }

    pub fn update_task(&self, task: &Task) -> Result<()> {
        self.conn
            .execute(
                "UPDATE tasks
                 SET title = ?1, description = ?2, recurrence = ?3, due_date = ?4,
                     tags = ?5, priority = ?6
                 WHERE id = ?7 AND owner_id = ?8",
                params![
                    task.title,
                    task.description,
                    task.recurrence.map(|value| value.as_str()),
                    task.due_date,
                    encode_tags(&task.tags)?,
                    task.priority.map(|value| value.as_str()),
                    task.id,
                    task.owner_id
                ],
            )
            .context("Failed to update task")?;

        Ok(())
    }

    pub fn mark_task_completed(
        &self,
        owner_id: &str,
        id: i64,
        completed_at: i64,
        terminated: bool,
    ) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE tasks
                 SET status = 'completed', completed_at = ?1, is_terminated = ?2
                 WHERE id = ?3 AND owner_id = ?4",
                params![completed_at, terminated, id, owner_id],
            )
            .context("Failed to complete task")
    }

    /// Stores the completion snapshot and moves the master's due date in one step.
    pub fn record_recurring_completion(
        &mut self,
        snapshot: &Task,
        master_id: i64,
        next_due: i64,
    ) -> Result<i64> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        transaction
            .execute(
                "INSERT INTO tasks (owner_id, title, description, status, recurrence, due_date, completed_at, is_terminated, created_at, tags, priority, master_task_id)
                 VALUES (?1, ?2, ?3, 'completed', NULL, ?4, ?5, 0, ?6, ?7, ?8, ?9)",
                params![
                    snapshot.owner_id,
                    snapshot.title,
                    snapshot.description,
                    snapshot.due_date,
                    snapshot.completed_at,
                    snapshot.created_at,
                    encode_tags(&snapshot.tags)?,
                    snapshot.priority.map(|value| value.as_str()),
                    master_id
                ],
            )
            .context("Failed to insert completion snapshot")?;
        let snapshot_id = transaction.last_insert_rowid();

        transaction
            .execute(
                "UPDATE tasks SET due_date = ?1 WHERE id = ?2 AND owner_id = ?3",
                params![next_due, master_id, snapshot.owner_id],
            )
            .context("Failed to advance recurring task")?;

        transaction
            .commit()
            .context("Failed to commit recurring completion")?;
        Ok(snapshot_id)
    }

    pub fn delete_task(&self, owner_id: &str, id: i64) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .context("Failed to delete task")
    }

    pub fn delete_completed_tasks_before(&self, owner_id: &str, cutoff: i64) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM tasks
                 WHERE owner_id = ?1 AND status = 'completed' AND completed_at < ?2",
                params![owner_id, cutoff],
            )
            .context("Failed to purge completed tasks")
    }

    pub fn retention_days(&self, owner_id: &str) -> Result<Option<u32>> {
        self.conn
            .query_row(
                "SELECT retention_period_days FROM settings WHERE owner_id = ?1",
                params![owner_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query retention period")
    }

    pub fn set_retention_days(&self, owner_id: &str, days: u32) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO settings (owner_id, retention_period_days) VALUES (?1, ?2)
                 ON CONFLICT(owner_id) DO UPDATE SET retention_period_days = excluded.retention_period_days",
                params![owner_id, days],
            )
            .context("Failed to store retention period")?;

        Ok(())
    }

    /// Owners holding completed tasks, with their stored retention if any.
    pub fn owners_with_completed_tasks(&self) -> Result<Vec<(String, Option<u32>)>> {
        let mut statement = self.conn.prepare(
            "SELECT DISTINCT t.owner_id, s.retention_period_days
             FROM tasks t
             LEFT JOIN settings s ON s.owner_id = t.owner_id
             WHERE t.status = 'completed'
             ORDER BY t.owner_id ASC",
        )?;

        let rows = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query task owners")?;

        Ok(rows)
    }
}

fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).context("Failed to encode task tags")
}

fn map_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let raw_tags: String = row.get(10)?;
    let tags = serde_json::from_str(&raw_tags)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(error)))?;

    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: text_enum(row, 4)?,
        recurrence: optional_text_enum(row, 5)?,
        due_date: row.get(6)?,
        completed_at: row.get(7)?,
        is_terminated: row.get(8)?,
        created_at: row.get(9)?,
        tags,
        priority: optional_text_enum(row, 11)?,
        master_task_id: row.get(12)?,
    })
}
