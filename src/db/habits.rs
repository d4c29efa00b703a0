use super::queries::HABIT_COLUMNS;
use super::{Database, text_enum};
use crate::habits::{Habit, HabitFilter, NewHabit};
use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row, params};

impl Database {
    pub fn insert_habit(
        &self,
        owner_id: &str,
        habit: &NewHabit,
        sort_order: i64,
        created_at: i64,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO habits (owner_id, name, description, color, icon, frequency, target_days_per_week, target_count, is_tracked, default_duration_minutes, is_archived, sort_order, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12)",
                params![
                    owner_id,
                    habit.name,
                    habit.description,
                    habit.color,
                    habit.icon,
                    habit.frequency.as_str(),
                    habit.target_days_per_week,
                    habit.target_count,
                    habit.is_tracked,
                    habit.default_duration_minutes,
                    sort_order,
                    created_at
                ],
            )
            .context("Failed to insert habit")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn habit(&self, owner_id: &str, id: i64) -> Result<Option<Habit>> {
        self.conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1 AND owner_id = ?2"),
                params![id, owner_id],
                map_habit,
            )
            .optional()
            .context("Failed to query habit")
    }

    pub fn habits(&self, owner_id: &str, filter: HabitFilter) -> Result<Vec<Habit>> {
        let archived_clause = match filter {
            HabitFilter::Active => "AND is_archived = 0",
            HabitFilter::Archived => "AND is_archived = 1",
            HabitFilter::All => "",
        };
        let mut statement = self.conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS}
             FROM habits
             WHERE owner_id = ?1 {archived_clause}
             ORDER BY COALESCE(sort_order, 9999) ASC, id ASC"
        ))?;

        let rows = statement
            .query_map(params![owner_id], map_habit)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query habits")?;

        Ok(rows)
    }

    pub fn count_habits(&self, owner_id: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM habits WHERE owner_id = ?1",
                params![owner_id],
                |row| row.get(0),
            )
            .context("Failed to count habits")
    }

    pub fn update_habit(&self, habit: &Habit) -> Result<()> {
        self.conn
            .execute(
                "UPDATE habits
                 SET name = ?1, description = ?2, color = ?3, icon = ?4, frequency = ?5,
                     target_days_per_week = ?6, target_count = ?7, is_tracked = ?8,
                     default_duration_minutes = ?9, sort_order = ?10
                 WHERE id = ?11 AND owner_id = ?12",
                params![
                    habit.name,
                    habit.description,
                    habit.color,
                    habit.icon,
                    habit.frequency.as_str(),
                    habit.target_days_per_week,
                    habit.target_count,
                    habit.is_tracked,
                    habit.default_duration_minutes,
                    habit.sort_order,
                    habit.id,
                    habit.owner_id
                ],
            )
            .context("Failed to update habit")?;

        Ok(())
    }

    pub fn set_habit_archived(&self, owner_id: &str, id: i64, archived: bool) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE habits SET is_archived = ?1 WHERE id = ?2 AND owner_id = ?3",
                params![archived, id, owner_id],
            )
            .context("Failed to update habit archive flag")
    }

    /// Returns `None` when the owner has no such habit, otherwise the number of
    /// schedule cards removed alongside it.
    pub fn delete_habit_cascading_cards(&mut self, owner_id: &str, id: i64) -> Result<Option<usize>> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        let deleted = transaction
            .execute(
                "DELETE FROM habits WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .context("Failed to delete habit")?;
        if deleted == 0 {
            return Ok(None);
        }

        let cards = transaction
            .execute(
                "DELETE FROM schedule_cards WHERE habit_id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .context("Failed to delete schedule cards of habit")?;

        transaction
            .commit()
            .context("Failed to commit habit deletion")?;
        Ok(Some(cards))
    }

    pub fn reorder_habits(&mut self, owner_id: &str, habit_ids: &[i64]) -> Result<usize> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        let updated = habit_ids
            .iter()
            .enumerate()
            .try_fold(0_usize, |acc, (position, id)| {
                transaction
                    .execute(
                        "UPDATE habits SET sort_order = ?1 WHERE id = ?2 AND owner_id = ?3",
                        params![position as i64, id, owner_id],
                    )
                    .map(|changed| acc + changed)
                    .context("Failed to update habit sort order")
            })?;

        transaction
            .commit()
            .context("Failed to commit habit order")?;
        Ok(updated)
    }
}

fn map_habit(row: &Row<'_>) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        icon: row.get(5)?,
        frequency: text_enum(row, 6)?,
        target_days_per_week: row.get(7)?,
        target_count: row.get(8)?,
        is_tracked: row.get(9)?,
        default_duration_minutes: row.get(10)?,
        is_archived: row.get(11)?,
        sort_order: row.get(12)?,
        created_at: row.get(13)?,
    })
}
