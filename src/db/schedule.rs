use super::Database;
use super::queries::SCHEDULE_CARD_COLUMNS;
use crate::error::DomainResult;
use crate::schedule::{ScheduleCard, UNSAVED_CARD_ID};
use anyhow::{Context, Result};
use rusqlite::{Connection, Row, TransactionBehavior, params};

impl Database {
    pub fn schedule_cards(&self, owner_id: &str) -> Result<Vec<ScheduleCard>> {
        cards_of(&self.conn, owner_id)
    }

    /// Reads the owner's cards and writes the cards `plan` returns, holding the
    /// write lock for the whole round so no concurrent placement slips in between.
    /// Cards with the unsaved id are inserted; the rest are updated in place.
    pub fn write_cards_atomically<F>(
        &mut self,
        owner_id: &str,
        plan: F,
    ) -> DomainResult<Vec<ScheduleCard>>
    where
        F: FnOnce(&[ScheduleCard]) -> DomainResult<Vec<ScheduleCard>>,
    {
        let transaction = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to start schedule transaction")?;

        let existing = cards_of(&transaction, owner_id)?;
        let planned = plan(&existing)?;

        let mut written = Vec::with_capacity(planned.len());
        for card in planned {
            if card.id == UNSAVED_CARD_ID {
                transaction
                    .execute(
                        "INSERT INTO schedule_cards (habit_id, owner_id, day, start_hour, start_minute, duration_minutes)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            card.habit_id,
                            owner_id,
                            card.day,
                            card.start_hour,
                            card.start_minute,
                            card.duration_minutes
                        ],
                    )
                    .context("Failed to insert schedule card")?;
                written.push(ScheduleCard {
                    id: transaction.last_insert_rowid(),
                    ..card
                });
            } else {
                transaction
                    .execute(
                        "UPDATE schedule_cards
                         SET day = ?1, start_hour = ?2, start_minute = ?3, duration_minutes = ?4
                         WHERE id = ?5 AND owner_id = ?6",
                        params![
                            card.day,
                            card.start_hour,
                            card.start_minute,
                            card.duration_minutes,
                            card.id,
                            owner_id
                        ],
                    )
                    .context("Failed to update schedule card")?;
                written.push(card);
            }
        }

        transaction
            .commit()
            .context("Failed to commit schedule change")?;
        Ok(written)
    }

    pub fn delete_schedule_card(&self, owner_id: &str, id: i64) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM schedule_cards WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .context("Failed to delete schedule card")
    }

    pub fn delete_schedule_cards_for_habit(&self, owner_id: &str, habit_id: i64) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM schedule_cards WHERE habit_id = ?1 AND owner_id = ?2",
                params![habit_id, owner_id],
            )
            .context("Failed to delete schedule cards of habit")
    }
}

fn cards_of(conn: &Connection, owner_id: &str) -> Result<Vec<ScheduleCard>> {
    let mut statement = conn.prepare(&format!(
        "SELECT {SCHEDULE_CARD_COLUMNS}
         FROM schedule_cards
         WHERE owner_id = ?1
         ORDER BY day ASC, start_hour ASC, start_minute ASC, id ASC"
    ))?;

    let rows = statement
        .query_map(params![owner_id], map_card)?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to query schedule cards")?;

    Ok(rows)
}

fn map_card(row: &Row<'_>) -> rusqlite::Result<ScheduleCard> {
    Ok(ScheduleCard {
        id: row.get(0)?,
        habit_id: row.get(1)?,
        day: row.get(2)?,
        start_hour: row.get(3)?,
        start_minute: row.get(4)?,
        duration_minutes: row.get(5)?,
    })
}
