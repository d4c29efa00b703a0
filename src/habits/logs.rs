//! Per-day completion counts. A log never holds a zero count: reaching zero
//! deletes the row.

use super::get as get_habit;
use crate::auth::Owner;
use crate::calendar;
use crate::db::Database;
use crate::error::{DomainError, DomainResult};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitLog {
    pub id: i64,
    pub habit_id: i64,
    pub date: NaiveDate,
    pub count: u32,
    pub completed_at: i64,
}

/// Result of lowering a log's count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChange {
    Missing,
    Removed,
    Updated(HabitLog),
}

pub fn log(
    database: &Database,
    owner: &Owner,
    habit_id: i64,
    date: Option<NaiveDate>,
    count: Option<u32>,
) -> DomainResult<HabitLog> {
    get_habit(database, owner, habit_id)?;
    let date = date.unwrap_or_else(calendar::today);
    let delta = positive_delta(count)?;

    let entry = database
        .increment_log(owner.as_str(), habit_id, date, delta, calendar::now_millis())?
        .ok_or_else(|| DomainError::Validation("count is too large".to_string()))?;
    info!(habit_id, date = %date, count = entry.count, "habit logged");

    Ok(entry)
}

/// Lowers the day's count; returns `None` once the log is gone.
pub fn unlog(
    database: &Database,
    owner: &Owner,
    habit_id: i64,
    date: Option<NaiveDate>,
    count: Option<u32>,
) -> DomainResult<Option<HabitLog>> {
    get_habit(database, owner, habit_id)?;
    let date = date.unwrap_or_else(calendar::today);
    let delta = positive_delta(count)?;

    match database.decrement_log(habit_id, date, delta, calendar::now_millis())? {
        LogChange::Missing => Err(DomainError::not_found(
            "HabitLog",
            format!("{habit_id}@{}", calendar::format_date(date)),
        )),
        LogChange::Removed => {
            info!(habit_id, date = %date, "habit log removed");
            Ok(None)
        }
        LogChange::Updated(entry) => {
            info!(habit_id, date = %date, count = entry.count, "habit unlogged");
            Ok(Some(entry))
        }
    }
}

/// Absolute write; a count of zero or less deletes the day's log.
pub fn set(
    database: &Database,
    owner: &Owner,
    habit_id: i64,
    date: NaiveDate,
    count: i64,
) -> DomainResult<Option<HabitLog>> {
    get_habit(database, owner, habit_id)?;
    let count = u32::try_from(count.max(0))
        .map_err(|_| DomainError::Validation("count is too large".to_string()))?;

    let entry = database.set_log(owner.as_str(), habit_id, date, count, calendar::now_millis())?;
    info!(habit_id, date = %date, count, "habit log set");

    Ok(entry)
}

pub fn delete(
    database: &Database,
    owner: &Owner,
    habit_id: i64,
    date: NaiveDate,
) -> DomainResult<bool> {
    get_habit(database, owner, habit_id)?;
    let removed = database.delete_log(habit_id, date)? > 0;
    info!(habit_id, date = %date, removed, "habit log deleted");

    Ok(removed)
}

pub fn get(
    database: &Database,
    owner: &Owner,
    habit_id: i64,
    date: NaiveDate,
) -> DomainResult<Option<HabitLog>> {
    if database.habit(owner.as_str(), habit_id)?.is_none() {
        return Ok(None);
    }

    Ok(database.log_for(habit_id, date)?)
}

pub fn list_for_habit(
    database: &Database,
    owner: &Owner,
    habit_id: i64,
) -> DomainResult<Vec<HabitLog>> {
    if database.habit(owner.as_str(), habit_id)?.is_none() {
        return Ok(Vec::new());
    }

    Ok(database.logs_for_habit(habit_id)?)
}

/// Every log of the owner between `start` and `end` inclusive, including logs of
/// deleted habits.
pub fn list_range(
    database: &Database,
    owner: &Owner,
    start: NaiveDate,
    end: NaiveDate,
) -> DomainResult<Vec<HabitLog>> {
    if start > end {
        return Err(DomainError::Validation(
            "start date must not be after end date".to_string(),
        ));
    }

    Ok(database.logs_for_owner_between(owner.as_str(), start, end)?)
}

pub fn list_for_day(database: &Database, owner: &Owner, date: NaiveDate) -> DomainResult<Vec<HabitLog>> {
    list_range(database, owner, date, date)
}

fn positive_delta(count: Option<u32>) -> DomainResult<u32> {
    match count.unwrap_or(1) {
        0 => Err(DomainError::Validation(
            "count must be at least 1".to_string(),
        )),
        value => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;
    use crate::habits::{self, NewHabit};

    fn setup() -> (tempfile::TempDir, Database, Owner, i64) {
        let (dir, database) = temp_database();
        let owner = Owner::new("me").expect("owner");
        let habit = habits::create(&database, &owner, NewHabit::named("Read")).expect("habit");
        (dir, database, owner, habit.id)
    }

    fn day(raw: &str) -> NaiveDate {
        calendar::parse_date(raw).expect("date")
    }

    #[test]
    fn log_accumulates_on_one_row() {
        let (_dir, database, owner, habit_id) = setup();
        let date = day("2024-02-10");

        let first = log(&database, &owner, habit_id, Some(date), None).expect("first");
        let second = log(&database, &owner, habit_id, Some(date), Some(2)).expect("second");

        assert_eq!(first.id, second.id);
        assert_eq!(second.count, 3);
        assert_eq!(list_for_habit(&database, &owner, habit_id).expect("list").len(), 1);
    }

    #[test]
    fn unlog_to_zero_deletes_row() {
        let (_dir, database, owner, habit_id) = setup();
        let date = day("2024-02-10");

        log(&database, &owner, habit_id, Some(date), Some(2)).expect("log");
        let lowered = unlog(&database, &owner, habit_id, Some(date), None).expect("unlog");
        assert_eq!(lowered.map(|entry| entry.count), Some(1));

        let gone = unlog(&database, &owner, habit_id, Some(date), Some(5)).expect("unlog");
        assert_eq!(gone, None);
        assert_eq!(get(&database, &owner, habit_id, date).expect("get"), None);

        assert!(matches!(
            unlog(&database, &owner, habit_id, Some(date), None),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn set_zero_deletes_and_never_stores_zero() {
        let (_dir, database, owner, habit_id) = setup();
        let date = day("2024-02-10");

        assert_eq!(set(&database, &owner, habit_id, date, 0).expect("noop"), None);
        let stored = set(&database, &owner, habit_id, date, 4).expect("set");
        assert_eq!(stored.map(|entry| entry.count), Some(4));

        assert_eq!(set(&database, &owner, habit_id, date, -1).expect("clear"), None);
        assert!(list_for_habit(&database, &owner, habit_id).expect("list").is_empty());
    }

    #[test]
    fn writes_reject_foreign_habit_and_reads_degrade() {
        let (_dir, database, _owner, habit_id) = setup();
        let stranger = Owner::new("stranger").expect("owner");
        let date = day("2024-02-10");

        assert!(matches!(
            log(&database, &stranger, habit_id, Some(date), None),
            Err(DomainError::NotFound { .. })
        ));
        assert_eq!(get(&database, &stranger, habit_id, date).expect("get"), None);
        assert!(list_for_habit(&database, &stranger, habit_id).expect("list").is_empty());
    }

    #[test]
    fn range_is_inclusive_and_sorted() {
        let (_dir, database, owner, habit_id) = setup();
        for raw in ["2024-02-12", "2024-02-10", "2024-02-11", "2024-02-13"] {
            log(&database, &owner, habit_id, Some(day(raw)), None).expect("log");
        }

        let dates = list_range(&database, &owner, day("2024-02-10"), day("2024-02-12"))
            .expect("range")
            .into_iter()
            .map(|entry| calendar::format_date(entry.date))
            .collect::<Vec<_>>();
        assert_eq!(dates, vec!["2024-02-10", "2024-02-11", "2024-02-12"]);

        assert!(list_range(&database, &owner, day("2024-02-12"), day("2024-02-10")).is_err());
        assert_eq!(list_for_day(&database, &owner, day("2024-02-13")).expect("day").len(), 1);
    }

    #[test]
    fn increment_past_u32_range_is_rejected_and_leaves_log_readable() {
        let (_dir, database, owner, habit_id) = setup();
        let date = day("2024-02-10");

        log(&database, &owner, habit_id, Some(date), Some(u32::MAX)).expect("fill");
        assert!(matches!(
            log(&database, &owner, habit_id, Some(date), Some(1)),
            Err(DomainError::Validation(_))
        ));

        let stored = list_for_habit(&database, &owner, habit_id).expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].count, u32::MAX);
        assert_eq!(
            list_for_day(&database, &owner, date).expect("day")[0].count,
            u32::MAX
        );

        let caller = crate::auth::Caller::from(owner.clone());
        let streak =
            crate::stats::habit_streak(&database, &caller, habit_id, date, 30).expect("streak");
        assert_eq!(streak.current, 1);
    }

    #[test]
    fn delete_reports_whether_a_log_existed() {
        let (_dir, database, owner, habit_id) = setup();
        let date = day("2024-02-10");
        log(&database, &owner, habit_id, Some(date), None).expect("log");

        assert!(delete(&database, &owner, habit_id, date).expect("delete"));
        assert!(!delete(&database, &owner, habit_id, date).expect("delete again"));
    }
}
