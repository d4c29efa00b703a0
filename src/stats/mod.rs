//! Read-only habit statistics. Every entry point answers an anonymous caller
//! with an empty or zeroed result instead of an error.

pub mod streak;
pub mod window;

use crate::auth::{Caller, Owner};
use crate::db::Database;
use crate::error::DomainResult;
use crate::habits::{HabitFilter, logs};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use streak::{LogMap, OverallStreak, StreakSummary};
use window::{ConsistencyRate, DailyVolume, DensityCell, LogIndex, TrendPoint, WeeklyProgress};

pub const MAX_DAYS: u32 = 365;
pub const MAX_WEEKS: u32 = 52;

pub fn clamp_days(days: u32) -> u32 {
    days.clamp(1, MAX_DAYS)
}

pub fn clamp_weeks(weeks: u32) -> u32 {
    weeks.clamp(1, MAX_WEEKS)
}

pub fn habit_streak(
    database: &Database,
    caller: &Caller,
    habit_id: i64,
    anchor: NaiveDate,
    window_days: u32,
) -> DomainResult<StreakSummary> {
    let Some(owner) = caller.owner() else {
        return Ok(StreakSummary::default());
    };
    let Some(habit) = database.habit(owner.as_str(), habit_id)? else {
        return Ok(StreakSummary::default());
    };

    let logs = database
        .logs_for_habit(habit.id)?
        .into_iter()
        .map(|log| (log.date, log.count))
        .collect::<LogMap>();

    Ok(streak::compute_streak(
        &logs,
        habit.target_count,
        habit.frequency,
        anchor,
        window_days,
    ))
}

pub fn overall(
    database: &Database,
    caller: &Caller,
    anchor: NaiveDate,
    window_days: u32,
) -> DomainResult<OverallStreak> {
    let Some(owner) = caller.owner() else {
        return Ok(OverallStreak::default());
    };

    let habits = database.habits(owner.as_str(), HabitFilter::Active)?;
    let index = index_ending_at(database, owner, anchor, window_days)?;
    let logs_by_habit = habits
        .iter()
        .map(|habit| (habit.id, index.logs_for(habit.id)))
        .collect::<HashMap<_, _>>();

    Ok(streak::overall_streak(&habits, &logs_by_habit, anchor, window_days))
}

pub fn consistency(
    database: &Database,
    caller: &Caller,
    anchor: NaiveDate,
    days: u32,
) -> DomainResult<ConsistencyRate> {
    let Some(owner) = caller.owner() else {
        return Ok(ConsistencyRate::default());
    };

    let days = clamp_days(days);
    let habits = database.habits(owner.as_str(), HabitFilter::Active)?;
    let index = index_ending_at(database, owner, anchor, days)?;

    Ok(window::consistency_rate(&habits, &index, anchor, days))
}

pub fn volume(database: &Database, caller: &Caller, date: NaiveDate) -> DomainResult<DailyVolume> {
    let Some(owner) = caller.owner() else {
        return Ok(DailyVolume::default());
    };

    let habits = database.habits(owner.as_str(), HabitFilter::Active)?;
    let index = LogIndex::from_logs(&logs::list_for_day(database, owner, date)?);

    Ok(window::daily_volume(&habits, &index, date))
}

pub fn weekly(
    database: &Database,
    caller: &Caller,
    anchor: NaiveDate,
) -> DomainResult<Vec<WeeklyProgress>> {
    let Some(owner) = caller.owner() else {
        return Ok(Vec::new());
    };

    let sunday = crate::calendar::monday_of_week(anchor) + Duration::days(6);
    let habits = database.habits(owner.as_str(), HabitFilter::Active)?;
    let index = index_ending_at(database, owner, sunday, 7)?;

    Ok(window::weekly_progress(&habits, &index, anchor))
}

pub fn trend(
    database: &Database,
    caller: &Caller,
    anchor: NaiveDate,
    weeks: u32,
) -> DomainResult<Vec<TrendPoint>> {
    let Some(owner) = caller.owner() else {
        return Ok(Vec::new());
    };

    let weeks = clamp_weeks(weeks);
    let habits = database.habits(owner.as_str(), HabitFilter::Active)?;
    let index = index_ending_at(database, owner, anchor, weeks * 7)?;

    Ok(window::focus_trend(&habits, &index, anchor, weeks))
}

pub fn density(
    database: &Database,
    caller: &Caller,
    anchor: NaiveDate,
    weeks: u32,
) -> DomainResult<Vec<DensityCell>> {
    let Some(owner) = caller.owner() else {
        return Ok(Vec::new());
    };

    let weeks = clamp_weeks(weeks);
    let habits = database.habits(owner.as_str(), HabitFilter::Active)?;
    let index = index_ending_at(database, owner, anchor, weeks * 7)?;

    Ok(window::density_map(&habits, &index, anchor, weeks))
}

fn index_ending_at(
    database: &Database,
    owner: &Owner,
    end: NaiveDate,
    days: u32,
) -> DomainResult<LogIndex> {
    let start = end - Duration::days(i64::from(days.max(1)) - 1);
    let logs = logs::list_range(database, owner, start, end)?;

    Ok(LogIndex::from_logs(&logs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar;
    use crate::db::test_support::temp_database;
    use crate::habits::{self, NewHabit};

    fn date(raw: &str) -> NaiveDate {
        calendar::parse_date(raw).expect("date")
    }

    #[test]
    fn anonymous_callers_get_defaults() {
        let (_dir, database) = temp_database();
        let anonymous = Caller::anonymous();
        let anchor = date("2024-01-10");

        assert_eq!(habit_streak(&database, &anonymous, 1, anchor, 365).expect("streak"), StreakSummary::default());
        assert_eq!(overall(&database, &anonymous, anchor, 365).expect("overall"), OverallStreak::default());
        assert_eq!(consistency(&database, &anonymous, anchor, 30).expect("rate"), ConsistencyRate::default());
        assert_eq!(volume(&database, &anonymous, anchor).expect("volume"), DailyVolume::default());
        assert!(weekly(&database, &anonymous, anchor).expect("weekly").is_empty());
        assert!(trend(&database, &anonymous, anchor, 4).expect("trend").is_empty());
        assert!(density(&database, &anonymous, anchor, 4).expect("density").is_empty());
    }

    #[test]
    fn foreign_habit_streak_is_zeroed() {
        let (_dir, database) = temp_database();
        let owner = Owner::new("me").expect("owner");
        let habit = habits::create(&database, &owner, NewHabit::named("Read")).expect("habit");
        logs::log(&database, &owner, habit.id, Some(date("2024-01-10")), None).expect("log");

        let stranger = Caller::from(Owner::new("stranger").expect("owner"));
        let summary = habit_streak(&database, &stranger, habit.id, date("2024-01-10"), 365).expect("streak");
        assert_eq!(summary, StreakSummary::default());
    }

    #[test]
    fn target_count_two_completes_on_second_log() {
        let (_dir, database) = temp_database();
        let owner = Owner::new("me").expect("owner");
        let caller = Caller::from(owner.clone());
        let habit = habits::create(
            &database,
            &owner,
            NewHabit {
                target_count: 2,
                ..NewHabit::named("Water")
            },
        )
        .expect("habit");
        let day = date("2024-01-10");

        logs::log(&database, &owner, habit.id, Some(day), None).expect("first");
        assert_eq!(volume(&database, &caller, day).expect("volume").completed, 0);

        logs::log(&database, &owner, habit.id, Some(day), None).expect("second");
        assert_eq!(volume(&database, &caller, day).expect("volume").completed, 1);
        assert_eq!(habit_streak(&database, &caller, habit.id, day, 365).expect("streak").current, 1);

        logs::unlog(&database, &owner, habit.id, Some(day), None).expect("unlog");
        assert_eq!(volume(&database, &caller, day).expect("volume").completed, 0);
    }

    #[test]
    fn overall_uses_logs_inside_window_only() {
        let (_dir, database) = temp_database();
        let owner = Owner::new("me").expect("owner");
        let caller = Caller::from(owner.clone());
        let habit = habits::create(&database, &owner, NewHabit::named("Read")).expect("habit");

        for raw in ["2024-01-08", "2024-01-09", "2024-01-10", "2024-01-11"] {
            logs::log(&database, &owner, habit.id, Some(date(raw)), None).expect("log");
        }

        let result = overall(&database, &caller, date("2024-01-10"), 365).expect("overall");
        assert_eq!(result.current, 3);
        assert_eq!(result.habit_name, "Read");
    }

    #[test]
    fn input_sizes_are_clamped() {
        assert_eq!(clamp_days(0), 1);
        assert_eq!(clamp_days(10_000), MAX_DAYS);
        assert_eq!(clamp_weeks(0), 1);
        assert_eq!(clamp_weeks(53), MAX_WEEKS);
    }
}
