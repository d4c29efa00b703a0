use crate::calendar;
use crate::habits::{Frequency, Habit};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::HashMap;

/// Day to logged count for a single habit.
pub type LogMap = HashMap<NaiveDate, u32>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakSummary {
    pub current: u32,
    pub best: u32,
    pub has_shield: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverallStreak {
    pub current: u32,
    pub best: u32,
    pub habit_name: String,
}

/// Walks `window_days` days back from `anchor`.
///
/// A daily habit may miss one day per Monday-anchored week without breaking its
/// streak. The shielded day keeps the streak alive but adds nothing to it.
pub fn compute_streak(
    logs: &LogMap,
    target_count: u32,
    frequency: Frequency,
    anchor: NaiveDate,
    window_days: u32,
) -> StreakSummary {
    let anchor_monday = calendar::monday_of_week(anchor);
    let mut week = anchor_monday;
    let mut shield_used = false;
    let mut anchor_week_shield_used = false;

    let mut current = 0_u32;
    let mut current_open = true;
    let mut run = 0_u32;
    let mut best = 0_u32;

    for day in calendar::days_back_from(anchor, window_days) {
        let monday = calendar::monday_of_week(day);
        if monday != week {
            week = monday;
            shield_used = false;
        }

        let completed = logs.get(&day).copied().unwrap_or_default() >= target_count;
        if completed {
            run += 1;
            best = best.max(run);
            if current_open {
                current += 1;
            }
        } else if frequency == Frequency::Daily && !shield_used {
            shield_used = true;
            if week == anchor_monday {
                anchor_week_shield_used = true;
            }
        } else {
            run = 0;
            current_open = false;
        }
    }

    StreakSummary {
        current,
        best,
        has_shield: anchor.weekday() == Weekday::Mon || (current > 0 && !anchor_week_shield_used),
    }
}

/// Longest current streak across habits (the earliest habit wins ties) and the
/// longest best streak, which may belong to another habit.
pub fn overall_streak(
    habits: &[Habit],
    logs_by_habit: &HashMap<i64, LogMap>,
    anchor: NaiveDate,
    window_days: u32,
) -> OverallStreak {
    let empty = LogMap::new();

    habits
        .iter()
        .filter(|habit| !habit.is_archived)
        .fold(OverallStreak::default(), |mut overall, habit| {
            let logs = logs_by_habit.get(&habit.id).unwrap_or(&empty);
            let summary =
                compute_streak(logs, habit.target_count, habit.frequency, anchor, window_days);

            if summary.current > overall.current {
                overall.current = summary.current;
                overall.habit_name = habit.name.clone();
            }
            overall.best = overall.best.max(summary.best);
            overall
        })
}
