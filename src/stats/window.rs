use super::streak::LogMap;
use crate::calendar;
use crate::habits::logs::HabitLog;
use crate::habits::{Frequency, Habit};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

const DAYS_PER_WEEK: u32 = 7;

/// Completion counts of many habits keyed by (habit, day).
#[derive(Debug, Clone, Default)]
pub struct LogIndex {
    counts: HashMap<(i64, NaiveDate), u32>,
}

impl LogIndex {
    pub fn from_logs(logs: &[HabitLog]) -> Self {
        Self {
            counts: logs
                .iter()
                .map(|log| ((log.habit_id, log.date), log.count))
                .collect(),
        }
    }

    pub fn count(&self, habit_id: i64, day: NaiveDate) -> u32 {
        self.counts.get(&(habit_id, day)).copied().unwrap_or_default()
    }

    pub fn completed(&self, habit: &Habit, day: NaiveDate) -> bool {
        habit.is_completed_with(self.count(habit.id, day))
    }

    pub fn logs_for(&self, habit_id: i64) -> LogMap {
        self.counts
            .iter()
            .filter(|((id, _), _)| *id == habit_id)
            .map(|((_, day), count)| (*day, *count))
            .collect()
    }
}

/// Decides which habits an aggregate counts.
pub trait Participation {
    fn includes(&self, habit: &Habit) -> bool;
}

/// Tracked daily habits; backs the rate, volume, trend and density aggregates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateParticipation;

impl Participation for RateParticipation {
    fn includes(&self, habit: &Habit) -> bool {
        habit.is_tracked && !habit.is_archived && habit.frequency == Frequency::Daily
    }
}

/// Tracked daily and weekly habits, each measured against its own weekly target.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeeklyParticipation;

impl WeeklyParticipation {
    pub fn target_days(habit: &Habit) -> u32 {
        match habit.frequency {
            Frequency::Weekly => habit
                .target_days_per_week
                .map(u32::from)
                .unwrap_or(DAYS_PER_WEEK),
            _ => DAYS_PER_WEEK,
        }
    }
}

impl Participation for WeeklyParticipation {
    fn includes(&self, habit: &Habit) -> bool {
        habit.is_tracked
            && !habit.is_archived
            && matches!(habit.frequency, Frequency::Daily | Frequency::Weekly)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub completed: u32,
    pub total: u32,
}

impl Tally {
    pub fn percentage(&self) -> u32 {
        percentage(self.completed, self.total)
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.completed) / f64::from(self.total)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyRate {
    pub rate: u32,
    pub completed: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyVolume {
    pub completed: u32,
    pub total: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyProgress {
    pub habit_id: i64,
    pub name: String,
    pub color: String,
    pub percentage: u32,
    pub completed_days: u32,
    pub target_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub week: String,
    pub week_start: NaiveDate,
    pub rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityCell {
    pub date: NaiveDate,
    pub intensity: f64,
}

pub fn percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(completed) * 100.0 / f64::from(total)).round() as u32
}

/// Counts (habit, day) pairs and how many of them were completed.
pub fn tally<I>(habits: &[&Habit], index: &LogIndex, days: I) -> Tally
where
    I: IntoIterator<Item = NaiveDate>,
{
    days.into_iter().fold(Tally::default(), |acc, day| Tally {
        completed: acc.completed
            + habits.iter().filter(|habit| index.completed(habit, day)).count() as u32,
        total: acc.total + habits.len() as u32,
    })
}

pub fn participants<'a, P: Participation>(habits: &'a [Habit], rule: &P) -> Vec<&'a Habit> {
    habits.iter().filter(|habit| rule.includes(habit)).collect()
}

pub fn consistency_rate(
    habits: &[Habit],
    index: &LogIndex,
    anchor: NaiveDate,
    days: u32,
) -> ConsistencyRate {
    let tracked = participants(habits, &RateParticipation);
    let result = tally(&tracked, index, calendar::days_ending_at(anchor, days));

    ConsistencyRate {
        rate: result.percentage(),
        completed: result.completed,
        total: result.total,
    }
}

pub fn daily_volume(habits: &[Habit], index: &LogIndex, date: NaiveDate) -> DailyVolume {
    let tracked = participants(habits, &RateParticipation);
    let result = tally(&tracked, index, [date]);

    DailyVolume {
        completed: result.completed,
        total: result.total,
        percentage: result.percentage(),
    }
}

/// Progress of each participating habit through the Monday-anchored week that
/// contains `anchor`, best first.
pub fn weekly_progress(habits: &[Habit], index: &LogIndex, anchor: NaiveDate) -> Vec<WeeklyProgress> {
    let monday = calendar::monday_of_week(anchor);
    let week = calendar::days_ending_at(monday + Duration::days(6), DAYS_PER_WEEK).collect::<Vec<_>>();

    let mut rows = participants(habits, &WeeklyParticipation)
        .into_iter()
        .map(|habit| {
            let completed_days = tally(&[habit], index, week.iter().copied()).completed;
            let target_days = WeeklyParticipation::target_days(habit);

            WeeklyProgress {
                habit_id: habit.id,
                name: habit.name.clone(),
                color: habit.color.clone(),
                percentage: percentage(completed_days, target_days).min(100),
                completed_days,
                target_days,
            }
        })
        .collect::<Vec<_>>();

    rows.sort_by(|left, right| right.percentage.cmp(&left.percentage));
    rows
}

/// Completion rate over `weeks` consecutive 7-day windows ending at `anchor`,
/// oldest first.
pub fn focus_trend(habits: &[Habit], index: &LogIndex, anchor: NaiveDate, weeks: u32) -> Vec<TrendPoint> {
    let tracked = participants(habits, &RateParticipation);

    (0..i64::from(weeks))
        .rev()
        .map(|offset| {
            let week_end = anchor - Duration::weeks(offset);
            let week_start = week_end - Duration::days(6);
            let result = tally(&tracked, index, calendar::days_ending_at(week_end, DAYS_PER_WEEK));

            TrendPoint {
                week: week_label(week_start),
                week_start,
                rate: result.percentage(),
            }
        })
        .collect()
}

/// Share of participating habits completed on each of the last `weeks * 7` days.
pub fn density_map(habits: &[Habit], index: &LogIndex, anchor: NaiveDate, weeks: u32) -> Vec<DensityCell> {
    let tracked = participants(habits, &RateParticipation);

    calendar::days_ending_at(anchor, weeks * DAYS_PER_WEEK)
        .map(|date| DensityCell {
            date,
            intensity: tally(&tracked, index, [date]).fraction(),
        })
        .collect()
}

fn week_label(week_start: NaiveDate) -> String {
    let days = (week_start - NaiveDate::default()).num_days();
    format!("W{}", days.div_euclid(7))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        calendar::parse_date(raw).expect("date")
    }

    fn habit(id: i64, frequency: Frequency) -> Habit {
        Habit {
            id,
            owner_id: "me".to_string(),
            name: format!("habit-{id}"),
            description: None,
            color: "blue".to_string(),
            icon: None,
            frequency,
            target_days_per_week: None,
            target_count: 1,
            is_tracked: true,
            default_duration_minutes: 60,
            is_archived: false,
            sort_order: Some(id),
            created_at: 0,
        }
    }

    fn log(habit_id: i64, raw: &str, count: u32) -> HabitLog {
        HabitLog {
            id: 0,
            habit_id,
            date: date(raw),
            count,
            completed_at: 0,
        }
    }

    #[test]
    fn consistency_with_no_participants_is_zero() {
        let index = LogIndex::from_logs(&[log(1, "2024-01-10", 1)]);
        let weekly_only = vec![habit(1, Frequency::Weekly)];

        assert_eq!(
            consistency_rate(&weekly_only, &index, date("2024-01-10"), 30),
            ConsistencyRate::default()
        );
        assert_eq!(consistency_rate(&[], &index, date("2024-01-10"), 30).rate, 0);
    }

    #[test]
    fn consistency_counts_habit_days_in_window() {
        let habits = vec![habit(1, Frequency::Daily), habit(2, Frequency::Daily)];
        let index = LogIndex::from_logs(&[
            log(1, "2024-01-10", 1),
            log(1, "2024-01-09", 1),
            log(2, "2024-01-10", 1),
            log(2, "2024-01-01", 1),
        ]);

        let rate = consistency_rate(&habits, &index, date("2024-01-10"), 2);
        assert_eq!(rate, ConsistencyRate { rate: 75, completed: 3, total: 4 });
    }

    #[test]
    fn volume_respects_target_count_and_tracking() {
        let mut doubled = habit(1, Frequency::Daily);
        doubled.target_count = 2;
        let mut untracked = habit(3, Frequency::Daily);
        untracked.is_tracked = false;
        let habits = vec![doubled, habit(2, Frequency::Daily), untracked];

        let day = "2024-01-10";
        let index = LogIndex::from_logs(&[log(1, day, 1), log(2, day, 1), log(3, day, 1)]);
        let volume = daily_volume(&habits, &index, date(day));
        assert_eq!(volume, DailyVolume { completed: 1, total: 2, percentage: 50 });

        let index = LogIndex::from_logs(&[log(1, day, 2), log(2, day, 1)]);
        assert_eq!(daily_volume(&habits, &index, date(day)).percentage, 100);
    }

    #[test]
    fn weekly_progress_uses_per_habit_targets() {
        let mut weekly = habit(2, Frequency::Weekly);
        weekly.target_days_per_week = Some(2);
        let habits = vec![habit(1, Frequency::Daily), weekly, habit(3, Frequency::Scheduled)];

        let index = LogIndex::from_logs(&[
            log(1, "2024-01-08", 1),
            log(2, "2024-01-08", 1),
            log(2, "2024-01-09", 1),
            log(2, "2024-01-10", 1),
            log(1, "2024-01-15", 1),
        ]);
        let rows = weekly_progress(&habits, &index, date("2024-01-14"));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].habit_id, 2);
        assert_eq!(rows[0].completed_days, 3);
        assert_eq!(rows[0].target_days, 2);
        assert_eq!(rows[0].percentage, 100);
        assert_eq!(rows[1].habit_id, 1);
        assert_eq!(rows[1].completed_days, 1);
        assert_eq!(rows[1].percentage, 14);
    }

    #[test]
    fn focus_trend_is_oldest_first_with_epoch_week_labels() {
        let habits = vec![habit(1, Frequency::Daily)];
        let index = LogIndex::from_logs(&[log(1, "2024-01-10", 1), log(1, "2024-01-09", 1)]);

        let trend = focus_trend(&habits, &index, date("2024-01-10"), 3);
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[2].week_start, date("2024-01-04"));
        assert_eq!(trend[2].rate, 29);
        assert_eq!(trend[0].week_start, date("2023-12-21"));
        assert_eq!(trend[0].rate, 0);

        // 2024-01-04 is 19726 days after the epoch.
        assert_eq!(trend[2].week, "W2818");
    }

    #[test]
    fn density_map_covers_every_day_in_range() {
        let habits = vec![habit(1, Frequency::Daily), habit(2, Frequency::Daily)];
        let index = LogIndex::from_logs(&[log(1, "2024-01-10", 1), log(2, "2024-01-10", 1), log(1, "2024-01-09", 1)]);

        let cells = density_map(&habits, &index, date("2024-01-10"), 2);
        assert_eq!(cells.len(), 14);
        assert_eq!(cells[0].date, date("2023-12-28"));
        assert_eq!(cells[13].intensity, 1.0);
        assert_eq!(cells[12].intensity, 0.5);
        assert!(cells.iter().all(|cell| (0.0..=1.0).contains(&cell.intensity)));
    }

    #[test]
    fn log_index_extracts_single_habit_maps() {
        let index = LogIndex::from_logs(&[log(1, "2024-01-10", 3), log(2, "2024-01-10", 1)]);
        let map = index.logs_for(1);

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&date("2024-01-10")), Some(&3));
    }
}
