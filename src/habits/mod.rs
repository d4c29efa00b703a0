pub mod logs;

use crate::auth::Owner;
use crate::calendar;
use crate::db::Database;
use crate::error::{DomainError, DomainResult, UnknownVariant};
use crate::patch::double_option;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub const CARD_COLORS: [&str; 9] = [
    "oklch(0.55 0.02 260)",
    "oklch(0.55 0.18 25)",
    "oklch(0.65 0.18 55)",
    "oklch(0.70 0.18 80)",
    "oklch(0.55 0.15 150)",
    "oklch(0.55 0.12 180)",
    "oklch(0.55 0.15 240)",
    "oklch(0.55 0.18 280)",
    "oklch(0.60 0.18 340)",
];

const MIN_DURATION_MINUTES: u32 = 15;
const MAX_DURATION_MINUTES: u32 = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Scheduled,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Scheduled => "scheduled",
        }
    }
}

impl FromStr for Frequency {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "scheduled" => Ok(Frequency::Scheduled),
            _ => Err(UnknownVariant {
                kind: "frequency",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Habit {
    pub id: i64,
    #[serde(skip)]
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub frequency: Frequency,
    pub target_days_per_week: Option<u8>,
    pub target_count: u32,
    pub is_tracked: bool,
    pub default_duration_minutes: u32,
    pub is_archived: bool,
    pub sort_order: Option<i64>,
    pub created_at: i64,
}

impl Habit {
    pub fn is_completed_with(&self, count: u32) -> bool {
        count >= self.target_count
    }

    fn apply(mut self, patch: HabitPatch) -> Self {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        if let Some(frequency) = patch.frequency {
            self.frequency = frequency;
        }
        if let Some(target_days) = patch.target_days_per_week {
            self.target_days_per_week = target_days;
        }
        if let Some(target_count) = patch.target_count {
            self.target_count = target_count;
        }
        if let Some(is_tracked) = patch.is_tracked {
            self.is_tracked = is_tracked;
        }
        if let Some(duration) = patch.default_duration_minutes {
            self.default_duration_minutes = duration;
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = Some(sort_order);
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_frequency")]
    pub frequency: Frequency,
    #[serde(default)]
    pub target_days_per_week: Option<u8>,
    #[serde(default = "default_target_count")]
    pub target_count: u32,
    #[serde(default = "default_tracked")]
    pub is_tracked: bool,
    #[serde(default = "default_duration")]
    pub default_duration_minutes: u32,
}

impl NewHabit {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            color: default_color(),
            icon: None,
            frequency: Frequency::Daily,
            target_days_per_week: None,
            target_count: 1,
            is_tracked: true,
            default_duration_minutes: default_duration(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HabitPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default, deserialize_with = "double_option")]
    pub target_days_per_week: Option<Option<u8>>,
    #[serde(default)]
    pub target_count: Option<u32>,
    #[serde(default)]
    pub is_tracked: Option<bool>,
    #[serde(default)]
    pub default_duration_minutes: Option<u32>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitFilter {
    #[default]
    Active,
    Archived,
    All,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitWithStatus {
    #[serde(flatten)]
    pub habit: Habit,
    pub date: NaiveDate,
    pub today_count: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedOutcome {
    pub created: usize,
}

struct DefaultHabit {
    name: &'static str,
    color: &'static str,
    icon: &'static str,
    duration_minutes: u32,
}

const DEFAULT_HABITS: [DefaultHabit; 2] = [
    DefaultHabit {
        name: "Gym",
        color: CARD_COLORS[4],
        icon: "Dumbbell",
        duration_minutes: 60,
    },
    DefaultHabit {
        name: "Work",
        color: CARD_COLORS[6],
        icon: "Briefcase",
        duration_minutes: 120,
    },
];

pub fn create(database: &Database, owner: &Owner, input: NewHabit) -> DomainResult<Habit> {
    let input = NewHabit {
        name: input.name.trim().to_string(),
        ..input
    };
    validate_fields(
        &input.name,
        &input.color,
        input.target_count,
        input.target_days_per_week,
        input.default_duration_minutes,
    )?;

    let sort_order = database.count_habits(owner.as_str())?;
    let id = database.insert_habit(owner.as_str(), &input, sort_order, calendar::now_millis())?;
    info!(habit_id = id, owner = %owner, name = %input.name, "habit created");

    get(database, owner, id)
}

/// Seeds the starter habits, only for an owner that has none yet.
pub fn create_defaults(database: &Database, owner: &Owner) -> DomainResult<SeedOutcome> {
    if database.count_habits(owner.as_str())? > 0 {
        return Ok(SeedOutcome { created: 0 });
    }

    let now = calendar::now_millis();
    DEFAULT_HABITS
        .iter()
        .enumerate()
        .try_for_each(|(index, preset)| -> DomainResult<()> {
            let input = NewHabit {
                color: preset.color.to_string(),
                icon: Some(preset.icon.to_string()),
                default_duration_minutes: preset.duration_minutes,
                ..NewHabit::named(preset.name)
            };
            database.insert_habit(owner.as_str(), &input, index as i64, now)?;
            Ok(())
        })?;

    info!(owner = %owner, created = DEFAULT_HABITS.len(), "default habits seeded");
    Ok(SeedOutcome {
        created: DEFAULT_HABITS.len(),
    })
}

pub fn get(database: &Database, owner: &Owner, id: i64) -> DomainResult<Habit> {
    database
        .habit(owner.as_str(), id)?
        .ok_or_else(|| DomainError::not_found("Habit", id))
}

pub fn list(database: &Database, owner: &Owner, filter: HabitFilter) -> DomainResult<Vec<Habit>> {
    Ok(database.habits(owner.as_str(), filter)?)
}

pub fn update(
    database: &Database,
    owner: &Owner,
    id: i64,
    patch: HabitPatch,
) -> DomainResult<Habit> {
    let updated = get(database, owner, id)?.apply(patch);
    validate_fields(
        &updated.name,
        &updated.color,
        updated.target_count,
        updated.target_days_per_week,
        updated.default_duration_minutes,
    )?;

    database.update_habit(&updated)?;
    info!(habit_id = id, owner = %owner, "habit updated");

    Ok(updated)
}

pub fn set_archived(
    database: &Database,
    owner: &Owner,
    id: i64,
    archived: bool,
) -> DomainResult<Habit> {
    let changed = database.set_habit_archived(owner.as_str(), id, archived)?;
    if changed == 0 {
        return Err(DomainError::not_found("Habit", id));
    }

    info!(habit_id = id, owner = %owner, archived, "habit archive flag changed");
    get(database, owner, id)
}

/// Hard delete. Schedule cards of the habit go with it; logs stay for statistics.
pub fn delete(database: &mut Database, owner: &Owner, id: i64) -> DomainResult<usize> {
    let removed_cards = database
        .delete_habit_cascading_cards(owner.as_str(), id)?
        .ok_or_else(|| DomainError::not_found("Habit", id))?;

    info!(habit_id = id, owner = %owner, removed_cards, "habit deleted");
    Ok(removed_cards)
}

/// Assigns `sort_order` by position. Ids the owner does not hold are skipped.
pub fn reorder(database: &mut Database, owner: &Owner, habit_ids: &[i64]) -> DomainResult<usize> {
    let updated = database.reorder_habits(owner.as_str(), habit_ids)?;
    info!(owner = %owner, updated, "habits reordered");
    Ok(updated)
}

/// Active habits with the count logged on `date`.
pub fn with_status(
    database: &Database,
    owner: &Owner,
    date: NaiveDate,
) -> DomainResult<Vec<HabitWithStatus>> {
    let habits = database.habits(owner.as_str(), HabitFilter::Active)?;
    let logs = database.logs_for_owner_between(owner.as_str(), date, date)?;

    let rows = habits
        .into_iter()
        .map(|habit| {
            let today_count = logs
                .iter()
                .find(|log| log.habit_id == habit.id)
                .map(|log| log.count)
                .unwrap_or_default();
            let completed = habit.is_completed_with(today_count);

            HabitWithStatus {
                habit,
                date,
                today_count,
                completed,
            }
        })
        .collect::<Vec<_>>();

    Ok(rows)
}

fn validate_fields(
    name: &str,
    color: &str,
    target_count: u32,
    target_days_per_week: Option<u8>,
    default_duration_minutes: u32,
) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::Validation("Name is required".to_string()));
    }
    if color.trim().is_empty() {
        return Err(DomainError::Validation("Color is required".to_string()));
    }
    if target_count < 1 {
        return Err(DomainError::Validation(
            "target_count must be at least 1".to_string(),
        ));
    }
    if let Some(days) = target_days_per_week {
        if !(1..=7).contains(&days) {
            return Err(DomainError::Validation(
                "target_days_per_week must be between 1 and 7".to_string(),
            ));
        }
    }
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&default_duration_minutes) {
        return Err(DomainError::Validation(format!(
            "default_duration_minutes must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}"
        )));
    }

    Ok(())
}

fn default_color() -> String {
    CARD_COLORS[4].to_string()
}

fn default_frequency() -> Frequency {
    Frequency::Daily
}

fn default_target_count() -> u32 {
    1
}

fn default_tracked() -> bool {
    true
}

fn default_duration() -> u32 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;
    use crate::schedule::{self, NewCard};

    fn owner(raw: &str) -> Owner {
        Owner::new(raw).expect("owner")
    }

    #[test]
    fn create_assigns_sort_order_and_trims_name() {
        let (_dir, database) = temp_database();
        let me = owner("me");

        let first = create(&database, &me, NewHabit::named("  Read ")).expect("first");
        let second = create(&database, &me, NewHabit::named("Run")).expect("second");

        assert_eq!(first.name, "Read");
        assert_eq!(first.sort_order, Some(0));
        assert_eq!(second.sort_order, Some(1));
        assert_eq!(first.frequency, Frequency::Daily);
    }

    #[test]
    fn rejects_invalid_targets() {
        let (_dir, database) = temp_database();
        let me = owner("me");

        let zero_target = NewHabit {
            target_count: 0,
            ..NewHabit::named("Read")
        };
        assert!(matches!(
            create(&database, &me, zero_target),
            Err(DomainError::Validation(_))
        ));

        let eight_days = NewHabit {
            frequency: Frequency::Weekly,
            target_days_per_week: Some(8),
            ..NewHabit::named("Read")
        };
        assert!(matches!(
            create(&database, &me, eight_days),
            Err(DomainError::Validation(_))
        ));

        assert!(matches!(
            create(&database, &me, NewHabit::named("   ")),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn foreign_habits_look_missing() {
        let (_dir, database) = temp_database();
        let habit = create(&database, &owner("alice"), NewHabit::named("Read")).expect("habit");

        assert!(matches!(
            get(&database, &owner("bob"), habit.id),
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            update(&database, &owner("bob"), habit.id, HabitPatch::default()),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn update_applies_partial_patch() {
        let (_dir, database) = temp_database();
        let me = owner("me");
        let habit = create(
            &database,
            &me,
            NewHabit {
                description: Some("pages".to_string()),
                ..NewHabit::named("Read")
            },
        )
        .expect("habit");

        let patch = HabitPatch {
            description: Some(None),
            target_count: Some(3),
            ..HabitPatch::default()
        };
        let updated = update(&database, &me, habit.id, patch).expect("updated");

        assert_eq!(updated.name, "Read");
        assert_eq!(updated.description, None);
        assert_eq!(updated.target_count, 3);
        assert_eq!(get(&database, &me, habit.id).expect("reload").target_count, 3);
    }

    #[test]
    fn defaults_are_seeded_once() {
        let (_dir, database) = temp_database();
        let me = owner("me");

        assert_eq!(create_defaults(&database, &me).expect("seed").created, 2);
        assert_eq!(create_defaults(&database, &me).expect("reseed").created, 0);

        let names = list(&database, &me, HabitFilter::Active)
            .expect("list")
            .into_iter()
            .map(|habit| habit.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Gym", "Work"]);
    }

    #[test]
    fn archive_hides_from_active_listing() {
        let (_dir, database) = temp_database();
        let me = owner("me");
        let habit = create(&database, &me, NewHabit::named("Read")).expect("habit");

        set_archived(&database, &me, habit.id, true).expect("archive");
        assert!(list(&database, &me, HabitFilter::Active).expect("active").is_empty());
        assert_eq!(list(&database, &me, HabitFilter::Archived).expect("archived").len(), 1);
        assert_eq!(list(&database, &me, HabitFilter::All).expect("all").len(), 1);

        set_archived(&database, &me, habit.id, false).expect("unarchive");
        assert_eq!(list(&database, &me, HabitFilter::Active).expect("active").len(), 1);
    }

    #[test]
    fn delete_cascades_cards_but_keeps_logs() {
        let (_dir, mut database) = temp_database();
        let me = owner("me");
        let habit = create(&database, &me, NewHabit::named("Gym")).expect("habit");
        let day = calendar::parse_date("2024-05-06").expect("date");

        schedule::create(
            &mut database,
            &me,
            NewCard {
                habit_id: habit.id,
                day: 0,
                start_hour: 7,
                start_minute: 0,
                duration_minutes: None,
            },
        )
        .expect("card");
        logs::log(&database, &me, habit.id, Some(day), None).expect("log");

        assert_eq!(delete(&mut database, &me, habit.id).expect("delete"), 1);
        assert!(schedule::list(&database, &me, None).expect("cards").is_empty());
        assert_eq!(
            database
                .logs_for_owner_between(me.as_str(), day, day)
                .expect("logs")
                .len(),
            1
        );
        assert!(matches!(
            delete(&mut database, &me, habit.id),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn reorder_skips_foreign_ids() {
        let (_dir, mut database) = temp_database();
        let me = owner("me");
        let a = create(&database, &me, NewHabit::named("A")).expect("a");
        let b = create(&database, &me, NewHabit::named("B")).expect("b");
        let foreign = create(&database, &owner("other"), NewHabit::named("X")).expect("x");

        let updated = reorder(&mut database, &me, &[b.id, foreign.id, a.id]).expect("reorder");
        assert_eq!(updated, 2);

        let names = list(&database, &me, HabitFilter::Active)
            .expect("list")
            .into_iter()
            .map(|habit| habit.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn status_reports_completion_against_target() {
        let (_dir, database) = temp_database();
        let me = owner("me");
        let day = calendar::parse_date("2024-05-06").expect("date");
        let habit = create(
            &database,
            &me,
            NewHabit {
                target_count: 2,
                ..NewHabit::named("Water")
            },
        )
        .expect("habit");

        logs::log(&database, &me, habit.id, Some(day), None).expect("first");
        let status = with_status(&database, &me, day).expect("status");
        assert_eq!(status[0].today_count, 1);
        assert!(!status[0].completed);

        logs::log(&database, &me, habit.id, Some(day), None).expect("second");
        let status = with_status(&database, &me, day).expect("status");
        assert!(status[0].completed);

        logs::unlog(&database, &me, habit.id, Some(day), None).expect("unlog");
        let status = with_status(&database, &me, day).expect("status");
        assert_eq!(status[0].today_count, 1);
        assert!(!status[0].completed);
    }
}
