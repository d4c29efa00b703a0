//! To-do items. A recurring task is a master record that stays active and rolls
//! its due date forward; every completion leaves a completed snapshot behind.

use crate::auth::Owner;
use crate::calendar;
use crate::db::Database;
use crate::error::{DomainError, DomainResult, UnknownVariant};
use crate::patch::double_option;
use anyhow::{Context, Result};
use chrono::{Days, Duration, Local, Months, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub const MIN_RETENTION_DAYS: u32 = 1;
pub const MAX_RETENTION_DAYS: u32 = 3650;
const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(TaskStatus::Active),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(UnknownVariant {
                kind: "task status",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        }
    }
}

impl FromStr for Recurrence {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            _ => Err(UnknownVariant {
                kind: "recurrence",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(UnknownVariant {
                kind: "priority",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFilter {
    #[default]
    Any,
    Recurring,
    OneOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskView {
    /// Everything still open.
    Active,
    /// Recurring masters due by the end of the anchor day.
    Routine,
    /// Open one-off tasks.
    Inbox,
    /// Completed and terminated tasks, most recent first.
    Past,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: i64,
    #[serde(skip)]
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub recurrence: Option<Recurrence>,
    pub due_date: Option<i64>,
    pub completed_at: Option<i64>,
    pub is_terminated: bool,
    pub created_at: i64,
    pub tags: Vec<String>,
    pub priority: Option<Priority>,
    pub master_task_id: Option<i64>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.status == TaskStatus::Active && !self.is_terminated
    }

    fn apply(mut self, patch: TaskPatch) -> Self {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(recurrence) = patch.recurrence {
            self.recurrence = recurrence;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = patch.tags {
            self.tags = clean_tags(tags);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl NewTask {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            recurrence: None,
            due_date: None,
            tags: Vec::new(),
            priority: None,
        }
    }
}

/// Partial update; `null` clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurrence: Option<Option<Recurrence>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<i64>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<Priority>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub task: Task,
    /// Present when a recurring master was completed.
    pub snapshot: Option<Task>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionSetting {
    pub retention_period_days: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub owners: usize,
    pub deleted: usize,
}

/// Rolls a due instant forward by one recurrence step in wall-clock time of `zone`.
/// Monthly steps clamp to the last day of a shorter month.
pub fn next_due<Tz: TimeZone>(recurrence: Recurrence, due_millis: i64, zone: &Tz) -> Result<i64> {
    let local = zone
        .timestamp_millis_opt(due_millis)
        .single()
        .with_context(|| format!("Invalid due timestamp: {due_millis}"))?
        .naive_local();

    let stepped = match recurrence {
        Recurrence::Daily => local.checked_add_days(Days::new(1)),
        Recurrence::Weekly => local.checked_add_days(Days::new(7)),
        Recurrence::Monthly => local.checked_add_months(Months::new(1)),
    }
    .with_context(|| format!("Due date overflow after {due_millis}"))?;

    resolve_local(zone, stepped)
}

fn resolve_local<Tz: TimeZone>(zone: &Tz, naive: NaiveDateTime) -> Result<i64> {
    // a wall-clock time skipped by a DST jump lands one hour later
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|instant| instant.timestamp_millis())
        .with_context(|| format!("Unrepresentable local time: {naive}"))
}

pub fn create(database: &Database, owner: &Owner, input: NewTask) -> DomainResult<Task> {
    let title = validate_title(&input.title)?;
    let mut task = Task {
        id: 0,
        owner_id: owner.as_str().to_string(),
        title,
        description: input.description,
        status: TaskStatus::Active,
        recurrence: input.recurrence,
        due_date: input.due_date,
        completed_at: None,
        is_terminated: false,
        created_at: calendar::now_millis(),
        tags: clean_tags(input.tags),
        priority: input.priority,
        master_task_id: None,
    };

    task.id = database.insert_task(&task)?;
    info!(task_id = task.id, owner = %owner, recurring = task.recurrence.is_some(), "task created");

    Ok(task)
}

pub fn get(database: &Database, owner: &Owner, id: i64) -> DomainResult<Task> {
    database
        .task(owner.as_str(), id)?
        .ok_or_else(|| DomainError::not_found("Task", id))
}

pub fn update(database: &Database, owner: &Owner, id: i64, patch: TaskPatch) -> DomainResult<Task> {
    let updated = get(database, owner, id)?.apply(patch);
    validate_title(&updated.title)?;

    database.update_task(&updated)?;
    info!(task_id = id, owner = %owner, "task updated");

    Ok(updated)
}

pub fn complete(database: &mut Database, owner: &Owner, id: i64) -> DomainResult<Completion> {
    let task = get(database, owner, id)?;
    ensure_open(&task)?;
    let now = calendar::now_millis();

    let Some(recurrence) = task.recurrence else {
        database.mark_task_completed(owner.as_str(), id, now, false)?;
        info!(task_id = id, owner = %owner, "task completed");
        return Ok(Completion {
            task: get(database, owner, id)?,
            snapshot: None,
        });
    };

    let next = next_due(recurrence, task.due_date.unwrap_or(now), &Local)?;
    let snapshot = Task {
        status: TaskStatus::Completed,
        recurrence: None,
        completed_at: Some(now),
        master_task_id: Some(task.id),
        ..task.clone()
    };
    let snapshot_id = database.record_recurring_completion(&snapshot, task.id, next)?;
    info!(task_id = id, snapshot_id, next_due = next, owner = %owner, "recurring task completed");

    Ok(Completion {
        task: Task {
            due_date: Some(next),
            ..task
        },
        snapshot: Some(Task {
            id: snapshot_id,
            ..snapshot
        }),
    })
}

/// Ends a task for good; a recurring master stops rolling forward.
pub fn terminate(database: &Database, owner: &Owner, id: i64) -> DomainResult<Task> {
    let task = get(database, owner, id)?;
    ensure_open(&task)?;

    database.mark_task_completed(owner.as_str(), id, calendar::now_millis(), true)?;
    info!(task_id = id, owner = %owner, "task terminated");

    get(database, owner, id)
}

pub fn delete(database: &Database, owner: &Owner, id: i64) -> DomainResult<()> {
    if database.delete_task(owner.as_str(), id)? == 0 {
        return Err(DomainError::not_found("Task", id));
    }

    info!(task_id = id, owner = %owner, "task deleted");
    Ok(())
}

pub fn list(
    database: &Database,
    owner: &Owner,
    view: TaskView,
    anchor: NaiveDate,
) -> DomainResult<Vec<Task>> {
    let tasks = match view {
        TaskView::Active => open_tasks(database, owner)?,
        TaskView::Inbox => open_tasks(database, owner)?
            .into_iter()
            .filter(|task| task.recurrence.is_none())
            .collect(),
        TaskView::Routine => {
            let end_of_day = calendar::end_of_day_millis(anchor)?;
            open_tasks(database, owner)?
                .into_iter()
                .filter(|task| {
                    task.recurrence.is_some()
                        && task.due_date.is_none_or(|due| due <= end_of_day)
                })
                .collect()
        }
        TaskView::Past => {
            let mut done = database.tasks_with_status(owner.as_str(), TaskStatus::Completed)?;
            done.sort_by(|left, right| right.completed_at.cmp(&left.completed_at));
            done
        }
    };

    Ok(tasks)
}

pub fn list_by_status(
    database: &Database,
    owner: &Owner,
    status: TaskStatus,
    filter: RecurrenceFilter,
) -> DomainResult<Vec<Task>> {
    let tasks = database.tasks_with_status(owner.as_str(), status)?;
    Ok(tasks
        .into_iter()
        .filter(|task| match filter {
            RecurrenceFilter::Any => true,
            RecurrenceFilter::Recurring => task.recurrence.is_some(),
            RecurrenceFilter::OneOff => task.recurrence.is_none(),
        })
        .collect())
}

pub fn retention_period(
    database: &Database,
    owner: &Owner,
    fallback_days: u32,
) -> DomainResult<RetentionSetting> {
    Ok(RetentionSetting {
        retention_period_days: database
            .retention_days(owner.as_str())?
            .unwrap_or(fallback_days),
    })
}

pub fn set_retention_period(
    database: &Database,
    owner: &Owner,
    days: u32,
) -> DomainResult<RetentionSetting> {
    if !(MIN_RETENTION_DAYS..=MAX_RETENTION_DAYS).contains(&days) {
        return Err(DomainError::Validation(format!(
            "retention period must be between {MIN_RETENTION_DAYS} and {MAX_RETENTION_DAYS} days"
        )));
    }

    database.set_retention_days(owner.as_str(), days)?;
    info!(owner = %owner, days, "task retention updated");

    Ok(RetentionSetting {
        retention_period_days: days,
    })
}

/// Deletes the owner's completed tasks older than their retention period.
pub fn cleanup_old(
    database: &Database,
    owner: &Owner,
    now_millis: i64,
    fallback_days: u32,
) -> DomainResult<usize> {
    let days = retention_period(database, owner, fallback_days)?.retention_period_days;
    let deleted = purge(database, owner.as_str(), days, now_millis)?;

    info!(owner = %owner, days, deleted, "completed tasks purged");
    Ok(deleted)
}

/// Applies every owner's retention period.
pub fn cleanup_all(database: &Database, now_millis: i64, fallback_days: u32) -> Result<CleanupReport> {
    let owners = database.owners_with_completed_tasks()?;

    let deleted = owners.iter().try_fold(0_usize, |acc, (owner_id, days)| {
        purge(database, owner_id, days.unwrap_or(fallback_days), now_millis).map(|count| acc + count)
    })?;

    let report = CleanupReport {
        owners: owners.len(),
        deleted,
    };
    info!(owners = report.owners, deleted = report.deleted, "task cleanup finished");

    Ok(report)
}

fn purge(database: &Database, owner_id: &str, days: u32, now_millis: i64) -> Result<usize> {
    let cutoff = now_millis - i64::from(days) * MILLIS_PER_DAY;
    database.delete_completed_tasks_before(owner_id, cutoff)
}

fn open_tasks(database: &Database, owner: &Owner) -> DomainResult<Vec<Task>> {
    Ok(database
        .tasks_with_status(owner.as_str(), TaskStatus::Active)?
        .into_iter()
        .filter(Task::is_open)
        .collect())
}

fn ensure_open(task: &Task) -> DomainResult<()> {
    if task.is_terminated {
        return Err(DomainError::Conflict(format!(
            "Task {} has been terminated",
            task.id
        )));
    }
    if task.status == TaskStatus::Completed {
        return Err(DomainError::Conflict(format!(
            "Task {} is already completed",
            task.id
        )));
    }
    Ok(())
}

fn validate_title(title: &str) -> DomainResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}
