//! Weekly timetable: cards placing a habit on a Monday-first 7-day grid that
//! runs from 06:00 to 24:00 in 30-minute slots.

use crate::auth::Owner;
use crate::db::Database;
use crate::error::{DomainError, DomainResult};
use crate::habits;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const GRID_START_HOUR: u8 = 6;
pub const GRID_END_HOUR: u8 = 24;
pub const MIN_DURATION_MINUTES: u32 = 30;
pub const MAX_DURATION_MINUTES: u32 = 720;
pub const DAY_LABELS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Id carried by a card that has not been stored yet.
pub const UNSAVED_CARD_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleCard {
    pub id: i64,
    pub habit_id: i64,
    pub day: u8,
    pub start_hour: u8,
    pub start_minute: u8,
    pub duration_minutes: u32,
}

impl ScheduleCard {
    pub fn start_minutes(&self) -> u32 {
        u32::from(self.start_hour) * 60 + u32::from(self.start_minute)
    }

    /// End of the half-open interval. May pass midnight; it is not wrapped.
    pub fn end_minutes(&self) -> u32 {
        self.start_minutes() + clamp_duration(self.duration_minutes)
    }

    fn describe(&self) -> String {
        let end = card_end_time(self);
        format!(
            "{} {}-{} ({})",
            DAY_LABELS.get(usize::from(self.day)).copied().unwrap_or("?"),
            format_time(u32::from(self.start_hour), u32::from(self.start_minute)),
            format_time(end.hour, end.minute),
            format_duration(clamp_duration(self.duration_minutes))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCard {
    pub habit_id: i64,
    pub day: u8,
    pub start_hour: u8,
    pub start_minute: u8,
    /// Falls back to the habit's default duration.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardPatch {
    #[serde(default)]
    pub day: Option<u8>,
    #[serde(default)]
    pub start_hour: Option<u8>,
    #[serde(default)]
    pub start_minute: Option<u8>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkCardPatch {
    pub id: i64,
    #[serde(flatten)]
    pub patch: CardPatch,
}

pub fn clamp_duration(minutes: u32) -> u32 {
    minutes.clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES)
}

pub fn snap_minute(minute: u8) -> u8 {
    if minute >= 30 { 30 } else { 0 }
}

/// Wall-clock end of a card as stored.
pub fn card_end_time(card: &ScheduleCard) -> ClockTime {
    let end = card.start_minutes() + card.duration_minutes;
    ClockTime {
        hour: end / 60,
        minute: end % 60,
    }
}

/// Same day, different cards, intersecting `[start, end)` intervals.
pub fn cards_overlap(left: &ScheduleCard, right: &ScheduleCard) -> bool {
    if left.day != right.day || left.id == right.id {
        return false;
    }

    left.start_minutes() < right.end_minutes() && right.start_minutes() < left.end_minutes()
}

pub fn format_time(hour: u32, minute: u32) -> String {
    if hour % 24 == 0 && hour > 0 {
        return format!("12:{minute:02} AM");
    }
    let period = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        other => other,
    };
    format!("{display_hour}:{minute:02} {period}")
}

pub fn format_duration(minutes: u32) -> String {
    let (hours, mins) = (minutes / 60, minutes % 60);
    match (hours, mins) {
        (0, _) => format!("{mins}m"),
        (_, 0) => format!("{hours}h"),
        _ => format!("{hours}h {mins}m"),
    }
}

pub fn list(database: &Database, owner: &Owner, day: Option<u8>) -> DomainResult<Vec<ScheduleCard>> {
    let cards = database.schedule_cards(owner.as_str())?;
    Ok(match day {
        Some(day) => cards.into_iter().filter(|card| card.day == day).collect(),
        None => cards,
    })
}

pub fn create(database: &mut Database, owner: &Owner, input: NewCard) -> DomainResult<ScheduleCard> {
    let habit = habits::get(database, owner, input.habit_id)?;
    let candidate = normalized(ScheduleCard {
        id: UNSAVED_CARD_ID,
        habit_id: habit.id,
        day: input.day,
        start_hour: input.start_hour,
        start_minute: input.start_minute,
        duration_minutes: input
            .duration_minutes
            .unwrap_or(habit.default_duration_minutes),
    })?;

    let written = database.write_cards_atomically(owner.as_str(), |existing| {
        ensure_free(std::slice::from_ref(&candidate), existing)?;
        Ok(vec![candidate.clone()])
    });
    let card = single(log_rejection(owner, written)?)?;
    info!(card_id = card.id, habit_id = card.habit_id, owner = %owner, "schedule card created");

    Ok(card)
}

pub fn update(
    database: &mut Database,
    owner: &Owner,
    id: i64,
    patch: CardPatch,
) -> DomainResult<ScheduleCard> {
    let written = database.write_cards_atomically(owner.as_str(), |existing| {
        let current = existing
            .iter()
            .find(|card| card.id == id)
            .ok_or_else(|| DomainError::not_found("ScheduleCard", id))?;
        let moved = normalized(apply_patch(current.clone(), &patch))?;

        ensure_free(std::slice::from_ref(&moved), existing)?;
        Ok(vec![moved])
    });
    let card = single(log_rejection(owner, written)?)?;
    info!(card_id = card.id, owner = %owner, "schedule card updated");

    Ok(card)
}

/// Copies a card to another day at the same time. Rejected when the habit already
/// has a card at that day and time, or when the copy would overlap anything.
pub fn duplicate_to_day(
    database: &mut Database,
    owner: &Owner,
    id: i64,
    target_day: u8,
) -> DomainResult<ScheduleCard> {
    let written = database.write_cards_atomically(owner.as_str(), |existing| {
        let source = existing
            .iter()
            .find(|card| card.id == id)
            .ok_or_else(|| DomainError::not_found("ScheduleCard", id))?;
        let copy = normalized(ScheduleCard {
            id: UNSAVED_CARD_ID,
            day: target_day,
            ..source.clone()
        })?;

        let duplicate = existing.iter().any(|card| {
            card.habit_id == copy.habit_id
                && card.day == copy.day
                && card.start_hour == copy.start_hour
                && card.start_minute == copy.start_minute
        });
        if duplicate {
            return Err(DomainError::Conflict(
                "Schedule card already exists for this day and time".to_string(),
            ));
        }

        ensure_free(std::slice::from_ref(&copy), existing)?;
        Ok(vec![copy])
    });
    let card = single(log_rejection(owner, written)?)?;
    info!(source_id = id, card_id = card.id, target_day, owner = %owner, "schedule card duplicated");

    Ok(card)
}

/// Applies several moves at once. Cards the owner does not hold are skipped; the
/// resulting layout is written whole or not at all.
pub fn bulk_update(
    database: &mut Database,
    owner: &Owner,
    patches: &[BulkCardPatch],
) -> DomainResult<Vec<ScheduleCard>> {
    let written = database.write_cards_atomically(owner.as_str(), |existing| {
        let moved = patches
            .iter()
            .filter_map(|entry| {
                existing
                    .iter()
                    .find(|card| card.id == entry.id)
                    .map(|card| normalized(apply_patch(card.clone(), &entry.patch)))
            })
            .collect::<DomainResult<Vec<_>>>()?;

        ensure_free(&moved, existing)?;
        Ok(moved)
    });
    let cards = log_rejection(owner, written)?;
    info!(owner = %owner, updated = cards.len(), "schedule cards bulk updated");

    Ok(cards)
}

pub fn delete(database: &Database, owner: &Owner, id: i64) -> DomainResult<()> {
    if database.delete_schedule_card(owner.as_str(), id)? == 0 {
        return Err(DomainError::not_found("ScheduleCard", id));
    }

    info!(card_id = id, owner = %owner, "schedule card deleted");
    Ok(())
}

pub fn delete_all_for_habit(database: &Database, owner: &Owner, habit_id: i64) -> DomainResult<usize> {
    let deleted = database.delete_schedule_cards_for_habit(owner.as_str(), habit_id)?;
    info!(habit_id, owner = %owner, deleted, "schedule cards of habit deleted");

    Ok(deleted)
}

fn apply_patch(mut card: ScheduleCard, patch: &CardPatch) -> ScheduleCard {
    if let Some(day) = patch.day {
        card.day = day;
    }
    if let Some(hour) = patch.start_hour {
        card.start_hour = hour;
    }
    if let Some(minute) = patch.start_minute {
        card.start_minute = minute;
    }
    if let Some(duration) = patch.duration_minutes {
        card.duration_minutes = duration;
    }
    card
}

/// Validates grid bounds, snaps the minute to its slot and clamps the duration.
fn normalized(card: ScheduleCard) -> DomainResult<ScheduleCard> {
    if card.day > 6 {
        return Err(DomainError::Validation(
            "day must be between 0 (Monday) and 6 (Sunday)".to_string(),
        ));
    }
    if !(GRID_START_HOUR..GRID_END_HOUR).contains(&card.start_hour) {
        return Err(DomainError::Validation(format!(
            "start_hour must be between {GRID_START_HOUR} and {}",
            GRID_END_HOUR - 1
        )));
    }
    if card.start_minute >= 60 {
        return Err(DomainError::Validation(
            "start_minute must be below 60".to_string(),
        ));
    }

    Ok(ScheduleCard {
        start_minute: snap_minute(card.start_minute),
        duration_minutes: clamp_duration(card.duration_minutes),
        ..card
    })
}

/// Checks each changed card against the layout the write would produce.
fn ensure_free(changed: &[ScheduleCard], existing: &[ScheduleCard]) -> DomainResult<()> {
    let untouched = existing
        .iter()
        .filter(|card| !changed.iter().any(|moved| moved.id == card.id));
    let layout = untouched.chain(changed.iter()).collect::<Vec<_>>();

    changed
        .iter()
        .find_map(|card| {
            layout
                .iter()
                // unsaved cards share an id, so compare addresses instead
                .filter(|other| !std::ptr::eq(**other, card))
                .find(|other| cards_overlap(card, other))
                .map(|other| (card, *other))
        })
        .map_or(Ok(()), |(card, other)| {
            Err(DomainError::Conflict(format!(
                "Card at {} overlaps card {} at {}",
                card.describe(),
                other.id,
                other.describe()
            )))
        })
}

fn single(cards: Vec<ScheduleCard>) -> DomainResult<ScheduleCard> {
    cards
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::Internal(anyhow::anyhow!("card write returned no rows")))
}

fn log_rejection<T>(owner: &Owner, result: DomainResult<T>) -> DomainResult<T> {
    if let Err(DomainError::Conflict(reason)) = &result {
        warn!(owner = %owner, reason = %reason, "schedule write rejected");
    }
    result
}
