use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, TimeZone, Utc, Weekday};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-02-18"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn monday_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Converts the platform's Sunday-first weekday into the grid's Monday-first day index.
pub fn grid_day(weekday: Weekday) -> u8 {
    let native = weekday.num_days_from_sunday() as u8;
    if native == 0 { 6 } else { native - 1 }
}

/// `count` days ending at `anchor`, oldest first.
pub fn days_ending_at(anchor: NaiveDate, count: u32) -> impl Iterator<Item = NaiveDate> {
    (0..i64::from(count))
        .rev()
        .map(move |offset| anchor - Duration::days(offset))
}

/// `count` days starting at `anchor` and walking into the past, newest first.
pub fn days_back_from(anchor: NaiveDate, count: u32) -> impl Iterator<Item = NaiveDate> {
    (0..i64::from(count)).map(move |offset| anchor - Duration::days(offset))
}

pub fn end_of_day_millis(date: NaiveDate) -> Result<i64> {
    let next = (date + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .context("Failed to build end-of-day timestamp")?;

    let millis = Local
        .from_local_datetime(&next)
        .earliest()
        .context("Failed to convert end-of-day timestamp to local time")?
        .timestamp_millis();

    Ok(millis - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).expect("valid date")
    }

    #[test]
    fn monday_anchoring_handles_sunday() {
        assert_eq!(monday_of_week(date("2024-01-07")), date("2024-01-01"));
        assert_eq!(monday_of_week(date("2024-01-01")), date("2024-01-01"));
        assert_eq!(monday_of_week(date("2024-01-03")), date("2024-01-01"));
    }

    #[test]
    fn grid_day_is_monday_first() {
        assert_eq!(grid_day(Weekday::Mon), 0);
        assert_eq!(grid_day(Weekday::Sat), 5);
        assert_eq!(grid_day(Weekday::Sun), 6);
    }

    #[test]
    fn day_ranges_have_expected_order() {
        let forward = days_ending_at(date("2024-03-01"), 3).collect::<Vec<_>>();
        assert_eq!(
            forward,
            vec![date("2024-02-28"), date("2024-02-29"), date("2024-03-01")]
        );

        let backward = days_back_from(date("2024-03-01"), 2).collect::<Vec<_>>();
        assert_eq!(backward, vec![date("2024-03-01"), date("2024-02-29")]);
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("01/02/2024").is_err());
        assert_eq!(format_date(date(" 2024-02-03 ")), "2024-02-03");
    }
}
