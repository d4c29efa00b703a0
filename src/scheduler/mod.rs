//! Daily housekeeping loop. The run time is re-read from config on every poll so
//! `config set cleanup_time` takes effect without a restart.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime, TimeZone};
use std::future::Future;
use tokio::time::{Duration, sleep};
use tracing::{error, info};

const RESCHEDULE_POLL_SECONDS: u64 = 30;

pub async fn run_daily_job<S, F, Fut>(mut time_provider: S, mut job: F) -> Result<()>
where
    S: FnMut() -> Result<NaiveTime>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut announced = None;

    loop {
        let target = match time_provider() {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, "failed to load cleanup time");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        let delay = match delay_until_next_run(target) {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, time = %target, "failed to schedule cleanup");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        if announced != Some(target) {
            info!(seconds = delay.as_secs(), time = %target.format("%H:%M"), "next cleanup scheduled");
            announced = Some(target);
        }

        if delay > Duration::from_secs(RESCHEDULE_POLL_SECONDS) {
            sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
            continue;
        }

        sleep(delay).await;

        if let Err(error) = job().await {
            error!(error = %error, "scheduled cleanup failed");
        }

        sleep(Duration::from_secs(1)).await;
    }
}

/// Time left until the next local occurrence of `target`.
pub fn delay_until_next_run(target: NaiveTime) -> Result<Duration> {
    let now = Local::now();
    let next_run = next_run_after(&Local, target, now)?;

    (next_run - now)
        .to_std()
        .context("Failed to compute next execution delay")
}

/// First instant strictly after `now` whose wall-clock time in `zone` is `target`.
/// A day on which `target` does not exist (DST gap) is skipped.
pub fn next_run_after<Tz: TimeZone>(
    zone: &Tz,
    target: NaiveTime,
    now: DateTime<Tz>,
) -> Result<DateTime<Tz>> {
    let today = now.date_naive();

    (0..=2)
        .filter_map(|offset| {
            let day = today + ChronoDuration::days(offset);
            zone.from_local_datetime(&day.and_time(target)).earliest()
        })
        .find(|candidate| *candidate > now)
        .context("Failed to convert schedule time")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_hhmm;
    use chrono::Utc;

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn time(raw: &str) -> NaiveTime {
        parse_hhmm(raw).expect("time")
    }

    #[test]
    fn next_run_is_later_today_or_tomorrow() {
        let morning = utc("2024-01-10T02:00:00Z");
        assert_eq!(
            next_run_after(&Utc, time("03:30"), morning).expect("today"),
            utc("2024-01-10T03:30:00Z")
        );

        let exactly = utc("2024-01-10T03:30:00Z");
        assert_eq!(
            next_run_after(&Utc, time("03:30"), exactly).expect("tomorrow"),
            utc("2024-01-11T03:30:00Z")
        );
    }

    #[test]
    fn delay_is_within_a_day() {
        let delay = delay_until_next_run(time("03:30")).expect("delay computed");
        assert!(delay.as_secs() <= 25 * 60 * 60);
    }
}
