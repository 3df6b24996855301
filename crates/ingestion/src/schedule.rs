//! Which forecast runs and which in-situ windows still need fetching.
//!
//! CAMS publishes two runs a day (00 and 12 UTC). The 00 run becomes
//! available around 10 UTC and the 12 run around 22 UTC, which is what
//! [`align_base_time`] encodes.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike, Utc};

use crate::error::{IngestionError, Result};

/// Hours between two forecast runs.
pub const FORECAST_INTERVAL_HOURS: i64 = 12;

/// Hour (UTC) after which the 00 run of the same day is published.
const MORNING_RUN_PUBLISHED_HOUR: u32 = 10;

/// Hour (UTC) after which the 12 run of the same day is published.
const EVENING_RUN_PUBLISHED_HOUR: u32 = 22;

fn at_hour(date: chrono::NaiveDate, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(time))
}

/// Latest forecast run that is published as of `now` and does not start
/// after `requested`.
///
/// A requested time in the future is rejected.
pub fn align_base_time(requested: DateTime<Utc>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if requested > now {
        return Err(IngestionError::Schedule(format!(
            "requested time {} is in the future (now {})",
            requested, now
        )));
    }

    let today = now.date_naive();
    let date = requested.date_naive();

    let aligned = if date == today {
        if now.hour() < MORNING_RUN_PUBLISHED_HOUR {
            at_hour(today - Duration::days(1), 12)
        } else if requested.hour() >= 12 && now.hour() >= EVENING_RUN_PUBLISHED_HOUR {
            at_hour(today, 12)
        } else {
            at_hour(today, 0)
        }
    } else if requested.hour() < 12 {
        at_hour(date, 0)
    } else {
        at_hour(date, 12)
    };

    Ok(aligned)
}

/// Forecast base times within the lookback window that are not stored yet,
/// oldest first.
pub fn plan_forecast_runs(
    now: DateTime<Utc>,
    lookback_days: u32,
    stored: &[DateTime<Utc>],
) -> Result<Vec<DateTime<Utc>>> {
    let latest = align_base_time(now, now)?;
    let earliest = now - Duration::days(lookback_days as i64);
    let stored: BTreeSet<DateTime<Utc>> = stored.iter().copied().collect();

    let mut planned = Vec::new();
    let mut slot = latest;
    while slot >= earliest {
        if !stored.contains(&slot) {
            planned.push(slot);
        }
        slot -= Duration::hours(FORECAST_INTERVAL_HOURS);
    }
    planned.reverse();
    Ok(planned)
}

/// Window `(point - 24h, point]` covered by one in-situ fetch.
pub fn fetch_window(point: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (point - Duration::hours(24), point)
}

/// In-situ fetch points for the lookback window.
///
/// Each past day ending at `now - k * 24h` is fetched again if any of its
/// 24 hourly slots has no stored measurement. `now` is always fetched.
pub fn plan_in_situ_fetches(
    now: DateTime<Utc>,
    lookback_days: u32,
    stored: &[DateTime<Utc>],
) -> Vec<DateTime<Utc>> {
    let stored: BTreeSet<DateTime<Utc>> = stored.iter().copied().collect();
    let mut points = Vec::new();

    for k in (1..=lookback_days as i64).rev() {
        let boundary = now - Duration::hours(24 * k);
        let incomplete = (0..24).any(|j| {
            let slot_end = boundary - Duration::hours(j);
            let slot_start = slot_end - Duration::hours(1);
            // (slot_start, slot_end]
            stored
                .range(slot_start..=slot_end)
                .all(|&t| t == slot_start)
        });
        if incomplete {
            points.push(boundary);
        }
    }

    points.push(now);
    points
}
