use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::{
    models::AttendanceStatus,
    virtual_verification::{WindowCheck, check_time_window},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArrivalError {
    #[error("check-in opens in {minutes_until_open} minute(s)")]
    TooEarly { minutes_until_open: i64 },
    #[error("the session has already ended")]
    SessionEnded,
}

/// campus_instant
///
/// Turns a campus wall-clock date and time into a UTC instant. `None` when the offset
/// is out of range.
pub fn campus_instant(date: NaiveDate, time: NaiveTime, utc_offset_minutes: i32) -> Option<DateTime<Utc>> {
    let offset = FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;
    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// Today's date on campus.
pub fn campus_today(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    match FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

/// classify_arrival
///
/// Inside the check-in window the lecturer is `present`. After the window but before
/// the session ends they are `late`. Outside both, the check-in is refused.
pub fn classify_arrival(
    now: DateTime<Utc>,
    scheduled_start: DateTime<Utc>,
    scheduled_end: DateTime<Utc>,
    window_minutes: i64,
) -> Result<AttendanceStatus, ArrivalError> {
    match check_time_window(now, scheduled_start, window_minutes) {
        WindowCheck::TooEarly { minutes_until_open } => Err(ArrivalError::TooEarly { minutes_until_open }),
        WindowCheck::OnTime => Ok(AttendanceStatus::Present),
        WindowCheck::Late { .. } if now < scheduled_end => Ok(AttendanceStatus::Late),
        WindowCheck::Late { .. } => Err(ArrivalError::SessionEnded),
    }
}
