use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use url::Url;
use utoipa::ToSchema;

/// WindowCheck
///
/// Where a moment falls relative to the check-in window around a scheduled start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum WindowCheck {
    TooEarly { minutes_until_open: i64 },
    OnTime,
    Late { minutes_after_start: i64 },
}

/// check_time_window
///
/// `OnTime` covers `[start - window, start + window]`, both edges inclusive.
pub fn check_time_window(now: DateTime<Utc>, scheduled_start: DateTime<Utc>, window_minutes: i64) -> WindowCheck {
    let window = Duration::minutes(window_minutes);
    let opens = scheduled_start - window;
    let closes = scheduled_start + window;

    if now < opens {
        // Round up so "30 seconds early" reports one minute rather than zero.
        let seconds = (opens - now).num_seconds();
        WindowCheck::TooEarly {
            minutes_until_open: (seconds + 59) / 60,
        }
    } else if now <= closes {
        WindowCheck::OnTime
    } else {
        WindowCheck::Late {
            minutes_after_start: (now - scheduled_start).num_minutes(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeetingUrlError {
    #[error("meeting link is not a valid URL")]
    Malformed,
    #[error("meeting link must use https")]
    InsecureScheme,
    #[error("meeting link has no host")]
    MissingHost,
    #[error("meeting host {0} is not an approved conferencing provider")]
    HostNotAllowed(String),
}

/// validate_meeting_url
///
/// Accepts an https URL whose host is an allowed provider or a subdomain of one
/// (`ucc.zoom.us` matches `zoom.us`). Returns the lower-cased host.
pub fn validate_meeting_url(raw: &str, allowed_hosts: &[String]) -> Result<String, MeetingUrlError> {
    let parsed = Url::parse(raw.trim()).map_err(|_| MeetingUrlError::Malformed)?;

    if parsed.scheme() != "https" {
        return Err(MeetingUrlError::InsecureScheme);
    }

    let host = parsed
        .host_str()
        .ok_or(MeetingUrlError::MissingHost)?
        .to_ascii_lowercase();

    let allowed = allowed_hosts.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    });

    if allowed {
        Ok(host)
    } else {
        Err(MeetingUrlError::HostNotAllowed(host))
    }
}

/// DurationCheck
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DurationCheck {
    pub ratio: f64,
    pub meets_threshold: bool,
}

/// check_duration
///
/// Compares how long a virtual lecture actually ran with its scheduled length.
pub fn check_duration(actual_minutes: i32, scheduled_minutes: i64, min_ratio: f64) -> DurationCheck {
    if scheduled_minutes <= 0 {
        return DurationCheck {
            ratio: 0.0,
            meets_threshold: false,
        };
    }

    let ratio = f64::from(actual_minutes.max(0)) / scheduled_minutes as f64;
    DurationCheck {
        ratio,
        meets_threshold: ratio >= min_ratio,
    }
}
