use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{AttendanceStatus, CourseSchedule, RecordVerificationStatus, SessionMode};

/// AttendanceReportRow
///
/// One attendance record joined with the names the reports and exports print.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AttendanceReportRow {
    pub attendance_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub session_date: NaiveDate,
    pub course_id: Uuid,
    pub course_code: String,
    pub course_title: String,
    pub class_group_id: Uuid,
    pub class_group_name: String,
    pub lecturer_id: Uuid,
    pub lecturer_name: String,
    pub session_mode: SessionMode,
    pub status: AttendanceStatus,
    pub verification_status: RecordVerificationStatus,
    pub distance_meters: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AttendanceSummary {
    pub total_sessions: i64,
    pub present: i64,
    pub late: i64,
    pub physical: i64,
    pub virtual_sessions: i64,
    pub verified: i64,
    pub pending: i64,
    pub disputed: i64,
    pub rejected: i64,
    /// verified / total.
    pub verification_rate: f64,
    /// present / total.
    pub punctuality_rate: f64,
}

/// LecturerStat
///
/// Delivery against the timetable for one lecturer over a reporting period.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct LecturerStat {
    pub lecturer_id: Uuid,
    pub lecturer_name: String,
    pub expected_sessions: i64,
    pub delivered_sessions: i64,
    pub late_sessions: i64,
    pub verified_sessions: i64,
    pub disputed_sessions: i64,
    /// delivered / expected, capped at 1.0.
    pub compliance_rate: f64,
    pub punctuality_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct CourseStat {
    pub course_id: Uuid,
    pub course_code: String,
    pub course_title: String,
    pub sessions: i64,
    pub late: i64,
    pub verified: i64,
    pub disputed: i64,
    pub verification_rate: f64,
}

/// TrendPoint
///
/// Activity in the ISO week starting on `week_start` (a Monday).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct TrendPoint {
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub week_start: NaiveDate,
    pub sessions: i64,
    pub late: i64,
    pub verified: i64,
    pub disputed: i64,
}

/// ReportPeriod
///
/// Inclusive date range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReportPeriod {
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub from: NaiveDate,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub to: NaiveDate,
}

/// Days covered by a period when the caller gives no start date.
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// Calendar years a report may cover.
pub const REPORT_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

impl ReportPeriod {
    /// Fills missing bounds: `to` defaults to `today`, `from` to 30 days before `to`
    /// (clamped to the earliest representable date). Reversed bounds are swapped.
    pub fn resolve(from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> Self {
        let to = to.unwrap_or(today);
        let from = from.unwrap_or_else(|| {
            to.checked_sub_signed(Duration::days(DEFAULT_PERIOD_DAYS - 1))
                .unwrap_or(NaiveDate::MIN)
        });
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    /// Whether both bounds fall inside `REPORT_YEARS`.
    pub fn is_supported(&self) -> bool {
        REPORT_YEARS.contains(&self.from.year()) && REPORT_YEARS.contains(&self.to.year())
    }
}

fn rate(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn summarize(rows: &[AttendanceReportRow]) -> AttendanceSummary {
    let mut summary = AttendanceSummary::default();

    for row in rows {
        summary.total_sessions += 1;
        match row.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Late => summary.late += 1,
        }
        match row.session_mode {
            SessionMode::Physical => summary.physical += 1,
            SessionMode::Virtual => summary.virtual_sessions += 1,
        }
        match row.verification_status {
            RecordVerificationStatus::Verified => summary.verified += 1,
            RecordVerificationStatus::Pending => summary.pending += 1,
            RecordVerificationStatus::Disputed => summary.disputed += 1,
            RecordVerificationStatus::Rejected => summary.rejected += 1,
        }
    }

    summary.verification_rate = rate(summary.verified, summary.total_sessions);
    summary.punctuality_rate = rate(summary.present, summary.total_sessions);
    summary
}

/// count_weekday_occurrences
///
/// How many dates in `[from, to]` fall on ISO weekday `day_of_week` (1 = Monday).
pub fn count_weekday_occurrences(day_of_week: i16, from: NaiveDate, to: NaiveDate) -> i64 {
    if from > to || !(1..=7).contains(&day_of_week) {
        return 0;
    }

    let start_day = i64::from(from.weekday().number_from_monday());
    let offset = (i64::from(day_of_week) - start_day).rem_euclid(7);
    let Some(first) = from.checked_add_signed(Duration::days(offset)) else {
        return 0;
    };
    if first > to {
        return 0;
    }

    (to - first).num_days() / 7 + 1
}

/// by_lecturer
///
/// Expected sessions come from each lecturer's active schedules; delivered sessions
/// from the rows. Rejected records do not count as delivered. Lecturers appear if
/// they have either.
pub fn by_lecturer(
    rows: &[AttendanceReportRow],
    schedules: &[CourseSchedule],
    names: &HashMap<Uuid, String>,
    period: ReportPeriod,
) -> Vec<LecturerStat> {
    let mut stats: HashMap<Uuid, LecturerStat> = HashMap::new();

    for schedule in schedules.iter().filter(|s| s.is_active) {
        let stat = lecturer_entry(&mut stats, schedule.lecturer_id);
        stat.expected_sessions += count_weekday_occurrences(schedule.day_of_week, period.from, period.to);
    }

    for row in rows {
        let stat = lecturer_entry(&mut stats, row.lecturer_id);
        if stat.lecturer_name.is_empty() {
            stat.lecturer_name = row.lecturer_name.clone();
        }
        if row.verification_status == RecordVerificationStatus::Rejected {
            continue;
        }
        stat.delivered_sessions += 1;
        if row.status == AttendanceStatus::Late {
            stat.late_sessions += 1;
        }
        match row.verification_status {
            RecordVerificationStatus::Verified => stat.verified_sessions += 1,
            RecordVerificationStatus::Disputed => stat.disputed_sessions += 1,
            _ => {}
        }
    }

    let mut out: Vec<LecturerStat> = stats
        .into_values()
        .map(|mut stat| {
            if let Some(name) = names.get(&stat.lecturer_id) {
                stat.lecturer_name = name.clone();
            }
            if stat.lecturer_name.is_empty() {
                stat.lecturer_name = "Unknown lecturer".to_string();
            }
            stat.compliance_rate = rate(stat.delivered_sessions, stat.expected_sessions).min(1.0);
            stat.punctuality_rate = rate(
                stat.delivered_sessions - stat.late_sessions,
                stat.delivered_sessions,
            );
            stat
        })
        .collect();

    out.sort_by(|a, b| {
        a.lecturer_name
            .cmp(&b.lecturer_name)
            .then(a.lecturer_id.cmp(&b.lecturer_id))
    });
    out
}

fn lecturer_entry(stats: &mut HashMap<Uuid, LecturerStat>, id: Uuid) -> &mut LecturerStat {
    stats.entry(id).or_insert_with(|| LecturerStat {
        lecturer_id: id,
        ..LecturerStat::default()
    })
}

pub fn by_course(rows: &[AttendanceReportRow]) -> Vec<CourseStat> {
    let mut stats: HashMap<Uuid, CourseStat> = HashMap::new();

    for row in rows {
        let stat = stats.entry(row.course_id).or_insert_with(|| CourseStat {
            course_id: row.course_id,
            course_code: row.course_code.clone(),
            course_title: row.course_title.clone(),
            ..CourseStat::default()
        });
        stat.sessions += 1;
        if row.status == AttendanceStatus::Late {
            stat.late += 1;
        }
        match row.verification_status {
            RecordVerificationStatus::Verified => stat.verified += 1,
            RecordVerificationStatus::Disputed => stat.disputed += 1,
            _ => {}
        }
    }

    let mut out: Vec<CourseStat> = stats
        .into_values()
        .map(|mut stat| {
            stat.verification_rate = rate(stat.verified, stat.sessions);
            stat
        })
        .collect();
    out.sort_by(|a, b| a.course_code.cmp(&b.course_code));
    out
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_signed(Duration::days(i64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(NaiveDate::MIN)
}

pub fn weekly_trend(rows: &[AttendanceReportRow]) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, TrendPoint> = BTreeMap::new();

    for row in rows {
        let week = week_start(row.session_date);
        let point = buckets.entry(week).or_insert_with(|| TrendPoint {
            week_start: week,
            ..TrendPoint::default()
        });
        point.sessions += 1;
        if row.status == AttendanceStatus::Late {
            point.late += 1;
        }
        match row.verification_status {
            RecordVerificationStatus::Verified => point.verified += 1,
            RecordVerificationStatus::Disputed => point.disputed += 1,
            _ => {}
        }
    }

    buckets.into_values().collect()
}
