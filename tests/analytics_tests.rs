use std::collections::HashMap;

use attendance_portal::{
    analytics::{
        AttendanceReportRow, DEFAULT_PERIOD_DAYS, ReportPeriod, by_course, by_lecturer,
        count_weekday_occurrences, summarize, week_start, weekly_trend,
    },
    models::{AttendanceStatus, CourseSchedule, RecordVerificationStatus, SessionMode},
};
use chrono::{Duration, NaiveDate, NaiveTime};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(
    lecturer_id: Uuid,
    course: (Uuid, &str),
    session_date: NaiveDate,
    status: AttendanceStatus,
    verification_status: RecordVerificationStatus,
) -> AttendanceReportRow {
    AttendanceReportRow {
        attendance_id: Uuid::new_v4(),
        session_date,
        course_id: course.0,
        course_code: course.1.to_string(),
        course_title: format!("{} title", course.1),
        class_group_id: Uuid::new_v4(),
        class_group_name: "Year 2 A".to_string(),
        lecturer_id,
        lecturer_name: "Dr. Mensah".to_string(),
        session_mode: SessionMode::Physical,
        status,
        verification_status,
        distance_meters: Some(42.0),
    }
}

fn weekly_slot(lecturer_id: Uuid, day_of_week: i16) -> CourseSchedule {
    CourseSchedule {
        id: Uuid::new_v4(),
        lecturer_id,
        day_of_week,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        is_active: true,
        ..CourseSchedule::default()
    }
}

#[test]
fn test_summarize_empty_rows_has_zero_rates() {
    let summary = summarize(&[]);
    assert_eq!(summary.total_sessions, 0);
    assert_eq!(summary.verification_rate, 0.0);
    assert_eq!(summary.punctuality_rate, 0.0);
}

#[test]
fn test_summarize_counts_and_rates() {
    let lecturer = Uuid::new_v4();
    let course = (Uuid::new_v4(), "CSC201");
    let d = date(2025, 9, 15);
    let rows = vec![
        row(lecturer, course, d, AttendanceStatus::Present, RecordVerificationStatus::Verified),
        row(lecturer, course, d, AttendanceStatus::Present, RecordVerificationStatus::Pending),
        row(lecturer, course, d, AttendanceStatus::Late, RecordVerificationStatus::Disputed),
        row(lecturer, course, d, AttendanceStatus::Late, RecordVerificationStatus::Verified),
    ];

    let summary = summarize(&rows);
    assert_eq!(summary.total_sessions, 4);
    assert_eq!(summary.present, 2);
    assert_eq!(summary.late, 2);
    assert_eq!(summary.verified, 2);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.disputed, 1);
    assert_eq!(summary.physical, 4);
    assert_eq!(summary.verification_rate, 0.5);
    assert_eq!(summary.punctuality_rate, 0.5);
}

#[test]
fn test_count_weekday_occurrences() {
    // 2025-09-01 is a Monday.
    let from = date(2025, 9, 1);
    let to = date(2025, 9, 30);
    assert_eq!(count_weekday_occurrences(1, from, to), 5);
    assert_eq!(count_weekday_occurrences(3, from, to), 4);
    assert_eq!(count_weekday_occurrences(7, from, to), 4);
    assert_eq!(count_weekday_occurrences(1, from, from), 1);
    assert_eq!(count_weekday_occurrences(2, from, from), 0);
    assert_eq!(count_weekday_occurrences(1, to, from), 0);
    assert_eq!(count_weekday_occurrences(8, from, to), 0);
}

#[test]
fn test_by_lecturer_compliance_and_rejections() {
    let lecturer = Uuid::new_v4();
    let course = (Uuid::new_v4(), "CSC201");
    let period = ReportPeriod {
        from: date(2025, 9, 1),
        to: date(2025, 9, 14),
    };
    // Two Mondays in the period.
    let schedules = vec![weekly_slot(lecturer, 1)];
    let rows = vec![
        row(lecturer, course, date(2025, 9, 1), AttendanceStatus::Late, RecordVerificationStatus::Verified),
        row(lecturer, course, date(2025, 9, 8), AttendanceStatus::Present, RecordVerificationStatus::Rejected),
    ];
    let names = HashMap::from([(lecturer, "Prof. Owusu".to_string())]);

    let stats = by_lecturer(&rows, &schedules, &names, period);
    assert_eq!(stats.len(), 1);
    let stat = &stats[0];
    assert_eq!(stat.lecturer_name, "Prof. Owusu");
    assert_eq!(stat.expected_sessions, 2);
    assert_eq!(stat.delivered_sessions, 1);
    assert_eq!(stat.late_sessions, 1);
    assert_eq!(stat.verified_sessions, 1);
    assert_eq!(stat.compliance_rate, 0.5);
    assert_eq!(stat.punctuality_rate, 0.0);
}

#[test]
fn test_by_lecturer_caps_compliance_and_lists_idle_lecturers() {
    let busy = Uuid::new_v4();
    let idle = Uuid::new_v4();
    let course = (Uuid::new_v4(), "MTH101");
    let period = ReportPeriod {
        from: date(2025, 9, 1),
        to: date(2025, 9, 7),
    };
    let schedules = vec![weekly_slot(busy, 1), weekly_slot(idle, 2)];
    // A make-up session on top of the timetabled one.
    let rows = vec![
        row(busy, course, date(2025, 9, 1), AttendanceStatus::Present, RecordVerificationStatus::Pending),
        row(busy, course, date(2025, 9, 4), AttendanceStatus::Present, RecordVerificationStatus::Pending),
    ];
    let names = HashMap::from([(busy, "A Busy".to_string()), (idle, "B Idle".to_string())]);

    let stats = by_lecturer(&rows, &schedules, &names, period);
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].lecturer_name, "A Busy");
    assert_eq!(stats[0].compliance_rate, 1.0);
    assert_eq!(stats[1].lecturer_name, "B Idle");
    assert_eq!(stats[1].expected_sessions, 1);
    assert_eq!(stats[1].delivered_sessions, 0);
    assert_eq!(stats[1].compliance_rate, 0.0);
}

#[test]
fn test_by_course_sorted_by_code() {
    let lecturer = Uuid::new_v4();
    let math = (Uuid::new_v4(), "MTH101");
    let cs = (Uuid::new_v4(), "CSC201");
    let d = date(2025, 9, 15);
    let rows = vec![
        row(lecturer, math, d, AttendanceStatus::Present, RecordVerificationStatus::Verified),
        row(lecturer, cs, d, AttendanceStatus::Late, RecordVerificationStatus::Disputed),
        row(lecturer, cs, d, AttendanceStatus::Present, RecordVerificationStatus::Verified),
    ];

    let stats = by_course(&rows);
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].course_code, "CSC201");
    assert_eq!(stats[0].sessions, 2);
    assert_eq!(stats[0].late, 1);
    assert_eq!(stats[0].disputed, 1);
    assert_eq!(stats[0].verification_rate, 0.5);
    assert_eq!(stats[1].course_code, "MTH101");
    assert_eq!(stats[1].verification_rate, 1.0);
}

#[test]
fn test_weekly_trend_buckets_by_monday() {
    let lecturer = Uuid::new_v4();
    let course = (Uuid::new_v4(), "CSC201");
    let rows = vec![
        row(lecturer, course, date(2025, 9, 24), AttendanceStatus::Late, RecordVerificationStatus::Pending),
        row(lecturer, course, date(2025, 9, 15), AttendanceStatus::Present, RecordVerificationStatus::Verified),
        row(lecturer, course, date(2025, 9, 21), AttendanceStatus::Present, RecordVerificationStatus::Disputed),
    ];

    let trend = weekly_trend(&rows);
    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0].week_start, date(2025, 9, 15));
    assert_eq!(trend[0].sessions, 2);
    assert_eq!(trend[0].verified, 1);
    assert_eq!(trend[0].disputed, 1);
    assert_eq!(trend[1].week_start, date(2025, 9, 22));
    assert_eq!(trend[1].late, 1);
}

#[test]
fn test_week_start_is_monday() {
    assert_eq!(week_start(date(2025, 9, 21)), date(2025, 9, 15));
    assert_eq!(week_start(date(2025, 9, 15)), date(2025, 9, 15));
}

#[test]
fn test_report_period_defaults_and_swaps() {
    let today = date(2025, 9, 30);

    let default = ReportPeriod::resolve(None, None, today);
    assert_eq!(default.to, today);
    assert_eq!(default.from, today - Duration::days(DEFAULT_PERIOD_DAYS - 1));

    let swapped = ReportPeriod::resolve(Some(date(2025, 9, 20)), Some(date(2025, 9, 10)), today);
    assert_eq!(swapped.from, date(2025, 9, 10));
    assert_eq!(swapped.to, date(2025, 9, 20));
}

#[test]
fn test_period_arithmetic_at_calendar_limits() {
    let today = date(2025, 9, 30);

    let earliest = ReportPeriod::resolve(None, Some(NaiveDate::MIN), today);
    assert_eq!(earliest.from, NaiveDate::MIN);
    assert_eq!(earliest.to, NaiveDate::MIN);
    assert!(!earliest.is_supported());

    let ancient = ReportPeriod::resolve(Some(date(1, 1, 1)), None, today);
    assert!(!ancient.is_supported());
    assert!(ReportPeriod::resolve(None, None, today).is_supported());

    assert_eq!(week_start(NaiveDate::MIN), NaiveDate::MIN);
    for day in 1..=7 {
        let n = count_weekday_occurrences(day, NaiveDate::MAX, NaiveDate::MAX);
        assert!(n <= 1);
    }
}
