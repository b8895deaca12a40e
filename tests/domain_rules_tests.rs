use attendance_portal::{
    attendance::{ArrivalError, campus_instant, campus_today, classify_arrival},
    audit::{AuditAction, RiskContext, risk_score},
    auth::AuthUser,
    error::ApiError,
    geolocation::{CoordinateError, Coordinates, haversine_distance, verify_location},
    models::{
        AttendanceRecord, AttendanceStatus, RecordVerificationStatus, Role, VerificationRequestStatus,
    },
    permissions::{Permission, has_permission},
    verification::{VerificationAction, authorize, transition},
    virtual_verification::{
        DurationCheck, MeetingUrlError, WindowCheck, check_duration, check_time_window, validate_meeting_url,
    },
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 15, hour, minute, second).unwrap()
}

fn campus() -> Coordinates {
    Coordinates::new(5.6508, -0.1870).unwrap()
}

fn allowed_hosts() -> Vec<String> {
    vec!["zoom.us".to_string(), "meet.google.com".to_string()]
}

// --- Geolocation ---

#[test]
fn test_haversine_zero_for_identical_points() {
    assert_eq!(haversine_distance(campus(), campus()), 0.0);
}

#[test]
fn test_haversine_one_degree_of_latitude() {
    let a = Coordinates::new(0.0, 0.0).unwrap();
    let b = Coordinates::new(1.0, 0.0).unwrap();
    let d = haversine_distance(a, b);
    // 2 * pi * 6_371_000 / 360
    assert!((d - 111_194.9).abs() < 1.0, "got {d}");
}

#[test]
fn test_haversine_is_symmetric() {
    let a = Coordinates::new(5.6037, -0.1870).unwrap();
    let b = Coordinates::new(6.6885, -1.6244).unwrap();
    assert!((haversine_distance(a, b) - haversine_distance(b, a)).abs() < 1e-6);
}

#[test]
fn test_verify_location_inside_and_outside_radius() {
    // ~111 m north of campus.
    let near = Coordinates::new(5.6518, -0.1870).unwrap();
    let verdict = verify_location(near, campus(), 500.0);
    assert!(verdict.within_radius);
    assert!(verdict.distance_meters > 100.0 && verdict.distance_meters < 125.0);

    // ~1.1 km north.
    let far = Coordinates::new(5.6608, -0.1870).unwrap();
    let verdict = verify_location(far, campus(), 500.0);
    assert!(!verdict.within_radius);
    assert!(verdict.distance_meters > 1_000.0);
}

#[test]
fn test_verify_location_boundary_counts_as_inside() {
    let point = Coordinates::new(5.6518, -0.1870).unwrap();
    let distance = haversine_distance(point, campus());
    assert!(verify_location(point, campus(), distance).within_radius);
}

#[test]
fn test_coordinates_reject_out_of_range_values() {
    assert_eq!(Coordinates::new(91.0, 0.0), Err(CoordinateError::Latitude(91.0)));
    assert_eq!(Coordinates::new(0.0, -180.5), Err(CoordinateError::Longitude(-180.5)));
    assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    assert!(Coordinates::new(-90.0, 180.0).is_ok());
}

// --- Time window & arrival ---

#[test]
fn test_window_edges_are_inclusive() {
    let start = at(9, 0, 0);
    assert_eq!(check_time_window(at(8, 45, 0), start, 15), WindowCheck::OnTime);
    assert_eq!(check_time_window(at(9, 15, 0), start, 15), WindowCheck::OnTime);
}

#[test]
fn test_window_too_early_rounds_minutes_up() {
    let start = at(9, 0, 0);
    assert_eq!(
        check_time_window(at(8, 44, 30), start, 15),
        WindowCheck::TooEarly { minutes_until_open: 1 }
    );
    assert_eq!(
        check_time_window(at(8, 0, 0), start, 15),
        WindowCheck::TooEarly { minutes_until_open: 45 }
    );
}

#[test]
fn test_window_late_reports_minutes_after_start() {
    assert_eq!(
        check_time_window(at(9, 20, 0), at(9, 0, 0), 15),
        WindowCheck::Late { minutes_after_start: 20 }
    );
}

#[test]
fn test_classify_arrival() {
    let (start, end) = (at(9, 0, 0), at(11, 0, 0));
    assert_eq!(classify_arrival(at(9, 5, 0), start, end, 15), Ok(AttendanceStatus::Present));
    assert_eq!(classify_arrival(at(10, 0, 0), start, end, 15), Ok(AttendanceStatus::Late));
    assert_eq!(classify_arrival(at(11, 0, 0), start, end, 15), Err(ArrivalError::SessionEnded));
    assert_eq!(
        classify_arrival(at(8, 30, 0), start, end, 15),
        Err(ArrivalError::TooEarly { minutes_until_open: 15 })
    );
}

#[test]
fn test_campus_instant_applies_offset() {
    let date = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

    assert_eq!(campus_instant(date, nine, 0), Some(at(9, 0, 0)));
    // UTC+1: 09:00 local is 08:00 UTC.
    assert_eq!(campus_instant(date, nine, 60), Some(at(8, 0, 0)));
    assert_eq!(campus_instant(date, nine, -120), Some(at(11, 0, 0)));
    assert_eq!(campus_instant(date, nine, 24 * 60), None);
}

#[test]
fn test_campus_today_crosses_midnight() {
    let late_evening = Utc.with_ymd_and_hms(2025, 9, 15, 23, 30, 0).unwrap();
    assert_eq!(campus_today(late_evening, 0), NaiveDate::from_ymd_opt(2025, 9, 15).unwrap());
    assert_eq!(campus_today(late_evening, 60), NaiveDate::from_ymd_opt(2025, 9, 16).unwrap());
}

// --- Virtual sessions ---

#[test]
fn test_meeting_url_accepts_allowed_hosts_and_subdomains() {
    let hosts = allowed_hosts();
    assert_eq!(validate_meeting_url("https://zoom.us/j/123", &hosts), Ok("zoom.us".to_string()));
    assert_eq!(
        validate_meeting_url("  https://UCC.Zoom.us/j/123?pwd=x ", &hosts),
        Ok("ucc.zoom.us".to_string())
    );
    assert_eq!(
        validate_meeting_url("https://meet.google.com/abc-defg-hij", &hosts),
        Ok("meet.google.com".to_string())
    );
}

#[test]
fn test_meeting_url_rejections() {
    let hosts = allowed_hosts();
    assert_eq!(validate_meeting_url("not a url", &hosts), Err(MeetingUrlError::Malformed));
    assert_eq!(
        validate_meeting_url("http://zoom.us/j/123", &hosts),
        Err(MeetingUrlError::InsecureScheme)
    );
    assert_eq!(
        validate_meeting_url("https://evilzoom.us/j/1", &hosts),
        Err(MeetingUrlError::HostNotAllowed("evilzoom.us".to_string()))
    );
    assert_eq!(
        validate_meeting_url("https://zoom.us.attacker.net/j/1", &hosts),
        Err(MeetingUrlError::HostNotAllowed("zoom.us.attacker.net".to_string()))
    );
}

#[test]
fn test_check_duration_threshold() {
    assert_eq!(
        check_duration(90, 120, 0.75),
        DurationCheck { ratio: 0.75, meets_threshold: true }
    );
    assert!(!check_duration(60, 120, 0.75).meets_threshold);
    assert_eq!(check_duration(-5, 120, 0.75).ratio, 0.0);
    assert!(!check_duration(60, 0, 0.75).meets_threshold);
}

// --- Audit risk ---

fn noon() -> RiskContext {
    RiskContext { at: at(12, 0, 0), bulk: false }
}

#[test]
fn test_risk_score_keyword_table() {
    assert_eq!(risk_score(AuditAction::AttendanceSubmitted.as_str(), &noon()), 1);
    assert_eq!(risk_score(AuditAction::ProgrammeCreated.as_str(), &noon()), 2);
    assert_eq!(risk_score(AuditAction::ReportExported.as_str(), &noon()), 3);
    assert_eq!(risk_score(AuditAction::RoleChanged.as_str(), &noon()), 4);
    assert_eq!(risk_score(AuditAction::UserDeactivated.as_str(), &noon()), 4);
    assert_eq!(risk_score(AuditAction::LocationCheckFailed.as_str(), &noon()), 4);
    assert_eq!(risk_score(AuditAction::CourseDeleted.as_str(), &noon()), 5);
    assert_eq!(risk_score(AuditAction::DisputeRejected.as_str(), &noon()), 5);
}

#[test]
fn test_risk_score_context_bonuses() {
    let night = RiskContext { at: at(23, 0, 0), bulk: false };
    let early = RiskContext { at: at(5, 59, 0), bulk: false };
    let opening = RiskContext { at: at(6, 0, 0), bulk: false };
    let closing = RiskContext { at: at(22, 0, 0), bulk: false };
    let bulk_night = RiskContext { at: at(23, 0, 0), bulk: true };

    assert_eq!(risk_score("LOCATION_CHECK_FAILED", &night), 5);
    assert_eq!(risk_score("ATTENDANCE_SUBMITTED", &early), 2);
    assert_eq!(risk_score("ATTENDANCE_SUBMITTED", &opening), 1);
    assert_eq!(risk_score("ATTENDANCE_SUBMITTED", &closing), 2);
    assert_eq!(risk_score("LOCATION_CHECK_FAILED", &bulk_night), 7);
}

#[test]
fn test_risk_score_is_clamped() {
    assert_eq!(risk_score("DELETE_ROLE_DEACTIVATE_FAILED_EXPORT", &noon()), 10);
    assert_eq!(risk_score("", &noon()), 1);
}

// --- Permissions ---

#[test]
fn test_permission_table() {
    assert!(has_permission(Role::Admin, Permission::ViewAuditLogs));
    assert!(has_permission(Role::Lecturer, Permission::SubmitAttendance));
    assert!(!has_permission(Role::Lecturer, Permission::ViewReports));
    assert!(has_permission(Role::ClassRep, Permission::VerifyAttendance));
    assert!(!has_permission(Role::ClassRep, Permission::ResolveDisputes));
    assert!(has_permission(Role::Coordinator, Permission::ManageSchedules));
    assert!(!has_permission(Role::Coordinator, Permission::ManageUsers));
    assert!(has_permission(Role::Supervisor, Permission::ExportReports));
    assert!(!has_permission(Role::Supervisor, Permission::ManageCourses));
}

// --- Verification workflow ---

#[test]
fn test_transition_table() {
    use VerificationRequestStatus as S;

    let approve = transition(S::Pending, VerificationAction::Approve).unwrap();
    assert_eq!(approve.request_status, S::Approved);
    assert_eq!(approve.record_status, RecordVerificationStatus::Verified);

    let dispute = transition(S::Pending, VerificationAction::Dispute).unwrap();
    assert_eq!(dispute.request_status, S::Disputed);
    assert_eq!(dispute.record_status, RecordVerificationStatus::Disputed);

    let resolve = transition(S::Disputed, VerificationAction::Resolve).unwrap();
    assert_eq!(resolve.request_status, S::Resolved);
    assert_eq!(resolve.record_status, RecordVerificationStatus::Verified);

    let reject = transition(S::Disputed, VerificationAction::Reject).unwrap();
    assert_eq!(reject.request_status, S::Rejected);
    assert_eq!(reject.record_status, RecordVerificationStatus::Rejected);
}

#[test]
fn test_invalid_transitions_conflict() {
    use VerificationRequestStatus as S;

    let invalid = [
        (S::Approved, VerificationAction::Approve),
        (S::Approved, VerificationAction::Dispute),
        (S::Pending, VerificationAction::Resolve),
        (S::Pending, VerificationAction::Reject),
        (S::Disputed, VerificationAction::Approve),
        (S::Resolved, VerificationAction::Reject),
        (S::Rejected, VerificationAction::Resolve),
    ];
    for (from, action) in invalid {
        assert!(
            matches!(transition(from, action), Err(ApiError::Conflict(_))),
            "{action:?} from {from:?} should conflict"
        );
    }
}

fn actor(role: Role, programme_id: Option<Uuid>, class_group_id: Option<Uuid>) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        role,
        programme_id,
        class_group_id,
    }
}

fn record_in(class_group_id: Uuid) -> AttendanceRecord {
    AttendanceRecord {
        id: Uuid::new_v4(),
        class_group_id,
        lecturer_id: Uuid::new_v4(),
        ..AttendanceRecord::default()
    }
}

#[test]
fn test_authorize_class_rep_of_the_group_only() {
    let group = Uuid::new_v4();
    let record = record_in(group);

    let rep = actor(Role::ClassRep, None, Some(group));
    assert!(authorize(&rep, VerificationAction::Approve, &record, None).is_ok());

    let other_rep = actor(Role::ClassRep, None, Some(Uuid::new_v4()));
    assert!(matches!(
        authorize(&other_rep, VerificationAction::Dispute, &record, None),
        Err(ApiError::Forbidden(_))
    ));

    let lecturer = actor(Role::Lecturer, None, Some(group));
    assert!(matches!(
        authorize(&lecturer, VerificationAction::Approve, &record, None),
        Err(ApiError::Forbidden(_))
    ));
}

#[test]
fn test_authorize_reviewers() {
    let programme = Uuid::new_v4();
    let record = record_in(Uuid::new_v4());

    let coordinator = actor(Role::Coordinator, Some(programme), None);
    assert!(authorize(&coordinator, VerificationAction::Resolve, &record, Some(programme)).is_ok());
    assert!(matches!(
        authorize(&coordinator, VerificationAction::Reject, &record, Some(Uuid::new_v4())),
        Err(ApiError::Forbidden(_))
    ));

    let supervisor = actor(Role::Supervisor, None, None);
    assert!(authorize(&supervisor, VerificationAction::Reject, &record, Some(programme)).is_ok());

    let rep = actor(Role::ClassRep, None, Some(record.class_group_id));
    assert!(matches!(
        authorize(&rep, VerificationAction::Resolve, &record, Some(programme)),
        Err(ApiError::Forbidden(_))
    ));

    let admin = actor(Role::Admin, None, None);
    assert!(authorize(&admin, VerificationAction::Approve, &record, None).is_ok());
}

#[test]
fn test_admin_cannot_verify_own_record() {
    let admin = actor(Role::Admin, None, None);
    let own = AttendanceRecord {
        lecturer_id: admin.id,
        ..record_in(Uuid::new_v4())
    };

    for action in [VerificationAction::Approve, VerificationAction::Dispute] {
        assert!(matches!(
            authorize(&admin, action, &own, None),
            Err(ApiError::Forbidden(_))
        ));
    }
}

#[test]
fn test_late_until_the_last_second() {
    let start = at(9, 0, 0);
    let end = start + Duration::minutes(90);
    assert_eq!(classify_arrival(end - Duration::seconds(1), start, end, 15), Ok(AttendanceStatus::Late));
}
