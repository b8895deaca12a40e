use attendance_portal::{
    error::ApiError,
    models::{
        CourseSchedule, CreateClassGroupRequest, CreateCourseRequest, CreateProgrammeRequest,
        CreateScheduleRequest, CreateUserRequest, Role, SessionMode, SubmitAttendanceRequest,
        UpdateCourseRequest, UpdateScheduleRequest, normalize_code, validate_slot,
    },
};
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn monday_slot() -> CourseSchedule {
    CourseSchedule {
        id: Uuid::new_v4(),
        day_of_week: 1,
        start_time: t(9, 0),
        end_time: t(11, 0),
        is_active: true,
        ..CourseSchedule::default()
    }
}

fn valid_user() -> CreateUserRequest {
    CreateUserRequest {
        email: "ama.owusu@university.edu".to_string(),
        password: "correct-horse".to_string(),
        full_name: "Ama Owusu".to_string(),
        role: Role::Lecturer,
        programme_id: None,
        class_group_id: None,
    }
}

#[test]
fn test_create_user_validation() {
    assert!(valid_user().validate().is_ok());

    let bad_email = CreateUserRequest { email: "@university.edu".to_string(), ..valid_user() };
    assert!(matches!(bad_email.validate(), Err(ApiError::Validation(_))));

    let short_password = CreateUserRequest { password: "short".to_string(), ..valid_user() };
    assert!(matches!(short_password.validate(), Err(ApiError::Validation(_))));

    let blank_name = CreateUserRequest { full_name: "   ".to_string(), ..valid_user() };
    assert!(matches!(blank_name.validate(), Err(ApiError::Validation(_))));

    let rep_without_group = CreateUserRequest { role: Role::ClassRep, ..valid_user() };
    assert!(matches!(rep_without_group.validate(), Err(ApiError::Validation(_))));

    let rep_with_group = CreateUserRequest {
        role: Role::ClassRep,
        class_group_id: Some(Uuid::new_v4()),
        ..valid_user()
    };
    assert!(rep_with_group.validate().is_ok());
}

#[test]
fn test_catalog_request_validation() {
    let programme = CreateProgrammeRequest {
        code: "BSC-CS".to_string(),
        name: "Computer Science".to_string(),
        department: "Computing".to_string(),
    };
    assert!(programme.validate().is_ok());
    let bad_code = CreateProgrammeRequest { code: "BSC CS".to_string(), ..programme };
    assert!(bad_code.validate().is_err());

    let group = CreateClassGroupRequest {
        programme_id: Uuid::new_v4(),
        name: "CS Year 2".to_string(),
        year_of_study: 9,
    };
    assert!(group.validate().is_err());

    let course = CreateCourseRequest {
        code: "csc201".to_string(),
        title: "Data Structures".to_string(),
        programme_id: Uuid::new_v4(),
        credit_hours: 0,
    };
    assert!(course.validate().is_err());

    let update = UpdateCourseRequest { title: None, credit_hours: Some(3) };
    assert!(update.validate().is_ok());
    let update = UpdateCourseRequest { title: Some(String::new()), credit_hours: None };
    assert!(update.validate().is_err());
}

#[test]
fn test_normalize_code() {
    assert_eq!(normalize_code("  csc201 "), "CSC201");
}

#[test]
fn test_validate_slot() {
    assert!(validate_slot(1, t(9, 0), t(11, 0)).is_ok());
    assert!(validate_slot(7, t(9, 0), t(9, 1)).is_ok());
    assert!(validate_slot(0, t(9, 0), t(11, 0)).is_err());
    assert!(validate_slot(8, t(9, 0), t(11, 0)).is_err());
    assert!(validate_slot(1, t(11, 0), t(11, 0)).is_err());
    assert!(validate_slot(1, t(11, 0), t(9, 0)).is_err());
}

#[test]
fn test_virtual_schedule_needs_meeting_url() {
    let request = CreateScheduleRequest {
        course_id: Uuid::new_v4(),
        class_group_id: Uuid::new_v4(),
        lecturer_id: Uuid::new_v4(),
        day_of_week: 2,
        start_time: t(14, 0),
        end_time: t(16, 0),
        venue: None,
        session_mode: SessionMode::Virtual,
        meeting_url: Some("  ".to_string()),
    };
    assert!(request.validate().is_err());

    let with_link = CreateScheduleRequest {
        meeting_url: Some("https://zoom.us/j/123".to_string()),
        ..request
    };
    assert!(with_link.validate().is_ok());
}

#[test]
fn test_schedule_overlap_rules() {
    let slot = monday_slot();
    assert!(slot.overlaps(1, t(10, 0), t(12, 0)));
    assert!(slot.overlaps(1, t(8, 0), t(9, 30)));
    assert!(slot.overlaps(1, t(9, 30), t(10, 0)));
    // Back-to-back is allowed.
    assert!(!slot.overlaps(1, t(11, 0), t(12, 0)));
    assert!(!slot.overlaps(1, t(7, 0), t(9, 0)));
    assert!(!slot.overlaps(2, t(9, 0), t(11, 0)));
}

#[test]
fn test_schedule_occurrence_and_duration() {
    let slot = monday_slot();
    // 2025-09-15 is a Monday.
    assert!(slot.occurs_on(NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()));
    assert!(!slot.occurs_on(NaiveDate::from_ymd_opt(2025, 9, 16).unwrap()));
    assert_eq!(slot.duration_minutes(), 120);
}

#[test]
fn test_update_schedule_apply_to() {
    let slot = CourseSchedule {
        venue: Some("LT 1".to_string()),
        ..monday_slot()
    };
    let update = UpdateScheduleRequest {
        day_of_week: Some(3),
        end_time: Some(t(12, 0)),
        is_active: Some(false),
        ..UpdateScheduleRequest::default()
    };

    let next = update.apply_to(&slot);
    assert_eq!(next.id, slot.id);
    assert_eq!(next.day_of_week, 3);
    assert_eq!(next.start_time, t(9, 0));
    assert_eq!(next.end_time, t(12, 0));
    assert_eq!(next.venue.as_deref(), Some("LT 1"));
    assert!(!next.is_active);
}

#[test]
fn test_submit_attendance_coordinates() {
    let base = SubmitAttendanceRequest {
        schedule_id: Uuid::new_v4(),
        session_date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
        ..SubmitAttendanceRequest::default()
    };
    assert!(base.coordinates().unwrap().is_none());

    let both = SubmitAttendanceRequest {
        latitude: Some(5.6508),
        longitude: Some(-0.1870),
        ..base.clone()
    };
    let coords = both.coordinates().unwrap().unwrap();
    assert_eq!(coords.latitude, 5.6508);

    let half = SubmitAttendanceRequest { latitude: Some(5.6508), ..base.clone() };
    assert!(matches!(half.coordinates(), Err(ApiError::Validation(_))));

    let out_of_range = SubmitAttendanceRequest {
        latitude: Some(91.0),
        longitude: Some(0.0),
        ..base.clone()
    };
    assert!(out_of_range.validate().is_err());

    let negative = SubmitAttendanceRequest {
        actual_duration_minutes: Some(-5),
        ..base
    };
    assert!(negative.validate().is_err());
}
