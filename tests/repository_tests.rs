use attendance_portal::{
    InMemoryRepository,
    error::ApiError,
    models::{
        CreateClassGroupRequest, CreateCourseRequest, CreateLecturerRequest, CreateProgrammeRequest,
        CreateScheduleRequest, RecordVerificationStatus, Role, SessionMode, UpdateUserRequest,
        VerificationRequestStatus,
    },
    repository::{
        AttendanceFilter, AuditLogFilter, NewAttendanceRecord, NewAuditLog, NewNotification,
        NewUser, Repository, ScheduleFilter, VerificationDecision, VerificationFilter,
    },
};
use axum::http::StatusCode;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;

// --- Fixtures ---

struct Catalog {
    programme_id: Uuid,
    class_group_id: Uuid,
    course_id: Uuid,
    lecturer_id: Uuid,
    schedule_id: Uuid,
}

async fn add_user(repo: &InMemoryRepository, role: Role, email: &str, class_group_id: Option<Uuid>) -> Uuid {
    let id = Uuid::new_v4();
    repo.create_user(NewUser {
        id,
        email: email.to_string(),
        full_name: email.split('@').next().unwrap_or_default().to_string(),
        role,
        programme_id: None,
        class_group_id,
    })
    .await
    .unwrap();
    id
}

async fn seed_catalog(repo: &InMemoryRepository) -> Catalog {
    let programme = repo
        .create_programme(CreateProgrammeRequest {
            code: "bsc-cs".to_string(),
            name: "Computer Science".to_string(),
            department: "Computing".to_string(),
        })
        .await
        .unwrap();
    let group = repo
        .create_class_group(CreateClassGroupRequest {
            programme_id: programme.id,
            name: "CS Year 2".to_string(),
            year_of_study: 2,
        })
        .await
        .unwrap();
    let course = repo
        .create_course(CreateCourseRequest {
            code: "csc201".to_string(),
            title: "Data Structures".to_string(),
            programme_id: programme.id,
            credit_hours: 3,
        })
        .await
        .unwrap();
    let lecturer_id = add_user(repo, Role::Lecturer, "mensah@university.edu", None).await;
    let schedule = repo
        .create_schedule(CreateScheduleRequest {
            course_id: course.id,
            class_group_id: group.id,
            lecturer_id,
            day_of_week: 1,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            venue: Some("LT 1".to_string()),
            session_mode: SessionMode::Physical,
            meeting_url: None,
        })
        .await
        .unwrap();

    Catalog {
        programme_id: programme.id,
        class_group_id: group.id,
        course_id: course.id,
        lecturer_id,
        schedule_id: schedule.id,
    }
}

fn new_record(catalog: &Catalog, session_date: NaiveDate) -> NewAttendanceRecord {
    NewAttendanceRecord {
        schedule_id: catalog.schedule_id,
        course_id: catalog.course_id,
        class_group_id: catalog.class_group_id,
        lecturer_id: catalog.lecturer_id,
        session_date,
        session_mode: SessionMode::Physical,
        submitted_at: Utc::now(),
        distance_meters: Some(40.0),
        location_verified: Some(true),
        ..NewAttendanceRecord::default()
    }
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
}

// --- Constraints ---

#[tokio::test]
async fn test_duplicate_codes_map_to_conflict() {
    let repo = InMemoryRepository::new();
    let catalog = seed_catalog(&repo).await;

    let err = repo
        .create_course(CreateCourseRequest {
            code: " CSC201 ".to_string(),
            title: "Another".to_string(),
            programme_id: catalog.programme_id,
            credit_hours: 2,
        })
        .await
        .unwrap_err();
    assert_eq!(ApiError::from(err).status_code(), StatusCode::CONFLICT);

    let err = repo
        .create_programme(CreateProgrammeRequest {
            code: "BSC-CS".to_string(),
            name: "Duplicate".to_string(),
            department: "Computing".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(ApiError::from(err).status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_missing_references_map_to_unprocessable() {
    let repo = InMemoryRepository::new();

    let err = repo
        .create_course(CreateCourseRequest {
            code: "MTH101".to_string(),
            title: "Calculus".to_string(),
            programme_id: Uuid::new_v4(),
            credit_hours: 3,
        })
        .await
        .unwrap_err();
    assert_eq!(ApiError::from(err).status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let err = repo
        .create_lecturer(CreateLecturerRequest {
            user_id: Uuid::new_v4(),
            staff_number: "ST-001".to_string(),
            department: "Computing".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(ApiError::from(err).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_user_email_is_unique_case_insensitively() {
    let repo = InMemoryRepository::new();
    add_user(&repo, Role::Lecturer, "ama@university.edu", None).await;

    let err = repo
        .create_user(NewUser {
            id: Uuid::new_v4(),
            email: "AMA@University.edu".to_string(),
            full_name: "Ama Again".to_string(),
            role: Role::Lecturer,
            programme_id: None,
            class_group_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(ApiError::from(err).status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_one_record_per_session() {
    let repo = InMemoryRepository::new();
    let catalog = seed_catalog(&repo).await;

    let (record, request) = repo
        .submit_attendance(new_record(&catalog, monday()), None)
        .await
        .unwrap();
    assert_eq!(record.verification_status, RecordVerificationStatus::Pending);
    assert_eq!(request.status, VerificationRequestStatus::Pending);
    assert_eq!(request.attendance_id, record.id);
    assert_eq!(request.class_rep_id, None);

    let err = repo
        .submit_attendance(new_record(&catalog, monday()), None)
        .await
        .unwrap_err();
    assert_eq!(ApiError::from(err).status_code(), StatusCode::CONFLICT);

    let found = repo
        .find_attendance_for_session(catalog.schedule_id, monday())
        .await
        .unwrap();
    assert_eq!(found.map(|r| r.id), Some(record.id));
}

// --- Lookups ---

#[tokio::test]
async fn test_find_class_rep_ignores_inactive_reps() {
    let repo = InMemoryRepository::new();
    let catalog = seed_catalog(&repo).await;
    assert!(repo.find_class_rep(catalog.class_group_id).await.unwrap().is_none());

    let rep = add_user(&repo, Role::ClassRep, "rep@university.edu", Some(catalog.class_group_id)).await;
    let found = repo.find_class_rep(catalog.class_group_id).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(rep));

    repo.update_user(
        rep,
        UpdateUserRequest {
            is_active: Some(false),
            ..UpdateUserRequest::default()
        },
    )
    .await
    .unwrap();
    assert!(repo.find_class_rep(catalog.class_group_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_attendance_filter_by_programme_and_dates() {
    let repo = InMemoryRepository::new();
    let catalog = seed_catalog(&repo).await;
    let next_monday = NaiveDate::from_ymd_opt(2025, 9, 22).unwrap();
    repo.submit_attendance(new_record(&catalog, monday()), None).await.unwrap();
    repo.submit_attendance(new_record(&catalog, next_monday), None).await.unwrap();

    let all = repo
        .list_attendance(AttendanceFilter {
            programme_id: Some(catalog.programme_id),
            ..AttendanceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    // Newest session first.
    assert_eq!(all[0].session_date, next_monday);

    let other_programme = repo
        .list_attendance(AttendanceFilter {
            programme_id: Some(Uuid::new_v4()),
            ..AttendanceFilter::default()
        })
        .await
        .unwrap();
    assert!(other_programme.is_empty());

    let first_week = repo
        .attendance_report_rows(AttendanceFilter {
            to: Some(monday()),
            ..AttendanceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(first_week.len(), 1);
    assert_eq!(first_week[0].course_code, "CSC201");
    assert_eq!(first_week[0].class_group_name, "CS Year 2");
    assert_eq!(first_week[0].lecturer_name, "mensah");
}

// --- Verification workflow ---

#[tokio::test]
async fn test_decision_applies_only_from_expected_status() {
    let repo = InMemoryRepository::new();
    let catalog = seed_catalog(&repo).await;
    let rep = add_user(&repo, Role::ClassRep, "rep@university.edu", Some(catalog.class_group_id)).await;
    let (record, request) = repo
        .submit_attendance(new_record(&catalog, monday()), Some(rep))
        .await
        .unwrap();

    let dispute = VerificationDecision {
        request_id: request.id,
        expected_status: VerificationRequestStatus::Pending,
        request_status: VerificationRequestStatus::Disputed,
        record_status: RecordVerificationStatus::Disputed,
        reviewer_id: rep,
        reviewer_comment: None,
        dispute_reason: Some("Lecturer left after 20 minutes".to_string()),
    };

    let updated = repo
        .apply_verification_decision(dispute.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, VerificationRequestStatus::Disputed);
    assert_eq!(updated.reviewer_id, Some(rep));
    assert_eq!(updated.dispute_reason.as_deref(), Some("Lecturer left after 20 minutes"));

    let record = repo.get_attendance(record.id).await.unwrap().unwrap();
    assert_eq!(record.verification_status, RecordVerificationStatus::Disputed);

    // A second reviewer acting on the stale status loses.
    assert!(repo.apply_verification_decision(dispute).await.unwrap().is_none());

    let disputed = repo
        .list_verification_requests(VerificationFilter {
            class_group_id: Some(catalog.class_group_id),
            status: Some(VerificationRequestStatus::Disputed),
            ..VerificationFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(disputed.len(), 1);

    let stats = repo.get_stats().await.unwrap();
    assert_eq!(stats.open_disputes, 1);
    assert_eq!(stats.pending_verifications, 0);
    assert_eq!(stats.attendance_records, 1);
}

#[tokio::test]
async fn test_deleting_a_programme_cascades() {
    let repo = InMemoryRepository::new();
    let catalog = seed_catalog(&repo).await;
    let rep = add_user(&repo, Role::ClassRep, "rep@university.edu", Some(catalog.class_group_id)).await;

    assert!(repo.delete_programme(catalog.programme_id).await.unwrap());
    assert!(!repo.delete_programme(catalog.programme_id).await.unwrap());

    assert!(repo.get_course(catalog.course_id).await.unwrap().is_none());
    assert!(repo.get_class_group(catalog.class_group_id).await.unwrap().is_none());
    assert!(repo.list_schedules(ScheduleFilter::default()).await.unwrap().is_empty());

    // The rep keeps their account but loses the dangling group.
    let rep = repo.get_user(rep).await.unwrap().unwrap();
    assert_eq!(rep.class_group_id, None);
}

#[tokio::test]
async fn test_recorded_attendance_blocks_catalog_deletes() {
    let repo = InMemoryRepository::new();
    let catalog = seed_catalog(&repo).await;
    let rep = add_user(&repo, Role::ClassRep, "rep@university.edu", Some(catalog.class_group_id)).await;
    let (record, request) = repo
        .submit_attendance(new_record(&catalog, monday()), Some(rep))
        .await
        .unwrap();

    let refused = [
        repo.delete_schedule(catalog.schedule_id).await,
        repo.delete_course(catalog.course_id).await,
        repo.delete_class_group(catalog.class_group_id).await,
        repo.delete_programme(catalog.programme_id).await,
    ];
    for result in refused {
        let err = result.unwrap_err();
        assert_eq!(ApiError::from(err).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    assert!(repo.get_schedule(catalog.schedule_id).await.unwrap().is_some());
    assert!(repo.get_attendance(record.id).await.unwrap().is_some());
    assert!(repo.get_verification_request(request.id).await.unwrap().is_some());
}

// --- Notifications & audit ---

#[tokio::test]
async fn test_notifications_are_private_to_the_recipient() {
    let repo = InMemoryRepository::new();
    let owner = add_user(&repo, Role::Lecturer, "owner@university.edu", None).await;
    let other = add_user(&repo, Role::Lecturer, "other@university.edu", None).await;

    let first = repo
        .create_notification(NewNotification {
            user_id: owner,
            kind: "attendance_verified".to_string(),
            title: "Attendance approved".to_string(),
            message: "CSC201 on 2025-09-15 was approved".to_string(),
            link: None,
        })
        .await
        .unwrap();
    repo.create_notification(NewNotification {
        user_id: owner,
        kind: "dispute_raised".to_string(),
        title: "Attendance disputed".to_string(),
        message: "CSC201 on 2025-09-22 was disputed".to_string(),
        link: None,
    })
    .await
    .unwrap();

    let listed = repo.list_notifications(owner, false).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].kind, "dispute_raised");

    assert!(!repo.mark_notification_read(first.id, other).await.unwrap());
    assert!(repo.mark_notification_read(first.id, owner).await.unwrap());
    assert_eq!(repo.list_notifications(owner, true).await.unwrap().len(), 1);
    assert_eq!(repo.mark_all_notifications_read(owner).await.unwrap(), 1);
    assert_eq!(repo.mark_all_notifications_read(owner).await.unwrap(), 0);

    let err = repo
        .create_notification(NewNotification {
            user_id: Uuid::new_v4(),
            kind: "x".to_string(),
            title: "x".to_string(),
            message: "x".to_string(),
            link: None,
        })
        .await
        .unwrap_err();
    assert_eq!(ApiError::from(err).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_audit_log_filters() {
    let repo = InMemoryRepository::new();
    let actor = Uuid::new_v4();
    for (action, risk) in [("USER_CREATED", 4), ("ROLE_CHANGED", 6), ("COURSE_UPDATED", 2)] {
        repo.insert_audit_log(NewAuditLog {
            user_id: Some(actor),
            action: action.to_string(),
            entity_type: "user".to_string(),
            entity_id: None,
            details: json!({}),
            ip_address: Some("10.0.0.1".to_string()),
            risk_score: risk,
        })
        .await
        .unwrap();
    }

    let all = repo
        .list_audit_logs(AuditLogFilter {
            user_id: Some(actor),
            limit: 100,
            ..AuditLogFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].action, "COURSE_UPDATED");

    let risky = repo
        .list_audit_logs(AuditLogFilter {
            min_risk: Some(4),
            limit: 100,
            ..AuditLogFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(risky.len(), 2);

    let by_action = repo
        .list_audit_logs(AuditLogFilter {
            action: Some("role_changed".to_string()),
            limit: 100,
            ..AuditLogFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_action.len(), 1);

    let limited = repo
        .list_audit_logs(AuditLogFilter {
            limit: 1,
            ..AuditLogFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}
