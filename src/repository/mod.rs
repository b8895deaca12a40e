use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    analytics::AttendanceReportRow,
    models::{
        AttendanceRecord, AttendanceStatus, AuditLog, ClassGroup, Course, CourseSchedule,
        CreateClassGroupRequest, CreateCourseRequest, CreateLecturerRequest,
        CreateProgrammeRequest, CreateScheduleRequest, DashboardStats, Lecturer,
        LecturerDirectoryEntry, Notification, Programme, RecordVerificationStatus, Role,
        SessionMode, UpdateCourseRequest, UpdateProgrammeRequest, UpdateUserRequest, User,
        VerificationRequest, VerificationRequestStatus,
    },
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

pub type RepoResult<T> = Result<T, sqlx::Error>;

// --- Write models ---

/// NewUser
///
/// Profile row for an account that the identity provider has already created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub programme_id: Option<Uuid>,
    pub class_group_id: Option<Uuid>,
}

/// NewAttendanceRecord
///
/// A fully checked attendance submission, ready to persist.
#[derive(Debug, Clone, Default)]
pub struct NewAttendanceRecord {
    pub schedule_id: Uuid,
    pub course_id: Uuid,
    pub class_group_id: Uuid,
    pub lecturer_id: Uuid,
    pub session_date: NaiveDate,
    pub session_mode: SessionMode,
    pub status: AttendanceStatus,
    pub submitted_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_meters: Option<f64>,
    pub location_verified: Option<bool>,
    pub meeting_url: Option<String>,
    pub actual_duration_minutes: Option<i32>,
    pub duration_verified: Option<bool>,
    pub topic: Option<String>,
    pub remarks: Option<String>,
}

/// VerificationDecision
///
/// One step of the verification workflow. Applied only while the request is still in
/// `expected_status`, so two reviewers acting at once cannot both win.
#[derive(Debug, Clone)]
pub struct VerificationDecision {
    pub request_id: Uuid,
    pub expected_status: VerificationRequestStatus,
    pub request_status: VerificationRequestStatus,
    pub record_status: RecordVerificationStatus,
    pub reviewer_id: Uuid,
    pub reviewer_comment: Option<String>,
    pub dispute_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Value,
    pub ip_address: Option<String>,
    pub risk_score: i16,
}

// --- Read filters ---

/// AttendanceFilter
///
/// Every field narrows the result; `None` means "no constraint". Dates are inclusive.
#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub schedule_id: Option<Uuid>,
    pub lecturer_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub class_group_id: Option<Uuid>,
    pub programme_id: Option<Uuid>,
    pub verification_status: Option<RecordVerificationStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub lecturer_id: Option<Uuid>,
    pub class_group_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub day_of_week: Option<i16>,
    pub active_only: bool,
}

/// VerificationFilter
///
/// `class_group_id` and `programme_id` are matched through the attendance record.
#[derive(Debug, Clone, Default)]
pub struct VerificationFilter {
    pub lecturer_id: Option<Uuid>,
    pub class_group_id: Option<Uuid>,
    pub programme_id: Option<Uuid>,
    pub status: Option<VerificationRequestStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub min_risk: Option<i16>,
    pub limit: i64,
}

/// Repository Trait
///
/// The persistence contract for the whole portal. Handlers talk only to this trait,
/// so the Postgres implementation can be swapped for the in-memory one in tests.
///
/// Lookups return `Ok(None)` for a missing row; mutations keyed by id return
/// `Ok(None)`/`Ok(false)` when nothing matched.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    // Case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self, role: Option<Role>) -> RepoResult<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> RepoResult<Option<User>>;
    // The active class rep of a class group, if any.
    async fn find_class_rep(&self, class_group_id: Uuid) -> RepoResult<Option<User>>;

    // --- Lecturer profiles ---
    async fn create_lecturer(&self, req: CreateLecturerRequest) -> RepoResult<Lecturer>;
    async fn list_lecturers(&self) -> RepoResult<Vec<LecturerDirectoryEntry>>;

    // --- Programmes & class groups ---
    async fn list_programmes(&self) -> RepoResult<Vec<Programme>>;
    async fn get_programme(&self, id: Uuid) -> RepoResult<Option<Programme>>;
    async fn create_programme(&self, req: CreateProgrammeRequest) -> RepoResult<Programme>;
    async fn update_programme(&self, id: Uuid, req: UpdateProgrammeRequest) -> RepoResult<Option<Programme>>;
    async fn delete_programme(&self, id: Uuid) -> RepoResult<bool>;
    async fn list_class_groups(&self, programme_id: Option<Uuid>) -> RepoResult<Vec<ClassGroup>>;
    async fn get_class_group(&self, id: Uuid) -> RepoResult<Option<ClassGroup>>;
    async fn create_class_group(&self, req: CreateClassGroupRequest) -> RepoResult<ClassGroup>;
    async fn delete_class_group(&self, id: Uuid) -> RepoResult<bool>;

    // --- Courses ---
    async fn list_courses(&self, programme_id: Option<Uuid>) -> RepoResult<Vec<Course>>;
    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>>;
    async fn create_course(&self, req: CreateCourseRequest) -> RepoResult<Course>;
    async fn update_course(&self, id: Uuid, req: UpdateCourseRequest) -> RepoResult<Option<Course>>;
    async fn delete_course(&self, id: Uuid) -> RepoResult<bool>;

    // --- Schedules ---
    async fn list_schedules(&self, filter: ScheduleFilter) -> RepoResult<Vec<CourseSchedule>>;
    async fn get_schedule(&self, id: Uuid) -> RepoResult<Option<CourseSchedule>>;
    async fn create_schedule(&self, req: CreateScheduleRequest) -> RepoResult<CourseSchedule>;
    // Persists every mutable column of `schedule`.
    async fn update_schedule(&self, schedule: CourseSchedule) -> RepoResult<Option<CourseSchedule>>;
    async fn delete_schedule(&self, id: Uuid) -> RepoResult<bool>;

    // --- Attendance ---
    async fn get_attendance(&self, id: Uuid) -> RepoResult<Option<AttendanceRecord>>;
    async fn find_attendance_for_session(
        &self,
        schedule_id: Uuid,
        session_date: NaiveDate,
    ) -> RepoResult<Option<AttendanceRecord>>;
    async fn list_attendance(&self, filter: AttendanceFilter) -> RepoResult<Vec<AttendanceRecord>>;
    /// Inserts the record and its verification request atomically.
    async fn submit_attendance(
        &self,
        record: NewAttendanceRecord,
        class_rep_id: Option<Uuid>,
    ) -> RepoResult<(AttendanceRecord, VerificationRequest)>;

    // --- Verification workflow ---
    async fn list_verification_requests(&self, filter: VerificationFilter) -> RepoResult<Vec<VerificationRequest>>;
    async fn get_verification_request(&self, id: Uuid) -> RepoResult<Option<VerificationRequest>>;
    /// Updates the request and its attendance record in one transaction. `Ok(None)` when
    /// the request no longer has `expected_status`.
    async fn apply_verification_decision(
        &self,
        decision: VerificationDecision,
    ) -> RepoResult<Option<VerificationRequest>>;

    // --- Notifications ---
    async fn create_notification(&self, notification: NewNotification) -> RepoResult<Notification>;
    async fn list_notifications(&self, user_id: Uuid, unread_only: bool) -> RepoResult<Vec<Notification>>;
    // Ownership enforced: only the recipient can mark it read.
    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool>;
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> RepoResult<u64>;

    // --- Audit ---
    async fn insert_audit_log(&self, log: NewAuditLog) -> RepoResult<AuditLog>;
    async fn list_audit_logs(&self, filter: AuditLogFilter) -> RepoResult<Vec<AuditLog>>;

    // --- Reporting ---
    async fn attendance_report_rows(&self, filter: AttendanceFilter) -> RepoResult<Vec<AttendanceReportRow>>;
    async fn get_stats(&self) -> RepoResult<DashboardStats>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
