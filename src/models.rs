use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    geolocation::{Coordinates, LocationVerdict},
    virtual_verification::{DurationCheck, WindowCheck},
};

// --- Enumerations (mapped to Postgres enum types) ---

/// Role
///
/// The RBAC field on every user. The permission table in `permissions` maps each
/// role to what it may do.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type, TS, ToSchema,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    Coordinator,
    #[default]
    Lecturer,
    ClassRep,
    Supervisor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coordinator => "coordinator",
            Role::Lecturer => "lecturer",
            Role::ClassRep => "class_rep",
            Role::Supervisor => "supervisor",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type, TS, ToSchema,
)]
#[sqlx(type_name = "session_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SessionMode {
    #[default]
    Physical,
    Virtual,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Physical => "physical",
            SessionMode::Virtual => "virtual",
        }
    }
}

/// Whether the lecturer checked in inside the on-time window or after it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type, TS, ToSchema,
)]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AttendanceStatus {
    #[default]
    Present,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
        }
    }
}

/// Verification state carried on the attendance record itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type, TS, ToSchema,
)]
#[sqlx(type_name = "record_verification_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RecordVerificationStatus {
    #[default]
    Pending,
    Verified,
    Disputed,
    Rejected,
}

impl RecordVerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordVerificationStatus::Pending => "pending",
            RecordVerificationStatus::Verified => "verified",
            RecordVerificationStatus::Disputed => "disputed",
            RecordVerificationStatus::Rejected => "rejected",
        }
    }
}

/// State of the class-rep / reviewer workflow attached to a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type, TS, ToSchema,
)]
#[sqlx(type_name = "verification_request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum VerificationRequestStatus {
    #[default]
    Pending,
    Approved,
    Disputed,
    Resolved,
    Rejected,
}

impl VerificationRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationRequestStatus::Pending => "pending",
            VerificationRequestStatus::Approved => "approved",
            VerificationRequestStatus::Disputed => "disputed",
            VerificationRequestStatus::Resolved => "resolved",
            VerificationRequestStatus::Rejected => "rejected",
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A portal account from the `users` table. The id is the identity provider's id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    // Set for coordinators: the programme they manage.
    pub programme_id: Option<Uuid>,
    // Set for class reps: the class group they represent.
    pub class_group_id: Option<Uuid>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Lecturer
///
/// Staff details attached to a user whose role is `lecturer`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Lecturer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub staff_number: String,
    pub department: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// LecturerDirectoryEntry
///
/// A lecturer profile joined with the owning user's name and email.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct LecturerDirectoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub staff_number: String,
    pub department: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Programme {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub department: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ClassGroup
///
/// A cohort of students inside a programme (e.g. "CS Year 2 Group A").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ClassGroup {
    pub id: Uuid,
    pub programme_id: Uuid,
    pub name: String,
    pub year_of_study: i16,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub programme_id: Uuid,
    pub credit_hours: i16,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CourseSchedule
///
/// A recurring weekly slot binding a course, class group and lecturer.
/// `day_of_week` follows ISO numbering: 1 = Monday, 7 = Sunday.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CourseSchedule {
    pub id: Uuid,
    pub course_id: Uuid,
    pub class_group_id: Uuid,
    pub lecturer_id: Uuid,
    pub day_of_week: i16,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "11:00:00")]
    pub end_time: NaiveTime,
    pub venue: Option<String>,
    pub session_mode: SessionMode,
    pub meeting_url: Option<String>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl CourseSchedule {
    /// Scheduled length of one session in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// True when `date` falls on this slot's weekday.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        i16::try_from(date.weekday().number_from_monday()).ok() == Some(self.day_of_week)
    }

    /// True when both slots share a day and their time ranges intersect.
    /// Back-to-back slots (one ends when the other starts) do not overlap.
    pub fn overlaps(&self, day_of_week: i16, start: NaiveTime, end: NaiveTime) -> bool {
        self.day_of_week == day_of_week && self.start_time < end && start < self.end_time
    }
}

/// AttendanceRecord
///
/// A lecturer's check-in for one occurrence of a schedule.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub course_id: Uuid,
    pub class_group_id: Uuid,
    pub lecturer_id: Uuid,
    #[ts(type = "string")]
    pub session_date: NaiveDate,
    pub session_mode: SessionMode,
    pub status: AttendanceStatus,
    pub verification_status: RecordVerificationStatus,
    #[ts(type = "string")]
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

/// VerificationRequest
///
/// Links an attendance record to the class-rep approval / dispute workflow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct VerificationRequest {
    pub id: Uuid,
    pub attendance_id: Uuid,
    // None when the class group had no class rep at submission time.
    pub class_rep_id: Option<Uuid>,
    pub lecturer_id: Uuid,
    pub status: VerificationRequestStatus,
    pub dispute_reason: Option<String>,
    pub reviewer_id: Option<Uuid>,
    pub reviewer_comment: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    // Recipient.
    pub user_id: Uuid,
    // Machine-readable category, e.g. "attendance_submitted".
    pub kind: String,
    pub title: String,
    pub message: String,
    // Frontend route the notification points at.
    pub link: Option<String>,
    pub is_read: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// AuditLog
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub risk_score: i16,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateUserRequest
///
/// Admin-only account creation. The password goes straight to the identity provider
/// and is never persisted or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub programme_id: Option<Uuid>,
    pub class_group_id: Option<Uuid>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(ApiError::Validation("email must be a valid address".to_string()));
        }
        if self.password.chars().count() < 8 {
            return Err(ApiError::Validation("password must be at least 8 characters".to_string()));
        }
        require_text("full_name", &self.full_name)?;
        if self.role == Role::ClassRep && self.class_group_id.is_none() {
            return Err(ApiError::Validation("class reps must belong to a class group".to_string()));
        }
        Ok(())
    }
}

/// UpdateUserRequest
///
/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub programme_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_group_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.full_name {
            require_text("full_name", name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateLecturerRequest {
    pub user_id: Uuid,
    pub staff_number: String,
    pub department: String,
}

impl CreateLecturerRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require_text("staff_number", &self.staff_number)?;
        require_text("department", &self.department)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateProgrammeRequest {
    pub code: String,
    pub name: String,
    pub department: String,
}

impl CreateProgrammeRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require_code("code", &self.code)?;
        require_text("name", &self.name)?;
        require_text("department", &self.department)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProgrammeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl UpdateProgrammeRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(department) = &self.department {
            require_text("department", department)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateClassGroupRequest {
    pub programme_id: Uuid,
    pub name: String,
    pub year_of_study: i16,
}

impl CreateClassGroupRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require_text("name", &self.name)?;
        if !(1..=8).contains(&self.year_of_study) {
            return Err(ApiError::Validation("year_of_study must be between 1 and 8".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCourseRequest {
    pub code: String,
    pub title: String,
    pub programme_id: Uuid,
    pub credit_hours: i16,
}

impl CreateCourseRequest {
    pub fn validate(&self) -> ApiResult<()> {
        require_code("code", &self.code)?;
        require_text("title", &self.title)?;
        if self.credit_hours <= 0 {
            return Err(ApiError::Validation("credit_hours must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCourseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_hours: Option<i16>,
}

impl UpdateCourseRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if matches!(self.credit_hours, Some(h) if h <= 0) {
            return Err(ApiError::Validation("credit_hours must be positive".to_string()));
        }
        Ok(())
    }
}

/// CreateScheduleRequest
///
/// Times are campus-local wall-clock times (`HH:MM:SS`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateScheduleRequest {
    pub course_id: Uuid,
    pub class_group_id: Uuid,
    pub lecturer_id: Uuid,
    pub day_of_week: i16,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "11:00:00")]
    pub end_time: NaiveTime,
    pub venue: Option<String>,
    pub session_mode: SessionMode,
    pub meeting_url: Option<String>,
}

impl CreateScheduleRequest {
    pub fn validate(&self) -> ApiResult<()> {
        validate_slot(self.day_of_week, self.start_time, self.end_time)?;
        if self.session_mode == SessionMode::Virtual
            && self.meeting_url.as_deref().is_none_or(|u| u.trim().is_empty())
        {
            return Err(ApiError::Validation(
                "virtual schedules need a meeting_url".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateScheduleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lecturer_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_mode: Option<SessionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateScheduleRequest {
    /// Overlays the provided fields onto `current`.
    pub fn apply_to(&self, current: &CourseSchedule) -> CourseSchedule {
        let mut next = current.clone();
        if let Some(lecturer_id) = self.lecturer_id {
            next.lecturer_id = lecturer_id;
        }
        if let Some(day) = self.day_of_week {
            next.day_of_week = day;
        }
        if let Some(start) = self.start_time {
            next.start_time = start;
        }
        if let Some(end) = self.end_time {
            next.end_time = end;
        }
        if let Some(venue) = &self.venue {
            next.venue = Some(venue.clone());
        }
        if let Some(mode) = self.session_mode {
            next.session_mode = mode;
        }
        if let Some(url) = &self.meeting_url {
            next.meeting_url = Some(url.clone());
        }
        if let Some(active) = self.is_active {
            next.is_active = active;
        }
        next
    }
}

/// SubmitAttendanceRequest
///
/// A lecturer's check-in. Physical sessions need coordinates; virtual sessions
/// fall back to the schedule's meeting link when `meeting_url` is absent.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SubmitAttendanceRequest {
    pub schedule_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "2025-09-15")]
    pub session_date: NaiveDate,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub meeting_url: Option<String>,
    pub actual_duration_minutes: Option<i32>,
    pub topic: Option<String>,
    pub remarks: Option<String>,
}

impl SubmitAttendanceRequest {
    /// Returns the reported position when both halves are present and valid.
    pub fn coordinates(&self) -> ApiResult<Option<Coordinates>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon)
                .map(Some)
                .map_err(|e| ApiError::Validation(e.to_string())),
            (None, None) => Ok(None),
            _ => Err(ApiError::Validation(
                "latitude and longitude must be sent together".to_string(),
            )),
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        if matches!(self.actual_duration_minutes, Some(m) if m < 0) {
            return Err(ApiError::Validation(
                "actual_duration_minutes cannot be negative".to_string(),
            ));
        }
        self.coordinates().map(|_| ())
    }
}

/// SubmitAttendanceResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SubmitAttendanceResponse {
    pub record: AttendanceRecord,
    pub verification_request: VerificationRequest,
    pub location: Option<LocationVerdict>,
    pub duration: Option<DurationCheck>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LocationCheckRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct VirtualCheckRequest {
    pub schedule_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "2025-09-15")]
    pub session_date: NaiveDate,
    pub meeting_url: Option<String>,
    pub actual_duration_minutes: Option<i32>,
}

/// VirtualCheckResponse
///
/// Preview of every virtual-session check for a schedule occurrence, computed
/// without recording anything.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct VirtualCheckResponse {
    pub window: WindowCheck,
    pub meeting_host: Option<String>,
    pub meeting_url_error: Option<String>,
    pub duration: Option<DurationCheck>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DisputeRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ReviewDecisionRequest {
    pub comment: Option<String>,
}

// --- Dashboard & Output Schemas ---

/// DashboardStats
///
/// Counters for the administrative dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_programmes: i64,
    pub total_courses: i64,
    pub active_schedules: i64,
    pub attendance_records: i64,
    pub pending_verifications: i64,
    pub open_disputes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatedCountResponse {
    pub updated: u64,
}

/// ArchivedReportResponse
///
/// Where an archived export was stored and a short-lived link to download it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArchivedReportResponse {
    pub resource_key: String,
    pub download_url: String,
}

// --- Validation helpers ---

fn require_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_code(field: &str, value: &str) -> ApiResult<()> {
    require_text(field, value)?;
    if !value.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ApiError::Validation(format!(
            "{field} may only contain letters, digits and '-'"
        )));
    }
    Ok(())
}

/// Day numbers are ISO (1..=7) and a slot must end after it starts.
pub fn validate_slot(day_of_week: i16, start: NaiveTime, end: NaiveTime) -> ApiResult<()> {
    if !(1..=7).contains(&day_of_week) {
        return Err(ApiError::Validation(
            "day_of_week must be between 1 (Monday) and 7 (Sunday)".to_string(),
        ));
    }
    if start >= end {
        return Err(ApiError::Validation("start_time must be before end_time".to_string()));
    }
    Ok(())
}

/// Normalizes a programme/course code for storage.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
