use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{
    AttendanceFilter, AuditLogFilter, NewAttendanceRecord, NewAuditLog, NewNotification, NewUser,
    RepoResult, Repository, ScheduleFilter, VerificationDecision, VerificationFilter,
};
use crate::{
    analytics::AttendanceReportRow,
    models::{
        AttendanceRecord, AuditLog, ClassGroup, Course, CourseSchedule, CreateClassGroupRequest,
        CreateCourseRequest, CreateLecturerRequest, CreateProgrammeRequest, CreateScheduleRequest,
        DashboardStats, Lecturer, LecturerDirectoryEntry, Notification, Programme, Role,
        UpdateCourseRequest, UpdateProgrammeRequest, UpdateUserRequest, User, VerificationRequest,
        normalize_code,
    },
};

const USER_COLUMNS: &str =
    "id, email, full_name, role, programme_id, class_group_id, is_active, created_at, updated_at";

const SCHEDULE_COLUMNS: &str = "id, course_id, class_group_id, lecturer_id, day_of_week, start_time, end_time, \
     venue, session_mode, meeting_url, is_active, created_at, updated_at";

const ATTENDANCE_COLUMNS: &str = "id, schedule_id, course_id, class_group_id, lecturer_id, session_date, \
     session_mode, status, verification_status, submitted_at, latitude, longitude, distance_meters, \
     location_verified, meeting_url, actual_duration_minutes, duration_verified, topic, remarks";

const VERIFICATION_COLUMNS: &str = "id, attendance_id, class_rep_id, lecturer_id, status, dispute_reason, \
     reviewer_id, reviewer_comment, created_at, updated_at";

const AUDIT_COLUMNS: &str =
    "id, user_id, action, entity_type, entity_id, details, ip_address, risk_score, created_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Every query is parameterized;
/// optional filters are appended with `QueryBuilder::push_bind`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the shared attendance filter to a query whose attendance table is aliased `a`
/// and whose courses table is aliased `c`.
fn push_attendance_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &AttendanceFilter) {
    if let Some(schedule_id) = filter.schedule_id {
        builder.push(" AND a.schedule_id = ").push_bind(schedule_id);
    }
    if let Some(lecturer_id) = filter.lecturer_id {
        builder.push(" AND a.lecturer_id = ").push_bind(lecturer_id);
    }
    if let Some(course_id) = filter.course_id {
        builder.push(" AND a.course_id = ").push_bind(course_id);
    }
    if let Some(class_group_id) = filter.class_group_id {
        builder.push(" AND a.class_group_id = ").push_bind(class_group_id);
    }
    if let Some(programme_id) = filter.programme_id {
        builder.push(" AND c.programme_id = ").push_bind(programme_id);
    }
    if let Some(status) = filter.verification_status {
        builder.push(" AND a.verification_status = ").push_bind(status);
    }
    if let Some(from) = filter.from {
        builder.push(" AND a.session_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND a.session_date <= ").push_bind(to);
    }
}

fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Users ---

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_users(&self, role: Option<Role>) -> RepoResult<Vec<User>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"));
        if let Some(role) = role {
            builder.push(" AND role = ").push_bind(role);
        }
        builder.push(" ORDER BY full_name ASC");
        builder.build_query_as::<User>().fetch_all(&self.pool).await
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, full_name, role, programme_id, class_group_id, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, true, NOW(), NOW()) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(user.email.trim().to_lowercase())
        .bind(user.full_name.trim())
        .bind(user.role)
        .bind(user.programme_id)
        .bind(user.class_group_id)
        .fetch_one(&self.pool)
        .await
    }

    /// update_user
    ///
    /// COALESCE keeps a column unchanged when the matching request field is `None`.
    async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                full_name = COALESCE($2, full_name), \
                role = COALESCE($3, role), \
                programme_id = COALESCE($4, programme_id), \
                class_group_id = COALESCE($5, class_group_id), \
                is_active = COALESCE($6, is_active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.full_name.map(|n| n.trim().to_string()))
        .bind(req.role)
        .bind(req.programme_id)
        .bind(req.class_group_id)
        .bind(req.is_active)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_class_rep(&self, class_group_id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE class_group_id = $1 AND role = 'class_rep' AND is_active = true \
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(class_group_id)
        .fetch_optional(&self.pool)
        .await
    }

    // --- Lecturer profiles ---

    async fn create_lecturer(&self, req: CreateLecturerRequest) -> RepoResult<Lecturer> {
        sqlx::query_as::<_, Lecturer>(
            "INSERT INTO lecturers (id, user_id, staff_number, department, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, user_id, staff_number, department, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.user_id)
        .bind(req.staff_number.trim())
        .bind(req.department.trim())
        .fetch_one(&self.pool)
        .await
    }

    async fn list_lecturers(&self) -> RepoResult<Vec<LecturerDirectoryEntry>> {
        sqlx::query_as::<_, LecturerDirectoryEntry>(
            "SELECT l.id, l.user_id, u.full_name, u.email, l.staff_number, l.department \
             FROM lecturers l JOIN users u ON l.user_id = u.id \
             WHERE u.is_active = true \
             ORDER BY u.full_name ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    // --- Programmes & class groups ---

    async fn list_programmes(&self) -> RepoResult<Vec<Programme>> {
        sqlx::query_as::<_, Programme>(
            "SELECT id, code, name, department, created_at FROM programmes ORDER BY code ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_programme(&self, id: Uuid) -> RepoResult<Option<Programme>> {
        sqlx::query_as::<_, Programme>(
            "SELECT id, code, name, department, created_at FROM programmes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_programme(&self, req: CreateProgrammeRequest) -> RepoResult<Programme> {
        sqlx::query_as::<_, Programme>(
            "INSERT INTO programmes (id, code, name, department, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) RETURNING id, code, name, department, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(normalize_code(&req.code))
        .bind(req.name.trim())
        .bind(req.department.trim())
        .fetch_one(&self.pool)
        .await
    }

    async fn update_programme(&self, id: Uuid, req: UpdateProgrammeRequest) -> RepoResult<Option<Programme>> {
        sqlx::query_as::<_, Programme>(
            "UPDATE programmes SET name = COALESCE($2, name), department = COALESCE($3, department) \
             WHERE id = $1 RETURNING id, code, name, department, created_at",
        )
        .bind(id)
        .bind(req.name.map(|n| n.trim().to_string()))
        .bind(req.department.map(|d| d.trim().to_string()))
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_programme(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM programmes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_class_groups(&self, programme_id: Option<Uuid>) -> RepoResult<Vec<ClassGroup>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, programme_id, name, year_of_study, created_at FROM class_groups WHERE 1 = 1",
        );
        if let Some(programme_id) = programme_id {
            builder.push(" AND programme_id = ").push_bind(programme_id);
        }
        builder.push(" ORDER BY year_of_study ASC, name ASC");
        builder.build_query_as::<ClassGroup>().fetch_all(&self.pool).await
    }

    async fn get_class_group(&self, id: Uuid) -> RepoResult<Option<ClassGroup>> {
        sqlx::query_as::<_, ClassGroup>(
            "SELECT id, programme_id, name, year_of_study, created_at FROM class_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_class_group(&self, req: CreateClassGroupRequest) -> RepoResult<ClassGroup> {
        sqlx::query_as::<_, ClassGroup>(
            "INSERT INTO class_groups (id, programme_id, name, year_of_study, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, programme_id, name, year_of_study, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.programme_id)
        .bind(req.name.trim())
        .bind(req.year_of_study)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_class_group(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM class_groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Courses ---

    async fn list_courses(&self, programme_id: Option<Uuid>) -> RepoResult<Vec<Course>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, code, title, programme_id, credit_hours, created_at, updated_at FROM courses WHERE 1 = 1",
        );
        if let Some(programme_id) = programme_id {
            builder.push(" AND programme_id = ").push_bind(programme_id);
        }
        builder.push(" ORDER BY code ASC");
        builder.build_query_as::<Course>().fetch_all(&self.pool).await
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        sqlx::query_as::<_, Course>(
            "SELECT id, code, title, programme_id, credit_hours, created_at, updated_at FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_course(&self, req: CreateCourseRequest) -> RepoResult<Course> {
        sqlx::query_as::<_, Course>(
            "INSERT INTO courses (id, code, title, programme_id, credit_hours, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) \
             RETURNING id, code, title, programme_id, credit_hours, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(normalize_code(&req.code))
        .bind(req.title.trim())
        .bind(req.programme_id)
        .bind(req.credit_hours)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_course(&self, id: Uuid, req: UpdateCourseRequest) -> RepoResult<Option<Course>> {
        sqlx::query_as::<_, Course>(
            "UPDATE courses SET title = COALESCE($2, title), credit_hours = COALESCE($3, credit_hours), \
             updated_at = NOW() WHERE id = $1 \
             RETURNING id, code, title, programme_id, credit_hours, created_at, updated_at",
        )
        .bind(id)
        .bind(req.title.map(|t| t.trim().to_string()))
        .bind(req.credit_hours)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Schedules ---

    async fn list_schedules(&self, filter: ScheduleFilter) -> RepoResult<Vec<CourseSchedule>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SCHEDULE_COLUMNS} FROM course_schedules WHERE 1 = 1"));
        if let Some(lecturer_id) = filter.lecturer_id {
            builder.push(" AND lecturer_id = ").push_bind(lecturer_id);
        }
        if let Some(class_group_id) = filter.class_group_id {
            builder.push(" AND class_group_id = ").push_bind(class_group_id);
        }
        if let Some(course_id) = filter.course_id {
            builder.push(" AND course_id = ").push_bind(course_id);
        }
        if let Some(day) = filter.day_of_week {
            builder.push(" AND day_of_week = ").push_bind(day);
        }
        if filter.active_only {
            builder.push(" AND is_active = true");
        }
        builder.push(" ORDER BY day_of_week ASC, start_time ASC");
        builder.build_query_as::<CourseSchedule>().fetch_all(&self.pool).await
    }

    async fn get_schedule(&self, id: Uuid) -> RepoResult<Option<CourseSchedule>> {
        sqlx::query_as::<_, CourseSchedule>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM course_schedules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_schedule(&self, req: CreateScheduleRequest) -> RepoResult<CourseSchedule> {
        sqlx::query_as::<_, CourseSchedule>(&format!(
            "INSERT INTO course_schedules \
                (id, course_id, class_group_id, lecturer_id, day_of_week, start_time, end_time, \
                 venue, session_mode, meeting_url, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, true, NOW(), NOW()) \
             RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.course_id)
        .bind(req.class_group_id)
        .bind(req.lecturer_id)
        .bind(req.day_of_week)
        .bind(req.start_time)
        .bind(req.end_time)
        .bind(req.venue)
        .bind(req.session_mode)
        .bind(req.meeting_url)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_schedule(&self, schedule: CourseSchedule) -> RepoResult<Option<CourseSchedule>> {
        sqlx::query_as::<_, CourseSchedule>(&format!(
            "UPDATE course_schedules SET \
                lecturer_id = $2, day_of_week = $3, start_time = $4, end_time = $5, venue = $6, \
                session_mode = $7, meeting_url = $8, is_active = $9, updated_at = NOW() \
             WHERE id = $1 RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(schedule.id)
        .bind(schedule.lecturer_id)
        .bind(schedule.day_of_week)
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.venue)
        .bind(schedule.session_mode)
        .bind(schedule.meeting_url)
        .bind(schedule.is_active)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_schedule(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM course_schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Attendance ---

    async fn get_attendance(&self, id: Uuid) -> RepoResult<Option<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_attendance_for_session(
        &self,
        schedule_id: Uuid,
        session_date: NaiveDate,
    ) -> RepoResult<Option<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE schedule_id = $1 AND session_date = $2"
        ))
        .bind(schedule_id)
        .bind(session_date)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_attendance(&self, filter: AttendanceFilter) -> RepoResult<Vec<AttendanceRecord>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM attendance_records a JOIN courses c ON a.course_id = c.id WHERE 1 = 1",
            prefixed(ATTENDANCE_COLUMNS, "a")
        ));
        push_attendance_filter(&mut builder, &filter);
        builder.push(" ORDER BY a.session_date DESC, a.submitted_at DESC");
        builder.build_query_as::<AttendanceRecord>().fetch_all(&self.pool).await
    }

    /// submit_attendance
    ///
    /// Record and verification request share one transaction: a failure on the
    /// second insert rolls back the first.
    async fn submit_attendance(
        &self,
        record: NewAttendanceRecord,
        class_rep_id: Option<Uuid>,
    ) -> RepoResult<(AttendanceRecord, VerificationRequest)> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "INSERT INTO attendance_records \
                (id, schedule_id, course_id, class_group_id, lecturer_id, session_date, session_mode, \
                 status, verification_status, submitted_at, latitude, longitude, distance_meters, \
                 location_verified, meeting_url, actual_duration_minutes, duration_verified, topic, remarks) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {ATTENDANCE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(record.schedule_id)
        .bind(record.course_id)
        .bind(record.class_group_id)
        .bind(record.lecturer_id)
        .bind(record.session_date)
        .bind(record.session_mode)
        .bind(record.status)
        .bind(record.submitted_at)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.distance_meters)
        .bind(record.location_verified)
        .bind(record.meeting_url)
        .bind(record.actual_duration_minutes)
        .bind(record.duration_verified)
        .bind(record.topic)
        .bind(record.remarks)
        .fetch_one(&mut *tx)
        .await?;

        let request = sqlx::query_as::<_, VerificationRequest>(&format!(
            "INSERT INTO verification_requests \
                (id, attendance_id, class_rep_id, lecturer_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 'pending', NOW(), NOW()) RETURNING {VERIFICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(saved.id)
        .bind(class_rep_id)
        .bind(saved.lecturer_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((saved, request))
    }

    // --- Verification workflow ---

    async fn list_verification_requests(&self, filter: VerificationFilter) -> RepoResult<Vec<VerificationRequest>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM verification_requests v \
             JOIN attendance_records a ON v.attendance_id = a.id \
             JOIN courses c ON a.course_id = c.id WHERE 1 = 1",
            prefixed(VERIFICATION_COLUMNS, "v")
        ));
        if let Some(lecturer_id) = filter.lecturer_id {
            builder.push(" AND v.lecturer_id = ").push_bind(lecturer_id);
        }
        if let Some(class_group_id) = filter.class_group_id {
            builder.push(" AND a.class_group_id = ").push_bind(class_group_id);
        }
        if let Some(programme_id) = filter.programme_id {
            builder.push(" AND c.programme_id = ").push_bind(programme_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND v.status = ").push_bind(status);
        }
        builder.push(" ORDER BY v.created_at DESC");
        builder.build_query_as::<VerificationRequest>().fetch_all(&self.pool).await
    }

    async fn get_verification_request(&self, id: Uuid) -> RepoResult<Option<VerificationRequest>> {
        sqlx::query_as::<_, VerificationRequest>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM verification_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// apply_verification_decision
    ///
    /// The `status = expected` guard on the UPDATE makes the transition a
    /// compare-and-set: a concurrent decision leaves zero rows and we return `None`.
    async fn apply_verification_decision(
        &self,
        decision: VerificationDecision,
    ) -> RepoResult<Option<VerificationRequest>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, VerificationRequest>(&format!(
            "UPDATE verification_requests SET \
                status = $3, \
                reviewer_id = $4, \
                reviewer_comment = COALESCE($5, reviewer_comment), \
                dispute_reason = COALESCE($6, dispute_reason), \
                updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {VERIFICATION_COLUMNS}"
        ))
        .bind(decision.request_id)
        .bind(decision.expected_status)
        .bind(decision.request_status)
        .bind(decision.reviewer_id)
        .bind(decision.reviewer_comment)
        .bind(decision.dispute_reason)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("UPDATE attendance_records SET verification_status = $2 WHERE id = $1")
            .bind(request.attendance_id)
            .bind(decision.record_status)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(request))
    }

    // --- Notifications ---

    async fn create_notification(&self, notification: NewNotification) -> RepoResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, user_id, kind, title, message, link, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, false, NOW()) \
             RETURNING id, user_id, kind, title, message, link, is_read, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(notification.title)
        .bind(notification.message)
        .bind(notification.link)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_notifications(&self, user_id: Uuid, unread_only: bool) -> RepoResult<Vec<Notification>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, user_id, kind, title, message, link, is_read, created_at \
             FROM notifications WHERE user_id = ",
        );
        builder.push_bind(user_id);
        if unread_only {
            builder.push(" AND is_read = false");
        }
        builder.push(" ORDER BY created_at DESC");
        builder.build_query_as::<Notification>().fetch_all(&self.pool).await
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // --- Audit ---

    async fn insert_audit_log(&self, log: NewAuditLog) -> RepoResult<AuditLog> {
        sqlx::query_as::<_, AuditLog>(&format!(
            "INSERT INTO audit_logs (id, user_id, action, entity_type, entity_id, details, ip_address, risk_score, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) RETURNING {AUDIT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(log.user_id)
        .bind(log.action)
        .bind(log.entity_type)
        .bind(log.entity_id)
        .bind(log.details)
        .bind(log.ip_address)
        .bind(log.risk_score)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_audit_logs(&self, filter: AuditLogFilter) -> RepoResult<Vec<AuditLog>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE 1 = 1"));
        if let Some(user_id) = filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(action) = filter.action {
            builder.push(" AND action = ").push_bind(action.to_ascii_uppercase());
        }
        if let Some(min_risk) = filter.min_risk {
            builder.push(" AND risk_score >= ").push_bind(min_risk);
        }
        builder.push(" ORDER BY created_at DESC LIMIT ").push_bind(filter.limit);
        builder.build_query_as::<AuditLog>().fetch_all(&self.pool).await
    }

    // --- Reporting ---

    async fn attendance_report_rows(&self, filter: AttendanceFilter) -> RepoResult<Vec<AttendanceReportRow>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT a.id AS attendance_id, a.session_date, a.course_id, c.code AS course_code, \
                    c.title AS course_title, a.class_group_id, g.name AS class_group_name, \
                    a.lecturer_id, u.full_name AS lecturer_name, a.session_mode, a.status, \
                    a.verification_status, a.distance_meters \
             FROM attendance_records a \
             JOIN courses c ON a.course_id = c.id \
             JOIN class_groups g ON a.class_group_id = g.id \
             JOIN users u ON a.lecturer_id = u.id \
             WHERE 1 = 1",
        );
        push_attendance_filter(&mut builder, &filter);
        builder.push(" ORDER BY a.session_date ASC, c.code ASC");
        builder.build_query_as::<AttendanceReportRow>().fetch_all(&self.pool).await
    }

    async fn get_stats(&self) -> RepoResult<DashboardStats> {
        let count = |sql: &'static str| sqlx::query_scalar::<Postgres, i64>(sql).fetch_one(&self.pool);

        Ok(DashboardStats {
            total_users: count("SELECT COUNT(*) FROM users").await?,
            total_programmes: count("SELECT COUNT(*) FROM programmes").await?,
            total_courses: count("SELECT COUNT(*) FROM courses").await?,
            active_schedules: count("SELECT COUNT(*) FROM course_schedules WHERE is_active = true").await?,
            attendance_records: count("SELECT COUNT(*) FROM attendance_records").await?,
            pending_verifications: count("SELECT COUNT(*) FROM verification_requests WHERE status = 'pending'").await?,
            open_disputes: count("SELECT COUNT(*) FROM verification_requests WHERE status = 'disputed'").await?,
        })
    }
}
