use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;
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
        DashboardStats, Lecturer, LecturerDirectoryEntry, Notification, Programme,
        RecordVerificationStatus, Role, UpdateCourseRequest, UpdateProgrammeRequest,
        UpdateUserRequest, User, VerificationRequest, VerificationRequestStatus, normalize_code,
    },
};

/// A constraint failure raised by the in-memory store, shaped like the Postgres one so
/// `ApiError::from(sqlx::Error)` maps it the same way.
#[derive(Debug, Error)]
#[error("{message}")]
struct ConstraintViolation {
    kind: ConstraintKind,
    message: String,
}

#[derive(Debug, Clone, Copy)]
enum ConstraintKind {
    Unique,
    ForeignKey,
}

impl DatabaseError for ConstraintViolation {
    fn message(&self) -> &str {
        &self.message
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        match self.kind {
            ConstraintKind::Unique => ErrorKind::UniqueViolation,
            ConstraintKind::ForeignKey => ErrorKind::ForeignKeyViolation,
        }
    }
}

fn unique_violation(what: &str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(ConstraintViolation {
        kind: ConstraintKind::Unique,
        message: format!("duplicate key value violates unique constraint on {what}"),
    }))
}

fn foreign_key_violation(what: &str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(ConstraintViolation {
        kind: ConstraintKind::ForeignKey,
        message: format!("violates foreign key constraint on {what}"),
    }))
}

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    lecturers: HashMap<Uuid, Lecturer>,
    programmes: HashMap<Uuid, Programme>,
    class_groups: HashMap<Uuid, ClassGroup>,
    courses: HashMap<Uuid, Course>,
    schedules: HashMap<Uuid, CourseSchedule>,
    attendance: HashMap<Uuid, AttendanceRecord>,
    verification_requests: HashMap<Uuid, VerificationRequest>,
    notifications: Vec<Notification>,
    audit_logs: Vec<AuditLog>,
}

impl Store {
    /// Mirrors the ON DELETE CASCADE chain of the schema after a parent row is removed.
    fn drop_orphans(&mut self) {
        let programmes = &self.programmes;
        self.class_groups.retain(|_, g| programmes.contains_key(&g.programme_id));
        self.courses.retain(|_, c| programmes.contains_key(&c.programme_id));

        let (courses, groups) = (&self.courses, &self.class_groups);
        self.schedules
            .retain(|_, s| courses.contains_key(&s.course_id) && groups.contains_key(&s.class_group_id));

        for user in self.users.values_mut() {
            if user.programme_id.is_some_and(|id| !self.programmes.contains_key(&id)) {
                user.programme_id = None;
            }
            if user.class_group_id.is_some_and(|id| !self.class_groups.contains_key(&id)) {
                user.class_group_id = None;
            }
        }
    }

    /// Attendance rows restrict deletes of anything they reference.
    fn attendance_references(&self, referenced: impl Fn(&AttendanceRecord) -> bool) -> bool {
        self.attendance.values().any(referenced)
    }

    /// The programme an attendance record belongs to, through its course.
    fn programme_of(&self, record: &AttendanceRecord) -> Option<Uuid> {
        self.courses.get(&record.course_id).map(|c| c.programme_id)
    }

    fn matches(&self, record: &AttendanceRecord, filter: &AttendanceFilter) -> bool {
        filter.schedule_id.is_none_or(|id| record.schedule_id == id)
            && filter.lecturer_id.is_none_or(|id| record.lecturer_id == id)
            && filter.course_id.is_none_or(|id| record.course_id == id)
            && filter.class_group_id.is_none_or(|id| record.class_group_id == id)
            && filter
                .programme_id
                .is_none_or(|id| self.programme_of(record) == Some(id))
            && filter
                .verification_status
                .is_none_or(|status| record.verification_status == status)
            && filter.from.is_none_or(|from| record.session_date >= from)
            && filter.to.is_none_or(|to| record.session_date <= to)
    }
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory. Used by the integration tests and
/// for running the API without a database. Enforces the same unique and foreign key
/// constraints as the Postgres schema.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- Users ---

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.store().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.store().users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, role: Option<Role>) -> RepoResult<Vec<User>> {
        let store = self.store();
        let mut users: Vec<User> = store
            .users
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store();
        let email = user.email.trim().to_lowercase();

        if store.users.contains_key(&user.id) || store.users.values().any(|u| u.email == email) {
            return Err(unique_violation("users"));
        }
        if user.programme_id.is_some_and(|id| !store.programmes.contains_key(&id)) {
            return Err(foreign_key_violation("users.programme_id"));
        }
        if user.class_group_id.is_some_and(|id| !store.class_groups.contains_key(&id)) {
            return Err(foreign_key_violation("users.class_group_id"));
        }

        let now = Utc::now();
        let created = User {
            id: user.id,
            email,
            full_name: user.full_name.trim().to_string(),
            role: user.role,
            programme_id: user.programme_id,
            class_group_id: user.class_group_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> RepoResult<Option<User>> {
        let mut store = self.store();
        if req.programme_id.is_some_and(|p| !store.programmes.contains_key(&p)) {
            return Err(foreign_key_violation("users.programme_id"));
        }
        if req.class_group_id.is_some_and(|g| !store.class_groups.contains_key(&g)) {
            return Err(foreign_key_violation("users.class_group_id"));
        }

        let Some(user) = store.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = req.full_name {
            user.full_name = name.trim().to_string();
        }
        if let Some(role) = req.role {
            user.role = role;
        }
        if let Some(programme_id) = req.programme_id {
            user.programme_id = Some(programme_id);
        }
        if let Some(class_group_id) = req.class_group_id {
            user.class_group_id = Some(class_group_id);
        }
        if let Some(active) = req.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn find_class_rep(&self, class_group_id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store();
        Ok(store
            .users
            .values()
            .filter(|u| u.role == Role::ClassRep && u.is_active && u.class_group_id == Some(class_group_id))
            .min_by_key(|u| u.created_at)
            .cloned())
    }

    // --- Lecturer profiles ---

    async fn create_lecturer(&self, req: CreateLecturerRequest) -> RepoResult<Lecturer> {
        let mut store = self.store();
        let staff_number = req.staff_number.trim().to_string();

        if !store.users.contains_key(&req.user_id) {
            return Err(foreign_key_violation("lecturers.user_id"));
        }
        if store
            .lecturers
            .values()
            .any(|l| l.user_id == req.user_id || l.staff_number == staff_number)
        {
            return Err(unique_violation("lecturers"));
        }

        let lecturer = Lecturer {
            id: Uuid::new_v4(),
            user_id: req.user_id,
            staff_number,
            department: req.department.trim().to_string(),
            created_at: Utc::now(),
        };
        store.lecturers.insert(lecturer.id, lecturer.clone());
        Ok(lecturer)
    }

    async fn list_lecturers(&self) -> RepoResult<Vec<LecturerDirectoryEntry>> {
        let store = self.store();
        let mut entries: Vec<LecturerDirectoryEntry> = store
            .lecturers
            .values()
            .filter_map(|l| {
                let user = store.users.get(&l.user_id).filter(|u| u.is_active)?;
                Some(LecturerDirectoryEntry {
                    id: l.id,
                    user_id: l.user_id,
                    full_name: user.full_name.clone(),
                    email: user.email.clone(),
                    staff_number: l.staff_number.clone(),
                    department: l.department.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(entries)
    }

    // --- Programmes & class groups ---

    async fn list_programmes(&self) -> RepoResult<Vec<Programme>> {
        let mut programmes: Vec<Programme> = self.store().programmes.values().cloned().collect();
        programmes.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(programmes)
    }

    async fn get_programme(&self, id: Uuid) -> RepoResult<Option<Programme>> {
        Ok(self.store().programmes.get(&id).cloned())
    }

    async fn create_programme(&self, req: CreateProgrammeRequest) -> RepoResult<Programme> {
        let mut store = self.store();
        let code = normalize_code(&req.code);
        if store.programmes.values().any(|p| p.code == code) {
            return Err(unique_violation("programmes.code"));
        }

        let programme = Programme {
            id: Uuid::new_v4(),
            code,
            name: req.name.trim().to_string(),
            department: req.department.trim().to_string(),
            created_at: Utc::now(),
        };
        store.programmes.insert(programme.id, programme.clone());
        Ok(programme)
    }

    async fn update_programme(&self, id: Uuid, req: UpdateProgrammeRequest) -> RepoResult<Option<Programme>> {
        let mut store = self.store();
        let Some(programme) = store.programmes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            programme.name = name.trim().to_string();
        }
        if let Some(department) = req.department {
            programme.department = department.trim().to_string();
        }
        Ok(Some(programme.clone()))
    }

    async fn delete_programme(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store();
        let groups = &store.class_groups;
        if store.attendance_references(|a| {
            store.programme_of(a) == Some(id) || groups.get(&a.class_group_id).is_some_and(|g| g.programme_id == id)
        }) {
            return Err(foreign_key_violation("attendance_records"));
        }
        let removed = store.programmes.remove(&id).is_some();
        if removed {
            store.drop_orphans();
        }
        Ok(removed)
    }

    async fn list_class_groups(&self, programme_id: Option<Uuid>) -> RepoResult<Vec<ClassGroup>> {
        let mut groups: Vec<ClassGroup> = self
            .store()
            .class_groups
            .values()
            .filter(|g| programme_id.is_none_or(|id| g.programme_id == id))
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.year_of_study.cmp(&b.year_of_study).then(a.name.cmp(&b.name)));
        Ok(groups)
    }

    async fn get_class_group(&self, id: Uuid) -> RepoResult<Option<ClassGroup>> {
        Ok(self.store().class_groups.get(&id).cloned())
    }

    async fn create_class_group(&self, req: CreateClassGroupRequest) -> RepoResult<ClassGroup> {
        let mut store = self.store();
        let name = req.name.trim().to_string();

        if !store.programmes.contains_key(&req.programme_id) {
            return Err(foreign_key_violation("class_groups.programme_id"));
        }
        if store
            .class_groups
            .values()
            .any(|g| g.programme_id == req.programme_id && g.name == name)
        {
            return Err(unique_violation("class_groups (programme_id, name)"));
        }

        let group = ClassGroup {
            id: Uuid::new_v4(),
            programme_id: req.programme_id,
            name,
            year_of_study: req.year_of_study,
            created_at: Utc::now(),
        };
        store.class_groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn delete_class_group(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store();
        if store.attendance_references(|a| a.class_group_id == id) {
            return Err(foreign_key_violation("attendance_records.class_group_id"));
        }
        let removed = store.class_groups.remove(&id).is_some();
        if removed {
            store.drop_orphans();
        }
        Ok(removed)
    }

    // --- Courses ---

    async fn list_courses(&self, programme_id: Option<Uuid>) -> RepoResult<Vec<Course>> {
        let mut courses: Vec<Course> = self
            .store()
            .courses
            .values()
            .filter(|c| programme_id.is_none_or(|id| c.programme_id == id))
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(courses)
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        Ok(self.store().courses.get(&id).cloned())
    }

    async fn create_course(&self, req: CreateCourseRequest) -> RepoResult<Course> {
        let mut store = self.store();
        let code = normalize_code(&req.code);

        if !store.programmes.contains_key(&req.programme_id) {
            return Err(foreign_key_violation("courses.programme_id"));
        }
        if store.courses.values().any(|c| c.code == code) {
            return Err(unique_violation("courses.code"));
        }

        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            code,
            title: req.title.trim().to_string(),
            programme_id: req.programme_id,
            credit_hours: req.credit_hours,
            created_at: now,
            updated_at: now,
        };
        store.courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn update_course(&self, id: Uuid, req: UpdateCourseRequest) -> RepoResult<Option<Course>> {
        let mut store = self.store();
        let Some(course) = store.courses.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            course.title = title.trim().to_string();
        }
        if let Some(credit_hours) = req.credit_hours {
            course.credit_hours = credit_hours;
        }
        course.updated_at = Utc::now();
        Ok(Some(course.clone()))
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store();
        if store.attendance_references(|a| a.course_id == id) {
            return Err(foreign_key_violation("attendance_records.course_id"));
        }
        let removed = store.courses.remove(&id).is_some();
        if removed {
            store.drop_orphans();
        }
        Ok(removed)
    }

    // --- Schedules ---

    async fn list_schedules(&self, filter: ScheduleFilter) -> RepoResult<Vec<CourseSchedule>> {
        let mut schedules: Vec<CourseSchedule> = self
            .store()
            .schedules
            .values()
            .filter(|s| {
                filter.lecturer_id.is_none_or(|id| s.lecturer_id == id)
                    && filter.class_group_id.is_none_or(|id| s.class_group_id == id)
                    && filter.course_id.is_none_or(|id| s.course_id == id)
                    && filter.day_of_week.is_none_or(|day| s.day_of_week == day)
                    && (!filter.active_only || s.is_active)
            })
            .cloned()
            .collect();
        schedules.sort_by(|a, b| a.day_of_week.cmp(&b.day_of_week).then(a.start_time.cmp(&b.start_time)));
        Ok(schedules)
    }

    async fn get_schedule(&self, id: Uuid) -> RepoResult<Option<CourseSchedule>> {
        Ok(self.store().schedules.get(&id).cloned())
    }

    async fn create_schedule(&self, req: CreateScheduleRequest) -> RepoResult<CourseSchedule> {
        let mut store = self.store();
        if !store.courses.contains_key(&req.course_id) {
            return Err(foreign_key_violation("course_schedules.course_id"));
        }
        if !store.class_groups.contains_key(&req.class_group_id) {
            return Err(foreign_key_violation("course_schedules.class_group_id"));
        }
        if !store.users.contains_key(&req.lecturer_id) {
            return Err(foreign_key_violation("course_schedules.lecturer_id"));
        }

        let now = Utc::now();
        let schedule = CourseSchedule {
            id: Uuid::new_v4(),
            course_id: req.course_id,
            class_group_id: req.class_group_id,
            lecturer_id: req.lecturer_id,
            day_of_week: req.day_of_week,
            start_time: req.start_time,
            end_time: req.end_time,
            venue: req.venue,
            session_mode: req.session_mode,
            meeting_url: req.meeting_url,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        store.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn update_schedule(&self, schedule: CourseSchedule) -> RepoResult<Option<CourseSchedule>> {
        let mut store = self.store();
        if !store.users.contains_key(&schedule.lecturer_id) {
            return Err(foreign_key_violation("course_schedules.lecturer_id"));
        }
        let Some(current) = store.schedules.get_mut(&schedule.id) else {
            return Ok(None);
        };
        current.lecturer_id = schedule.lecturer_id;
        current.day_of_week = schedule.day_of_week;
        current.start_time = schedule.start_time;
        current.end_time = schedule.end_time;
        current.venue = schedule.venue;
        current.session_mode = schedule.session_mode;
        current.meeting_url = schedule.meeting_url;
        current.is_active = schedule.is_active;
        current.updated_at = Utc::now();
        Ok(Some(current.clone()))
    }

    async fn delete_schedule(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store();
        if store.attendance_references(|a| a.schedule_id == id) {
            return Err(foreign_key_violation("attendance_records.schedule_id"));
        }
        let removed = store.schedules.remove(&id).is_some();
        if removed {
            store.drop_orphans();
        }
        Ok(removed)
    }

    // --- Attendance ---

    async fn get_attendance(&self, id: Uuid) -> RepoResult<Option<AttendanceRecord>> {
        Ok(self.store().attendance.get(&id).cloned())
    }

    async fn find_attendance_for_session(
        &self,
        schedule_id: Uuid,
        session_date: NaiveDate,
    ) -> RepoResult<Option<AttendanceRecord>> {
        Ok(self
            .store()
            .attendance
            .values()
            .find(|a| a.schedule_id == schedule_id && a.session_date == session_date)
            .cloned())
    }

    async fn list_attendance(&self, filter: AttendanceFilter) -> RepoResult<Vec<AttendanceRecord>> {
        let store = self.store();
        let mut records: Vec<AttendanceRecord> = store
            .attendance
            .values()
            .filter(|a| store.matches(a, &filter))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.session_date
                .cmp(&a.session_date)
                .then(b.submitted_at.cmp(&a.submitted_at))
        });
        Ok(records)
    }

    async fn submit_attendance(
        &self,
        record: NewAttendanceRecord,
        class_rep_id: Option<Uuid>,
    ) -> RepoResult<(AttendanceRecord, VerificationRequest)> {
        let mut store = self.store();
        if !store.schedules.contains_key(&record.schedule_id) {
            return Err(foreign_key_violation("attendance_records.schedule_id"));
        }
        if store
            .attendance
            .values()
            .any(|a| a.schedule_id == record.schedule_id && a.session_date == record.session_date)
        {
            return Err(unique_violation("attendance_records (schedule_id, session_date)"));
        }

        let saved = AttendanceRecord {
            id: Uuid::new_v4(),
            schedule_id: record.schedule_id,
            course_id: record.course_id,
            class_group_id: record.class_group_id,
            lecturer_id: record.lecturer_id,
            session_date: record.session_date,
            session_mode: record.session_mode,
            status: record.status,
            verification_status: RecordVerificationStatus::Pending,
            submitted_at: record.submitted_at,
            latitude: record.latitude,
            longitude: record.longitude,
            distance_meters: record.distance_meters,
            location_verified: record.location_verified,
            meeting_url: record.meeting_url,
            actual_duration_minutes: record.actual_duration_minutes,
            duration_verified: record.duration_verified,
            topic: record.topic,
            remarks: record.remarks,
        };

        let now = Utc::now();
        let request = VerificationRequest {
            id: Uuid::new_v4(),
            attendance_id: saved.id,
            class_rep_id,
            lecturer_id: saved.lecturer_id,
            status: VerificationRequestStatus::Pending,
            dispute_reason: None,
            reviewer_id: None,
            reviewer_comment: None,
            created_at: now,
            updated_at: now,
        };

        store.attendance.insert(saved.id, saved.clone());
        store.verification_requests.insert(request.id, request.clone());
        Ok((saved, request))
    }

    // --- Verification workflow ---

    async fn list_verification_requests(&self, filter: VerificationFilter) -> RepoResult<Vec<VerificationRequest>> {
        let store = self.store();
        let mut requests: Vec<VerificationRequest> = store
            .verification_requests
            .values()
            .filter(|v| {
                let Some(record) = store.attendance.get(&v.attendance_id) else {
                    return false;
                };
                filter.lecturer_id.is_none_or(|id| v.lecturer_id == id)
                    && filter.class_group_id.is_none_or(|id| record.class_group_id == id)
                    && filter
                        .programme_id
                        .is_none_or(|id| store.programme_of(record) == Some(id))
                    && filter.status.is_none_or(|status| v.status == status)
            })
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn get_verification_request(&self, id: Uuid) -> RepoResult<Option<VerificationRequest>> {
        Ok(self.store().verification_requests.get(&id).cloned())
    }

    async fn apply_verification_decision(
        &self,
        decision: VerificationDecision,
    ) -> RepoResult<Option<VerificationRequest>> {
        let mut store = self.store();
        let Some(request) = store.verification_requests.get_mut(&decision.request_id) else {
            return Ok(None);
        };
        if request.status != decision.expected_status {
            return Ok(None);
        }

        request.status = decision.request_status;
        request.reviewer_id = Some(decision.reviewer_id);
        if decision.reviewer_comment.is_some() {
            request.reviewer_comment = decision.reviewer_comment;
        }
        if decision.dispute_reason.is_some() {
            request.dispute_reason = decision.dispute_reason;
        }
        request.updated_at = Utc::now();
        let updated = request.clone();

        if let Some(record) = store.attendance.get_mut(&updated.attendance_id) {
            record.verification_status = decision.record_status;
        }
        Ok(Some(updated))
    }

    // --- Notifications ---

    async fn create_notification(&self, notification: NewNotification) -> RepoResult<Notification> {
        let mut store = self.store();
        if !store.users.contains_key(&notification.user_id) {
            return Err(foreign_key_violation("notifications.user_id"));
        }
        let created = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            link: notification.link,
            is_read: false,
            created_at: Utc::now(),
        };
        store.notifications.push(created.clone());
        Ok(created)
    }

    async fn list_notifications(&self, user_id: Uuid, unread_only: bool) -> RepoResult<Vec<Notification>> {
        let store = self.store();
        // Newest first; insertion order breaks timestamp ties.
        Ok(store
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store();
        match store
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> RepoResult<u64> {
        let mut store = self.store();
        let mut updated = 0;
        for notification in store
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    // --- Audit ---

    async fn insert_audit_log(&self, log: NewAuditLog) -> RepoResult<AuditLog> {
        let entry = AuditLog {
            id: Uuid::new_v4(),
            user_id: log.user_id,
            action: log.action,
            entity_type: log.entity_type,
            entity_id: log.entity_id,
            details: log.details,
            ip_address: log.ip_address,
            risk_score: log.risk_score,
            created_at: Utc::now(),
        };
        self.store().audit_logs.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit_logs(&self, filter: AuditLogFilter) -> RepoResult<Vec<AuditLog>> {
        let action = filter.action.map(|a| a.to_ascii_uppercase());
        let limit = usize::try_from(filter.limit).unwrap_or(0);
        Ok(self
            .store()
            .audit_logs
            .iter()
            .rev()
            .filter(|log| {
                filter.user_id.is_none_or(|id| log.user_id == Some(id))
                    && action.as_deref().is_none_or(|a| log.action == a)
                    && filter.min_risk.is_none_or(|min| log.risk_score >= min)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    // --- Reporting ---

    async fn attendance_report_rows(&self, filter: AttendanceFilter) -> RepoResult<Vec<AttendanceReportRow>> {
        let store = self.store();
        let mut rows: Vec<AttendanceReportRow> = store
            .attendance
            .values()
            .filter(|a| store.matches(a, &filter))
            .filter_map(|a| {
                let course = store.courses.get(&a.course_id)?;
                let group = store.class_groups.get(&a.class_group_id)?;
                let lecturer = store.users.get(&a.lecturer_id)?;
                Some(AttendanceReportRow {
                    attendance_id: a.id,
                    session_date: a.session_date,
                    course_id: course.id,
                    course_code: course.code.clone(),
                    course_title: course.title.clone(),
                    class_group_id: group.id,
                    class_group_name: group.name.clone(),
                    lecturer_id: lecturer.id,
                    lecturer_name: lecturer.full_name.clone(),
                    session_mode: a.session_mode,
                    status: a.status,
                    verification_status: a.verification_status,
                    distance_meters: a.distance_meters,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.session_date.cmp(&b.session_date).then(a.course_code.cmp(&b.course_code)));
        Ok(rows)
    }

    async fn get_stats(&self) -> RepoResult<DashboardStats> {
        let store = self.store();
        let count_requests = |status: VerificationRequestStatus| {
            store
                .verification_requests
                .values()
                .filter(|v| v.status == status)
                .count() as i64
        };

        Ok(DashboardStats {
            total_users: store.users.len() as i64,
            total_programmes: store.programmes.len() as i64,
            total_courses: store.courses.len() as i64,
            active_schedules: store.schedules.values().filter(|s| s.is_active).count() as i64,
            attendance_records: store.attendance.len() as i64,
            pending_verifications: count_requests(VerificationRequestStatus::Pending),
            open_disputes: count_requests(VerificationRequestStatus::Disputed),
        })
    }
}
