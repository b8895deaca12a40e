//! HTTP handlers, grouped by resource. Every handler resolves the caller through the
//! `AuthUser` extractor and checks a `Permission` before touching the repository.

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{AttendanceRecord, Role},
    permissions::Permission,
    repository::{AttendanceFilter, RepositoryState},
};

pub mod attendance;
pub mod audit_logs;
pub mod catalog;
pub mod notifications;
pub mod reports;
pub mod schedules;
pub mod users;
pub mod verification;

/// attendance_scope
///
/// Narrows an attendance filter to what the caller may see: lecturers their own
/// records, class reps their class group, coordinators their programme, and other
/// `ViewAllAttendance` holders everything.
pub(crate) fn attendance_scope(user: &AuthUser, mut filter: AttendanceFilter) -> ApiResult<AttendanceFilter> {
    if user.can(Permission::ViewAllAttendance) {
        if user.role == Role::Coordinator && user.programme_id.is_some() {
            filter.programme_id = user.programme_id;
        }
        return Ok(filter);
    }

    match user.role {
        Role::ClassRep => {
            let group = user
                .class_group_id
                .ok_or_else(|| ApiError::Forbidden("class rep is not assigned to a class group".to_string()))?;
            filter.class_group_id = Some(group);
        }
        _ => filter.lecturer_id = Some(user.id),
    }
    Ok(filter)
}

/// Single-record form of `attendance_scope`. `record_programme_id` is the programme of
/// the record's course.
pub(crate) fn can_view_record(user: &AuthUser, record: &AttendanceRecord, record_programme_id: Option<Uuid>) -> bool {
    if user.can(Permission::ViewAllAttendance) {
        return !(user.role == Role::Coordinator
            && user.programme_id.is_some()
            && user.programme_id != record_programme_id);
    }
    match user.role {
        Role::ClassRep => user.class_group_id == Some(record.class_group_id),
        _ => record.lecturer_id == user.id,
    }
}

/// Programme of an attendance record, resolved through its course.
pub(crate) async fn record_programme(repo: &RepositoryState, record: &AttendanceRecord) -> ApiResult<Option<Uuid>> {
    Ok(repo.get_course(record.course_id).await?.map(|c| c.programme_id))
}

/// ensure_no_attendance
///
/// Refuses to delete catalog entries that attendance records point at. Those records
/// back the audit trail and reports; deactivate the schedule instead.
pub(crate) async fn ensure_no_attendance(
    repo: &RepositoryState,
    filter: AttendanceFilter,
    what: &str,
) -> ApiResult<()> {
    if !repo.list_attendance(filter).await?.is_empty() {
        return Err(ApiError::Conflict(format!(
            "{what} has recorded attendance and cannot be deleted; set is_active=false on its schedules instead"
        )));
    }
    Ok(())
}

/// Coordinators assigned to a programme may only manage resources inside it.
pub(crate) fn ensure_programme_access(user: &AuthUser, programme_id: Uuid) -> ApiResult<()> {
    if user.role == Role::Coordinator && user.programme_id.is_some() && user.programme_id != Some(programme_id) {
        return Err(ApiError::Forbidden(
            "coordinators can only manage their own programme".to_string(),
        ));
    }
    Ok(())
}
