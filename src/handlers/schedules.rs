use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{ensure_no_attendance, ensure_programme_access};
use crate::{
    AppState,
    audit::{self, AuditAction, AuditEntry, ClientIp},
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{
        CourseSchedule, CreateScheduleRequest, Role, SessionMode, UpdateScheduleRequest, validate_slot,
    },
    permissions::Permission,
    repository::{AttendanceFilter, RepositoryState, ScheduleFilter},
    virtual_verification::validate_meeting_url,
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ScheduleListQuery {
    pub lecturer_id: Option<Uuid>,
    pub class_group_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    /// ISO weekday, 1 = Monday.
    pub day_of_week: Option<i16>,
    /// Include deactivated slots (default false).
    #[serde(default)]
    pub include_inactive: bool,
}

/// ensure_lecturer
///
/// Schedules can only be assigned to active users with the lecturer role.
async fn ensure_lecturer(repo: &RepositoryState, lecturer_id: Uuid) -> ApiResult<()> {
    match repo.get_user(lecturer_id).await? {
        Some(user) if user.role == Role::Lecturer && user.is_active => Ok(()),
        Some(_) => Err(ApiError::Validation(
            "lecturer_id must reference an active user with the lecturer role".to_string(),
        )),
        None => Err(ApiError::Validation("lecturer_id does not reference an existing user".to_string())),
    }
}

fn ensure_meeting_url(mode: SessionMode, meeting_url: Option<&str>, allowed_hosts: &[String]) -> ApiResult<()> {
    if mode != SessionMode::Virtual {
        return Ok(());
    }
    let url = meeting_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("virtual schedules need a meeting_url".to_string()))?;
    validate_meeting_url(url, allowed_hosts)
        .map(|_| ())
        .map_err(|e| ApiError::Validation(e.to_string()))
}

/// ensure_no_overlap
///
/// A slot may not intersect another active slot of the same lecturer or the same class
/// group on the same day. `exclude` skips the schedule being updated.
async fn ensure_no_overlap(repo: &RepositoryState, candidate: &CourseSchedule, exclude: Option<Uuid>) -> ApiResult<()> {
    let same_day = |lecturer_id, class_group_id| ScheduleFilter {
        lecturer_id,
        class_group_id,
        day_of_week: Some(candidate.day_of_week),
        active_only: true,
        ..ScheduleFilter::default()
    };

    let lecturer_slots = repo.list_schedules(same_day(Some(candidate.lecturer_id), None)).await?;
    let group_slots = repo.list_schedules(same_day(None, Some(candidate.class_group_id))).await?;

    let clash = lecturer_slots
        .iter()
        .chain(group_slots.iter())
        .filter(|s| Some(s.id) != exclude)
        .find(|s| s.overlaps(candidate.day_of_week, candidate.start_time, candidate.end_time));

    match clash {
        Some(existing) => Err(ApiError::Conflict(format!(
            "slot overlaps schedule {} ({}-{})",
            existing.id, existing.start_time, existing.end_time
        ))),
        None => Ok(()),
    }
}

async fn course_programme(repo: &RepositoryState, course_id: Uuid) -> ApiResult<Uuid> {
    repo.get_course(course_id)
        .await?
        .map(|c| c.programme_id)
        .ok_or_else(|| ApiError::Validation("course_id does not reference an existing course".to_string()))
}

#[utoipa::path(
    get,
    path = "/schedules",
    params(ScheduleListQuery),
    responses((status = 200, description = "Schedules", body = [CourseSchedule]))
)]
pub async fn list_schedules(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ScheduleListQuery>,
) -> ApiResult<Json<Vec<CourseSchedule>>> {
    let filter = ScheduleFilter {
        lecturer_id: query.lecturer_id,
        class_group_id: query.class_group_id,
        course_id: query.course_id,
        day_of_week: query.day_of_week,
        active_only: !query.include_inactive,
    };
    Ok(Json(state.repo.list_schedules(filter).await?))
}

#[utoipa::path(
    get,
    path = "/schedules/{id}",
    responses(
        (status = 200, description = "Schedule", body = CourseSchedule),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_schedule(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CourseSchedule>> {
    let schedule = state
        .repo
        .get_schedule(id)
        .await?
        .ok_or_else(|| ApiError::not_found("schedule"))?;
    Ok(Json(schedule))
}

/// create_schedule
///
/// Adds a weekly slot after checking the lecturer's role and that neither the
/// lecturer nor the class group is already booked at that time.
#[utoipa::path(
    post,
    path = "/schedules",
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Schedule created", body = CourseSchedule),
        (status = 403, description = "Outside the coordinator's programme"),
        (status = 409, description = "Overlapping slot"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn create_schedule(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Json(payload): Json<CreateScheduleRequest>,
) -> ApiResult<(StatusCode, Json<CourseSchedule>)> {
    user.require(Permission::ManageSchedules)?;
    payload.validate()?;
    ensure_meeting_url(
        payload.session_mode,
        payload.meeting_url.as_deref(),
        &state.config.virtual_allowed_hosts,
    )?;

    let programme_id = course_programme(&state.repo, payload.course_id).await?;
    ensure_programme_access(&user, programme_id)?;
    ensure_lecturer(&state.repo, payload.lecturer_id).await?;

    let candidate = CourseSchedule {
        course_id: payload.course_id,
        class_group_id: payload.class_group_id,
        lecturer_id: payload.lecturer_id,
        day_of_week: payload.day_of_week,
        start_time: payload.start_time,
        end_time: payload.end_time,
        is_active: true,
        ..CourseSchedule::default()
    };
    ensure_no_overlap(&state.repo, &candidate, None).await?;

    let schedule = state.repo.create_schedule(payload).await?;
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::ScheduleCreated, "schedule", Some(schedule.id))
            .details(json!({
                "course_id": schedule.course_id,
                "lecturer_id": schedule.lecturer_id,
                "day_of_week": schedule.day_of_week,
            }))
            .ip(&ip),
    )
    .await;

    Ok((StatusCode::CREATED, Json(schedule)))
}

#[utoipa::path(
    put,
    path = "/schedules/{id}",
    request_body = UpdateScheduleRequest,
    responses(
        (status = 200, description = "Schedule updated", body = CourseSchedule),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Overlapping slot"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn update_schedule(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScheduleRequest>,
) -> ApiResult<Json<CourseSchedule>> {
    user.require(Permission::ManageSchedules)?;

    let current = state
        .repo
        .get_schedule(id)
        .await?
        .ok_or_else(|| ApiError::not_found("schedule"))?;
    let programme_id = course_programme(&state.repo, current.course_id).await?;
    ensure_programme_access(&user, programme_id)?;

    let next = payload.apply_to(&current);
    validate_slot(next.day_of_week, next.start_time, next.end_time)?;
    ensure_meeting_url(
        next.session_mode,
        next.meeting_url.as_deref(),
        &state.config.virtual_allowed_hosts,
    )?;
    if next.lecturer_id != current.lecturer_id {
        ensure_lecturer(&state.repo, next.lecturer_id).await?;
    }
    if next.is_active {
        ensure_no_overlap(&state.repo, &next, Some(id)).await?;
    }

    let schedule = state
        .repo
        .update_schedule(next)
        .await?
        .ok_or_else(|| ApiError::not_found("schedule"))?;
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::ScheduleUpdated, "schedule", Some(id)).ip(&ip),
    )
    .await;

    Ok(Json(schedule))
}

#[utoipa::path(
    delete,
    path = "/schedules/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 409, description = "Attendance has been recorded against it"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_schedule(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    user.require(Permission::ManageSchedules)?;

    let current = state
        .repo
        .get_schedule(id)
        .await?
        .ok_or_else(|| ApiError::not_found("schedule"))?;
    let programme_id = course_programme(&state.repo, current.course_id).await?;
    ensure_programme_access(&user, programme_id)?;
    ensure_no_attendance(
        &state.repo,
        AttendanceFilter { schedule_id: Some(id), ..AttendanceFilter::default() },
        "schedule",
    )
    .await?;

    if !state.repo.delete_schedule(id).await? {
        return Err(ApiError::not_found("schedule"));
    }
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::ScheduleDeleted, "schedule", Some(id)).ip(&ip),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
