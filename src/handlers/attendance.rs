use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{attendance_scope, can_view_record, record_programme};
use crate::{
    AppState,
    attendance::{campus_instant, classify_arrival},
    audit::{self, AuditAction, AuditEntry, ClientIp},
    auth::AuthUser,
    error::{ApiError, ApiResult},
    geolocation::{Coordinates, LocationVerdict, verify_location},
    models::{
        AttendanceRecord, CourseSchedule, LocationCheckRequest, RecordVerificationStatus, Role,
        SessionMode, SubmitAttendanceRequest, SubmitAttendanceResponse, VirtualCheckRequest,
        VirtualCheckResponse,
    },
    notifications::{NotificationKind, notify},
    permissions::Permission,
    repository::{AttendanceFilter, NewAttendanceRecord},
    virtual_verification::{check_duration, check_time_window, validate_meeting_url},
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AttendanceListQuery {
    pub course_id: Option<Uuid>,
    pub class_group_id: Option<Uuid>,
    pub lecturer_id: Option<Uuid>,
    pub verification_status: Option<RecordVerificationStatus>,
    #[param(value_type = Option<String>, example = "2025-09-01")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, example = "2025-09-30")]
    pub to: Option<NaiveDate>,
}

/// Scheduled start and end of one occurrence, as UTC instants.
fn session_bounds(
    state: &AppState,
    schedule: &CourseSchedule,
    date: NaiveDate,
) -> ApiResult<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)> {
    let offset = state.config.campus_utc_offset_minutes;
    let start = campus_instant(date, schedule.start_time, offset);
    let end = campus_instant(date, schedule.end_time, offset);
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(ApiError::BadRequest("invalid campus UTC offset".to_string())),
    }
}

/// Loads a schedule the caller is allowed to check in against.
async fn own_schedule(state: &AppState, user: &AuthUser, schedule_id: Uuid) -> ApiResult<CourseSchedule> {
    let schedule = state
        .repo
        .get_schedule(schedule_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| ApiError::not_found("schedule"))?;

    if schedule.lecturer_id != user.id && user.role != Role::Admin {
        return Err(ApiError::Forbidden("this schedule belongs to another lecturer".to_string()));
    }
    Ok(schedule)
}

/// submit_attendance
///
/// [Authenticated Route] Lecturer check-in for one session.
///
/// 1. The schedule must be active and the caller's, and the date must fall on its weekday.
/// 2. One record per (schedule, date).
/// 3. Within the window the lecturer is present; after it, late until the session ends.
/// 4. Physical sessions must be on campus; virtual ones need an approved meeting host.
/// 5. The record and its verification request are saved together, then the class rep
///    is notified.
#[utoipa::path(
    post,
    path = "/attendance",
    request_body = SubmitAttendanceRequest,
    responses(
        (status = 201, description = "Attendance recorded", body = SubmitAttendanceResponse),
        (status = 403, description = "Not the scheduled lecturer"),
        (status = 404, description = "Schedule not found"),
        (status = 409, description = "Already submitted for this session"),
        (status = 422, description = "Outside the window, off campus or invalid meeting link")
    )
)]
pub async fn submit_attendance(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAttendanceRequest>,
) -> ApiResult<(StatusCode, Json<SubmitAttendanceResponse>)> {
    user.require(Permission::SubmitAttendance)?;
    payload.validate()?;

    let schedule = own_schedule(&state, &user, payload.schedule_id).await?;

    if !schedule.occurs_on(payload.session_date) {
        return Err(ApiError::Validation(format!(
            "{} is not a scheduled day for this course (expected ISO weekday {})",
            payload.session_date, schedule.day_of_week
        )));
    }

    if state
        .repo
        .find_attendance_for_session(schedule.id, payload.session_date)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("attendance already submitted for this session".to_string()));
    }

    let now = Utc::now();
    let (start, end) = session_bounds(&state, &schedule, payload.session_date)?;
    let status = classify_arrival(now, start, end, state.config.attendance_window_minutes)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let mut record = NewAttendanceRecord {
        schedule_id: schedule.id,
        course_id: schedule.course_id,
        class_group_id: schedule.class_group_id,
        lecturer_id: schedule.lecturer_id,
        session_date: payload.session_date,
        session_mode: schedule.session_mode,
        status,
        submitted_at: now,
        topic: payload.topic.clone(),
        remarks: payload.remarks.clone(),
        ..NewAttendanceRecord::default()
    };
    let mut location = None;
    let mut duration = None;

    match schedule.session_mode {
        SessionMode::Physical => {
            let position = payload.coordinates()?.ok_or_else(|| {
                ApiError::Validation("physical sessions require latitude and longitude".to_string())
            })?;
            let verdict = verify_location(position, state.config.campus_center, state.config.campus_radius_meters);

            if !verdict.within_radius {
                tracing::warn!(
                    lecturer_id = %user.id,
                    schedule_id = %schedule.id,
                    distance_meters = verdict.distance_meters,
                    "check-in rejected: outside campus radius"
                );
                audit::record(
                    &state.repo,
                    AuditEntry::new(user.id, AuditAction::LocationCheckFailed, "schedule", Some(schedule.id))
                        .details(json!({
                            "distance_meters": verdict.distance_meters,
                            "radius_meters": state.config.campus_radius_meters,
                            "session_date": payload.session_date,
                        }))
                        .ip(&ip),
                )
                .await;
                return Err(ApiError::Validation(format!(
                    "you are {:.0} m from campus; check-in is limited to {:.0} m",
                    verdict.distance_meters, state.config.campus_radius_meters
                )));
            }

            record.latitude = Some(position.latitude);
            record.longitude = Some(position.longitude);
            record.distance_meters = Some(verdict.distance_meters);
            record.location_verified = Some(true);
            location = Some(verdict);
        }
        SessionMode::Virtual => {
            let meeting_url = payload
                .meeting_url
                .clone()
                .or_else(|| schedule.meeting_url.clone())
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| ApiError::Validation("virtual sessions require a meeting_url".to_string()))?;

            if let Err(e) = validate_meeting_url(&meeting_url, &state.config.virtual_allowed_hosts) {
                tracing::warn!(lecturer_id = %user.id, schedule_id = %schedule.id, error = %e, "check-in rejected: meeting link");
                audit::record(
                    &state.repo,
                    AuditEntry::new(user.id, AuditAction::VirtualCheckFailed, "schedule", Some(schedule.id))
                        .details(json!({ "meeting_url": meeting_url, "reason": e.to_string() }))
                        .ip(&ip),
                )
                .await;
                return Err(ApiError::Validation(e.to_string()));
            }

            // Too short a session is flagged for reviewers, not refused.
            if let Some(actual) = payload.actual_duration_minutes {
                let check = check_duration(
                    actual,
                    schedule.duration_minutes(),
                    state.config.virtual_min_duration_ratio,
                );
                record.actual_duration_minutes = Some(actual);
                record.duration_verified = Some(check.meets_threshold);
                duration = Some(check);
            }
            record.meeting_url = Some(meeting_url);
        }
    }

    let class_rep = state.repo.find_class_rep(schedule.class_group_id).await?;
    let (saved, verification_request) = state
        .repo
        .submit_attendance(record, class_rep.as_ref().map(|u| u.id))
        .await?;

    tracing::info!(
        attendance_id = %saved.id,
        lecturer_id = %saved.lecturer_id,
        status = saved.status.as_str(),
        "attendance submitted"
    );

    match &class_rep {
        Some(rep) => {
            notify(
                &state.repo,
                rep.id,
                NotificationKind::AttendanceSubmitted,
                "Attendance awaiting verification",
                format!(
                    "A lecture on {} was recorded as {}. Please confirm or dispute it.",
                    saved.session_date,
                    saved.status.as_str()
                ),
                Some(format!("/verification-requests/{}", verification_request.id)),
            )
            .await;
        }
        None => tracing::warn!(
            class_group_id = %saved.class_group_id,
            "no class rep assigned; verification request is unaddressed"
        ),
    }

    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::AttendanceSubmitted, "attendance", Some(saved.id))
            .details(json!({
                "schedule_id": saved.schedule_id,
                "session_date": saved.session_date,
                "status": saved.status,
                "session_mode": saved.session_mode,
                "duration_verified": saved.duration_verified,
            }))
            .ip(&ip),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(SubmitAttendanceResponse {
            record: saved,
            verification_request,
            location,
            duration,
        }),
    ))
}

/// check_location
///
/// Geofence preview: reports the distance to campus without recording anything.
#[utoipa::path(
    post,
    path = "/attendance/check-location",
    request_body = LocationCheckRequest,
    responses(
        (status = 200, description = "Location verdict", body = LocationVerdict),
        (status = 422, description = "Coordinates out of range")
    )
)]
pub async fn check_location(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<LocationCheckRequest>,
) -> ApiResult<Json<LocationVerdict>> {
    user.require(Permission::SubmitAttendance)?;
    let position =
        Coordinates::new(payload.latitude, payload.longitude).map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok(Json(verify_location(
        position,
        state.config.campus_center,
        state.config.campus_radius_meters,
    )))
}

/// check_virtual
///
/// Preview of the window, meeting link and duration checks for a virtual session.
#[utoipa::path(
    post,
    path = "/attendance/check-virtual",
    request_body = VirtualCheckRequest,
    responses(
        (status = 200, description = "Virtual session verdict", body = VirtualCheckResponse),
        (status = 403, description = "Not the scheduled lecturer"),
        (status = 404, description = "Schedule not found")
    )
)]
pub async fn check_virtual(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<VirtualCheckRequest>,
) -> ApiResult<Json<VirtualCheckResponse>> {
    user.require(Permission::SubmitAttendance)?;
    let schedule = own_schedule(&state, &user, payload.schedule_id).await?;

    let (start, _) = session_bounds(&state, &schedule, payload.session_date)?;
    let window = check_time_window(Utc::now(), start, state.config.attendance_window_minutes);

    let meeting_url = payload.meeting_url.or_else(|| schedule.meeting_url.clone());
    let (meeting_host, meeting_url_error) = match meeting_url.as_deref() {
        Some(url) => match validate_meeting_url(url, &state.config.virtual_allowed_hosts) {
            Ok(host) => (Some(host), None),
            Err(e) => (None, Some(e.to_string())),
        },
        None => (None, Some("no meeting link provided".to_string())),
    };

    let duration = payload.actual_duration_minutes.map(|actual| {
        check_duration(
            actual,
            schedule.duration_minutes(),
            state.config.virtual_min_duration_ratio,
        )
    });

    Ok(Json(VirtualCheckResponse {
        window,
        meeting_host,
        meeting_url_error,
        duration,
    }))
}

/// list_attendance
///
/// Scoped to the caller: see `attendance_scope`.
#[utoipa::path(
    get,
    path = "/attendance",
    params(AttendanceListQuery),
    responses((status = 200, description = "Attendance records", body = [AttendanceRecord]))
)]
pub async fn list_attendance(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AttendanceListQuery>,
) -> ApiResult<Json<Vec<AttendanceRecord>>> {
    let filter = attendance_scope(
        &user,
        AttendanceFilter {
            schedule_id: None,
            lecturer_id: query.lecturer_id,
            course_id: query.course_id,
            class_group_id: query.class_group_id,
            programme_id: None,
            verification_status: query.verification_status,
            from: query.from,
            to: query.to,
        },
    )?;
    Ok(Json(state.repo.list_attendance(filter).await?))
}

/// get_attendance
///
/// Records outside the caller's scope are reported as missing.
#[utoipa::path(
    get,
    path = "/attendance/{id}",
    responses(
        (status = 200, description = "Attendance record", body = AttendanceRecord),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_attendance(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AttendanceRecord>> {
    let record = state
        .repo
        .get_attendance(id)
        .await?
        .ok_or_else(|| ApiError::not_found("attendance record"))?;

    let programme_id = record_programme(&state.repo, &record).await?;
    if !can_view_record(&user, &record, programme_id) {
        return Err(ApiError::not_found("attendance record"));
    }
    Ok(Json(record))
}
