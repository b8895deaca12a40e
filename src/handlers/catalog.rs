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
        ClassGroup, Course, CreateClassGroupRequest, CreateCourseRequest, CreateProgrammeRequest,
        Programme, UpdateCourseRequest, UpdateProgrammeRequest,
    },
    permissions::Permission,
    repository::AttendanceFilter,
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ProgrammeScopeQuery {
    /// Only rows belonging to this programme.
    pub programme_id: Option<Uuid>,
}

// --- Programmes ---

#[utoipa::path(
    get,
    path = "/programmes",
    responses((status = 200, description = "All programmes", body = [Programme]))
)]
pub async fn list_programmes(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Programme>>> {
    Ok(Json(state.repo.list_programmes().await?))
}

#[utoipa::path(
    post,
    path = "/programmes",
    request_body = CreateProgrammeRequest,
    responses(
        (status = 201, description = "Programme created", body = Programme),
        (status = 409, description = "Code already in use"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn create_programme(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Json(payload): Json<CreateProgrammeRequest>,
) -> ApiResult<(StatusCode, Json<Programme>)> {
    user.require(Permission::ManageProgrammes)?;
    payload.validate()?;

    let programme = state.repo.create_programme(payload).await?;
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::ProgrammeCreated, "programme", Some(programme.id))
            .details(json!({ "code": programme.code }))
            .ip(&ip),
    )
    .await;

    Ok((StatusCode::CREATED, Json(programme)))
}

#[utoipa::path(
    put,
    path = "/programmes/{id}",
    request_body = UpdateProgrammeRequest,
    responses(
        (status = 200, description = "Programme updated", body = Programme),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_programme(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProgrammeRequest>,
) -> ApiResult<Json<Programme>> {
    user.require(Permission::ManageProgrammes)?;
    payload.validate()?;

    let programme = state
        .repo
        .update_programme(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("programme"))?;
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::ProgrammeUpdated, "programme", Some(id)).ip(&ip),
    )
    .await;

    Ok(Json(programme))
}

/// delete_programme
///
/// Cascades to the programme's class groups, courses and their schedules.
#[utoipa::path(
    delete,
    path = "/programmes/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 409, description = "Attendance has been recorded against it"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_programme(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    user.require(Permission::ManageProgrammes)?;
    ensure_no_attendance(
        &state.repo,
        AttendanceFilter { programme_id: Some(id), ..AttendanceFilter::default() },
        "programme",
    )
    .await?;

    if !state.repo.delete_programme(id).await? {
        return Err(ApiError::not_found("programme"));
    }
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::ProgrammeDeleted, "programme", Some(id)).ip(&ip),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// --- Class groups ---

#[utoipa::path(
    get,
    path = "/class-groups",
    params(ProgrammeScopeQuery),
    responses((status = 200, description = "Class groups", body = [ClassGroup]))
)]
pub async fn list_class_groups(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ProgrammeScopeQuery>,
) -> ApiResult<Json<Vec<ClassGroup>>> {
    Ok(Json(state.repo.list_class_groups(query.programme_id).await?))
}

#[utoipa::path(
    post,
    path = "/class-groups",
    request_body = CreateClassGroupRequest,
    responses(
        (status = 201, description = "Class group created", body = ClassGroup),
        (status = 409, description = "Name already used in this programme"),
        (status = 422, description = "Invalid payload or unknown programme")
    )
)]
pub async fn create_class_group(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Json(payload): Json<CreateClassGroupRequest>,
) -> ApiResult<(StatusCode, Json<ClassGroup>)> {
    user.require(Permission::ManageProgrammes)?;
    payload.validate()?;

    let group = state.repo.create_class_group(payload).await?;
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::ClassGroupCreated, "class_group", Some(group.id))
            .details(json!({ "programme_id": group.programme_id, "name": group.name }))
            .ip(&ip),
    )
    .await;

    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    delete,
    path = "/class-groups/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 409, description = "Attendance has been recorded against it"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_class_group(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    user.require(Permission::ManageProgrammes)?;
    ensure_no_attendance(
        &state.repo,
        AttendanceFilter { class_group_id: Some(id), ..AttendanceFilter::default() },
        "class group",
    )
    .await?;

    if !state.repo.delete_class_group(id).await? {
        return Err(ApiError::not_found("class group"));
    }
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::ClassGroupDeleted, "class_group", Some(id)).ip(&ip),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// --- Courses ---

#[utoipa::path(
    get,
    path = "/courses",
    params(ProgrammeScopeQuery),
    responses((status = 200, description = "Courses", body = [Course]))
)]
pub async fn list_courses(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ProgrammeScopeQuery>,
) -> ApiResult<Json<Vec<Course>>> {
    Ok(Json(state.repo.list_courses(query.programme_id).await?))
}

#[utoipa::path(
    get,
    path = "/courses/{id}",
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_course(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Course>> {
    let course = state
        .repo
        .get_course(id)
        .await?
        .ok_or_else(|| ApiError::not_found("course"))?;
    Ok(Json(course))
}

#[utoipa::path(
    post,
    path = "/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 403, description = "Outside the coordinator's programme"),
        (status = 409, description = "Code already in use")
    )
)]
pub async fn create_course(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Json(payload): Json<CreateCourseRequest>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    user.require(Permission::ManageCourses)?;
    payload.validate()?;
    ensure_programme_access(&user, payload.programme_id)?;

    let course = state.repo.create_course(payload).await?;
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::CourseCreated, "course", Some(course.id))
            .details(json!({ "code": course.code, "programme_id": course.programme_id }))
            .ip(&ip),
    )
    .await;

    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    put,
    path = "/courses/{id}",
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "Outside the coordinator's programme"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_course(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCourseRequest>,
) -> ApiResult<Json<Course>> {
    user.require(Permission::ManageCourses)?;
    payload.validate()?;

    let existing = state
        .repo
        .get_course(id)
        .await?
        .ok_or_else(|| ApiError::not_found("course"))?;
    ensure_programme_access(&user, existing.programme_id)?;

    let course = state
        .repo
        .update_course(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("course"))?;
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::CourseUpdated, "course", Some(id)).ip(&ip),
    )
    .await;

    Ok(Json(course))
}

#[utoipa::path(
    delete,
    path = "/courses/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 409, description = "Attendance has been recorded against it"),
        (status = 403, description = "Outside the coordinator's programme"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_course(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    user.require(Permission::ManageCourses)?;

    let existing = state
        .repo
        .get_course(id)
        .await?
        .ok_or_else(|| ApiError::not_found("course"))?;
    ensure_programme_access(&user, existing.programme_id)?;
    ensure_no_attendance(
        &state.repo,
        AttendanceFilter { course_id: Some(id), ..AttendanceFilter::default() },
        "course",
    )
    .await?;

    if !state.repo.delete_course(id).await? {
        return Err(ApiError::not_found("course"));
    }
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::CourseDeleted, "course", Some(id))
            .details(json!({ "code": existing.code }))
            .ip(&ip),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
