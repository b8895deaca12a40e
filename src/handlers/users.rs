use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    audit::{self, AuditAction, AuditEntry, ClientIp},
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{
        CreateLecturerRequest, CreateUserRequest, DashboardStats, Lecturer, LecturerDirectoryEntry,
        Role, UpdateUserRequest, User,
    },
    permissions::Permission,
    repository::NewUser,
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    /// Only users with this role.
    pub role: Option<Role>,
}

/// get_me
///
/// The caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_me(user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<User>> {
    let profile = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<Vec<User>>> {
    user.require(Permission::ManageUsers)?;
    Ok(Json(state.repo.list_users(query.role).await?))
}

/// create_user
///
/// [Admin Route] Provisions the login with the identity provider, then stores the
/// portal profile under the id the provider returned.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid payload"),
        (status = 502, description = "Identity provider failure")
    )
)]
pub async fn create_user(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    user.require(Permission::ManageUsers)?;
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();

    // Profile constraints are checked before the login is created.
    if state.repo.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(format!("{email} is already registered")));
    }
    if let Some(programme_id) = payload.programme_id {
        if state.repo.get_programme(programme_id).await?.is_none() {
            return Err(ApiError::Validation(format!("programme {programme_id} does not exist")));
        }
    }
    if let Some(class_group_id) = payload.class_group_id {
        if state.repo.get_class_group(class_group_id).await?.is_none() {
            return Err(ApiError::Validation(format!("class group {class_group_id} does not exist")));
        }
    }

    let account_id = state
        .identity
        .create_account(&email, &payload.password)
        .await
        .map_err(ApiError::Identity)?;

    let created = state
        .repo
        .create_user(NewUser {
            id: account_id,
            email,
            full_name: payload.full_name,
            role: payload.role,
            programme_id: payload.programme_id,
            class_group_id: payload.class_group_id,
        })
        .await?;

    tracing::info!(user_id = %created.id, role = created.role.as_str(), "user provisioned");
    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::UserCreated, "user", Some(created.id))
            .details(json!({ "email": created.email, "role": created.role }))
            .ip(&ip),
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}

/// update_user
///
/// [Admin Route] Partial profile update. Role changes and deactivations get their own
/// audit actions so they stand out in the trail.
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    user.require(Permission::ManageUsers)?;
    payload.validate()?;

    if id == user.id && (payload.is_active == Some(false) || payload.role.is_some_and(|r| r != user.role)) {
        return Err(ApiError::Forbidden(
            "you cannot deactivate or change the role of your own account".to_string(),
        ));
    }

    let before = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    let after = state
        .repo
        .update_user(id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    if before.role != after.role {
        audit::record(
            &state.repo,
            AuditEntry::new(user.id, AuditAction::RoleChanged, "user", Some(id))
                .details(json!({ "from": before.role, "to": after.role }))
                .ip(&ip),
        )
        .await;
    }
    if before.is_active && !after.is_active {
        audit::record(
            &state.repo,
            AuditEntry::new(user.id, AuditAction::UserDeactivated, "user", Some(id)).ip(&ip),
        )
        .await;
    }
    if before.role == after.role && before.is_active == after.is_active {
        audit::record(
            &state.repo,
            AuditEntry::new(user.id, AuditAction::UserUpdated, "user", Some(id)).ip(&ip),
        )
        .await;
    }

    Ok(Json(after))
}

/// create_lecturer
///
/// [Admin Route] Attaches staff details to an existing user whose role is `lecturer`.
#[utoipa::path(
    post,
    path = "/admin/lecturers",
    request_body = CreateLecturerRequest,
    responses(
        (status = 201, description = "Lecturer profile created", body = Lecturer),
        (status = 409, description = "Profile or staff number already exists"),
        (status = 422, description = "User is not a lecturer")
    )
)]
pub async fn create_lecturer(
    user: AuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Json(payload): Json<CreateLecturerRequest>,
) -> ApiResult<(StatusCode, Json<Lecturer>)> {
    user.require(Permission::ManageUsers)?;
    payload.validate()?;

    let owner = state
        .repo
        .get_user(payload.user_id)
        .await?
        .ok_or_else(|| ApiError::Validation("user_id does not reference an existing user".to_string()))?;
    if owner.role != Role::Lecturer {
        return Err(ApiError::Validation("lecturer profiles can only be attached to lecturers".to_string()));
    }

    let lecturer = state.repo.create_lecturer(payload).await?;

    audit::record(
        &state.repo,
        AuditEntry::new(user.id, AuditAction::LecturerProfileCreated, "lecturer", Some(lecturer.id))
            .details(json!({ "user_id": lecturer.user_id, "staff_number": lecturer.staff_number }))
            .ip(&ip),
    )
    .await;

    Ok((StatusCode::CREATED, Json(lecturer)))
}

#[utoipa::path(
    get,
    path = "/lecturers",
    responses((status = 200, description = "Lecturer directory", body = [LecturerDirectoryEntry]))
)]
pub async fn list_lecturers(
    _user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<LecturerDirectoryEntry>>> {
    Ok(Json(state.repo.list_lecturers().await?))
}

/// get_admin_stats
///
/// [Admin Route] Dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardStats),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn get_admin_stats(user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    user.require(Permission::ManageUsers)?;
    Ok(Json(state.repo.get_stats().await?))
}
