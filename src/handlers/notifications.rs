use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{Notification, UpdatedCountResponse},
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct NotificationListQuery {
    /// Only notifications not yet marked read.
    #[serde(default)]
    pub unread_only: bool,
}

/// list_notifications
///
/// The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/notifications",
    params(NotificationListQuery),
    responses((status = 200, description = "Notifications", body = [Notification]))
)]
pub async fn list_notifications(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.repo.list_notifications(user.id, query.unread_only).await?))
}

/// mark_read
///
/// Someone else's notification is reported as missing.
#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    responses(
        (status = 200, description = "Marked as read", body = UpdatedCountResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn mark_read(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UpdatedCountResponse>> {
    if !state.repo.mark_notification_read(id, user.id).await? {
        return Err(ApiError::not_found("notification"));
    }
    Ok(Json(UpdatedCountResponse { updated: 1 }))
}

#[utoipa::path(
    post,
    path = "/notifications/read-all",
    responses((status = 200, description = "Number of notifications marked read", body = UpdatedCountResponse))
)]
pub async fn mark_all_read(user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<UpdatedCountResponse>> {
    let updated = state.repo.mark_all_notifications_read(user.id).await?;
    tracing::debug!(user_id = %user.id, updated, "notifications marked read");
    Ok(Json(UpdatedCountResponse { updated }))
}
