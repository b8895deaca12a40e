use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiResult,
    models::AuditLog,
    permissions::Permission,
    repository::AuditLogFilter,
};

pub const DEFAULT_AUDIT_LIMIT: i64 = 100;
pub const MAX_AUDIT_LIMIT: i64 = 500;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AuditLogQuery {
    pub user_id: Option<Uuid>,
    /// Exact action name, e.g. `USER_DEACTIVATED`.
    pub action: Option<String>,
    /// Only entries scored at least this high.
    pub min_risk: Option<i16>,
    /// Defaults to 100, capped at 500.
    pub limit: Option<i64>,
}

/// list_audit_logs
///
/// [Admin Route] Newest first.
#[utoipa::path(
    get,
    path = "/admin/audit-logs",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Audit trail", body = [AuditLog]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_audit_logs(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    user.require(Permission::ViewAuditLogs)?;

    let filter = AuditLogFilter {
        user_id: query.user_id,
        action: query.action.map(|a| a.trim().to_uppercase()).filter(|a| !a.is_empty()),
        min_risk: query.min_risk,
        limit: query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT),
    };
    Ok(Json(state.repo.list_audit_logs(filter).await?))
}
