use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Account provisioning, dashboard counters and the audit trail. The router is
/// wrapped by the authentication layer in `create_router`; each handler then
/// requires `ManageUsers` or `ViewAuditLogs`, which only admins hold.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /admin/users
        // Lists accounts (optionally by role) or provisions a new one with the identity provider.
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        // PUT /admin/users/{id}
        // Profile, role, assignment and activation changes.
        .route("/users/{id}", put(handlers::users::update_user))
        // POST /admin/lecturers
        // Attaches staff details to a lecturer account.
        .route("/lecturers", post(handlers::users::create_lecturer))
        // GET /admin/stats
        .route("/stats", get(handlers::users::get_admin_stats))
        // GET /admin/audit-logs?user_id=&action=&min_risk=&limit=
        .route("/audit-logs", get(handlers::audit_logs::list_audit_logs))
}
