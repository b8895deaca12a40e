use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

/// Authenticated Router Module
///
/// Everything a signed-in user can reach. Every handler receives a resolved
/// `AuthUser` and checks the permission it needs, so the same routes serve
/// lecturers, class reps, coordinators and supervisors with different scopes.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::users::get_me))
        // GET /lecturers
        // Directory of lecturer profiles joined with their accounts.
        .route("/lecturers", get(handlers::users::list_lecturers))
        // --- Academic structure ---
        .route(
            "/programmes",
            get(handlers::catalog::list_programmes).post(handlers::catalog::create_programme),
        )
        .route(
            "/programmes/{id}",
            put(handlers::catalog::update_programme).delete(handlers::catalog::delete_programme),
        )
        .route(
            "/class-groups",
            get(handlers::catalog::list_class_groups).post(handlers::catalog::create_class_group),
        )
        .route(
            "/class-groups/{id}",
            axum::routing::delete(handlers::catalog::delete_class_group),
        )
        .route(
            "/courses",
            get(handlers::catalog::list_courses).post(handlers::catalog::create_course),
        )
        .route(
            "/courses/{id}",
            get(handlers::catalog::get_course)
                .put(handlers::catalog::update_course)
                .delete(handlers::catalog::delete_course),
        )
        // Weekly timetable slots. Overlapping slots for a lecturer or class group are rejected.
        .route(
            "/schedules",
            get(handlers::schedules::list_schedules).post(handlers::schedules::create_schedule),
        )
        .route(
            "/schedules/{id}",
            get(handlers::schedules::get_schedule)
                .put(handlers::schedules::update_schedule)
                .delete(handlers::schedules::delete_schedule),
        )
        // --- Attendance ---
        // POST /attendance
        // Lecturer check-in: time window, then geofence or meeting-link checks.
        .route(
            "/attendance",
            get(handlers::attendance::list_attendance).post(handlers::attendance::submit_attendance),
        )
        // Dry runs of the checks, nothing is recorded.
        .route(
            "/attendance/check-location",
            post(handlers::attendance::check_location),
        )
        .route(
            "/attendance/check-virtual",
            post(handlers::attendance::check_virtual),
        )
        .route("/attendance/{id}", get(handlers::attendance::get_attendance))
        // --- Verification workflow ---
        .route(
            "/verification-requests",
            get(handlers::verification::list_verification_requests),
        )
        .route(
            "/verification-requests/{id}",
            get(handlers::verification::get_verification_request),
        )
        .route(
            "/verification-requests/{id}/approve",
            post(handlers::verification::approve),
        )
        .route(
            "/verification-requests/{id}/dispute",
            post(handlers::verification::dispute),
        )
        .route(
            "/verification-requests/{id}/resolve",
            post(handlers::verification::resolve),
        )
        .route(
            "/verification-requests/{id}/reject",
            post(handlers::verification::reject),
        )
        // --- Notifications ---
        .route("/notifications", get(handlers::notifications::list_notifications))
        // PATCH /notifications/{id}/read
        // Only the recipient can mark a notification; anyone else gets 404.
        .route(
            "/notifications/{id}/read",
            patch(handlers::notifications::mark_read),
        )
        .route(
            "/notifications/read-all",
            post(handlers::notifications::mark_all_read),
        )
        // --- Reports ---
        .route("/reports/summary", get(handlers::reports::summary))
        .route("/reports/lecturers", get(handlers::reports::lecturers))
        .route("/reports/courses", get(handlers::reports::courses))
        .route("/reports/trend", get(handlers::reports::trend))
        // GET /reports/export?format=csv|pdf
        .route("/reports/export", get(handlers::reports::export))
        // POST /reports/archive
        // Uploads the rendered export to object storage and returns a presigned link.
        .route("/reports/archive", post(handlers::reports::archive))
}
