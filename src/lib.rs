use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain rules. Pure functions, no I/O.
pub mod analytics;
pub mod attendance;
pub mod geolocation;
pub mod permissions;
pub mod verification;
pub mod virtual_verification;

// Services and infrastructure.
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod notifications;
pub mod repository;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{IdentityState, MockIdentityProvider, SupabaseIdentityProvider};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every `#[utoipa::path]` handler, served at
/// `/api-docs/openapi.json` and browsable through the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::get_me, handlers::users::list_users, handlers::users::create_user,
        handlers::users::update_user, handlers::users::create_lecturer, handlers::users::list_lecturers,
        handlers::users::get_admin_stats,
        handlers::catalog::list_programmes, handlers::catalog::create_programme,
        handlers::catalog::update_programme, handlers::catalog::delete_programme,
        handlers::catalog::list_class_groups, handlers::catalog::create_class_group,
        handlers::catalog::delete_class_group, handlers::catalog::list_courses,
        handlers::catalog::get_course, handlers::catalog::create_course,
        handlers::catalog::update_course, handlers::catalog::delete_course,
        handlers::schedules::list_schedules, handlers::schedules::get_schedule,
        handlers::schedules::create_schedule, handlers::schedules::update_schedule,
        handlers::schedules::delete_schedule,
        handlers::attendance::submit_attendance, handlers::attendance::check_location,
        handlers::attendance::check_virtual, handlers::attendance::list_attendance,
        handlers::attendance::get_attendance,
        handlers::verification::list_verification_requests,
        handlers::verification::get_verification_request, handlers::verification::approve,
        handlers::verification::dispute, handlers::verification::resolve,
        handlers::verification::reject,
        handlers::notifications::list_notifications, handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,
        handlers::audit_logs::list_audit_logs,
        handlers::reports::summary, handlers::reports::lecturers, handlers::reports::courses,
        handlers::reports::trend, handlers::reports::export, handlers::reports::archive
    ),
    components(
        schemas(
            models::Role, models::SessionMode, models::AttendanceStatus,
            models::RecordVerificationStatus, models::VerificationRequestStatus,
            models::User, models::Lecturer, models::LecturerDirectoryEntry, models::Programme,
            models::ClassGroup, models::Course, models::CourseSchedule, models::AttendanceRecord,
            models::VerificationRequest, models::Notification, models::AuditLog,
            models::CreateUserRequest, models::UpdateUserRequest, models::CreateLecturerRequest,
            models::CreateProgrammeRequest, models::UpdateProgrammeRequest,
            models::CreateClassGroupRequest, models::CreateCourseRequest, models::UpdateCourseRequest,
            models::CreateScheduleRequest, models::UpdateScheduleRequest,
            models::SubmitAttendanceRequest, models::SubmitAttendanceResponse,
            models::LocationCheckRequest, models::VirtualCheckRequest, models::VirtualCheckResponse,
            models::DisputeRequest, models::ReviewDecisionRequest, models::DashboardStats,
            models::UpdatedCountResponse, models::ArchivedReportResponse,
            geolocation::Coordinates, geolocation::LocationVerdict,
            virtual_verification::WindowCheck, virtual_verification::DurationCheck,
            analytics::AttendanceSummary, analytics::LecturerStat, analytics::CourseStat,
            analytics::TrendPoint, analytics::ReportPeriod, export::ExportFormat,
            verification::VerificationAction,
        )
    ),
    tags(
        (name = "attendance-portal", description = "Lecture Attendance Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: one cloneable container with every
/// service a handler may need, shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Storage Layer: S3/MinIO for archived report exports.
    pub storage: StorageState,
    /// Identity provider used when an admin provisions an account.
    pub identity: IdentityState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 before it reaches a handler when `AuthUser` cannot
/// be extracted (missing or invalid token, unknown or inactive user).
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: Protected by the `auth_middleware`.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin Routes: nested under '/admin', authenticated here and
        // permission-checked inside each handler.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `TraceLayer` span with the method, URI and `x-request-id` so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
