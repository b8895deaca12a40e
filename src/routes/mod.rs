/// Router Module Index
///
/// Routing is split by access level. Authentication is applied per module as an
/// Axum layer in `create_router`; permission checks happen inside the handlers.

/// Unauthenticated routes (health check only).
pub mod public;

/// Routes behind the `AuthUser` extractor middleware.
pub mod authenticated;

/// Administration routes, nested under `/admin`.
pub mod admin;
