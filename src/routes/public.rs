use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token: liveness, account creation, login and read-only
/// event browsing.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        .route("/api/health", get(handlers::health))
        // POST /api/auth/register
        // Creates a student account. Any client-supplied role is ignored.
        .route("/api/auth/register", post(handlers::register_user))
        // POST /api/auth/login
        .route("/api/auth/login", post(handlers::login_user))
        // GET /api/events
        .route("/api/events", get(handlers::get_events))
        // GET /api/events/random
        // Static segment; matched ahead of `/api/events/{id}` by the router.
        .route("/api/events/random", get(handlers::get_random_events))
        // GET /api/events/category/{category}
        .route(
            "/api/events/category/{category}",
            get(handlers::get_events_by_category),
        )
        // GET /api/events/{id}
        .route("/api/events/{id}", get(handlers::get_event))
}
