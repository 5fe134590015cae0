use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every handler here receives a verified `AuthUser`, attached by the auth
/// middleware layered over this router in `create_router`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/auth/me
        .route("/api/auth/me", get(handlers::get_me))
        // PUT /api/auth/profile
        // Partial update of name, birthday, gender, phone number and picture.
        .route("/api/auth/profile", put(handlers::update_profile))
        // POST/DELETE /api/enrollments/events/{event_id}
        // One enrollment per (user, event); the store's unique constraint enforces it.
        .route(
            "/api/enrollments/events/{event_id}",
            post(handlers::enroll_in_event).delete(handlers::unenroll_from_event),
        )
        // GET /api/enrollments/my-enrollments
        // Most recently enrolled first.
        .route(
            "/api/enrollments/my-enrollments",
            get(handlers::get_my_enrollments),
        )
}
