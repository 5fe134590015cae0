use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Admin Router Module
///
/// Event management. Nested under `/api/admin`. The auth middleware rejects
/// anonymous requests; each handler then requires `Role::Admin` and answers 403
/// otherwise.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /api/admin/events
        .route("/events", post(handlers::create_event))
        // PUT/DELETE /api/admin/events/{id}
        .route(
            "/events/{id}",
            put(handlers::update_event).delete(handlers::delete_event),
        )
}
