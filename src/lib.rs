use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{HeaderName, StatusCode},
    middleware,
    response::{IntoResponse, Response},
};
use std::any::Any;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain flows.
pub mod accounts;
pub mod enrollment;
pub mod events;
pub mod password;
pub mod token;

// Web and persistence plumbing.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repository;

// Routing segregated by access level (Public, Authenticated, Admin).
pub mod routes;
use auth::auth_middleware;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use memory::MemoryRepository;
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// Request bodies up to 10 MiB, so base64 profile pictures fit in a JSON payload.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and the
/// `ToSchema` models. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::register_user, handlers::login_user, handlers::get_me,
        handlers::update_profile, handlers::get_events, handlers::get_random_events,
        handlers::get_events_by_category, handlers::get_event, handlers::create_event,
        handlers::update_event, handlers::delete_event, handlers::enroll_in_event,
        handlers::unenroll_from_event, handlers::get_my_enrollments
    ),
    components(
        schemas(
            models::Account, models::Role, models::Gender, models::Event, models::Enrollment,
            models::EnrollmentWithEvent, models::RegisterRequest, models::LoginRequest,
            models::UpdateProfileRequest, models::CreateEventRequest,
            models::UpdateEventRequest, models::AuthPayload, models::HealthStatus,
        )
    ),
    tags(
        (name = "eventsx", description = "Event registration API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container shared across all requests: the store and the
/// immutable configuration. No other mutable state is shared between requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in deployments, in-memory locally and in tests.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles all routers, applies the auth gate to the protected ones, and wraps
/// everything in the observability, panic and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(AnyOrigin)
        .allow_origin(AnyOrigin)
        .allow_headers(AnyOrigin);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/api/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                // Innermost: a panicking handler still yields a 500 envelope.
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .layer(cors)
}

/// handle_panic
///
/// Converts a handler panic into the standard internal-error response.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = %detail, "handler panicked");

    let body = error::ErrorBody {
        success: false,
        message: error::INTERNAL_MESSAGE,
        field: None,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// trace_span_logger
///
/// Opens the per-request span with method, URI and the `x-request-id`, so every
/// log line of one request is correlated. `user_id` is filled in by the auth
/// middleware once the caller is known.
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
        user_id = tracing::field::Empty,
    )
}
