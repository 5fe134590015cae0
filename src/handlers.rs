use crate::{
    AppState, accounts,
    auth::AuthUser,
    enrollment,
    error::AppError,
    events::{self, RANDOM_EVENT_COUNT},
    models::{
        Account, ApiResponse, AuthPayload, CreateEventRequest, Enrollment, EnrollmentWithEvent,
        Event, HealthStatus, LoginRequest, NewEvent, RegisterRequest, UpdateEventRequest,
        UpdateProfileRequest,
    },
};
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
};
use uuid::Uuid;

type JsonResult<T> = Result<Json<ApiResponse<T>>, AppError>;
type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

// --- Public: Health & Fallback ---

/// health
///
/// [Public Route] Liveness probe for monitoring and load balancers.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthStatus))
)]
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "OK".to_string(),
        message: "Server is running".to_string(),
    })
}

/// Router fallback: unknown routes still answer with the error envelope.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route not found: {}", uri.path()))
}

// --- Public: Authentication ---

/// register_user
///
/// [Public Route] Creates a student account and returns it with a session token.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthPayload),
        (status = 400, description = "Missing field, weak password or email already registered")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> CreatedResult<AuthPayload> {
    let Json(payload) = payload?;
    let auth = accounts::register(state.repo.as_ref(), &state.config.jwt_secret, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(auth).with_message("User registered successfully")),
    ))
}

/// login_user
///
/// [Public Route] Exchanges credentials for a session token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthPayload),
        (status = 400, description = "Missing field"),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> JsonResult<AuthPayload> {
    let Json(payload) = payload?;
    let auth = accounts::login(state.repo.as_ref(), &state.config.jwt_secret, payload).await?;
    Ok(Json(ApiResponse::data(auth).with_message("Login successful")))
}

// --- Authenticated: Profile ---

/// get_me
///
/// [Authenticated Route] The caller's own account, without the password hash.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile", body = Account),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> JsonResult<Account> {
    let account = accounts::get_self(state.repo.as_ref(), id).await?;
    Ok(Json(ApiResponse::data(account)))
}

/// update_profile
///
/// [Authenticated Route] Partial profile update. Omitted keys are untouched;
/// `null` or `""` clears birthday, gender, phone number or picture.
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = Account),
        (status = 400, description = "Invalid field value"),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn update_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> JsonResult<Account> {
    let Json(payload) = payload?;
    let account = accounts::update_profile(state.repo.as_ref(), id, payload).await?;
    Ok(Json(
        ApiResponse::data(account).with_message("Profile updated successfully"),
    ))
}

// --- Public: Events ---

/// get_events
///
/// [Public Route] All events, soonest first.
#[utoipa::path(
    get,
    path = "/api/events",
    responses((status = 200, description = "Events", body = [Event]))
)]
pub async fn get_events(State(state): State<AppState>) -> JsonResult<Vec<Event>> {
    let events = state.repo.list_events().await?;
    Ok(Json(ApiResponse::list(events)))
}

/// get_random_events
///
/// [Public Route] Up to two random events, used as recommendations.
#[utoipa::path(
    get,
    path = "/api/events/random",
    responses((status = 200, description = "Random events", body = [Event]))
)]
pub async fn get_random_events(State(state): State<AppState>) -> JsonResult<Vec<Event>> {
    let events = state.repo.random_events(RANDOM_EVENT_COUNT).await?;
    Ok(Json(ApiResponse::list(events)))
}

/// get_events_by_category
///
/// [Public Route] Events in one category (case-insensitive), soonest first.
#[utoipa::path(
    get,
    path = "/api/events/category/{category}",
    params(("category" = String, Path, description = "Event category")),
    responses((status = 200, description = "Events", body = [Event]))
)]
pub async fn get_events_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> JsonResult<Vec<Event>> {
    let events = state.repo.list_events_by_category(&category).await?;
    Ok(Json(ApiResponse::list(events)))
}

/// get_event
///
/// [Public Route] A single event by id.
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Found", body = Event),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> JsonResult<Event> {
    let Path(id) = id?;
    let event = state
        .repo
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(Json(ApiResponse::data(event)))
}

// --- Admin: Event Management ---

/// create_event
///
/// [Admin Route] Creates an event. `cost` defaults to 0.
///
/// *RBAC*: rejects non-admin tokens with 403 before touching the store.
#[utoipa::path(
    post,
    path = "/api/admin/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Created", body = Event),
        (status = 400, description = "Missing or invalid field"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> CreatedResult<Event> {
    auth_user.require_admin()?;
    let Json(payload) = payload?;
    let event = state.repo.create_event(NewEvent::try_from(payload)?).await?;
    tracing::info!(event_id = %event.id, admin_id = %auth_user.id, "event created");
    Ok((StatusCode::CREATED, Json(ApiResponse::data(event))))
}

/// update_event
///
/// [Admin Route] Partial update; omitted fields keep their values.
#[utoipa::path(
    put,
    path = "/api/admin/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated", body = Event),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn update_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> JsonResult<Event> {
    auth_user.require_admin()?;
    let Path(id) = id?;
    let Json(payload) = payload?;
    let changes = events::validate_update(payload)?;
    let event = state
        .repo
        .update_event(id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(Json(ApiResponse::data(event)))
}

/// delete_event
///
/// [Admin Route] Deletes an event and, with it, every enrollment that references it.
#[utoipa::path(
    delete,
    path = "/api/admin/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Deleted", body = Event),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> JsonResult<Event> {
    auth_user.require_admin()?;
    let Path(id) = id?;
    let event = state
        .repo
        .delete_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    tracing::info!(event_id = %event.id, admin_id = %auth_user.id, "event deleted");
    Ok(Json(
        ApiResponse::data(event).with_message("Event deleted successfully"),
    ))
}

// --- Authenticated: Enrollment ---

/// enroll_in_event
///
/// [Authenticated Route] Enrolls the caller in an event.
#[utoipa::path(
    post,
    path = "/api/enrollments/events/{event_id}",
    params(("event_id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 201, description = "Enrolled", body = Enrollment),
        (status = 404, description = "Event not found"),
        (status = 400, description = "Already enrolled")
    )
)]
pub async fn enroll_in_event(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    event_id: Result<Path<Uuid>, PathRejection>,
) -> CreatedResult<Enrollment> {
    let Path(event_id) = event_id?;
    let enrollment = enrollment::enroll(state.repo.as_ref(), user_id, event_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(enrollment).with_message("Successfully enrolled in event")),
    ))
}

/// unenroll_from_event
///
/// [Authenticated Route] Removes the caller's enrollment in an event.
#[utoipa::path(
    delete,
    path = "/api/enrollments/events/{event_id}",
    params(("event_id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Unenrolled"),
        (status = 404, description = "Enrollment not found")
    )
)]
pub async fn unenroll_from_event(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    event_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Path(event_id) = event_id?;
    enrollment::unenroll(state.repo.as_ref(), user_id, event_id).await?;
    Ok(Json(ApiResponse::message("Successfully unenrolled from event")))
}

/// get_my_enrollments
///
/// [Authenticated Route] The caller's enrollments joined with their events,
/// most recently enrolled first.
#[utoipa::path(
    get,
    path = "/api/enrollments/my-enrollments",
    responses((status = 200, description = "My enrollments", body = [EnrollmentWithEvent]))
)]
pub async fn get_my_enrollments(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> JsonResult<Vec<EnrollmentWithEvent>> {
    let enrollments = enrollment::list_for_account(state.repo.as_ref(), id).await?;
    Ok(Json(ApiResponse::list(enrollments)))
}
