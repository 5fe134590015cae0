use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field carried on every account and embedded in every session token.
/// Registration always produces `Student`; admins are provisioned out-of-band.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// Gender
///
/// Optional profile attribute. The empty string on the wire means "unset" and is
/// stored as `NULL`, never as a fourth variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[ts(export)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// Account
///
/// A registered identity as exposed to clients. The password hash lives only in
/// [`StoredAccount`], so an `Account` can be serialized anywhere without leaking it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    // Lower-cased and trimmed; globally unique.
    pub email: String,
    pub role: Role,
    pub governorate: String,
    #[ts(type = "string | null")]
    pub birthday: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone_number: Option<String>,
    pub profile_picture: Option<String>,
    /// Denormalized back-references in enrollment order. The enrollments table is
    /// authoritative; this list may lag behind it.
    pub enrolled_events: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// StoredAccount
///
/// Internal row used only by the login flow: the public account plus its hash.
#[derive(Debug, Clone, FromRow)]
pub struct StoredAccount {
    #[sqlx(flatten)]
    pub account: Account,
    pub password_hash: String,
}

/// NewAccount
///
/// Fully validated and normalized input for `Repository::create_account`.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub governorate: String,
}

/// Event
///
/// An enrollable event. Managed by admins; read by everyone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: String,
    pub cost: f64,
}

/// Enrollment
///
/// Join record between one account and one event. Unique per (user, event) pair,
/// created by enroll, destroyed by unenroll, never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    #[ts(type = "string")]
    pub enrolled_at: DateTime<Utc>,
}

/// EnrollmentWithEvent
///
/// An enrollment joined with its event, as listed on the personal dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrollmentWithEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub enrolled_at: DateTime<Utc>,
    pub event: Event,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /api/auth/register. Every field is optional at the
/// serde level so that a missing field yields a field-specific validation message
/// instead of a generic body rejection. Any client-supplied role is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub governorate: Option<String>,
}

/// LoginRequest
///
/// Input payload for POST /api/auth/login.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Distinguishes an explicit `null` from an absent key: absent stays `None`
/// (via `#[serde(default)]`), `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// UpdateProfileRequest
///
/// Partial update payload for PUT /api/auth/profile.
///
/// Omitted keys leave the stored value untouched; `null` (or `""`) clears it.
/// `name` cannot be cleared, so `null` there is treated like an omitted key.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, example = "2001-04-12")]
    pub birthday: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, example = "female")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub profile_picture: Option<Option<String>>,
}

/// FieldUpdate
///
/// What a partial update does to one nullable column.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Applies the update to a stored value.
    pub fn apply(self, current: &mut Option<T>) {
        match self {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => *current = None,
            FieldUpdate::Set(value) => *current = Some(value),
        }
    }

    /// Maps a raw wire value: absent keeps, `null` or `""` clears, anything else is parsed.
    fn from_wire<F>(raw: Option<Option<String>>, parse: F) -> Result<Self, AppError>
    where
        F: FnOnce(String) -> Result<T, AppError>,
    {
        match raw {
            None => Ok(FieldUpdate::Keep),
            Some(None) => Ok(FieldUpdate::Clear),
            Some(Some(value)) if value.trim().is_empty() => Ok(FieldUpdate::Clear),
            Some(Some(value)) => parse(value).map(FieldUpdate::Set),
        }
    }
}

/// ProfileChanges
///
/// A validated [`UpdateProfileRequest`], ready for the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub birthday: FieldUpdate<NaiveDate>,
    pub gender: FieldUpdate<Gender>,
    pub phone_number: FieldUpdate<String>,
    pub profile_picture: FieldUpdate<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.birthday == FieldUpdate::Keep
            && self.gender == FieldUpdate::Keep
            && self.phone_number == FieldUpdate::Keep
            && self.profile_picture == FieldUpdate::Keep
    }

    /// Applies the changes to an in-memory account.
    pub fn apply_to(self, account: &mut Account) {
        if let Some(name) = self.name {
            account.name = name;
        }
        self.birthday.apply(&mut account.birthday);
        self.gender.apply(&mut account.gender);
        self.phone_number.apply(&mut account.phone_number);
        self.profile_picture.apply(&mut account.profile_picture);
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
fn parse_birthday(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

impl TryFrom<UpdateProfileRequest> for ProfileChanges {
    type Error = AppError;

    fn try_from(req: UpdateProfileRequest) -> Result<Self, Self::Error> {
        let name = match req.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::field("name", "Name cannot be empty"));
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        let birthday = FieldUpdate::from_wire(req.birthday, |raw| {
            parse_birthday(&raw)
                .ok_or_else(|| AppError::field("birthday", "Birthday must be a valid date"))
        })?;
        let gender = FieldUpdate::from_wire(req.gender, |raw| {
            Gender::parse(raw.trim()).ok_or_else(|| {
                AppError::field("gender", "Gender must be one of male, female or other")
            })
        })?;
        let phone_number =
            FieldUpdate::from_wire(req.phone_number, |raw| Ok(raw.trim().to_string()))?;
        let profile_picture = FieldUpdate::from_wire(req.profile_picture, Ok)?;

        Ok(Self {
            name,
            birthday,
            gender,
            phone_number,
            profile_picture,
        })
    }
}

/// CreateEventRequest
///
/// Input payload for POST /api/admin/events. Required fields are optional at the
/// serde level so that validation can name the missing one. `date` is kept raw:
/// RFC 3339, `YYYY-MM-DDTHH:MM` and `YYYY-MM-DD` are all accepted (see `events`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub cost: Option<f64>,
}

/// UpdateEventRequest
///
/// Partial update payload for PUT /api/admin/events/{id}. Only provided fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateEventRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// EventChanges
///
/// A validated [`UpdateEventRequest`]. `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub cost: Option<f64>,
}

/// NewEvent
///
/// Validated input for `Repository::create_event`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: String,
    pub cost: f64,
}

// --- Response Schemas (Output) ---

/// AuthPayload
///
/// Returned by register and login: the account (never its hash) and a fresh token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthPayload {
    pub user: Account,
    pub token: String,
}

/// HealthStatus
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
}

/// ApiResponse
///
/// Success envelope shared by every endpoint. Failures use `error::ErrorBody`,
/// which carries the same `success` flag set to `false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        Self {
            success: true,
            message: None,
            count: Some(items.len()),
            data: Some(items),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            count: None,
            data: None,
        }
    }
}
