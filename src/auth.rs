use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{config::AppConfig, error::AppError, models::Role, token};

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers take it as an
/// argument to learn who is calling and with which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// The account id carried in the token's `sub` claim.
    pub id: Uuid,
    /// The role embedded at issuance. Not re-read from the store: a promotion or
    /// demotion only takes effect once the old token expires or is replaced.
    pub role: Role,
}

impl AuthUser {
    /// Rejects any caller that is not an admin.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role != Role::Admin {
            tracing::warn!(user_id = %self.id, "non-admin attempted an admin operation");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(())
    }
}

/// Pulls the credential out of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn unauthenticated() -> AppError {
    AppError::Authentication("Authentication required".to_string())
}

/// AuthUser Extractor Implementation
///
/// 1. Reuse an identity already attached by [`auth_middleware`], if any.
/// 2. Otherwise read the bearer token and verify it against the configured secret.
///
/// No store lookup happens here; a structurally and cryptographically valid,
/// unexpired token is sufficient.
///
/// Rejection: `AppError::Authentication` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(*user);
        }

        let config = AppConfig::from_ref(state);
        let token = bearer_token(parts).ok_or_else(unauthenticated)?;
        let verified = token::verify(&config.jwt_secret, token)?;

        Ok(AuthUser {
            id: verified.account_id,
            role: verified.role,
        })
    }
}

/// auth_middleware
///
/// Gate for every protected router. Extracting `AuthUser` rejects the request with
/// a 401 envelope before any handler runs; on success the identity is attached to
/// the request extensions for downstream handlers.
pub async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    tracing::Span::current().record("user_id", tracing::field::display(auth_user.id));
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}
