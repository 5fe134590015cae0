use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::Role};

/// Validity window of every session token.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Claims
///
/// Payload of a session token. Signed with the server-held secret (HS256);
/// there is no server-side session store, so these claims are the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id.
    pub sub: Uuid,
    /// Role at issuance. Trusted until the token expires, even if the stored role changes.
    pub role: Role,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
}

/// Identity resolved from a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub account_id: Uuid,
    pub role: Role,
}

/// InvalidToken
///
/// Single outcome for every verification failure. Expired, forged and malformed
/// tokens are deliberately indistinguishable to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidToken;

impl From<InvalidToken> for AppError {
    fn from(_: InvalidToken) -> Self {
        AppError::Authentication("Invalid or expired token".to_string())
    }
}

/// issue
///
/// Mints a token for `account_id` valid for [`TOKEN_TTL_DAYS`] from now.
pub fn issue(secret: &str, account_id: Uuid, role: Role) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id,
        role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("token signing failed: {}", e)))
}

/// verify
///
/// Checks signature, structure and expiry. Pure function of the token and the secret.
pub fn verify(secret: &str, token: &str) -> Result<VerifiedToken, InvalidToken> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(VerifiedToken {
            account_id: data.claims.sub,
            role: data.claims.role,
        }),
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "token rejected");
            Err(InvalidToken)
        }
    }
}
