//! Registration, login and profile flows.
//!
//! Registration is a single transition `Received -> Validated -> PersistedOrRejected`:
//! the first failed check short-circuits, and the account is created by one atomic
//! store call, so a failed registration never leaves a partial record behind.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Account, AuthPayload, LoginRequest, NewAccount, ProfileChanges, RegisterRequest, Role,
        UpdateProfileRequest,
    },
    password,
    repository::{DUPLICATE_ACCOUNT, Repository},
    token,
};

/// Identical for unknown email and wrong password, so responses never reveal
/// whether an account exists.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Lower-cases and trims an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns the trimmed value, or a field-specific validation error when it is
/// absent or blank.
fn required(value: Option<&str>, field: &'static str, message: &str) -> AppResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::field(field, message)),
    }
}

async fn hash_password(plain: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash(&plain))
        .await?
        .map_err(|e| AppError::internal(format!("password hashing failed: {}", e)))
}

async fn verify_password(plain: String, digest: String) -> AppResult<bool> {
    Ok(tokio::task::spawn_blocking(move || password::verify(&plain, &digest)).await?)
}

/// register
///
/// 1. Presence of name, email, governorate, password (first missing field wins).
/// 2. Password strength; the message names the failed criterion.
/// 3. Normalized-email duplicate check.
/// 4. Hash and create with the role forced to `Student`.
/// 5. Issue a session token.
pub async fn register(
    repo: &dyn Repository,
    jwt_secret: &str,
    req: RegisterRequest,
) -> AppResult<AuthPayload> {
    let name = required(req.name.as_deref(), "name", "Name is required")?;
    let email = required(req.email.as_deref(), "email", "Email is required")?;
    let governorate = required(
        req.governorate.as_deref(),
        "governorate",
        "Governorate is required",
    )?;
    password::validate_strength(req.password.as_deref())
        .map_err(|weakness| AppError::field("password", weakness.message()))?;
    let plain = req.password.unwrap_or_default();

    let email = normalize_email(&email);
    if repo.find_account_by_email(&email).await?.is_some() {
        tracing::info!(%email, "registration rejected: email already registered");
        return Err(AppError::Conflict(DUPLICATE_ACCOUNT.to_string()));
    }

    let password_hash = hash_password(plain).await?;
    // A concurrent registration can still win the race; the store's unique
    // constraint reports that as the same conflict.
    let account = repo
        .create_account(NewAccount {
            name,
            email,
            password_hash,
            role: Role::Student,
            governorate,
        })
        .await?;

    let token = token::issue(jwt_secret, account.id, account.role)?;
    tracing::info!(user_id = %account.id, "account registered");
    Ok(AuthPayload {
        user: account,
        token,
    })
}

/// login
///
/// Unknown email and wrong password fail with the same `Authentication` error.
pub async fn login(
    repo: &dyn Repository,
    jwt_secret: &str,
    req: LoginRequest,
) -> AppResult<AuthPayload> {
    let email = required(req.email.as_deref(), "email", "Email is required")?;
    let plain = match req.password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(AppError::field("password", "Password is required")),
    };

    let Some(stored) = repo.find_account_by_email(&normalize_email(&email)).await? else {
        tracing::warn!("login failed: unknown email");
        return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(plain, stored.password_hash).await? {
        tracing::warn!(user_id = %stored.account.id, "login failed: wrong password");
        return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
    }

    let account = stored.account;
    let token = token::issue(jwt_secret, account.id, account.role)?;
    tracing::info!(user_id = %account.id, "login succeeded");
    Ok(AuthPayload {
        user: account,
        token,
    })
}

/// get_self
///
/// 404 when the account behind a still-valid token no longer exists.
pub async fn get_self(repo: &dyn Repository, account_id: Uuid) -> AppResult<Account> {
    repo.get_account(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// update_profile
///
/// Partial update: omitted keys are untouched, `null`/`""` clears.
pub async fn update_profile(
    repo: &dyn Repository,
    account_id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<Account> {
    let changes = ProfileChanges::try_from(req)?;
    if changes.is_empty() {
        return get_self(repo, account_id).await;
    }

    repo.update_profile(account_id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
