//! Enrollment consistency guard.
//!
//! The enrollment row is the authoritative record. The account's back-reference
//! list is a denormalized convenience written after it: a failure there is logged
//! and tolerated, never surfaced to the caller, and the list may lag.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Enrollment, EnrollmentWithEvent},
    repository::{ALREADY_ENROLLED, Repository},
};

/// enroll
///
/// 1. The event must exist (`NotFound`).
/// 2. Pre-check for an existing enrollment, for a friendly `Conflict`. The store's
///    unique constraint on the pair remains the real guard against races.
/// 3. Insert the enrollment, then set-add the event to the account's back-references.
pub async fn enroll(repo: &dyn Repository, account_id: Uuid, event_id: Uuid) -> AppResult<Enrollment> {
    if repo.get_event(event_id).await?.is_none() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    if repo.find_enrollment(account_id, event_id).await?.is_some() {
        return Err(AppError::Conflict(ALREADY_ENROLLED.to_string()));
    }

    let enrollment = repo.insert_enrollment(account_id, event_id).await?;

    if let Err(e) = repo.add_enrolled_event(account_id, event_id).await {
        tracing::warn!(
            user_id = %account_id,
            event_id = %event_id,
            error = %e,
            "enrollment stored but back-reference update failed"
        );
    }

    tracing::info!(user_id = %account_id, event_id = %event_id, "enrolled");
    Ok(enrollment)
}

/// unenroll
///
/// Deletes the row for the pair (`NotFound` if none), then removes the back-reference.
pub async fn unenroll(repo: &dyn Repository, account_id: Uuid, event_id: Uuid) -> AppResult<()> {
    if repo.delete_enrollment(account_id, event_id).await?.is_none() {
        return Err(AppError::NotFound("Enrollment not found".to_string()));
    }

    if let Err(e) = repo.remove_enrolled_event(account_id, event_id).await {
        tracing::warn!(
            user_id = %account_id,
            event_id = %event_id,
            error = %e,
            "enrollment removed but back-reference update failed"
        );
    }

    tracing::info!(user_id = %account_id, event_id = %event_id, "unenrolled");
    Ok(())
}

/// All enrollments of an account joined with their events, most recent first.
pub async fn list_for_account(repo: &dyn Repository, account_id: Uuid) -> AppResult<Vec<EnrollmentWithEvent>> {
    repo.list_enrollments(account_id).await
}
