use uuid::Uuid;

use crate::{
    db,
    errors::ApiError,
    models::{Booking, User, VerificationStatus},
    PGPool,
};

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<User, ApiError> {
    db::user::get_by_id(id, pool).await.map_err(ApiError::from_db)
}

pub async fn bookings(user_id: Uuid, pool: &PGPool) -> Result<Vec<Booking>, ApiError> {
    db::booking::get_for_user(user_id, pool)
        .await
        .map_err(ApiError::from_db)
}

/// Identity upload transition: NotSubmitted|Rejected -> Pending. The AI
/// pre-check is advisory and handled by the caller; this only moves the
/// status.
pub async fn submit_identity(user: &User, pool: &PGPool) -> Result<User, ApiError> {
    match user.verification_status {
        VerificationStatus::NotSubmitted | VerificationStatus::Rejected => {}
        VerificationStatus::Pending => {
            return Err(ApiError::Validation(
                "your verification is already awaiting review".to_string(),
            ))
        }
        VerificationStatus::Verified => {
            return Err(ApiError::Validation(
                "your identity is already verified".to_string(),
            ))
        }
    }
    db::user::set_verification_status(user.id, VerificationStatus::Pending, pool)
        .await
        .map_err(ApiError::from_db)?;
    Ok(User {
        verification_status: VerificationStatus::Pending,
        ..user.clone()
    })
}
