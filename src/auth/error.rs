use thiserror::Error;

use crate::error::{ApiError, UnknownVariant};

/// Failures of the auth service, surfaced to clients as their message text.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User role must be specified.")]
    RoleRequired,

    #[error(transparent)]
    UnknownRole(#[from] UnknownVariant),

    #[error("Invalid email")]
    InvalidEmail,

    #[error("{0}")]
    WeakPassword(&'static str),

    #[error("Name is required")]
    NameRequired,

    #[error("This email is already registered. Please login instead.")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Please complete your Aadhaar verification before logging in.")]
    VerificationPending,

    #[error("Your account is inactive. Please contact support.")]
    AccountInactive,

    #[error("Aadhaar number must be exactly 12 digits")]
    InvalidAadhaar,

    #[error("Invalid OTP.")]
    InvalidOtp,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid verification token")]
    InvalidVerificationToken,

    #[error("Invalid reset token")]
    InvalidResetToken,

    #[error("Reset token has expired")]
    ResetTokenExpired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UnknownRole(v) => ApiError::UnknownVariant(v),
            AuthError::Internal(inner) => ApiError::Internal(inner),
            AuthError::RoleRequired
            | AuthError::InvalidEmail
            | AuthError::WeakPassword(_)
            | AuthError::NameRequired
            | AuthError::InvalidAadhaar
            | AuthError::InvalidOtp
            | AuthError::InvalidVerificationToken
            | AuthError::InvalidResetToken
            | AuthError::ResetTokenExpired => ApiError::BadRequest(e.to_string()),
            AuthError::EmailTaken => ApiError::Conflict(e.to_string()),
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::VerificationPending | AuthError::AccountInactive => {
                ApiError::Forbidden(e.to_string())
            }
            AuthError::UserNotFound => ApiError::NotFound(e.to_string()),
        }
    }
}
