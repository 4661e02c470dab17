//! Failure taxonomy for the credential lifecycle engine.
//!
//! Several internal causes deliberately collapse onto one public message so
//! callers cannot tell which factor failed (account existence, password,
//! token state). The distinction survives in server-side logs only.

use axum::http::StatusCode;
use thiserror::Error;

use super::store::StoreError;

/// What kind of single-use credential failed validation.
///
/// Only affects the public message wording; both map to 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Otp,
    ResetToken,
}

impl CredentialKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Otp => "OTP",
            Self::ResetToken => "reset token",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or missing input; carries the first validation message.
    #[error("{0}")]
    Validation(String),

    /// The email already owns a user record.
    #[error("User already exists with this email")]
    Conflict,

    /// Unknown email, missing password hash, or wrong password.
    /// One message for all three so account existence does not leak.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Credentials were fine but the email is not verified yet.
    /// Carries the email so the client can resume the OTP flow.
    #[error("Please verify your email first")]
    VerificationRequired { email: String },

    /// OTP or reset token that is absent, expired, or already consumed.
    #[error("Invalid or expired {}", .0.label())]
    InvalidOrExpired(CredentialKind),

    /// Refresh token that fails signature, expiry, or store-presence checks.
    #[error("Invalid or expired refresh token")]
    InvalidToken,

    #[error("User not found")]
    NotFound,

    /// A critical email could not be delivered (e.g. the reset link).
    #[error("Failed to send reset email. Please try again.")]
    EmailDelivery(#[source] anyhow::Error),

    /// Store or other infrastructure failure. Never echoed to callers.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::Conflict,
            StoreError::Other(err) => Self::Internal(err),
        }
    }
}

impl AuthError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidOrExpired(_) => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::VerificationRequired { .. } => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::EmailDelivery(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to put on the wire. `Internal` collapses to a generic
    /// string no matter what the wrapped error says.
    #[must_use]
    pub fn public_message(&self) -> String {
        self.to_string()
    }
}
