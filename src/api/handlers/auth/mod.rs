//! Authentication endpoints.
//!
//! Handlers validate the payload into a typed command, call the lifecycle
//! engine, and map [`AuthError`] onto the wire. Infrastructure failures are
//! logged here with full detail and leave the process as a generic message.

pub mod forgot_password;
pub mod login;
pub mod refresh;
pub mod register;
pub mod reset_password;
pub mod types;
pub mod verify_otp;

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use tracing::error;

use crate::auth::AuthError;
use self::types::ErrorResponse;

/// Map an engine failure to its response. Keeps the internal/public message
/// split in one place.
pub(super) fn error_response(err: &AuthError) -> Response {
    match err {
        AuthError::Internal(inner) => error!("internal error: {inner:#}"),
        AuthError::EmailDelivery(inner) => error!("email delivery failed: {inner:#}"),
        _ => {}
    }

    let (requires_verification, email) = match err {
        AuthError::VerificationRequired { email } => (Some(true), Some(email.clone())),
        _ => (None, None),
    };

    let body = ErrorResponse {
        success: false,
        message: err.public_message(),
        requires_verification,
        email,
    };
    (err.status(), Json(body)).into_response()
}

/// 400 with the first validation message, same envelope as other failures.
pub(super) fn validation_response(message: String) -> Response {
    error_response(&AuthError::Validation(message))
}

pub(super) fn missing_payload_response() -> Response {
    (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use crate::auth::postgres::PgCredentialStore;
    use crate::auth::{AuthConfig, AuthEngine};
    use crate::email::LogEmailSender;

    /// Engine over a lazy pool: handler tests that fail before any store
    /// access never need a live database.
    pub(crate) fn lazy_engine() -> anyhow::Result<Arc<AuthEngine>> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let store = Arc::new(PgCredentialStore::new(pool));
        let config = AuthConfig::new(
            SecretString::from("handler-test-secret"),
            "https://atesti.dev".to_string(),
        );
        Ok(Arc::new(AuthEngine::new(
            store,
            Arc::new(LogEmailSender),
            config,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    async fn body_json(response: Response) -> Result<serde_json::Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn verification_required_includes_email() -> Result<()> {
        let response = error_response(&AuthError::VerificationRequired {
            email: "a@x.com".to_string(),
        });
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let value = body_json(response).await?;
        assert_eq!(value["success"], false);
        assert_eq!(value["requiresVerification"], true);
        assert_eq!(value["email"], "a@x.com");
        Ok(())
    }

    #[tokio::test]
    async fn internal_error_is_collapsed() -> Result<()> {
        let response = error_response(&AuthError::Internal(anyhow::anyhow!(
            "pg pool timeout after 30s"
        )));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value = body_json(response).await?;
        assert_eq!(value["message"], "Internal server error");
        assert!(value.get("requiresVerification").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn validation_response_is_400_with_message() -> Result<()> {
        let response = validation_response("Invalid email format".to_string());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = body_json(response).await?;
        assert_eq!(value["message"], "Invalid email format");
        Ok(())
    }
}
