//! Forgot-password endpoint.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::types::{ErrorResponse, ForgotPasswordRequest, MessageResponse};
use super::{error_response, missing_payload_response, validation_response};
use crate::auth::{AuthEngine, FORGOT_PASSWORD_MESSAGE};

#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Same response whether or not the account exists", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Reset email could not be delivered", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    engine: Extension<Arc<AuthEngine>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let request: ForgotPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload_response(),
    };

    let email = match request.validate() {
        Ok(email) => email,
        Err(message) => return validation_response(message),
    };

    // Found or not, the engine reports success; the one exception is a
    // failed email dispatch for an existing account.
    match engine.forgot_password(&email).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: FORGOT_PASSWORD_MESSAGE.to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::lazy_engine;
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn missing_payload_is_400() -> Result<()> {
        let response = forgot_password(Extension(lazy_engine()?), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_email_is_400() -> Result<()> {
        let response = forgot_password(
            Extension(lazy_engine()?),
            Some(Json(ForgotPasswordRequest {
                email: "missing-at.example.com".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
