//! OTP verification endpoint.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::types::{ErrorResponse, MessageResponse, VerifyOtpRequest};
use super::{error_response, missing_payload_response, validation_response};
use crate::auth::AuthEngine;

#[utoipa::path(
    post,
    path = "/v1/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Validation error or invalid/expired OTP", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    engine: Extension<Arc<AuthEngine>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload_response(),
    };

    let command = match request.validate() {
        Ok(command) => command,
        Err(message) => return validation_response(message),
    };

    match engine.verify_otp(command).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Email verified successfully! You can now login.".to_string(),
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
        let response = verify_otp(Extension(lazy_engine()?), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn short_otp_is_400() -> Result<()> {
        let response = verify_otp(
            Extension(lazy_engine()?),
            Some(Json(VerifyOtpRequest {
                email: "a@x.com".to_string(),
                otp: "123".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
