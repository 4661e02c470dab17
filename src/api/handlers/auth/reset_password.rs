//! Reset-password endpoint. The token travels in the path, the new
//! password in the body.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::types::{ErrorResponse, MessageResponse, ResetPasswordRequest};
use super::{error_response, missing_payload_response, validation_response};
use crate::auth::AuthEngine;

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password/{token}",
    request_body = ResetPasswordRequest,
    params(
        ("token" = String, Path, description = "Reset token from the emailed link")
    ),
    responses(
        (status = 200, description = "Password replaced; all sessions revoked", body = MessageResponse),
        (status = 400, description = "Validation error or invalid/expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    engine: Extension<Arc<AuthEngine>>,
    Path(token): Path<String>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload_response(),
    };

    let command = match request.validate(&token) {
        Ok(command) => command,
        Err(message) => return validation_response(message),
    };

    match engine.reset_password(command).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Password reset successful. Please login with your new password."
                    .to_string(),
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
        let response = reset_password(
            Extension(lazy_engine()?),
            Path("sometoken".to_string()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn weak_new_password_is_400() -> Result<()> {
        let response = reset_password(
            Extension(lazy_engine()?),
            Path("sometoken".to_string()),
            Some(Json(ResetPasswordRequest {
                new_password: "weak".to_string(),
                confirm_password: "weak".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn blank_token_is_400() -> Result<()> {
        let response = reset_password(
            Extension(lazy_engine()?),
            Path(" ".to_string()),
            Some(Json(ResetPasswordRequest {
                new_password: "Str0ng!Pass".to_string(),
                confirm_password: "Str0ng!Pass".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
