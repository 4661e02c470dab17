//! Login endpoint.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::types::{ErrorResponse, LoginRequest, LoginResponse};
use super::{error_response, missing_payload_response, validation_response};
use crate::auth::AuthEngine;

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; access and refresh tokens issued", body = LoginResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 403, description = "Email not verified yet", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    engine: Extension<Arc<AuthEngine>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload_response(),
    };

    let command = match request.validate() {
        Ok(command) => command,
        Err(message) => return validation_response(message),
    };

    match engine.login(command).await {
        Ok(data) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                message: "Login successful".to_string(),
                data,
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
        let response = login(Extension(lazy_engine()?), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn empty_password_is_400() -> Result<()> {
        let response = login(
            Extension(lazy_engine()?),
            Some(Json(LoginRequest {
                email: "a@x.com".to_string(),
                password: String::new(),
                remember_me: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
