//! Registration endpoint.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::types::{ErrorResponse, RegisterRequest, RegisterResponse};
use super::{error_response, missing_payload_response, validation_response};
use crate::auth::AuthEngine;

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration accepted; OTP emailed", body = RegisterResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    engine: Extension<Arc<AuthEngine>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload_response(),
    };

    let command = match request.validate() {
        Ok(command) => command,
        Err(message) => return validation_response(message),
    };

    match engine.register(command).await {
        Ok(data) => (
            StatusCode::OK,
            Json(RegisterResponse {
                success: true,
                message: "Registration successful. Please check your email for OTP verification."
                    .to_string(),
                data,
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}
