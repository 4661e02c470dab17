//! Refresh-token exchange endpoint.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::types::{ErrorResponse, RefreshResponse, RefreshTokenRequest};
use super::{error_response, missing_payload_response, validation_response};
use crate::auth::AuthEngine;

#[utoipa::path(
    post,
    path = "/v1/auth/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access and refresh tokens", body = RefreshResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorResponse),
        (status = 404, description = "Token's user no longer exists", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    engine: Extension<Arc<AuthEngine>>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> impl IntoResponse {
    let request: RefreshTokenRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload_response(),
    };

    let token = match request.validate() {
        Ok(token) => token,
        Err(message) => return validation_response(message),
    };

    match engine.refresh(&token).await {
        Ok(pair) => (
            StatusCode::OK,
            Json(RefreshResponse {
                success: true,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}
