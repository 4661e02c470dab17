//! Root banner, intentionally undocumented in the OpenAPI spec.

use axum::response::IntoResponse;

pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn root_reports_name_and_version() {
        let response = root().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
