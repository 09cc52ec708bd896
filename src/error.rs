//! Error types for the application

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed message: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Router unavailable")]
    RouterClosed,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Protocol(e) => (StatusCode::BAD_REQUEST, format!("Malformed message: {}", e)),
            AppError::InvalidPayload(e) => (StatusCode::BAD_REQUEST, e.clone()),
            AppError::NotFound(e) => (StatusCode::NOT_FOUND, e.clone()),
            AppError::RouterClosed => {
                tracing::error!("Router task is gone");
                (StatusCode::SERVICE_UNAVAILABLE, "Router unavailable".to_string())
            }
        };

        (status, message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("room lobby".to_string());
        assert_eq!(format!("{}", err), "Not found: room lobby");

        let err = AppError::InvalidPayload("size".to_string());
        assert_eq!(format!("{}", err), "Invalid payload: size");

        let err = AppError::RouterClosed;
        assert_eq!(format!("{}", err), "Router unavailable");
    }

    #[test]
    fn test_protocol_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app_err: AppError = serde_err.into();
        assert!(matches!(app_err, AppError::Protocol(_)));
        assert_eq!(app_err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_into_response() {
        let err = AppError::NotFound("room".to_string());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_router_closed_into_response() {
        let response = AppError::RouterClosed.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
