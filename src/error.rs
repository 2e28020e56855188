//! Error types and Axum response conversions.
//!
//! OTP failures keep the field-keyed JSON bodies of the original API
//! (`{"code": ...}`, `{"times": ...}`, `{"authentication": ...}`) so
//! existing clients can key on the failing field. Everything else uses
//! the generic `{"error": ...}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    // OTP flow failures (field-keyed 400 payloads)
    #[error("Wrong code")]
    WrongCode,

    #[error("Code has expired")]
    CodeExpired,

    #[error("Max OTP attempts reached")]
    MaxOtpTry,

    #[error("No active code")]
    NoActiveCode,

    #[error("Invalid user id")]
    InvalidUserId,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal server error"}),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({"error": msg})),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({"error": msg})),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({"error": msg})),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({"error": "Rate limit exceeded"}),
            ),
            AppError::WrongCode => (StatusCode::BAD_REQUEST, json!({"code": "wrong code"})),
            AppError::CodeExpired => {
                (StatusCode::BAD_REQUEST, json!({"code": "code has expired"}))
            }
            AppError::MaxOtpTry => (StatusCode::BAD_REQUEST, json!({"times": "max otp try"})),
            AppError::NoActiveCode => (
                StatusCode::BAD_REQUEST,
                json!({"authentication": "user did not create a code."}),
            ),
            AppError::InvalidUserId => (
                StatusCode::BAD_REQUEST,
                json!({"user_id": "user id is invalid"}),
            ),
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions from common error types
impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Internal(format!("Redis error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    /// Extract status code and JSON body from an AppError response.
    async fn error_response(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_internal_hides_details() {
        // Internal error must NOT leak detailed message to client
        let (status, body) = error_response(AppError::Internal(
            "Redis connection refused at 10.0.0.5:6379".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body["error"].as_str().unwrap().contains("Redis"));
        assert!(!body["error"].as_str().unwrap().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_bad_request() {
        let (status, body) =
            error_response(AppError::BadRequest("Invalid format".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid format");
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let (status, body) = error_response(AppError::RateLimited).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Rate limit exceeded");
    }

    #[tokio::test]
    async fn test_wrong_code_payload() {
        let (status, body) = error_response(AppError::WrongCode).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "wrong code");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_code_expired_payload() {
        let (status, body) = error_response(AppError::CodeExpired).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "code has expired");
    }

    #[tokio::test]
    async fn test_max_otp_try_payload() {
        let (status, body) = error_response(AppError::MaxOtpTry).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["times"], "max otp try");
    }

    #[tokio::test]
    async fn test_no_active_code_payload() {
        let (status, body) = error_response(AppError::NoActiveCode).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["authentication"], "user did not create a code.");
    }

    #[tokio::test]
    async fn test_invalid_user_id_payload() {
        let (status, body) = error_response(AppError::InvalidUserId).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["user_id"], "user id is invalid");
    }

    #[test]
    fn test_from_redis_error() {
        let redis_err = redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "test context",
            "connection refused".to_string(),
        ));
        let app_err = AppError::from(redis_err);
        match app_err {
            AppError::Internal(msg) => assert!(msg.contains("Redis error")),
            _ => panic!("Expected Internal variant"),
        }
    }
}
