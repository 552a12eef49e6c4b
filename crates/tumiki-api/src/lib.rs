//! Response types shared by every Tumiki HTTP endpoint.
//!
//! Every body is a JSON object with a `success` flag. Successful bodies are
//! produced with [`Success`]; failures with [`ApiError`], which renders
//! `{"success": false, "error": ..., "details"?: ...}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use tumiki_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Internal server error: {message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::PayloadTooLarge(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            details: None,
        }
    }
    pub fn internal_with_details(msg: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            details: Some(details.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The caller-facing message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::PayloadTooLarge(msg) => msg.as_str(),
            ApiError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn to_body(&self) -> ErrorBody<'_> {
        let details = match self {
            ApiError::Internal { details, .. } => details.as_deref(),
            _ => None,
        };
        ErrorBody {
            success: false,
            error: self.message(),
            details,
        }
    }
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub success: bool,
    pub error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.to_body())).into_response()
    }
}

/// Invalid keys and records are the caller's fault; everything else is a
/// store failure reported as 500 with the underlying message attached.
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_client_error() {
            return ApiError::bad_request(err.to_string());
        }
        tracing::warn!(category = %err.category(), error = %err, "storage operation failed");
        ApiError::internal_with_details("Storage error", err.to_string())
    }
}

/// A successful response: the payload's fields next to `"success": true`.
///
/// Payloads that do not serialize to a JSON object are placed under `data`.
#[derive(Debug, Clone)]
pub struct Success<T>(pub T);

impl<T: Serialize> Success<T> {
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        match serde_json::to_value(&self.0)? {
            Value::Object(fields) => {
                for (k, v) in fields {
                    if k != "success" {
                        body.insert(k, v);
                    }
                }
            }
            other => {
                body.insert("data".to_string(), other);
            }
        }
        Ok(Value::Object(body))
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        match self.to_value() {
            Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            Err(e) => ApiError::internal_with_details("Serialization failure", e.to_string())
                .into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::payload_too_large("x").status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(ApiError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_body_omits_empty_details() {
        let body = serde_json::to_value(ApiError::bad_request("userId is required").to_body()).unwrap();
        assert_eq!(body, json!({"success": false, "error": "userId is required"}));

        let err = ApiError::internal_with_details("Storage error", "503 unavailable");
        let body = serde_json::to_value(err.to_body()).unwrap();
        assert_eq!(body["details"], "503 unavailable");
    }

    #[test]
    fn storage_errors_map_by_cause() {
        let err: ApiError = StorageError::missing_document_id("csv-schedules").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = StorageError::backend(500, "boom").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_body().details.unwrap().contains("boom"));
    }

    #[test]
    fn success_flattens_objects() {
        let value = Success(json!({"token": "t", "success": false})).to_value().unwrap();
        assert_eq!(value, json!({"success": true, "token": "t"}));

        let value = Success(vec![1, 2]).to_value().unwrap();
        assert_eq!(value, json!({"success": true, "data": [1, 2]}));
    }

    #[tokio::test]
    async fn error_response_is_json() {
        let response = ApiError::forbidden("admin role required").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "admin role required");
    }
}
