pub mod attendance;
pub mod auth;
pub mod cache;
pub mod data;
pub mod records;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::{Json, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;
use tumiki_api::{ApiError, Success};

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Success(HealthResponse {
        status: "ok",
        backend: state.storage.backend_name(),
    })
}

pub async fn unknown_endpoint() -> ApiError {
    ApiError::not_found("Unknown endpoint")
}

/// `Json<T>` whose rejection is a JSON 400 instead of axum's plain-text body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection_error(&rejection)),
        }
    }
}

/// Body-limit rejections keep their 413; every other JSON problem is a 400.
fn json_rejection_error(rejection: &JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(rejection.body_text())
    } else {
        ApiError::bad_request(rejection.body_text())
    }
}

/// Loose truthiness for optional request and document fields: absent, null,
/// `false`, `0` and `""` count as missing.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Fails with a 400 naming the first missing field.
pub(crate) fn require_fields(body: &serde_json::Map<String, Value>, fields: &[&str]) -> Result<(), ApiError> {
    let missing: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|f| !is_truthy(body.get(*f)))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(is_truthy(Some(&json!("10"))));
        assert!(is_truthy(Some(&json!(5))));
        assert!(is_truthy(Some(&json!({}))));
    }

    #[test]
    fn required_fields_are_listed() {
        let body = json!({"userId": "5", "date": ""});
        let err = require_fields(body.as_object().unwrap(), &["userId", "date", "time"]).unwrap_err();
        assert_eq!(err.message(), "Missing required fields: date, time");
        assert!(require_fields(body.as_object().unwrap(), &["userId"]).is_ok());
    }
}
