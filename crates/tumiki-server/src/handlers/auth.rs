use axum::extract::State;
use serde::Deserialize;
use serde_json::json;
use tumiki_api::Success;
use tumiki_auth::{AuthError, BearerAuth, LoginOutcome};

use super::JsonBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Success<LoginOutcome>, AuthError> {
    let outcome = state.login.login(&req.username, &req.password).await?;
    Ok(Success(outcome))
}

/// `GET /api/auth/me`
pub async fn me(BearerAuth(claims): BearerAuth) -> Success<serde_json::Value> {
    Success(json!({ "user": claims }))
}
