//! Bearer token extractors.
//!
//! ```ignore
//! async fn handler(BearerAuth(claims): BearerAuth) -> String {
//!     format!("hello {}", claims.subject())
//! }
//! ```

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AuthError;
use crate::session::{SessionClaims, SessionTokenIssuer};

/// State the extractors need, reachable from the app state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AuthState {
    pub issuer: Arc<SessionTokenIssuer>,
    /// Roles allowed through [`AdminAuth`].
    pub admin_roles: Arc<Vec<String>>,
}

impl AuthState {
    pub fn new(issuer: Arc<SessionTokenIssuer>, admin_roles: Vec<String>) -> Self {
        Self {
            issuer,
            admin_roles: Arc::new(admin_roles),
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AuthError::unauthorized("Malformed Authorization header"))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::unauthorized("Expected a Bearer token"))
}

/// Verified session claims of the caller.
#[derive(Debug, Clone)]
pub struct BearerAuth(pub SessionClaims);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);
        let token = bearer_token(parts)?;
        auth.issuer
            .verify(token)
            .map(BearerAuth)
            .ok_or(AuthError::InvalidToken)
    }
}

/// Like [`BearerAuth`], but the caller's role must be one of the admin roles.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub SessionClaims);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerAuth(claims) = BearerAuth::from_request_parts(parts, state).await?;
        let auth = AuthState::from_ref(state);
        if !claims.has_any_role(&auth.admin_roles) {
            tracing::info!(subject = %claims.subject(), role = %claims.role(), "admin route refused");
            return Err(AuthError::forbidden("This action requires an administrator role"));
        }
        Ok(AdminAuth(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionIdentity;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state() -> AuthState {
        let issuer = SessionTokenIssuer::new("middleware-secret").unwrap();
        AuthState::new(Arc::new(issuer), vec!["admin".into()])
    }

    fn token(state: &AuthState, role: &str) -> String {
        state
            .issuer
            .issue(SessionIdentity {
                id: "u1".into(),
                username: "u1".into(),
                role: role.into(),
                permission: Value::Null,
            })
            .unwrap()
    }

    fn app(state: AuthState) -> Router {
        Router::new()
            .route("/me", get(|BearerAuth(c): BearerAuth| async move { c.identity.id }))
            .route("/admin", get(|AdminAuth(_): AdminAuth| async { "ok" }))
            .with_state(state)
    }

    async fn status(app: Router, path: &str, auth: Option<String>) -> StatusCode {
        let mut req = Request::builder().uri(path);
        if let Some(value) = auth {
            req = req.header(AUTHORIZATION, value);
        }
        app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap().status()
    }

    #[tokio::test]
    async fn missing_or_bad_tokens_are_401() {
        let st = state();
        assert_eq!(status(app(st.clone()), "/me", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(app(st.clone()), "/me", Some("Basic abc".into())).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(app(st), "/me", Some("Bearer nope".into())).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn valid_token_passes() {
        let st = state();
        let t = token(&st, "staff");
        assert_eq!(status(app(st), "/me", Some(format!("Bearer {t}"))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_route_checks_role() {
        let st = state();
        let staff = token(&st, "staff");
        let admin = token(&st, "admin");
        assert_eq!(
            status(app(st.clone()), "/admin", Some(format!("Bearer {staff}"))).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(app(st), "/admin", Some(format!("Bearer {admin}"))).await,
            StatusCode::OK
        );
    }
}
