//! Authentication error types.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tumiki_api::ApiError;
use tumiki_storage::StorageError;

/// Message returned for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown identifier or wrong password. Deliberately indistinguishable.
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,

    /// No usable bearer token on the request.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The bearer token failed verification (bad signature, malformed or expired).
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Authenticated, but the role does not allow the action.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Required request fields are missing.
    #[error("{message}")]
    Validation { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Missing or unusable secrets.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for failures answered with 401.
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::Unauthorized { .. } | Self::InvalidToken
        )
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized(INVALID_CREDENTIALS_MESSAGE),
            AuthError::Unauthorized { message } => ApiError::unauthorized(message),
            AuthError::InvalidToken => ApiError::unauthorized("Invalid or expired token"),
            AuthError::Forbidden { message } => ApiError::forbidden(message),
            AuthError::Validation { message } => ApiError::bad_request(message),
            AuthError::Storage(e) => e.into(),
            AuthError::Configuration { message } | AuthError::Internal { message } => {
                ApiError::internal(message)
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let challenge = self.is_authentication_failure();
        let mut response = ApiError::from(self).into_response();
        if challenge && response.status() == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
