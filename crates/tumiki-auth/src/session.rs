//! Stateless session tokens.
//!
//! Tokens are HS256 JWTs carrying the account id, username, role and
//! permission plus `iat`/`exp`. Verification never says why a token was
//! rejected: bad signature, malformed input and expiry all yield `None`.
//! There is no revocation; a token stays valid until `exp`.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tumiki_core::{SharedClock, system_clock};

use crate::error::{AuthError, AuthResult};

pub const DEFAULT_SESSION_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// Who a token is issued for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub id: String,
    pub username: String,
    pub role: String,
    /// Permission set as stored on the credential (string, list or object).
    #[serde(default)]
    pub permission: Value,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub identity: SessionIdentity,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn subject(&self) -> &str {
        &self.identity.id
    }

    pub fn role(&self) -> &str {
        &self.identity.role
    }

    pub fn has_any_role(&self, roles: &[String]) -> bool {
        roles.iter().any(|r| r == &self.identity.role)
    }
}

/// Mints and verifies session tokens with a shared secret.
pub struct SessionTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity: Duration,
    clock: SharedClock,
}

impl std::fmt::Debug for SessionTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenIssuer")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl SessionTokenIssuer {
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] for an empty secret.
    pub fn new(secret: &str) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::configuration("session token secret is empty"));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validity: DEFAULT_SESSION_VALIDITY,
            clock: system_clock(),
        })
    }

    #[must_use]
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Signs a token for `identity`, valid from now for the configured window.
    pub fn issue(&self, identity: SessionIdentity) -> AuthResult<String> {
        let iat = self.clock.unix_timestamp();
        let claims = SessionClaims {
            identity,
            iat,
            exp: iat + self.validity.as_secs() as i64,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("failed to sign session token: {e}")))
    }

    /// Returns the claims of a valid, unexpired token and `None` otherwise.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        let claims = match jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected");
                return None;
            }
        };

        if self.clock.unix_timestamp() > claims.exp {
            tracing::debug!(subject = %claims.identity.id, "session token expired");
            return None;
        }
        Some(claims)
    }
}
