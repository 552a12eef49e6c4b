//! OAuth2 access tokens for the Firestore REST API.
//!
//! [`ServiceAccountTokenProvider`] implements the JWT-bearer grant: it signs
//! an RS256 assertion with the service account's private key, exchanges it
//! at the token endpoint and caches the resulting access token until it is
//! within [`RENEWAL_MARGIN_SECS`] of expiry.
//!
//! The cache sits behind an async mutex that is held across the exchange, so
//! concurrent callers that find the token stale wait for one renewal instead
//! of each starting their own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tumiki_core::{SharedClock, system_clock};
use tumiki_storage::{StorageError, StorageResult};

use crate::config::{DEFAULT_SCOPE, DEFAULT_TOKEN_URL};

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Renew once fewer than this many seconds of validity remain.
pub const RENEWAL_MARGIN_SECS: i64 = 300;
const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies bearer tokens for document store requests.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> StorageResult<String>;

    /// Drops any cached token so the next call fetches a fresh one.
    async fn invalidate(&self) {}
}

/// Always returns the same token. For emulators and tests.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> StorageResult<String> {
        Ok(self.token.clone())
    }
}

/// Service account identity.
#[derive(Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    /// PEM private key. Escaped `\n` sequences are accepted.
    pub private_key: String,
}

impl ServiceAccountKey {
    pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.into(),
        }
    }

    /// The PEM with literal `\n` escapes turned into newlines.
    pub fn normalized_private_key(&self) -> String {
        self.private_key.replace("\\n", "\n")
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

/// JWT-bearer access token provider with a process-wide cached token.
pub struct ServiceAccountTokenProvider {
    http: reqwest::Client,
    client_email: String,
    signing_key: EncodingKey,
    token_url: String,
    scope: String,
    request_timeout: Duration,
    clock: SharedClock,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ServiceAccountTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokenProvider")
            .field("client_email", &self.client_email)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountTokenProvider {
    /// Builds a provider for the given identity.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] when the identity is incomplete
    /// or the private key is not a valid RSA PEM.
    pub fn new(key: &ServiceAccountKey) -> StorageResult<Self> {
        if key.client_email.trim().is_empty() {
            return Err(StorageError::configuration("service account client email is empty"));
        }
        if key.private_key.trim().is_empty() {
            return Err(StorageError::configuration("service account private key is empty"));
        }
        let signing_key = EncodingKey::from_rsa_pem(key.normalized_private_key().as_bytes())
            .map_err(|e| StorageError::configuration(format!("invalid service account private key: {e}")))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            client_email: key.client_email.clone(),
            signing_key,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            request_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            clock: system_clock(),
            cached: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Deadline for one token exchange (default 10 s).
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn into_shared(self) -> Arc<dyn AccessTokenProvider> {
        Arc::new(self)
    }

    fn sign_assertion(&self, now: i64) -> StorageResult<String> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: &self.scope,
            aud: &self.token_url,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| StorageError::authentication(format!("failed to sign assertion: {e}")))
    }

    async fn exchange(&self, now: i64) -> StorageResult<CachedToken> {
        let assertion = self.sign_assertion(now)?;

        tracing::debug!(token_url = %self.token_url, "requesting access token");
        let response = self
            .http
            .post(&self.token_url)
            .timeout(self.request_timeout)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::timeout(format!("token endpoint: {e}"))
                } else {
                    StorageError::connection(format!("token endpoint: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "access token request rejected");
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                StorageError::backend(status.as_u16(), format!("token endpoint: {body}"))
            } else {
                StorageError::authentication(format!("token endpoint returned {status}: {body}"))
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| StorageError::authentication(format!("unreadable token response: {e}")))?;
        let value = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StorageError::authentication("token response has no access_token"))?;
        let lifetime = body.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);

        tracing::info!(expires_in = lifetime, "obtained document store access token");
        Ok(CachedToken {
            value,
            expires_at: now + lifetime,
        })
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> StorageResult<String> {
        let mut cached = self.cached.lock().await;
        let now = self.clock.unix_timestamp();

        if let Some(token) = cached.as_ref()
            && token.expires_at - now > RENEWAL_MARGIN_SECS
        {
            tracing::trace!("reusing cached access token");
            return Ok(token.value.clone());
        }

        let fresh = self.exchange(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn invalidate(&self) {
        self.cached.lock().await.take();
    }
}
