use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const DEFAULT_DATABASE: &str = "(default)";

/// Retry policy for transient document store failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying).
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt.
    pub initial_backoff: Duration,
    /// Upper bound for a single delay before jitter.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Where and how to reach Firestore.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    /// API root, e.g. `https://firestore.googleapis.com/v1`.
    pub endpoint: String,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: DEFAULT_DATABASE.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// `{endpoint}/projects/{project}/databases/{database}/documents`
    pub fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.endpoint.trim_end_matches('/'),
            self.project_id,
            self.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_root_uses_default_database() {
        let cfg = FirestoreConfig::new("tumiki-prod");
        assert_eq!(
            cfg.documents_root(),
            "https://firestore.googleapis.com/v1/projects/tumiki-prod/databases/(default)/documents"
        );
    }

    #[test]
    fn trailing_slash_on_endpoint_is_ignored() {
        let cfg = FirestoreConfig::new("p").with_endpoint("http://localhost:8080/v1/");
        assert_eq!(
            cfg.documents_root(),
            "http://localhost:8080/v1/projects/p/databases/(default)/documents"
        );
    }
}
