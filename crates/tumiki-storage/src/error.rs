//! Storage error types.

use std::fmt;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// A missing document is not an error; lookups return `Ok(None)` instead.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A key could not be turned into a document id.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Why the key was rejected.
        message: String,
    },

    /// A record carried none of the fields a document id is derived from.
    #[error("cannot determine document id for table '{table}' (needs id, userId+dateGroup or userId+date)")]
    MissingDocumentId {
        /// The table the record was written to.
        table: String,
    },

    /// The table has no collection mapping and the adapter runs in strict mode.
    #[error("Unknown table: {table}")]
    UnknownTable {
        /// The unmapped table name.
        table: String,
    },

    /// The document store answered with a non-success status.
    #[error("Document store returned {status}: {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body or summary.
        message: String,
    },

    /// Obtaining credentials for the document store failed.
    #[error("Authentication with document store failed: {message}")]
    Authentication {
        /// Description of the failure.
        message: String,
    },

    /// Failed to reach the document store.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// A document store call exceeded its deadline.
    #[error("Timed out: {message}")]
    Timeout {
        /// The operation that timed out.
        message: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// The backend is misconfigured (missing identity, bad key material).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },
}

impl StorageError {
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn missing_document_id(table: impl Into<String>) -> Self {
        Self::MissingDocumentId {
            table: table.into(),
        }
    }

    #[must_use]
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }

    #[must_use]
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    ///
    /// Connection failures, timeouts, 429 and the usual gateway 5xx codes are
    /// transient. Everything else is permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::Backend { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Returns `true` if the caller supplied a record or key that cannot be stored.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    /// Coarse cause, logged as `category` next to store failures.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidKey { .. } | Self::MissingDocumentId { .. } | Self::UnknownTable { .. } => {
                ErrorCategory::Validation
            }
            Self::Backend { .. } => ErrorCategory::Backend,
            Self::Authentication { .. } | Self::Configuration { .. } => ErrorCategory::Credentials,
            Self::Connection { .. } | Self::Timeout { .. } => ErrorCategory::Infrastructure,
            Self::Serialization { .. } => ErrorCategory::Data,
        }
    }
}

impl From<tumiki_core::IdError> for StorageError {
    fn from(err: tumiki_core::IdError) -> Self {
        Self::invalid_key(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Categories of storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad key, record or table name.
    Validation,
    /// Non-success answer from the store.
    Backend,
    /// Identity or token problems.
    Credentials,
    /// Network or deadline problems.
    Infrastructure,
    /// A payload that could not be encoded or decoded.
    Data,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Backend => write!(f, "backend"),
            Self::Credentials => write!(f, "credentials"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Data => write!(f, "data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::backend(403, "PERMISSION_DENIED");
        assert_eq!(err.to_string(), "Document store returned 403: PERMISSION_DENIED");

        let err = StorageError::missing_document_id("csv-schedules");
        assert!(err.to_string().starts_with("cannot determine document id"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::connection("reset").is_transient());
        assert!(StorageError::timeout("get").is_transient());
        assert!(StorageError::backend(503, "").is_transient());
        assert!(StorageError::backend(429, "").is_transient());
        assert!(!StorageError::backend(400, "").is_transient());
        assert!(!StorageError::backend(404, "").is_transient());
        assert!(!StorageError::authentication("bad key").is_transient());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StorageError::invalid_key("x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            StorageError::timeout("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            StorageError::serialization("x").category(),
            ErrorCategory::Data
        );
        assert_eq!(ErrorCategory::Backend.to_string(), "backend");
    }

    #[test]
    fn test_client_errors_are_validation_category() {
        assert!(StorageError::unknown_table("shfits").is_client_error());
        assert!(StorageError::invalid_key("empty").is_client_error());
        assert!(!StorageError::backend(400, "bad").is_client_error());
        assert!(!StorageError::configuration("no key").is_client_error());
    }
}
