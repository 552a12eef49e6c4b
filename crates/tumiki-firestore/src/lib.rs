//! Firestore REST backend.
//!
//! - [`codec`] converts between JSON values and Firestore's typed value wire format.
//! - [`token`] obtains OAuth2 access tokens with a service-account JWT-bearer grant.
//! - [`FirestoreClient`] implements [`tumiki_storage::DocumentStore`] over the REST API.

pub mod codec;
mod client;
mod config;
mod retry;
pub mod token;

pub use client::FirestoreClient;
pub use config::{
    DEFAULT_ENDPOINT, DEFAULT_SCOPE, DEFAULT_TOKEN_URL, FirestoreConfig, RetryConfig,
};
pub use retry::with_retry;
pub use token::{
    AccessTokenProvider, ServiceAccountKey, ServiceAccountTokenProvider, StaticTokenProvider,
};
