//! HTTP service for recording support services and attendance.
//!
//! Wires the storage adapter, the login flow and the read-through cache into
//! an axum router. See [`server::build_app`] for the route table.

pub mod cache;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;

pub use cache::{CacheStats, CacheTtl, TtlCache, TtlPresets, cache_key};
pub use config::{AppConfig, ConfigError};
pub use server::{ServerBuilder, TumikiServer, build_app};
pub use state::AppState;
