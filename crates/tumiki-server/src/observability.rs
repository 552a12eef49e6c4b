//! Log output for the server binary.
//!
//! The subscriber starts at `info` before configuration exists; once
//! `logging.level` is known, [`apply_logging_level`] swaps the filter through
//! the stored reload handle. An operator-supplied `RUST_LOG` wins over both.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// HTTP client internals are only interesting when they fail.
const QUIET_TARGETS: &str = "hyper=warn,hyper_util=warn,reqwest=warn";

pub fn init_tracing() {
    init_tracing_with_level("info");
}

pub fn init_tracing_with_level(level: &str) {
    let filter = match std::env::var_os("RUST_LOG") {
        Some(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(level)),
        None => filter_for(level),
    };

    let (filter_layer, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .try_init();
}

/// Switches to the configured level. No-op under `RUST_LOG` or before init.
pub fn apply_logging_level(level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    if let Some(handle) = FILTER_HANDLE.get() {
        let _ = handle.modify(|current| *current = filter_for(level));
    }
}

fn filter_for(level: &str) -> EnvFilter {
    if level == "off" {
        return EnvFilter::new("off");
    }
    EnvFilter::try_new(format!("{level},{QUIET_TARGETS}")).unwrap_or_else(|_| EnvFilter::new("info"))
}
