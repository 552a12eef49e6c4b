use std::env;

use tumiki_server::ServerBuilder;
use tumiki_server::config::loader::{DEFAULT_CONFIG_FILE, load_config};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From TUMIKI_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (tumiki.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (TUMIKI_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    tumiki_server::observability::init_tracing();

    let (config_path, source) =
        resolve_config_path(env::args().skip(1), env::var("TUMIKI_CONFIG").ok());

    // Only an explicitly named file is expected to exist
    let cfg = match load_config(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = config_path.as_deref().unwrap_or(DEFAULT_CONFIG_FILE),
        source = %source,
        backend = %cfg.storage.backend,
        "Configuration loaded"
    );
    tumiki_server::observability::apply_logging_level(&cfg.logging.level);

    let server = match ServerBuilder::new().with_config(cfg).build() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: TUMIKI_CONFIG
/// 3. Default: tumiki.toml, returned as `None` so a missing file is not reported
fn resolve_config_path(
    args: impl IntoIterator<Item = String>,
    env_path: Option<String>,
) -> (Option<String>, ConfigSource) {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (Some(path), ConfigSource::CliArgument);
        }
    }

    if let Some(path) = env_path
        && !path.is_empty()
    {
        return (Some(path), ConfigSource::EnvironmentVariable);
    }

    (None, ConfigSource::Default)
}
