use std::env;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

use crate::config::TelemetryConfig;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("APPLY_LOG_LEVEL '{level}' is not a valid tracing filter")]
    Filter {
        level: String,
        #[source]
        source: ParseError,
    },
    #[error("a tracing subscriber is already installed")]
    AlreadyInstalled(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Filter from `RUST_LOG` when it parses, otherwise from the configured level.
fn build_filter(rust_log: Option<&str>, level: &str) -> Result<EnvFilter, TelemetryError> {
    if let Some(directives) = rust_log
        && let Ok(filter) = EnvFilter::try_new(directives)
    {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|source| TelemetryError::Filter {
        level: level.to_string(),
        source,
    })
}

/// Logs go to stderr so command output on stdout stays parseable.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let rust_log = env::var("RUST_LOG").ok();
    let filter = build_filter(rust_log.as_deref(), &config.log_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}
