//! Process-wide log setup for the binary.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// Libraries that are chatty at debug level.
const QUIET_TARGETS: &[&str] = &["hyper=warn", "hyper_util=warn", "rustls=warn"];

/// Builds the filter: `RUST_LOG` when set, otherwise the configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(directive(level)).unwrap_or_else(|_| EnvFilter::new(directive("info")))
}

fn directive(level: &str) -> String {
    let mut parts = vec![level.to_string()];
    parts.extend(QUIET_TARGETS.iter().map(|t| t.to_string()));
    parts.join(",")
}

/// Installs the global subscriber and routes `log` records into it.
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.level))
        .with_target(false);

    let installed = match config.file.as_deref() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ConfigError::LogFile {
                    path: PathBuf::from(path),
                    source: e,
                })?;
            tracing::subscriber::set_global_default(
                builder.with_ansi(false).with_writer(Mutex::new(file)).finish(),
            )
        }
        None => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stderr).finish(),
        ),
    };
    installed.map_err(|e| ConfigError::Logger(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| ConfigError::Logger(e.to_string()))?;
    Ok(())
}
