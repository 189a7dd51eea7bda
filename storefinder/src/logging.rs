//! Logging setup.
//!
//! Everything in the crate logs through `tracing`. Embedding applications
//! call [`init`] once at startup; libraries and tests may skip it.
//!
//! `RUST_LOG` takes precedence over the configured level so a single run can
//! be made verbose without touching the config file.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// File name prefix for rolling log files.
pub const LOG_FILE_PREFIX: &str = "storefinder.log";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `storefinder=debug`.
    pub level: String,
    /// Write daily-rolling log files here instead of stderr.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Set the filter directive.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Log to files in `directory`.
    pub fn with_directory(mut self, directory: PathBuf) -> Self {
        self.directory = Some(directory);
        self
    }
}

/// Errors from [`init`].
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive did not parse.
    #[error("Invalid log filter {filter:?}: {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber was already installed.
    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

fn build_filter(level: &str, env_override: Option<String>) -> Result<EnvFilter, LoggingError> {
    let directive = env_override
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| level.to_string());
    EnvFilter::try_new(&directive).map_err(|source| LoggingError::Filter {
        filter: directive,
        source,
    })
}

/// Install the global subscriber.
///
/// Returns the appender guard when logging to files; keep it alive for the
/// lifetime of the program or buffered lines are lost.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = build_filter(&config.level, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| LoggingError::Install(e.to_string()))?;
            tracing::info!(directory = %directory.display(), "File logging initialized");
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| LoggingError::Install(e.to_string()))?;
            Ok(None)
        }
    }
}
