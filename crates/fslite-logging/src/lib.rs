//! Process-wide `tracing` setup for fslite binaries.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("failed to create log file appender: {0}")]
    Appender(#[from] rolling::InitError),

    #[error("failed to install subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to reload log filter: {0}")]
    Reload(#[from] reload::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive (`info`, `debug`, `fslite_cluster=trace,info`, ...).
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for log files. If None, no file logging.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_prefix")]
    pub file_prefix: String,

    /// Log rotation: "hourly", "daily", "never".
    #[serde(default = "default_rotation")]
    pub rotation: String,

    #[serde(default)]
    pub json_format: bool,

    #[serde(default = "default_true")]
    pub console_output: bool,
}

fn default_level() -> String {
    "info".into()
}

fn default_prefix() -> String {
    "fslite".into()
}

fn default_rotation() -> String {
    "daily".into()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
            log_dir: None,
            file_prefix: default_prefix(),
            rotation: default_rotation(),
            json_format: false,
            console_output: true,
        }
    }
}

impl LogConfig {
    pub fn rotation(&self) -> rolling::Rotation {
        match self.rotation.as_str() {
            "hourly" => rolling::Rotation::HOURLY,
            "never" => rolling::Rotation::NEVER,
            _ => rolling::Rotation::DAILY,
        }
    }

    /// Parse `level` into an `EnvFilter`.
    pub fn filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.level).map_err(|e| LoggingError::InvalidFilter {
            filter: self.level.clone(),
            reason: e.to_string(),
        })
    }
}

/// Keeps the file writer alive and allows the filter to be swapped at runtime.
pub struct LoggingHandle {
    _guard: Option<WorkerGuard>,
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LoggingHandle {
    /// Replace the active filter, e.g. after a config reload.
    pub fn set_level(&self, level: &str) -> Result<(), LoggingError> {
        let filter = EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
            filter: level.to_string(),
            reason: e.to_string(),
        })?;
        self.filter.reload(filter)?;
        tracing::info!(level, "log level updated");
        Ok(())
    }
}

/// Initialize the logging system. Call once at program startup and keep the
/// returned handle alive for the lifetime of the process.
///
/// `RUST_LOG` takes precedence over `config.level` when set.
pub fn init_logging(config: &LogConfig) -> Result<LoggingHandle, LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config.filter()?,
    };
    let (filter_layer, filter_handle) = reload::Layer::new(env_filter);

    let registry = tracing_subscriber::registry().with(filter_layer);

    let console_layer: Option<Box<dyn tracing_subscriber::Layer<_> + Send + Sync>> =
        match (config.console_output, config.json_format) {
            (false, _) => None,
            (true, true) => Some(Box::new(fmt::layer().json())),
            (true, false) => Some(Box::new(fmt::layer())),
        };

    let (file_layer, guard): (
        Option<Box<dyn tracing_subscriber::Layer<_> + Send + Sync>>,
        Option<WorkerGuard>,
    ) = match config.log_dir {
        Some(ref log_dir) => {
            let file_appender = rolling::RollingFileAppender::builder()
                .rotation(config.rotation())
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .build(log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json_format {
                Box::new(fmt::layer().json().with_ansi(false).with_writer(non_blocking))
            } else {
                Box::new(fmt::layer().with_ansi(false).with_writer(non_blocking))
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    registry.with(console_layer).with(file_layer).try_init()?;

    Ok(LoggingHandle {
        _guard: guard,
        filter: filter_handle,
    })
}
