//! Structured logging setup.
//!
//! Stdout logging in one of three formats, an optional single log file, or
//! multi-stream rolling files via `tracing-appender`.
//!
//! # Component Targets
//!
//! | Target | Description |
//! |--------|-------------|
//! | `macro_signals::series` | Provider fetches and alignment |
//! | `macro_signals::narrative` | Generation, validation, fallbacks |
//! | `macro_signals::jobs` | Batch, backfill and key-event runs |
//! | `macro_signals::risk` | Risk-state aggregation |
//! | `macro_signals::store` | Signal persistence |
//!
//! ```bash
//! RUST_LOG=warn,macro_signals::narrative=debug macro_signals run
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON format (best for log aggregation)
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LogConfig {
    /// Base level when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Format for stdout logging
    #[serde(default)]
    pub format: LogFormat,

    /// Optional single log file; JSON for both stdout and file when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    /// Enable multi-stream rolling files (operational/diagnostic/errors)
    #[serde(default)]
    pub enable_multi_stream: bool,

    /// Directory for rolling log files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Level for the error stream
    #[serde(default = "default_error_level")]
    pub error_level: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_error_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            log_file: None,
            enable_multi_stream: false,
            log_dir: default_log_dir(),
            error_level: default_error_level(),
        }
    }
}

impl LogConfig {
    /// JSON to stdout plus rolling files under `log_dir`.
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            format: LogFormat::Json,
            enable_multi_stream: true,
            log_dir,
            ..Default::default()
        }
    }
}

/// Level filter with HTTP client internals quieted.
fn quiet_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{level},hyper=warn,reqwest=warn"))
}

/// Initialize the global subscriber.
///
/// `env_filter_override` replaces both `RUST_LOG` and the configured level.
/// The returned guards must stay alive for file logs to flush.
pub fn init_logging(
    config: &LogConfig,
    env_filter_override: Option<&str>,
) -> Result<Vec<WorkerGuard>, Box<dyn std::error::Error>> {
    let mut guards = Vec::new();

    let base_filter = match env_filter_override {
        Some(filter) => quiet_filter(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| quiet_filter(&config.level)),
    };

    if config.enable_multi_stream {
        std::fs::create_dir_all(&config.log_dir)?;

        let operational_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "signals-operational.log");
        let (operational_writer, guard) = tracing_appender::non_blocking(operational_appender);
        guards.push(guard);
        let operational_layer = fmt::layer()
            .with_writer(operational_writer)
            .with_ansi(false)
            .json()
            .with_filter(quiet_filter(&config.level));

        let diagnostic_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "signals-diagnostic.log");
        let (diagnostic_writer, guard) = tracing_appender::non_blocking(diagnostic_appender);
        guards.push(guard);
        let diagnostic_layer = fmt::layer()
            .with_writer(diagnostic_writer)
            .with_ansi(false)
            .json()
            .with_filter(EnvFilter::new(
                "macro_signals::series=debug,\
                 macro_signals::narrative=debug,\
                 macro_signals::store=debug",
            ));

        let error_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "signals-errors.log");
        let (error_writer, guard) = tracing_appender::non_blocking(error_appender);
        guards.push(guard);
        let error_layer = fmt::layer()
            .with_writer(error_writer)
            .with_ansi(false)
            .json()
            .with_filter(EnvFilter::new(&config.error_level));

        let registry = tracing_subscriber::registry()
            .with(operational_layer)
            .with(diagnostic_layer)
            .with(error_layer);
        match config.format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_filter(base_filter))
                .init(),
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_filter(base_filter))
                .init(),
            LogFormat::Pretty => registry
                .with(fmt::layer().with_filter(base_filter))
                .init(),
        }

        eprintln!("Multi-stream logging enabled: {}", config.log_dir.display());
    } else if let Some(ref log_file) = config.log_file {
        let file = std::fs::File::create(log_file)?;
        let file = std::sync::Mutex::new(file);

        tracing_subscriber::registry()
            .with(base_filter)
            .with(fmt::layer().json())
            .with(fmt::layer().with_writer(file).with_ansi(false).json())
            .init();

        eprintln!("Logging to file: {log_file} (JSON for both stdout and file)");
    } else {
        match config.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .with_env_filter(base_filter)
                .json()
                .init(),
            LogFormat::Compact => tracing_subscriber::fmt()
                .with_env_filter(base_filter)
                .compact()
                .init(),
            LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(base_filter).init(),
        }
    }

    Ok(guards)
}
