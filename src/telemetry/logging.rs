//! Logging configuration and initialization
//!
//! Structured logging with tracing: a compact or JSON console layer and an
//! optional plain-text file layer written through a non-blocking appender.

use std::path::PathBuf;

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*, registry::Registry, Layer};

/// Environment variable holding the log filter (takes precedence over `RUST_LOG`)
pub const LOG_FILTER_ENV: &str = "OVERLAY_STUDIO_LOG";
/// Environment variable selecting the console format ("json" or "compact")
pub const LOG_FORMAT_ENV: &str = "OVERLAY_STUDIO_LOG_FORMAT";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Compact,
    /// One JSON object per event, for log aggregation
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "compact" | "text" | "pretty" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Write events to stderr (default: true)
    pub console_enabled: bool,
    /// Console format, overridable through `OVERLAY_STUDIO_LOG_FORMAT`
    pub format: LogFormat,
    /// Also write events to this file
    pub file_path: Option<PathBuf>,
    /// Filter used when neither environment variable is set
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            format: LogFormat::Compact,
            file_path: None,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Effective console format after applying the environment override
    pub fn resolved_format(&self) -> LogFormat {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|v| LogFormat::parse(&v))
            .unwrap_or(self.format)
    }
}

/// Initialize the global subscriber.
///
/// Returns the file appender's guard when file logging is on; keep it
/// alive until exit so buffered lines are flushed.
///
/// # Environment Variables
///
/// - `OVERLAY_STUDIO_LOG`: filter directives (e.g. "debug", "info,overlay_studio::input=debug")
/// - `OVERLAY_STUDIO_LOG_FORMAT`: "json" for JSON console output
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<LogGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));
    let format = config.resolved_format();

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.console_enabled {
        let console: BoxedLayer = match format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed(),
        };
        layers.push(console);
    }

    if let Some(path) = &config.file_path {
        let file = std::fs::File::create(path)?;
        let (writer, file_guard) = tracing_appender::non_blocking(file);
        guard = Some(file_guard);
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    }

    tracing_subscriber::registry().with(layers).with(env_filter).try_init()?;

    tracing::info!(
        target: "overlay_studio",
        version = env!("CARGO_PKG_VERSION"),
        json = format == LogFormat::Json,
        file = ?config.file_path,
        "Logging initialized"
    );

    Ok(guard)
}

// Re-export WorkerGuard so callers can store it
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.console_enabled);
        assert!(config.file_path.is_none());
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.default_level, "info");
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" compact "), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
