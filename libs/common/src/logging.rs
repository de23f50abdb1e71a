//! Logging setup for the calculator tools

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (trace, debug, info, warn, error, or `target=level` lists)
    pub level: String,
    /// Enable console output
    pub console: bool,
    /// Daily rolling log file
    pub file: Option<PathBuf>,
    pub format: LogFormat,
    /// Enable ANSI colors in console output
    pub ansi: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            file: None,
            format: LogFormat::Compact,
            ansi: true,
        }
    }
}

/// `RUST_LOG` wins over the configured level
fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| Error::logging(format!("Invalid log level '{}': {}", level, e)))
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// Initialize the global subscriber
///
/// Returns a guard that must be kept alive for file logging to work
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.console {
        let layer = fmt_layer(config.format, std::io::stderr, config.ansi);
        layers.push(layer.with_filter(env_filter(&config.level)?).boxed());
    }

    if let Some(path) = &config.file {
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("calc.log");
        let appender = tracing_appender::rolling::daily(directory, file_name);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);

        let layer = fmt_layer(config.format, non_blocking, false);
        layers.push(layer.with_filter(env_filter(&config.level)?).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| Error::logging(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}

/// Initialize logging for tests
///
/// Output goes through the test harness writer; repeated calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use figment::providers::{Format, Toml};
    use figment::Figment;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.console);
        assert!(config.file.is_none());
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_log_config_partial() {
        let config: LogConfig = Figment::from(Toml::string(
            r#"
            level = "debug"
            format = "json"
            "#,
        ))
        .extract()
        .unwrap();

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.console);
        assert!(config.ansi);
    }

    #[test]
    fn test_file_logging_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let config = LogConfig {
            console: false,
            file: Some(log_dir.join("calc.log")),
            ..Default::default()
        };

        let guard = init_logging(&config).unwrap();
        assert!(guard.is_some());
        assert!(log_dir.is_dir());
    }
}
