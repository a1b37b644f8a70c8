//! Logging setup
//!
//! Stderr and/or a daily-rotated log file, filtered through `RUST_LOG`.

use crate::config::LoggingConfig;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` does not say otherwise
    pub level: Level,

    /// Log to file
    pub file_path: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,

    /// Include thread IDs
    pub thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_path: None,
            stderr: true,
            thread_ids: false,
        }
    }
}

impl LogConfig {
    /// Build from the `[logging]` config section
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        Self {
            level: parse_level(&settings.level).unwrap_or(Level::INFO),
            file_path: settings.file.clone(),
            stderr: settings.stderr,
            thread_ids: false,
        }
    }

    /// Override from `DIMMER_LOG_FILE` and `DIMMER_LOG_STDERR`
    pub fn with_env(mut self) -> Self {
        if let Ok(log_file) = std::env::var("DIMMER_LOG_FILE") {
            self.file_path = Some(PathBuf::from(log_file));
        }

        if let Ok(log_stderr) = std::env::var("DIMMER_LOG_STDERR") {
            self.stderr = log_stderr.to_lowercase() != "false";
        }

        self
    }

    /// Force debug output (the `--debug` flag)
    pub fn debug(mut self, enabled: bool) -> Self {
        if enabled {
            self.level = Level::DEBUG;
            self.thread_ids = true;
        }
        self
    }
}

fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging with the given configuration
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let format = fmt::format()
        .with_level(true)
        .with_target(true)
        .with_thread_ids(config.thread_ids);

    let file_layer = match config.file_path {
        Some(file_path) => {
            if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            let file_appender = tracing_appender::rolling::daily(
                file_path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| std::path::Path::new(".")),
                file_path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("iot-dimmer.log")),
            );

            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .event_format(format.clone()),
            )
        }
        None => None,
    };

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .event_format(format)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level(" warn "), Some(Level::WARN));
        assert_eq!(parse_level("chatty"), None);
    }

    #[test]
    fn test_from_settings_falls_back_to_info() {
        let settings = LoggingConfig {
            level: "loud".to_string(),
            file: None,
            stderr: false,
        };
        let config = LogConfig::from_settings(&settings);
        assert_eq!(config.level, Level::INFO);
        assert!(!config.stderr);
    }

    #[test]
    fn test_debug_flag() {
        let config = LogConfig::default().debug(true);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.thread_ids);

        let config = LogConfig::default().debug(false);
        assert_eq!(config.level, Level::INFO);
    }
}
