//! Logging configuration for the ping uploader.
//!
//! The library only emits `tracing` events. Hosts that do not install their
//! own subscriber can use [`init_logging`].

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{UploadError, UploadResult};

/// Configuration for the uploader's logging setup.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for everything outside this crate
    pub level: Level,
    /// Log level for the uploader itself
    pub uploader_level: Level,
    /// Whether to use JSON output format
    pub json_format: bool,
    /// Environment filter override
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            uploader_level: Level::INFO,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Creates a configuration for production use.
    pub fn production() -> Self {
        Self {
            level: Level::WARN,
            uploader_level: Level::INFO,
            json_format: true,
            env_filter: None,
        }
    }

    /// Creates a configuration for development use; shows pings logged with `log_pings`.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            uploader_level: Level::DEBUG,
            json_format: false,
            env_filter: None,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_uploader_level(mut self, level: Level) -> Self {
        self.uploader_level = level;
        self
    }

    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    /// Sets a custom environment filter.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the environment filter string.
    pub fn env_filter(&self) -> String {
        if let Some(ref filter) = self.env_filter {
            filter.clone()
        } else {
            format!(
                "{},ping_uploader={}",
                self.level.as_str().to_lowercase(),
                self.uploader_level.as_str().to_lowercase()
            )
        }
    }
}

/// Installs a global `tracing` subscriber. `RUST_LOG` takes precedence over the config.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> UploadResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| UploadError::Configuration {
            message: format!("Failed to install logging subscriber: {e}"),
        })
}

/// Truncates a string to at most `max_length` bytes, on a character boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }

    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_env_filter() {
        let config = LoggingConfig::default();
        assert_eq!(config.env_filter(), "info,ping_uploader=info");

        let config = LoggingConfig::development().with_level(Level::WARN);
        assert_eq!(config.env_filter(), "warn,ping_uploader=debug");

        let config = LoggingConfig::production().with_env_filter("ping_uploader=trace");
        assert_eq!(config.env_filter(), "ping_uploader=trace");
        assert!(config.json_format);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long ping body", 10),
            "this is a ...(truncated)"
        );
    }

    #[test]
    fn test_truncate_field_respects_char_boundaries() {
        // "é" is two bytes; cutting at 2 would split it.
        assert_eq!(truncate_field("aébc", 2), "a...(truncated)");
    }
}
