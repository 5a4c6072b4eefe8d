use crate::error::{Result, StreamError};
use crate::streaming::decoder::DEFAULT_MAX_LINE_BYTES;
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-stream clock limits. A zero duration disables that clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default, rename = "ttft_ms", with = "millis")]
    pub ttft: Duration,
    #[serde(default, rename = "idle_ms", with = "millis")]
    pub idle: Duration,
    #[serde(default, rename = "total_ms", with = "millis")]
    pub total: Duration,
}

impl TimeoutConfig {
    pub fn with_ttft(mut self, ttft: Duration) -> Self {
        self.ttft = ttft;
        self
    }

    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    pub fn with_total(mut self, total: Duration) -> Self {
        self.total = total;
        self
    }

    pub fn ttft_limit(&self) -> Option<Duration> {
        enabled(self.ttft)
    }

    pub fn idle_limit(&self) -> Option<Duration> {
        enabled(self.idle)
    }

    pub fn total_limit(&self) -> Option<Duration> {
        enabled(self.total)
    }
}

fn enabled(limit: Duration) -> Option<Duration> {
    (!limit.is_zero()).then_some(limit)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Response header carrying the server-echoed correlation id
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

fn default_request_id_header() -> String {
    DEFAULT_REQUEST_ID_HEADER.to_string()
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            request_id_header: default_request_id_header(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl StreamConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = StreamConfig::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| StreamError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: StreamConfig = toml::from_str(&contents)
            .map_err(|e| StreamError::Config(format!("Failed to parse config file: {}", e)))?;

        // Allow environment variables to override file config
        config.apply_env()?;

        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(ms) = env_millis("NDJSON_TTFT_TIMEOUT_MS")? {
            self.timeouts.ttft = ms;
        }
        if let Some(ms) = env_millis("NDJSON_IDLE_TIMEOUT_MS")? {
            self.timeouts.idle = ms;
        }
        if let Some(ms) = env_millis("NDJSON_TOTAL_TIMEOUT_MS")? {
            self.timeouts.total = ms;
        }
        if let Ok(header) = env::var("NDJSON_REQUEST_ID_HEADER") {
            self.request_id_header = header;
        }
        if let Ok(value) = env::var("NDJSON_MAX_LINE_BYTES") {
            self.max_line_bytes = value.parse::<usize>().map_err(|e| {
                StreamError::Config(format!("Invalid NDJSON_MAX_LINE_BYTES value: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_line_bytes == 0 {
            return Err(StreamError::Config(
                "max_line_bytes must be greater than 0".to_string(),
            ));
        }

        self.request_id_header_name()?;

        let TimeoutConfig { ttft, idle, total } = self.timeouts;
        if !total.is_zero() && !ttft.is_zero() && ttft > total {
            tracing::warn!(
                ?ttft,
                ?total,
                "TTFT timeout exceeds total timeout and can never fire"
            );
        }
        if !total.is_zero() && !idle.is_zero() && idle > total {
            tracing::warn!(
                ?idle,
                ?total,
                "Idle timeout exceeds total timeout and can never fire"
            );
        }

        Ok(())
    }

    pub fn request_id_header_name(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.request_id_header.trim().as_bytes()).map_err(|e| {
            StreamError::Config(format!(
                "Invalid request id header {:?}: {}",
                self.request_id_header, e
            ))
        })
    }
}

fn env_millis(key: &str) -> Result<Option<Duration>> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|e| StreamError::Config(format!("Invalid {} value: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Everything a single stream needs besides its transport.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    pub config: StreamConfig,
    /// Caller-side cancellation; takes precedence over the stream clocks
    pub cancel: Option<CancellationToken>,
    /// Caller-side absolute deadline, reported as a cancellation
    pub deadline: Option<Instant>,
}

impl StreamOptions {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let valid_config = StreamConfig::default();
        assert!(valid_config.validate().is_ok());

        let invalid_config = StreamConfig {
            max_line_bytes: 0,
            ..StreamConfig::default()
        };
        assert!(invalid_config.validate().is_err());

        let invalid_header = StreamConfig {
            request_id_header: "bad header\n".to_string(),
            ..StreamConfig::default()
        };
        assert!(invalid_header.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config: StreamConfig = toml::from_str(
            r#"
            request_id_header = "x-correlation-id"

            [timeouts]
            ttft_ms = 2500
            total_ms = 60000
            "#,
        )
        .unwrap();

        assert_eq!(config.timeouts.ttft, Duration::from_millis(2500));
        assert_eq!(config.timeouts.idle_limit(), None);
        assert_eq!(config.timeouts.total_limit(), Some(Duration::from_secs(60)));
        assert_eq!(config.request_id_header, "x-correlation-id");
        assert_eq!(config.max_line_bytes, DEFAULT_MAX_LINE_BYTES);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: StreamConfig = toml::from_str("").unwrap();
        assert_eq!(config, StreamConfig::default());
        assert!(config.timeouts.ttft_limit().is_none());
    }

    #[test]
    fn test_zero_disables_clock() {
        let timeouts = TimeoutConfig::default()
            .with_ttft(Duration::ZERO)
            .with_idle(Duration::from_millis(5));
        assert_eq!(timeouts.ttft_limit(), None);
        assert_eq!(timeouts.idle_limit(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_timeouts_roundtrip_as_millis() {
        let timeouts = TimeoutConfig::default().with_idle(Duration::from_millis(1500));
        let text = toml::to_string(&timeouts).unwrap();
        assert!(text.contains("idle_ms = 1500"));
    }
}
