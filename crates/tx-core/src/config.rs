//! Session configuration

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Settings for the session readiness gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds to wait for the platform handshake
    pub timeout_secs: f64,

    /// Interval between readiness checks
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 2.0,
            poll_interval_ms: 100,
        }
    }
}

impl SessionConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Negative values wait not at all; values past `Duration::MAX` saturate
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text).context("Invalid session config")?;
        Duration::try_from_secs_f64(config.timeout_secs)
            .with_context(|| format!("timeout_secs out of range: {}", config.timeout_secs))?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SessionConfig::from_json(r#"{"timeout_secs": 0.5}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(500));
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn test_invalid_json() {
        assert!(SessionConfig::from_json(r#"{"timeout_secs": "soon"}"#).is_err());
    }

    #[test]
    fn test_out_of_range_timeout_rejected() {
        assert!(SessionConfig::from_json(r#"{"timeout_secs": 1e20}"#).is_err());
        assert!(SessionConfig::from_json(r#"{"timeout_secs": -1.0}"#).is_err());

        let built = SessionConfig {
            timeout_secs: 1e20,
            ..SessionConfig::default()
        };
        assert_eq!(built.timeout(), Duration::MAX);

        let zero = SessionConfig::default().with_timeout(Duration::ZERO);
        assert_eq!(zero.timeout(), Duration::ZERO);
    }
}
