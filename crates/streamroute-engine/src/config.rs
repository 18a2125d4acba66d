//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operator-facing routing engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-rule regex evaluation deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub stream_processing_timeout_ms: u64,

    /// Consecutive timeouts before a stream is auto-paused (0 disables)
    #[serde(default = "default_max_faults")]
    pub stream_processing_max_faults: u64,

    /// Interval of the background generation rebuild task in milliseconds
    #[serde(default = "default_refresh_ms")]
    pub refresh_interval_ms: u64,

    /// Which engine construction strategy to use
    #[serde(default)]
    pub engine_variant: EngineVariant,

    /// The built-in default stream, if the deployment has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_stream_id: Option<String>,
}

impl EngineConfig {
    /// The regex deadline as a [`Duration`]
    pub fn processing_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_processing_timeout_ms)
    }

    /// The rebuild interval as a [`Duration`]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream_processing_timeout_ms: default_timeout_ms(),
            stream_processing_max_faults: default_max_faults(),
            refresh_interval_ms: default_refresh_ms(),
            engine_variant: EngineVariant::default(),
            default_stream_id: None,
        }
    }
}

/// Engine construction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineVariant {
    /// Rule buckets indexed by field name with per-stream match tallies
    #[default]
    Indexed,
    /// Flat rule list with per-message stream blacklisting
    EarlyExit,
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_max_faults() -> u64 {
    3
}

fn default_refresh_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();

        assert_eq!(config.processing_timeout(), Duration::from_secs(2));
        assert_eq!(config.stream_processing_max_faults, 3);
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
        assert_eq!(config.engine_variant, EngineVariant::Indexed);
        assert!(config.default_stream_id.is_none());
    }

    #[test]
    fn test_partial_deserialization() {
        let json = r#"{"stream_processing_timeout_ms": 250, "engine_variant": "early_exit"}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.stream_processing_timeout_ms, 250);
        assert_eq!(config.engine_variant, EngineVariant::EarlyExit);
        assert_eq!(config.stream_processing_max_faults, 3);
    }
}
