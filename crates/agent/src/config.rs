//! Agent configuration

use anyhow::{Context, Result};
use gas_anomaly::{
    classify::{
        DEFAULT_LOW_THRESHOLD, DEFAULT_MID_THRESHOLD, DEFAULT_NORMAL_THRESHOLD,
        DEFAULT_QUOTA_CAPACITY,
    },
    Alpha, StoreConfig, Thresholds, WarmupGate,
};
use serde::Deserialize;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Smoothing factor of the running statistics
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Warm-up policy (observation_count, zero_moments, disabled)
    #[serde(default)]
    pub warmup_gate: WarmupGate,

    #[serde(default = "default_normal_threshold")]
    pub normal_threshold: u64,

    #[serde(default = "default_low_threshold")]
    pub low_threshold: u64,

    #[serde(default = "default_mid_threshold")]
    pub mid_threshold: u64,

    /// Findings allowed over the agent's lifetime
    #[serde(default = "default_quota_capacity")]
    pub quota_capacity: u64,

    /// Bound on tracked keys per quantity, unbounded when unset
    #[serde(default)]
    pub max_keys: Option<usize>,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_alpha() -> f64 {
    0.05
}

fn default_normal_threshold() -> u64 {
    DEFAULT_NORMAL_THRESHOLD
}

fn default_low_threshold() -> u64 {
    DEFAULT_LOW_THRESHOLD
}

fn default_mid_threshold() -> u64 {
    DEFAULT_MID_THRESHOLD
}

fn default_quota_capacity() -> u64 {
    DEFAULT_QUOTA_CAPACITY
}

fn default_api_port() -> u16 {
    8080
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            warmup_gate: WarmupGate::default(),
            normal_threshold: default_normal_threshold(),
            low_threshold: default_low_threshold(),
            mid_threshold: default_mid_threshold(),
            quota_capacity: default_quota_capacity(),
            max_keys: None,
            api_port: default_api_port(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from `AGENT_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT").try_parsing(true))
            .build()?;

        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    pub fn store_config(&self) -> Result<StoreConfig> {
        let alpha = Alpha::new(self.alpha)?;
        let mut store_config = StoreConfig::new(alpha).with_warmup_gate(self.warmup_gate);
        if let Some(max_keys) = self.max_keys {
            store_config = store_config.with_max_keys(max_keys);
        }
        Ok(store_config)
    }

    pub fn thresholds(&self) -> Result<Thresholds> {
        Ok(Thresholds::new(
            self.normal_threshold,
            self.low_threshold,
            self.mid_threshold,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = AgentConfig::default();
        let store_config = config.store_config().unwrap();

        assert_eq!(store_config.alpha.scaled(), 50_000);
        assert_eq!(store_config.warmup_gate, WarmupGate::ObservationCount);
        assert!(store_config.max_keys.is_none());

        let thresholds = config.thresholds().unwrap();
        assert_eq!(thresholds.normal(), 5);
        assert_eq!(thresholds.low(), 10);
        assert_eq!(thresholds.mid(), 15);
        assert_eq!(config.quota_capacity, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = AgentConfig {
            alpha: 2.0,
            ..Default::default()
        };
        assert!(config.store_config().is_err());

        let config = AgentConfig {
            normal_threshold: 20,
            ..Default::default()
        };
        assert!(config.thresholds().is_err());
    }

    #[test]
    fn test_deserialize_overrides() {
        let config: AgentConfig = serde_json::from_str(
            r#"{"alpha": 0.1, "warmup_gate": "zero_moments", "max_keys": 1000}"#,
        )
        .unwrap();

        let store_config = config.store_config().unwrap();
        assert_eq!(store_config.alpha.warmup_count(), 10);
        assert_eq!(store_config.warmup_gate, WarmupGate::ZeroMoments);
        assert_eq!(store_config.max_keys, Some(1000));
        assert_eq!(config.api_port, 8080);
    }
}
