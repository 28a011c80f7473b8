//! Engine configuration
//!
//! All tunables the boundary exposes: collection interval, history capacity,
//! alert cooldown/expiry windows, analysis cadence, forecast horizon and the
//! per-category decision-table thresholds. Loaded from the environment with
//! a `TELEMETRY_` prefix, or from a flat key→value map supplied by the host
//! application. Invalid threshold ordering is rejected at load time; this is
//! the only hard initialization failure in the engine.

use crate::error::TelemetryError;
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;

/// Adaptive threshold band seeded for one metric
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdBand {
    pub baseline: f64,
    pub upper: f64,
    pub lower: f64,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    #[serde(default = "default_adaptation_rate")]
    pub adaptation_rate: f64,
}

fn default_sensitivity() -> f64 {
    1.0
}

fn default_adaptation_rate() -> f64 {
    0.1
}

/// Memory collector decision-table thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryThresholds {
    /// System usage fraction above which status is Warning
    #[serde(default = "default_memory_warning")]
    pub warning: f64,
    /// System usage fraction above which status is Critical
    #[serde(default = "default_memory_critical")]
    pub critical: f64,
    /// System usage fraction above which status is OutOfMemory
    #[serde(default = "default_memory_oom")]
    pub out_of_memory: f64,
    /// Swap usage fraction that fires the high-swap condition
    #[serde(default = "default_swap_warning")]
    pub swap_warning: f64,
    /// Fragmentation proxy level that fires the fragmentation condition
    #[serde(default = "default_fragmentation_warning")]
    pub fragmentation_warning: f64,
    /// Leak-trend (usage fraction per minute) that fires the leak condition
    #[serde(default = "default_leak_trend_warning")]
    pub leak_trend_warning: f64,
}

fn default_memory_warning() -> f64 {
    0.80
}
fn default_memory_critical() -> f64 {
    0.95
}
fn default_memory_oom() -> f64 {
    0.99
}
fn default_swap_warning() -> f64 {
    0.50
}
fn default_fragmentation_warning() -> f64 {
    0.30
}
fn default_leak_trend_warning() -> f64 {
    0.05
}

impl Default for MemoryThresholds {
    fn default() -> Self {
        Self {
            warning: default_memory_warning(),
            critical: default_memory_critical(),
            out_of_memory: default_memory_oom(),
            swap_warning: default_swap_warning(),
            fragmentation_warning: default_fragmentation_warning(),
            leak_trend_warning: default_leak_trend_warning(),
        }
    }
}

/// Thread/CPU collector decision-table thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadThresholds {
    /// CPU utilization fraction that fires the high-CPU condition
    #[serde(default = "default_cpu_warning")]
    pub cpu_warning: f64,
    /// CPU utilization fraction below which the process is considered idle
    #[serde(default = "default_idle_cpu")]
    pub idle_cpu: f64,
    /// Deadlock-risk score above which status is Blocked
    #[serde(default = "default_blocked_risk")]
    pub blocked_risk: f64,
    /// Deadlock-risk score above which status is Deadlocked
    #[serde(default = "default_deadlock_risk")]
    pub deadlock_risk: f64,
    /// Absolute thread-count increase over baseline that flags a leak
    #[serde(default = "default_thread_leak_increase")]
    pub thread_leak_increase: u64,
    /// Cooldown before the thread-leak condition may fire again
    #[serde(default = "default_thread_leak_cooldown")]
    pub thread_leak_cooldown_secs: u64,
    /// Context-switch rate treated as the nominal busy level, per second
    #[serde(default = "default_context_switch_nominal")]
    pub context_switch_nominal: f64,
}

fn default_cpu_warning() -> f64 {
    0.85
}
fn default_idle_cpu() -> f64 {
    0.05
}
fn default_blocked_risk() -> f64 {
    0.5
}
fn default_deadlock_risk() -> f64 {
    0.8
}
fn default_thread_leak_increase() -> u64 {
    50
}
fn default_thread_leak_cooldown() -> u64 {
    300
}
fn default_context_switch_nominal() -> f64 {
    1000.0
}

impl Default for ThreadThresholds {
    fn default() -> Self {
        Self {
            cpu_warning: default_cpu_warning(),
            idle_cpu: default_idle_cpu(),
            blocked_risk: default_blocked_risk(),
            deadlock_risk: default_deadlock_risk(),
            thread_leak_increase: default_thread_leak_increase(),
            thread_leak_cooldown_secs: default_thread_leak_cooldown(),
            context_switch_nominal: default_context_switch_nominal(),
        }
    }
}

/// Engine-wide configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Collector and coordinator tick interval in seconds
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    /// Analytics cadence in seconds
    #[serde(default = "default_analysis_interval")]
    pub analysis_interval_secs: u64,

    /// Bounded snapshot-history capacity
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Minimum time between two admissions of the same alert condition
    #[serde(default = "default_alert_cooldown")]
    pub alert_cooldown_secs: u64,

    /// Age after which an untouched active alert is auto-resolved
    #[serde(default = "default_alert_expiry")]
    pub alert_expiry_secs: u64,

    /// Forecast horizon in steps
    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon: usize,

    #[serde(default)]
    pub memory: MemoryThresholds,

    #[serde(default)]
    pub thread: ThreadThresholds,

    /// Seeded adaptive bands, keyed by metric name
    #[serde(default)]
    pub metric_thresholds: HashMap<String, ThresholdBand>,
}

fn default_collection_interval() -> u64 {
    10
}
fn default_analysis_interval() -> u64 {
    300
}
fn default_history_capacity() -> usize {
    2000
}
fn default_alert_cooldown() -> u64 {
    60
}
fn default_alert_expiry() -> u64 {
    3600
}
fn default_forecast_horizon() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collection_interval_secs: default_collection_interval(),
            analysis_interval_secs: default_analysis_interval(),
            history_capacity: default_history_capacity(),
            alert_cooldown_secs: default_alert_cooldown(),
            alert_expiry_secs: default_alert_expiry(),
            forecast_horizon: default_forecast_horizon(),
            memory: MemoryThresholds::default(),
            thread: ThreadThresholds::default(),
            metric_thresholds: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment (`TELEMETRY_` prefix, `__`
    /// for nested keys, e.g. `TELEMETRY_MEMORY__WARNING`), falling back to
    /// defaults for anything unset
    pub fn load() -> Result<Self> {
        let source = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TELEMETRY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let cfg: EngineConfig = match source.try_deserialize() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(
                    event = "config_env_fallback",
                    error = %err,
                    "malformed environment configuration, using defaults"
                );
                EngineConfig::default()
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from a flat key→value map supplied by the host
    /// application's config collaborator, e.g. `{"alert_cooldown_secs": "60"}`
    pub fn from_map(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(key.clone(), value.clone())?;
        }
        let source = builder.build()?;

        let cfg: EngineConfig = source.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject invalid orderings at load time rather than starting in an
    /// invalid state
    pub fn validate(&self) -> Result<(), TelemetryError> {
        for (name, band) in &self.metric_thresholds {
            if !(band.lower < band.baseline && band.baseline < band.upper) {
                return Err(TelemetryError::Config(format!(
                    "threshold band for '{}' must satisfy lower < baseline < upper \
                     (got lower={}, baseline={}, upper={})",
                    name, band.lower, band.baseline, band.upper
                )));
            }
            if !(0.0..=1.0).contains(&band.adaptation_rate) {
                return Err(TelemetryError::Config(format!(
                    "adaptation rate for '{}' must be in [0, 1]",
                    name
                )));
            }
        }

        if !(self.memory.warning < self.memory.critical
            && self.memory.critical <= self.memory.out_of_memory)
        {
            return Err(TelemetryError::Config(format!(
                "memory thresholds must satisfy warning < critical <= out_of_memory \
                 (got {}, {}, {})",
                self.memory.warning, self.memory.critical, self.memory.out_of_memory
            )));
        }

        if self.thread.blocked_risk >= self.thread.deadlock_risk {
            return Err(TelemetryError::Config(
                "thread blocked_risk must be below deadlock_risk".to_string(),
            ));
        }

        if self.history_capacity == 0 {
            return Err(TelemetryError::Config(
                "history_capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.alert_cooldown_secs, 60);
        assert_eq!(cfg.alert_expiry_secs, 3600);
        assert_eq!(cfg.history_capacity, 2000);
        assert_eq!(cfg.forecast_horizon, 10);
        assert_eq!(cfg.analysis_interval_secs, 300);
    }

    #[test]
    fn test_invalid_band_ordering_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.metric_thresholds.insert(
            "memory.system_usage".to_string(),
            ThresholdBand {
                baseline: 0.5,
                upper: 0.4,
                lower: 0.6,
                sensitivity: 1.0,
                adaptation_rate: 0.1,
            },
        );
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("lower < baseline < upper"));
    }

    #[test]
    fn test_invalid_memory_ordering_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.memory.warning = 0.97;
        cfg.memory.critical = 0.95;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_map_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("alert_cooldown_secs".to_string(), "120".to_string());
        overrides.insert("history_capacity".to_string(), "500".to_string());

        let cfg = EngineConfig::from_map(&overrides).unwrap();
        assert_eq!(cfg.alert_cooldown_secs, 120);
        assert_eq!(cfg.history_capacity, 500);
        // Untouched fields keep their defaults
        assert_eq!(cfg.alert_expiry_secs, 3600);
    }

    #[test]
    fn test_env_nested_keys_reach_threshold_tables() {
        // One env-mutating test only; parallel tests must not touch the
        // TELEMETRY_ prefix
        std::env::set_var("TELEMETRY_MEMORY__WARNING", "0.7");
        std::env::set_var("TELEMETRY_ALERT_COOLDOWN_SECS", "90");
        let cfg = EngineConfig::load().unwrap();
        std::env::remove_var("TELEMETRY_MEMORY__WARNING");
        std::env::remove_var("TELEMETRY_ALERT_COOLDOWN_SECS");

        assert_eq!(cfg.memory.warning, 0.7);
        assert_eq!(cfg.alert_cooldown_secs, 90);
        // Nested defaults survive a partial override
        assert_eq!(cfg.memory.critical, 0.95);
    }

    #[test]
    fn test_zero_history_capacity_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.history_capacity = 0;
        assert!(cfg.validate().is_err());
    }
}
