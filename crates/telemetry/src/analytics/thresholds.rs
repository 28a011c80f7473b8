//! Adaptive per-metric thresholds
//!
//! Each monitored metric carries a (lower, baseline, upper) band. Evaluation
//! classifies breaches by how far outside the band a value lands;
//! recalibration pulls the band toward the recent mean with an exponential
//! moving average, gated by a minimum interval so normal noise cannot make
//! the band oscillate while long-term drift is still absorbed.

use crate::analytics::stats;
use crate::config::EngineConfig;
use crate::models::AlertSeverity;
use crate::window::MetricWindow;
use std::collections::HashMap;

/// Minimum seconds between recalibrations of one metric's band
const MIN_RECALIBRATION_SECS: i64 = 30;

/// Samples of recent history kept per metric for recalibration
const RECENT_WINDOW: usize = 60;

/// Adaptive threshold band for one metric
///
/// Invariant: `lower < baseline < upper` after construction and after every
/// recalibration.
#[derive(Debug, Clone)]
pub struct SmartThreshold {
    pub metric_name: String,
    pub baseline: f64,
    pub upper: f64,
    pub lower: f64,
    pub sensitivity: f64,
    pub adaptation_rate: f64,
    pub last_adaptation: i64,
}

impl SmartThreshold {
    /// Seed a band around the first observed value
    fn from_first_value(metric: &str, value: f64) -> Self {
        let margin = (value.abs() * 0.5).max(1e-3);
        Self {
            metric_name: metric.to_string(),
            baseline: value,
            upper: value + margin,
            lower: value - margin,
            sensitivity: 1.0,
            adaptation_rate: 0.1,
            last_adaptation: 0,
        }
    }
}

/// Outcome of evaluating one value against its band
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEvaluation {
    pub breached: bool,
    pub severity: AlertSeverity,
    /// How far outside the band, as a fraction of the band half-width
    pub deviation: f64,
}

/// Holds and recalibrates the adaptive bands for all monitored metrics
pub struct SmartThresholdManager {
    thresholds: HashMap<String, SmartThreshold>,
    recent: HashMap<String, MetricWindow>,
    min_recalibration_secs: i64,
}

impl SmartThresholdManager {
    /// Create a manager seeded from the configured per-metric bands
    pub fn new(config: &EngineConfig) -> Self {
        let mut thresholds = HashMap::new();
        for (name, band) in &config.metric_thresholds {
            thresholds.insert(
                name.clone(),
                SmartThreshold {
                    metric_name: name.clone(),
                    baseline: band.baseline,
                    upper: band.upper,
                    lower: band.lower,
                    sensitivity: band.sensitivity,
                    adaptation_rate: band.adaptation_rate,
                    last_adaptation: 0,
                },
            );
        }
        Self {
            thresholds,
            recent: HashMap::new(),
            min_recalibration_secs: MIN_RECALIBRATION_SECS,
        }
    }

    #[cfg(test)]
    fn with_recalibration_interval(mut self, secs: i64) -> Self {
        self.min_recalibration_secs = secs;
        self
    }

    /// Evaluate a value against the metric's band, creating one around the
    /// value on first observation (which therefore never breaches)
    pub fn evaluate(&mut self, metric: &str, value: f64) -> ThresholdEvaluation {
        let threshold = self
            .thresholds
            .entry(metric.to_string())
            .or_insert_with(|| SmartThreshold::from_first_value(metric, value));

        let deviation = if value > threshold.upper {
            (value - threshold.upper) / (threshold.upper - threshold.baseline).max(f64::EPSILON)
        } else if value < threshold.lower {
            (threshold.lower - value) / (threshold.baseline - threshold.lower).max(f64::EPSILON)
        } else {
            0.0
        };

        if deviation <= 0.0 {
            return ThresholdEvaluation {
                breached: false,
                severity: AlertSeverity::Info,
                deviation: 0.0,
            };
        }

        ThresholdEvaluation {
            breached: true,
            severity: severity_from_deviation(deviation),
            deviation,
        }
    }

    /// Record a value and, if the recalibration interval has elapsed, pull
    /// the band toward the recent mean
    pub fn adapt(&mut self, metric: &str, value: f64, now: i64) {
        let window = self
            .recent
            .entry(metric.to_string())
            .or_insert_with(|| MetricWindow::new(RECENT_WINDOW));
        window.push_value(now, value);

        let recent_mean = window.mean();
        let recent_std = window.std_dev();

        let threshold = self
            .thresholds
            .entry(metric.to_string())
            .or_insert_with(|| SmartThreshold::from_first_value(metric, value));

        if now - threshold.last_adaptation < self.min_recalibration_secs {
            return;
        }

        threshold.baseline =
            stats::ema(threshold.baseline, recent_mean, threshold.adaptation_rate);
        let half_width = (recent_std * 2.0 * threshold.sensitivity)
            .max((threshold.baseline.abs() * 0.05).max(1e-3));
        threshold.upper = threshold.baseline + half_width;
        threshold.lower = threshold.baseline - half_width;
        threshold.last_adaptation = now;
    }

    pub fn get(&self, metric: &str) -> Option<&SmartThreshold> {
        self.thresholds.get(metric)
    }

    pub fn metric_count(&self) -> usize {
        self.thresholds.len()
    }
}

/// Severity by deviation-ratio bands
fn severity_from_deviation(deviation: f64) -> AlertSeverity {
    if deviation < 0.1 {
        AlertSeverity::Info
    } else if deviation < 0.3 {
        AlertSeverity::Warning
    } else if deviation < 0.5 {
        AlertSeverity::Error
    } else {
        AlertSeverity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdBand;

    fn config_with_band(metric: &str, lower: f64, baseline: f64, upper: f64) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.metric_thresholds.insert(
            metric.to_string(),
            ThresholdBand {
                baseline,
                upper,
                lower,
                sensitivity: 1.0,
                adaptation_rate: 0.1,
            },
        );
        config
    }

    fn assert_band_invariant(threshold: &SmartThreshold) {
        assert!(
            threshold.lower < threshold.baseline && threshold.baseline < threshold.upper,
            "band invariant violated: {} < {} < {}",
            threshold.lower,
            threshold.baseline,
            threshold.upper
        );
    }

    #[test]
    fn test_within_band_no_breach() {
        let config = config_with_band("cpu", 0.2, 0.5, 0.8);
        let mut manager = SmartThresholdManager::new(&config);
        let eval = manager.evaluate("cpu", 0.6);
        assert!(!eval.breached);
        assert_eq!(eval.deviation, 0.0);
    }

    #[test]
    fn test_severity_bands() {
        let config = config_with_band("cpu", 0.0, 0.5, 1.0);
        let mut manager = SmartThresholdManager::new(&config);

        // Band half-width is 0.5; deviation = (value - upper) / 0.5
        let eval = manager.evaluate("cpu", 1.04);
        assert!(eval.breached);
        assert_eq!(eval.severity, AlertSeverity::Info);

        let eval = manager.evaluate("cpu", 1.1);
        assert_eq!(eval.severity, AlertSeverity::Warning);

        let eval = manager.evaluate("cpu", 1.2);
        assert_eq!(eval.severity, AlertSeverity::Error);

        let eval = manager.evaluate("cpu", 1.3);
        assert_eq!(eval.severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_breach_below_lower_bound() {
        let config = config_with_band("score", 0.5, 0.8, 1.0);
        let mut manager = SmartThresholdManager::new(&config);
        let eval = manager.evaluate("score", 0.3);
        assert!(eval.breached);
        assert!(eval.deviation > 0.5);
    }

    #[test]
    fn test_first_observation_creates_band() {
        let mut manager = SmartThresholdManager::new(&EngineConfig::default());
        let eval = manager.evaluate("new_metric", 42.0);
        assert!(!eval.breached);
        let threshold = manager.get("new_metric").unwrap();
        assert_band_invariant(threshold);
        assert_eq!(threshold.baseline, 42.0);
    }

    #[test]
    fn test_adaptation_moves_baseline_toward_recent_mean() {
        let config = config_with_band("cpu", 0.2, 0.5, 0.8);
        let mut manager = SmartThresholdManager::new(&config).with_recalibration_interval(10);

        // Sustained drift up to ~0.9
        let mut now = 100;
        for _ in 0..30 {
            manager.adapt("cpu", 0.9, now);
            now += 15;
        }

        let threshold = manager.get("cpu").unwrap();
        assert!(threshold.baseline > 0.5, "baseline was {}", threshold.baseline);
        assert_band_invariant(threshold);
    }

    #[test]
    fn test_recalibration_cooldown_prevents_oscillation() {
        let config = config_with_band("cpu", 0.2, 0.5, 0.8);
        let mut manager = SmartThresholdManager::new(&config).with_recalibration_interval(60);

        manager.adapt("cpu", 0.9, 100);
        let baseline_after_first = manager.get("cpu").unwrap().baseline;

        // Within the cooldown: no recalibration
        manager.adapt("cpu", 0.1, 130);
        assert_eq!(manager.get("cpu").unwrap().baseline, baseline_after_first);

        // After the cooldown: recalibration runs
        manager.adapt("cpu", 0.1, 200);
        assert_ne!(manager.get("cpu").unwrap().baseline, baseline_after_first);
    }

    #[test]
    fn test_band_invariant_across_many_adaptations() {
        let mut manager =
            SmartThresholdManager::new(&EngineConfig::default()).with_recalibration_interval(1);
        let mut now = 0;
        for i in 0..200 {
            let value = (i as f64 * 0.37).sin() * 10.0;
            assert!(manager
                .get("m")
                .map(|t| t.lower < t.baseline && t.baseline < t.upper)
                .unwrap_or(true));
            manager.adapt("m", value, now);
            let threshold = manager.get("m").unwrap();
            assert_band_invariant(threshold);
            now += 2;
        }
    }
}
