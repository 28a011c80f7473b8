//! Statistical anomaly detection
//!
//! Maintains a bounded window and rolling statistics per metric and
//! classifies incoming values as spike, outlier, degradation or gradual
//! change, in that precedence. Detection needs at least ten samples;
//! anything less returns a definitive no-anomaly result.

use crate::analytics::stats;
use crate::models::{AlertSeverity, AnomalyKind, AnomalyResult, MetricSample};
use crate::registry;
use crate::window::MetricWindow;
use std::collections::HashMap;

/// Samples required before any detection fires
const MIN_SAMPLES: usize = 10;

/// Points used for the gradual-change local slope
const LOCAL_SLOPE_POINTS: usize = 10;

/// Per-metric anomaly detector
pub struct AnomalyDetector {
    windows: HashMap<String, MetricWindow>,
    window_capacity: usize,
    /// Z-score above which a value is a spike
    spike_threshold: f64,
    /// Ratio of observed to trend-projected value below which a sustained
    /// drop counts as degradation
    degradation_threshold: f64,
    /// Minimum R² for the degradation rule to apply at all
    trend_gate: f64,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self {
            windows: HashMap::new(),
            window_capacity: 300,
            spike_threshold: 3.0,
            degradation_threshold: 0.7,
            trend_gate: 0.7,
        }
    }

    pub fn with_spike_threshold(mut self, threshold: f64) -> Self {
        self.spike_threshold = threshold;
        self
    }

    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    /// Append a sample to the metric's window
    pub fn add_sample(&mut self, metric: &str, value: f64, timestamp: i64) {
        let capacity = self.window_capacity;
        self.windows
            .entry(metric.to_string())
            .or_insert_with(|| MetricWindow::new(capacity))
            .push(MetricSample { timestamp, value });
    }

    /// Evaluate a value against the metric's existing window, then record it
    pub fn observe(&mut self, metric: &str, value: f64, timestamp: i64) -> AnomalyResult {
        let result = self.detect(metric, value);
        self.add_sample(metric, value, timestamp);
        result
    }

    /// Classify a value against the metric's window without recording it
    pub fn detect(&self, metric: &str, value: f64) -> AnomalyResult {
        let Some(window) = self.windows.get(metric) else {
            return AnomalyResult::insufficient_data(0);
        };
        let n = window.len();
        if n < MIN_SAMPLES {
            return AnomalyResult::insufficient_data(n);
        }

        if let Some(result) = self.detect_spike(window, value) {
            return result;
        }
        if let Some(result) = self.detect_outlier(window, value) {
            return result;
        }
        if let Some(result) = self.detect_degradation(metric, window, value) {
            return result;
        }
        if let Some(result) = self.detect_gradual_change(window) {
            return result;
        }

        AnomalyResult::none(n)
    }

    fn detect_spike(&self, window: &MetricWindow, value: f64) -> Option<AnomalyResult> {
        let std = window.std_dev();
        if std < f64::EPSILON {
            return None;
        }
        let z = (value - window.mean()).abs() / std;
        if z <= self.spike_threshold {
            return None;
        }
        Some(AnomalyResult {
            is_anomaly: true,
            kind: Some(AnomalyKind::Spike),
            confidence: (z / self.spike_threshold).min(1.0),
            severity: spike_severity(z),
            deviation: z,
            samples: window.len(),
        })
    }

    fn detect_outlier(&self, window: &MetricWindow, value: f64) -> Option<AnomalyResult> {
        let (low, high) = stats::iqr_fences(&window.values())?;
        if value >= low && value <= high {
            return None;
        }
        let iqr = ((high - low) / 3.0).max(f64::EPSILON);
        let distance = if value > high { value - high } else { low - value };
        let confidence = (distance / iqr).min(1.0);
        Some(AnomalyResult {
            is_anomaly: true,
            kind: Some(AnomalyKind::Outlier),
            confidence,
            severity: severity_from_confidence(confidence),
            deviation: distance,
            samples: window.len(),
        })
    }

    /// Sustained drop below the trend-projected expected value. Only applies
    /// when a strong trend exists (R² above the gate). The projection offset
    /// is the window's actual median sample spacing, not a fixed lag.
    fn detect_degradation(
        &self,
        metric: &str,
        window: &MetricWindow,
        value: f64,
    ) -> Option<AnomalyResult> {
        let fit = window.linear_fit();
        if fit.r_squared <= self.trend_gate {
            return None;
        }

        let t0 = window.first()?.timestamp;
        let last = window.last()?.timestamp;
        let x_now = (last - t0) as f64 + window.median_interval();
        let expected = fit.predict(x_now);
        if expected.abs() < f64::EPSILON {
            return None;
        }

        // For pressure metrics a rise above trend is the degradation
        let ratio = if registry::lower_is_better(metric) {
            expected / value.max(f64::EPSILON)
        } else {
            value / expected
        };
        if !(0.0..self.degradation_threshold).contains(&ratio) {
            return None;
        }

        let shortfall = (self.degradation_threshold - ratio) / self.degradation_threshold;
        let confidence = shortfall.clamp(0.0, 1.0);
        Some(AnomalyResult {
            is_anomaly: true,
            kind: Some(AnomalyKind::Degradation),
            confidence,
            severity: severity_from_confidence(confidence),
            deviation: ratio,
            samples: window.len(),
        })
    }

    /// Local slope over the last few points exceeding a noise-relative bound
    fn detect_gradual_change(&self, window: &MetricWindow) -> Option<AnomalyResult> {
        let values = window.values();
        if values.len() < LOCAL_SLOPE_POINTS {
            return None;
        }
        let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let noise = stats::std_dev(&diffs);
        if noise < f64::EPSILON {
            return None;
        }

        let interval = window.median_interval().max(f64::EPSILON);
        let slope_per_step = window.recent_slope(LOCAL_SLOPE_POINTS) * interval;
        let threshold = 1.5 * noise / (LOCAL_SLOPE_POINTS as f64).sqrt();
        if slope_per_step.abs() <= threshold {
            return None;
        }

        let confidence = (slope_per_step.abs() / (2.0 * threshold)).min(1.0);
        Some(AnomalyResult {
            is_anomaly: true,
            kind: Some(AnomalyKind::GradualChange),
            confidence,
            severity: severity_from_confidence(confidence),
            deviation: slope_per_step,
            samples: window.len(),
        })
    }

    /// Number of samples held for a metric
    pub fn sample_count(&self, metric: &str) -> usize {
        self.windows.get(metric).map(|w| w.len()).unwrap_or(0)
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn spike_severity(z: f64) -> AlertSeverity {
    if z >= 5.0 {
        AlertSeverity::Critical
    } else if z >= 4.0 {
        AlertSeverity::Error
    } else {
        AlertSeverity::Warning
    }
}

fn severity_from_confidence(confidence: f64) -> AlertSeverity {
    if confidence >= 0.85 {
        AlertSeverity::Critical
    } else if confidence >= 0.65 {
        AlertSeverity::Error
    } else if confidence >= 0.4 {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    }
}
