//! Behavioral pattern classification per metric
//!
//! Computes trend strength, cyclical strength, noise level and spikiness for
//! every registered metric with enough history, then classifies by fixed
//! precedence. Confidence is the statistic that decided the classification.

use crate::analytics::stats;
use crate::models::{MetricPattern, PatternAnalysis, UnifiedSnapshot};
use crate::registry::{self, METRIC_REGISTRY};

/// Observations required before a metric is classified
const MIN_OBSERVATIONS: usize = 20;

const CYCLIC_THRESHOLD: f64 = 0.3;
const SPIKY_THRESHOLD: f64 = 0.5;
const TREND_THRESHOLD: f64 = 0.6;
const NOISE_THRESHOLD: f64 = 0.4;

/// Classifies each monitored metric's recent behavior
pub struct PatternAnalyzer {
    min_observations: usize,
}

impl PatternAnalyzer {
    pub fn new() -> Self {
        Self {
            min_observations: MIN_OBSERVATIONS,
        }
    }

    /// One analysis per registered metric with at least twenty observations
    pub fn analyze(&self, history: &[UnifiedSnapshot]) -> Vec<PatternAnalysis> {
        METRIC_REGISTRY
            .iter()
            .filter_map(|accessor| {
                let (values, _) = registry::series(accessor, history.iter());
                if values.len() < self.min_observations {
                    return None;
                }
                Some(classify(accessor.name, &values))
            })
            .collect()
    }
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(metric: &str, values: &[f64]) -> PatternAnalysis {
    let fit = stats::linear_fit(values);
    let trend_strength = fit.r_squared;

    let cycle = stats::dominant_cycle(values);
    let cyclical_strength = cycle.map(|(_, s)| s).unwrap_or(0.0);
    let dominant_period = cycle.map(|(p, _)| p);

    let std = stats::std_dev(values);
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let noise_level = if std > f64::EPSILON {
        (stats::std_dev(&diffs) / std).min(1.0)
    } else {
        0.0
    };

    let spikiness = outlier_fraction(values);

    let (pattern, confidence) = if cyclical_strength > CYCLIC_THRESHOLD {
        (MetricPattern::Cyclic, cyclical_strength)
    } else if spikiness > SPIKY_THRESHOLD {
        (MetricPattern::Spiky, spikiness)
    } else if trend_strength > TREND_THRESHOLD {
        let pattern = if fit.slope >= 0.0 {
            MetricPattern::TrendingUp
        } else {
            MetricPattern::TrendingDown
        };
        (pattern, trend_strength)
    } else if noise_level > NOISE_THRESHOLD {
        (MetricPattern::Spiky, noise_level)
    } else {
        (MetricPattern::Stable, 1.0 - noise_level)
    };

    PatternAnalysis {
        metric: metric.to_string(),
        pattern,
        confidence: confidence.clamp(0.0, 1.0),
        trend_strength,
        cyclical_strength,
        dominant_period,
        noise_level,
        spikiness,
    }
}

/// Fraction of values outside the 1.5·IQR fences
fn outlier_fraction(values: &[f64]) -> f64 {
    match stats::iqr_fences(values) {
        Some((low, high)) => {
            let outliers = values.iter().filter(|v| **v < low || **v > high).count();
            outliers as f64 / values.len() as f64
        }
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_analysis(values: &[f64]) -> PatternAnalysis {
        classify("m", values)
    }

    #[test]
    fn test_stable_series() {
        let values = vec![10.0; 40];
        let analysis = series_analysis(&values);
        assert_eq!(analysis.pattern, MetricPattern::Stable);
        assert!(analysis.confidence > 0.9);
    }

    #[test]
    fn test_alternating_series_is_cyclic() {
        // Alternation is a genuine period-2 cycle to the spectrum
        let values: Vec<f64> = (0..40)
            .map(|i| 10.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let analysis = series_analysis(&values);
        assert_eq!(analysis.pattern, MetricPattern::Cyclic);
        assert_eq!(analysis.dominant_period, Some(2));
    }

    #[test]
    fn test_trending_up_series() {
        let values: Vec<f64> = (0..40).map(|i| 1.0 + i as f64 * 0.5).collect();
        let analysis = series_analysis(&values);
        assert_eq!(analysis.pattern, MetricPattern::TrendingUp);
        assert!(analysis.trend_strength > 0.95);
        assert_eq!(analysis.confidence, analysis.trend_strength);
    }

    #[test]
    fn test_trending_down_series() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 - i as f64 * 0.5).collect();
        let analysis = series_analysis(&values);
        assert_eq!(analysis.pattern, MetricPattern::TrendingDown);
    }

    #[test]
    fn test_cyclic_series_with_period() {
        let values: Vec<f64> = (0..48)
            .map(|i| 10.0 + 3.0 * (2.0 * std::f64::consts::PI * i as f64 / 8.0).sin())
            .collect();
        let analysis = series_analysis(&values);
        assert_eq!(analysis.pattern, MetricPattern::Cyclic);
        assert_eq!(analysis.dominant_period, Some(8));
        assert!(analysis.cyclical_strength > 0.3);
    }

    #[test]
    fn test_cyclic_takes_precedence_over_trend() {
        // Strong cycle on a mild trend
        let values: Vec<f64> = (0..48)
            .map(|i| {
                10.0 + i as f64 * 0.05
                    + 5.0 * (2.0 * std::f64::consts::PI * i as f64 / 8.0).sin()
            })
            .collect();
        let analysis = series_analysis(&values);
        assert_eq!(analysis.pattern, MetricPattern::Cyclic);
    }

    #[test]
    fn test_analyzer_respects_minimum_observations() {
        use crate::models::UnifiedSnapshot;
        let analyzer = PatternAnalyzer::new();
        let history: Vec<UnifiedSnapshot> = (0..10)
            .map(|i| UnifiedSnapshot {
                timestamp: i * 10,
                memory: None,
                thread: None,
                render_latency_ms: 5.0,
                network_throughput: 0.0,
                overall_score: 0.9,
                optimization_potential: 0.0,
                active_alerts: Vec::new(),
                critical_issues: Vec::new(),
                incomplete: true,
            })
            .collect();
        assert!(analyzer.analyze(&history).is_empty());
    }

    #[test]
    fn test_analyzer_covers_reporting_metrics_only() {
        use crate::models::UnifiedSnapshot;
        let analyzer = PatternAnalyzer::new();
        let history: Vec<UnifiedSnapshot> = (0..25)
            .map(|i| UnifiedSnapshot {
                timestamp: i * 10,
                memory: None,
                thread: None,
                render_latency_ms: 5.0 + (i % 3) as f64,
                network_throughput: 100.0,
                overall_score: 0.9,
                optimization_potential: 0.0,
                active_alerts: Vec::new(),
                critical_issues: Vec::new(),
                incomplete: true,
            })
            .collect();
        let analyses = analyzer.analyze(&history);
        // Memory and thread never reported; only snapshot-level metrics appear
        assert!(analyses.iter().all(|a| !a.metric.starts_with("memory.")));
        assert!(analyses.iter().any(|a| a.metric == "render.latency_ms"));
    }
}
