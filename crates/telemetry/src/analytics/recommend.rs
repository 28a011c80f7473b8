//! Optimization recommendations from analytics findings
//!
//! Turns bottleneck findings, declining forecasts and unstable patterns into
//! a prioritized, per-category deduplicated list of actions.

use crate::models::{
    BottleneckAnalysis, MetricPattern, OptimizationRecommendation, PatternAnalysis,
    PerformanceForecast, RecommendationPriority, ResourceCategory, TrendDirection,
};
use crate::registry;
use std::collections::HashSet;

/// Forecast risk above which a preventive recommendation is produced
const FORECAST_RISK_THRESHOLD: f64 = 0.5;

/// Pattern confidence above which stabilization advice is produced
const PATTERN_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Builds the final recommendation list for one analysis pass
pub struct OptimizationRecommender;

impl OptimizationRecommender {
    pub fn new() -> Self {
        Self
    }

    /// Combine findings into a priority-sorted list with one recommendation
    /// per category
    pub fn generate(
        &self,
        bottlenecks: &[BottleneckAnalysis],
        forecasts: &[PerformanceForecast],
        patterns: &[PatternAnalysis],
    ) -> Vec<OptimizationRecommendation> {
        let mut recommendations = Vec::new();

        for bottleneck in bottlenecks {
            recommendations.push(from_bottleneck(bottleneck));
        }
        for forecast in forecasts {
            if forecast.trend_direction == TrendDirection::Declining
                && forecast.risk_level > FORECAST_RISK_THRESHOLD
            {
                recommendations.push(from_forecast(forecast));
            }
        }
        for pattern in patterns {
            if matches!(pattern.pattern, MetricPattern::Spiky | MetricPattern::Cyclic)
                && pattern.confidence > PATTERN_CONFIDENCE_THRESHOLD
            {
                recommendations.push(from_pattern(pattern));
            }
        }

        // Highest priority first, then one recommendation per category
        recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
        let mut seen = HashSet::new();
        recommendations.retain(|r| seen.insert(r.category));
        recommendations
    }
}

impl Default for OptimizationRecommender {
    fn default() -> Self {
        Self::new()
    }
}

fn priority_from_severity(severity: f64) -> RecommendationPriority {
    if severity > 0.8 {
        RecommendationPriority::Critical
    } else if severity > 0.6 {
        RecommendationPriority::High
    } else if severity > 0.4 {
        RecommendationPriority::Medium
    } else {
        RecommendationPriority::Low
    }
}

fn from_bottleneck(bottleneck: &BottleneckAnalysis) -> OptimizationRecommendation {
    let category = bottleneck.kind.category();
    OptimizationRecommendation {
        category,
        priority: priority_from_severity(bottleneck.severity),
        title: format!("Relieve {} bottleneck", category),
        description: bottleneck.impact_assessment.clone(),
        actions: bottleneck.suggested_solutions.clone(),
        estimated_improvement: bottleneck.estimated_improvement,
    }
}

fn from_forecast(forecast: &PerformanceForecast) -> OptimizationRecommendation {
    let category = registry::find_metric(&forecast.metric)
        .map(|m| m.category)
        .unwrap_or(ResourceCategory::System);
    let priority = if forecast.risk_level > 0.8 {
        RecommendationPriority::High
    } else {
        RecommendationPriority::Medium
    };
    OptimizationRecommendation {
        category,
        priority,
        title: format!("Act before {} degrades further", forecast.metric),
        description: format!(
            "{} is forecast to keep declining (risk {:.2}); intervening now is cheaper than after a breach",
            forecast.metric, forecast.risk_level
        ),
        actions: vec![
            format!("review recent changes affecting {}", forecast.metric),
            "tighten the metric's threshold band to alert earlier".to_string(),
        ],
        estimated_improvement: (forecast.risk_level * 0.3).clamp(0.0, 0.3),
    }
}

fn from_pattern(pattern: &PatternAnalysis) -> OptimizationRecommendation {
    let category = registry::find_metric(&pattern.metric)
        .map(|m| m.category)
        .unwrap_or(ResourceCategory::System);
    let (title, actions) = match pattern.pattern {
        MetricPattern::Cyclic => (
            format!("Schedule around the {} cycle", pattern.metric),
            vec![
                format!(
                    "align heavy background work with the low phase of the {}-sample cycle",
                    pattern.dominant_period.unwrap_or(0)
                ),
                "pre-warm caches before the expected peak".to_string(),
            ],
        ),
        _ => (
            format!("Stabilize {}", pattern.metric),
            vec![
                "smooth bursty workloads with batching or rate limits".to_string(),
                format!("investigate the spikes driving {} variance", pattern.metric),
            ],
        ),
    };
    OptimizationRecommendation {
        category,
        priority: RecommendationPriority::Low,
        title,
        description: format!(
            "{} shows a {:?} pattern with confidence {:.2}",
            pattern.metric, pattern.pattern, pattern.confidence
        ),
        actions,
        estimated_improvement: 0.1,
    }
}
