//! Core data models for the telemetry engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single scalar observation for one named metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub value: f64,
}

/// Resource category a metric or alert belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Memory,
    Thread,
    Rendering,
    Network,
    System,
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceCategory::Memory => write!(f, "memory"),
            ResourceCategory::Thread => write!(f, "thread"),
            ResourceCategory::Rendering => write!(f, "rendering"),
            ResourceCategory::Network => write!(f, "network"),
            ResourceCategory::System => write!(f, "system"),
        }
    }
}

/// Alert severity levels, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Error => write!(f, "error"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Memory category status from the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    Normal,
    Warning,
    Critical,
    OutOfMemory,
    /// Sampling failed; values are carried over from the last good reading
    Error,
}

/// Thread/CPU category status from the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Idle,
    Running,
    Blocked,
    Deadlocked,
    /// Sampling failed; values are carried over from the last good reading
    Error,
}

/// Derived memory measurements for one sampling tick
///
/// Mutated only by the owning collector; read-only to everyone else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub timestamp: i64,
    /// System memory usage as a fraction of total
    pub system_usage: f64,
    /// Process resident memory as a fraction of total system memory
    pub process_usage: f64,
    /// Swap usage as a fraction of total swap (0 when no swap configured)
    pub swap_usage: f64,
    /// Fragmentation proxy: reclaimable-but-not-free share of total memory
    pub fragmentation: f64,
    /// Leak-trend proxy: regression slope of recent usage, fraction per minute
    pub leak_trend: f64,
    pub status: MemoryStatus,
    /// Names of currently firing alert conditions
    pub active_conditions: Vec<String>,
}

/// Derived thread/CPU measurements for one sampling tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMetrics {
    pub timestamp: i64,
    pub thread_count: u64,
    /// Thread count recorded at collector start, for leak detection
    pub baseline_thread_count: u64,
    /// Global CPU utilization as a fraction
    pub cpu_utilization: f64,
    /// Context switches per second for the current process
    pub context_switch_rate: f64,
    /// Run-queue depth normalized by CPU count
    pub queue_depth: f64,
    /// Deadlock-risk score combining queue depth and context-switch rate
    pub deadlock_risk: f64,
    pub thread_leak_suspected: bool,
    pub status: ThreadStatus,
    /// Names of currently firing alert conditions
    pub active_conditions: Vec<String>,
}

/// One aggregated, immutable view of all monitored categories
///
/// Created once per coordinator tick and appended to the bounded history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedSnapshot {
    pub timestamp: i64,
    pub memory: Option<MemoryMetrics>,
    pub thread: Option<ThreadMetrics>,
    /// Externally pushed rendering latency gauge, milliseconds
    pub render_latency_ms: f64,
    /// Externally pushed network throughput gauge, bytes per second
    pub network_throughput: f64,
    /// Composite health score in [0, 1], higher is better
    pub overall_score: f64,
    /// Estimated headroom for optimization in [0, 1]
    pub optimization_potential: f64,
    /// Ids of alerts active in the coordinator at creation time
    pub active_alerts: Vec<u64>,
    pub critical_issues: Vec<String>,
    /// Set when one or more categories failed to report this tick
    pub incomplete: bool,
}

/// An admitted performance alert
///
/// Identity is `id`, a deterministic hash of (category, condition) used for
/// cooldown deduplication. A resolved alert is never re-activated; a repeat
/// breach after the cooldown produces a fresh admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub id: u64,
    pub category: ResourceCategory,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub current_value: f64,
    pub threshold_value: f64,
    pub timestamp: i64,
    pub resolved: bool,
    pub resolution_time: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Kind of detected anomaly, in evaluation precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Spike,
    Outlier,
    Degradation,
    GradualChange,
}

/// Result of a single anomaly evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    pub kind: Option<AnomalyKind>,
    /// Confidence in [0, 1], derived from the triggering statistic
    pub confidence: f64,
    pub severity: AlertSeverity,
    /// Deviation of the value from its expected level, in the units of the
    /// triggering statistic (z-score for spikes, ratio shortfall for
    /// degradation)
    pub deviation: f64,
    /// Samples available when the evaluation ran
    pub samples: usize,
}

impl AnomalyResult {
    /// Definitive no-anomaly result for windows below the minimum size
    pub fn insufficient_data(samples: usize) -> Self {
        Self {
            is_anomaly: false,
            kind: None,
            confidence: 0.0,
            severity: AlertSeverity::Info,
            deviation: 0.0,
            samples,
        }
    }

    pub fn none(samples: usize) -> Self {
        Self::insufficient_data(samples)
    }
}

/// Forecasting model selected for a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastModel {
    Linear,
    Polynomial,
    Seasonal,
    MovingAverage,
    Exponential,
}

/// Direction a metric is heading, in health terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

/// Point forecast with confidence bounds for one metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceForecast {
    pub metric: String,
    pub model: ForecastModel,
    pub predicted_values: Vec<f64>,
    /// (lower, upper) bounds, ±1.96σ around each predicted point
    pub confidence_intervals: Vec<(f64, f64)>,
    pub trend_direction: TrendDirection,
    pub change_probability: f64,
    pub risk_level: f64,
    pub forecast_accuracy: f64,
    pub generated_at: i64,
}

/// Resource category diagnosed as a bottleneck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    Memory,
    Thread,
    Rendering,
    Overall,
}

impl BottleneckKind {
    pub fn category(&self) -> ResourceCategory {
        match self {
            BottleneckKind::Memory => ResourceCategory::Memory,
            BottleneckKind::Thread => ResourceCategory::Thread,
            BottleneckKind::Rendering => ResourceCategory::Rendering,
            BottleneckKind::Overall => ResourceCategory::System,
        }
    }
}

/// Diagnosis of a resource category limiting overall performance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleneckAnalysis {
    pub kind: BottleneckKind,
    /// Severity in [0, 1] from the weighted breach conditions
    pub severity: f64,
    pub confidence: f64,
    pub affected_metrics: Vec<String>,
    pub root_causes: Vec<String>,
    pub impact_assessment: String,
    pub suggested_solutions: Vec<String>,
    /// Estimated overall-score improvement if addressed, in [0, 1]
    pub estimated_improvement: f64,
    pub detected_at: i64,
}

/// Qualitative classification of a metric's recent time-series shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricPattern {
    Stable,
    Cyclic,
    TrendingUp,
    TrendingDown,
    Spiky,
}

/// Pattern classification for one metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub metric: String,
    pub pattern: MetricPattern,
    /// Value of the statistic that decided the classification
    pub confidence: f64,
    pub trend_strength: f64,
    pub cyclical_strength: f64,
    pub dominant_period: Option<usize>,
    pub noise_level: f64,
    pub spikiness: f64,
}

/// Recommendation priority, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// A deduplicated, prioritized optimization recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRecommendation {
    pub category: ResourceCategory,
    pub priority: RecommendationPriority,
    pub title: String,
    pub description: String,
    pub actions: Vec<String>,
    /// Estimated overall-score improvement if applied, in [0, 1]
    pub estimated_improvement: f64,
}
