//! Closed registry of monitored metrics
//!
//! An explicit, enumerated mapping from metric name to snapshot accessor,
//! built once at startup. The coordinator feeds these series to the anomaly
//! and threshold layers; the analytics layer iterates them over history.

use crate::models::{ResourceCategory, UnifiedSnapshot};

/// One registered metric: a name, its category, whether smaller values are
/// healthier, and the accessor extracting it from a snapshot
pub struct MetricAccessor {
    pub name: &'static str,
    pub category: ResourceCategory,
    /// True for pressure-style metrics where an increase means decline
    pub lower_is_better: bool,
    pub get: fn(&UnifiedSnapshot) -> Option<f64>,
}

/// The full set of monitored metrics
pub const METRIC_REGISTRY: &[MetricAccessor] = &[
    MetricAccessor {
        name: "memory.system_usage",
        category: ResourceCategory::Memory,
        lower_is_better: true,
        get: |s| s.memory.as_ref().map(|m| m.system_usage),
    },
    MetricAccessor {
        name: "memory.process_usage",
        category: ResourceCategory::Memory,
        lower_is_better: true,
        get: |s| s.memory.as_ref().map(|m| m.process_usage),
    },
    MetricAccessor {
        name: "memory.swap_usage",
        category: ResourceCategory::Memory,
        lower_is_better: true,
        get: |s| s.memory.as_ref().map(|m| m.swap_usage),
    },
    MetricAccessor {
        name: "memory.fragmentation",
        category: ResourceCategory::Memory,
        lower_is_better: true,
        get: |s| s.memory.as_ref().map(|m| m.fragmentation),
    },
    MetricAccessor {
        name: "memory.leak_trend",
        category: ResourceCategory::Memory,
        lower_is_better: true,
        get: |s| s.memory.as_ref().map(|m| m.leak_trend),
    },
    MetricAccessor {
        name: "thread.cpu_utilization",
        category: ResourceCategory::Thread,
        lower_is_better: true,
        get: |s| s.thread.as_ref().map(|t| t.cpu_utilization),
    },
    MetricAccessor {
        name: "thread.count",
        category: ResourceCategory::Thread,
        lower_is_better: true,
        get: |s| s.thread.as_ref().map(|t| t.thread_count as f64),
    },
    MetricAccessor {
        name: "thread.context_switch_rate",
        category: ResourceCategory::Thread,
        lower_is_better: true,
        get: |s| s.thread.as_ref().map(|t| t.context_switch_rate),
    },
    MetricAccessor {
        name: "thread.deadlock_risk",
        category: ResourceCategory::Thread,
        lower_is_better: true,
        get: |s| s.thread.as_ref().map(|t| t.deadlock_risk),
    },
    MetricAccessor {
        name: "render.latency_ms",
        category: ResourceCategory::Rendering,
        lower_is_better: true,
        get: |s| Some(s.render_latency_ms),
    },
    MetricAccessor {
        name: "network.throughput",
        category: ResourceCategory::Network,
        lower_is_better: false,
        get: |s| Some(s.network_throughput),
    },
    MetricAccessor {
        name: "overall.score",
        category: ResourceCategory::System,
        lower_is_better: false,
        get: |s| Some(s.overall_score),
    },
];

/// Look up a registered metric by name
pub fn find_metric(name: &str) -> Option<&'static MetricAccessor> {
    METRIC_REGISTRY.iter().find(|m| m.name == name)
}

/// Whether an increase in this metric means decline. Unregistered metrics
/// default to higher-is-better.
pub fn lower_is_better(name: &str) -> bool {
    find_metric(name).map(|m| m.lower_is_better).unwrap_or(false)
}

/// Extract one metric's series from a run of snapshots, skipping ticks where
/// the category did not report
pub fn series<'a>(
    accessor: &MetricAccessor,
    history: impl Iterator<Item = &'a UnifiedSnapshot>,
) -> (Vec<f64>, Vec<i64>) {
    let mut values = Vec::new();
    let mut timestamps = Vec::new();
    for snapshot in history {
        if let Some(value) = (accessor.get)(snapshot) {
            values.push(value);
            timestamps.push(snapshot.timestamp);
        }
    }
    (values, timestamps)
}
