//! Observability for the telemetry engine itself
//!
//! Internal error and lifecycle counters backed by the process-wide
//! Prometheus registry, plus a structured event logger. The engine degrades
//! gracefully; these counters are how absorbed failures stay visible.

use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    collection_errors: IntCounter,
    aggregation_errors: IntCounter,
    analysis_errors: IntCounter,
    subscriber_failures: IntCounter,
    alerts_admitted: IntCounter,
    alerts_resolved: IntCounter,
    snapshots_aggregated: IntCounter,
    active_collectors: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            collection_errors: register_int_counter!(
                "telemetry_collection_errors_total",
                "Total number of failed or timed-out sampling calls"
            )
            .expect("Failed to register collection_errors"),

            aggregation_errors: register_int_counter!(
                "telemetry_aggregation_errors_total",
                "Total number of ticks with missing or partial category metrics"
            )
            .expect("Failed to register aggregation_errors"),

            analysis_errors: register_int_counter!(
                "telemetry_analysis_errors_total",
                "Total number of absorbed analytics failures"
            )
            .expect("Failed to register analysis_errors"),

            subscriber_failures: register_int_counter!(
                "telemetry_subscriber_failures_total",
                "Total number of isolated subscriber callback failures"
            )
            .expect("Failed to register subscriber_failures"),

            alerts_admitted: register_int_counter!(
                "telemetry_alerts_admitted_total",
                "Total number of alerts admitted past cooldown deduplication"
            )
            .expect("Failed to register alerts_admitted"),

            alerts_resolved: register_int_counter!(
                "telemetry_alerts_resolved_total",
                "Total number of alerts auto-resolved by the expiry sweep"
            )
            .expect("Failed to register alerts_resolved"),

            snapshots_aggregated: register_int_counter!(
                "telemetry_snapshots_aggregated_total",
                "Total number of unified snapshots produced"
            )
            .expect("Failed to register snapshots_aggregated"),

            active_collectors: register_int_gauge!(
                "telemetry_active_collectors",
                "Number of collectors registered with the coordinator"
            )
            .expect("Failed to register active_collectors"),
        }
    }
}

/// Lightweight handle to the global engine counters
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_collection_errors(&self) {
        self.inner().collection_errors.inc();
    }

    pub fn inc_aggregation_errors(&self) {
        self.inner().aggregation_errors.inc();
    }

    pub fn inc_analysis_errors(&self) {
        self.inner().analysis_errors.inc();
    }

    pub fn inc_subscriber_failures(&self) {
        self.inner().subscriber_failures.inc();
    }

    pub fn inc_alerts_admitted(&self) {
        self.inner().alerts_admitted.inc();
    }

    pub fn inc_alerts_resolved(&self) {
        self.inner().alerts_resolved.inc();
    }

    pub fn inc_snapshots_aggregated(&self) {
        self.inner().snapshots_aggregated.inc();
    }

    pub fn set_active_collectors(&self, count: i64) {
        self.inner().active_collectors.set(count);
    }

    pub fn collection_error_count(&self) -> u64 {
        self.inner().collection_errors.get()
    }

    pub fn analysis_error_count(&self) -> u64 {
        self.inner().analysis_errors.get()
    }
}

/// Structured logger for significant engine events
#[derive(Clone)]
pub struct EventLogger {
    component: String,
}

impl EventLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_alert_admitted(
        &self,
        alert_id: u64,
        category: &str,
        severity: &str,
        title: &str,
        current_value: f64,
        threshold_value: f64,
    ) {
        warn!(
            event = "alert_admitted",
            component = %self.component,
            alert_id = alert_id,
            category = %category,
            severity = %severity,
            title = %title,
            current_value = current_value,
            threshold_value = threshold_value,
            "Performance alert admitted"
        );
    }

    pub fn log_alert_resolved(&self, alert_id: u64, category: &str, age_secs: i64) {
        info!(
            event = "alert_resolved",
            component = %self.component,
            alert_id = alert_id,
            category = %category,
            age_secs = age_secs,
            "Alert auto-resolved by expiry sweep"
        );
    }

    pub fn log_collection_degraded(&self, category: &str, reason: &str) {
        warn!(
            event = "collection_degraded",
            component = %self.component,
            category = %category,
            reason = %reason,
            "Sampling failed, carrying previous reading"
        );
    }

    pub fn log_startup(&self, collectors: usize, interval_secs: u64) {
        info!(
            event = "engine_started",
            component = %self.component,
            collectors = collectors,
            interval_secs = interval_secs,
            "Telemetry engine started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "engine_shutdown",
            component = %self.component,
            reason = %reason,
            "Telemetry engine shutting down"
        );
    }
}
