//! Unified coordination of collectors, alerts and analytics
//!
//! The coordinator aggregates the latest collector readings into a
//! `UnifiedSnapshot` once per tick, scores overall health, evaluates
//! thresholds and anomalies, admits alerts and notifies subscribers. The
//! analytics pass runs on its own longer cadence over a cloned slice of
//! history. Locks are held only for reads and appends, never across a
//! subscriber callback.

pub mod alerts;
pub mod export;

pub use alerts::{alert_id, AlertCandidate, AlertCenter};
pub use export::{ExportFormat, MetricsExport};

use crate::analytics::{
    AnomalyDetector, BottleneckAnalyzer, OptimizationRecommender, PatternAnalyzer,
    SmartThresholdManager, TrendPredictor,
};
use crate::collector::{CategorySample, CollectorHandle, ResourceCollector};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{
    AlertSeverity, BottleneckAnalysis, MemoryMetrics, MemoryStatus, OptimizationRecommendation,
    PatternAnalysis, PerformanceAlert, PerformanceForecast, ThreadMetrics, ThreadStatus,
    UnifiedSnapshot,
};
use crate::observability::{EngineMetrics, EventLogger};
use crate::registry::{self, METRIC_REGISTRY};
use crate::runtime::{self, WorkerHandle};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Frame budget for a 60 fps target, used for the rendering health score
const FRAME_BUDGET_MS: f64 = 16.7;

/// Callback invoked with each produced snapshot
pub type SnapshotSubscriber = Box<dyn Fn(&UnifiedSnapshot) + Send + Sync>;

/// Callback invoked with each admitted alert
pub type AlertSubscriber = Box<dyn Fn(&PerformanceAlert) + Send + Sync>;

/// Running statistics over the retained history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub generated_at: i64,
    pub snapshot_count: usize,
    pub mean_overall_score: f64,
    pub min_overall_score: f64,
    pub max_overall_score: f64,
    pub mean_optimization_potential: f64,
    pub incomplete_snapshots: usize,
    pub active_alert_count: usize,
    pub resolved_alert_count: usize,
}

/// Output of one analytics pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub generated_at: i64,
    pub forecasts: Vec<PerformanceForecast>,
    pub bottlenecks: Vec<BottleneckAnalysis>,
    pub patterns: Vec<PatternAnalysis>,
    pub recommendations: Vec<OptimizationRecommendation>,
}

/// Externally pushed measurements with no dedicated collector
#[derive(Debug, Clone, Copy, Default)]
struct ExternalInputs {
    render_latency_ms: f64,
    network_throughput: f64,
}

pub struct UnifiedCoordinator {
    config: EngineConfig,
    metrics: EngineMetrics,
    logger: EventLogger,
    alert_center: AlertCenter,
    history: Mutex<VecDeque<UnifiedSnapshot>>,
    thresholds: Mutex<SmartThresholdManager>,
    anomalies: Mutex<AnomalyDetector>,
    external: Mutex<ExternalInputs>,
    analytics_report: Mutex<Option<AnalyticsReport>>,
    snapshot_subscribers: RwLock<Vec<SnapshotSubscriber>>,
    alert_subscribers: RwLock<Vec<AlertSubscriber>>,
    pending_collectors: Mutex<Vec<Box<dyn ResourceCollector>>>,
    running_collectors: Mutex<Vec<Arc<CollectorHandle>>>,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl UnifiedCoordinator {
    /// Validate the configuration and register the collectors. The only
    /// hard failure path in the engine.
    pub fn initialize(
        config: EngineConfig,
        collectors: Vec<Box<dyn ResourceCollector>>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let metrics = EngineMetrics::new();
        Ok(Arc::new(Self {
            alert_center: AlertCenter::new(
                config.alert_cooldown_secs,
                config.alert_expiry_secs,
                metrics.clone(),
            ),
            history: Mutex::new(VecDeque::with_capacity(config.history_capacity)),
            thresholds: Mutex::new(SmartThresholdManager::new(&config)),
            anomalies: Mutex::new(AnomalyDetector::new()),
            external: Mutex::new(ExternalInputs::default()),
            analytics_report: Mutex::new(None),
            snapshot_subscribers: RwLock::new(Vec::new()),
            alert_subscribers: RwLock::new(Vec::new()),
            pending_collectors: Mutex::new(collectors),
            running_collectors: Mutex::new(Vec::new()),
            workers: Mutex::new(Vec::new()),
            logger: EventLogger::new("coordinator"),
            metrics,
            config,
        }))
    }

    /// Spawn the collectors, the tick loop and the analytics loop
    pub fn start(self: &Arc<Self>) {
        let interval = Duration::from_secs(self.config.collection_interval_secs.max(1));
        let collectors: Vec<Box<dyn ResourceCollector>> =
            std::mem::take(&mut *self.pending_collectors.lock().unwrap_or_else(|e| e.into_inner()));
        let count = collectors.len();

        {
            let mut running = self
                .running_collectors
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            for collector in collectors {
                running.push(Arc::new(CollectorHandle::start(
                    collector,
                    interval,
                    self.metrics.clone(),
                )));
            }
            self.metrics.set_active_collectors(running.len() as i64);
        }

        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        let coordinator = self.clone();
        workers.push(runtime::spawn_periodic("coordinator", interval, move || {
            let coordinator = coordinator.clone();
            async move {
                coordinator.tick();
            }
        }));

        let coordinator = self.clone();
        let analysis_interval = Duration::from_secs(self.config.analysis_interval_secs.max(1));
        workers.push(runtime::spawn_periodic(
            "analytics",
            analysis_interval,
            move || {
                let coordinator = coordinator.clone();
                async move {
                    coordinator.run_analytics();
                }
            },
        ));
        drop(workers);

        self.logger
            .log_startup(count, self.config.collection_interval_secs);
    }

    /// Stop the tick loop, the analytics loop and all collectors.
    /// Best-effort and bounded; see `runtime::WorkerHandle::stop`.
    pub async fn stop(&self) {
        self.logger.log_shutdown("stop requested");
        let workers: Vec<WorkerHandle> =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        for worker in &workers {
            worker.stop().await;
        }
        let collectors: Vec<Arc<CollectorHandle>> = std::mem::take(
            &mut *self
                .running_collectors
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        );
        for collector in &collectors {
            collector.stop().await;
        }
        self.metrics.set_active_collectors(0);
    }

    /// One aggregation pass over the latest collector readings
    pub fn tick(&self) {
        let samples: Vec<CategorySample> = self
            .running_collectors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter_map(|handle| handle.latest())
            .collect();
        self.ingest(&samples, chrono::Utc::now().timestamp());
    }

    /// Aggregate one set of category samples at the given time. Exposed for
    /// on-demand use and simulated-time tests; the periodic tick delegates
    /// here.
    pub fn ingest(&self, samples: &[CategorySample], now: i64) -> UnifiedSnapshot {
        let mut memory: Option<MemoryMetrics> = None;
        let mut thread: Option<ThreadMetrics> = None;
        for sample in samples {
            match sample {
                CategorySample::Memory(m) => memory = Some(m.clone()),
                CategorySample::Thread(t) => thread = Some(t.clone()),
            }
        }

        let incomplete = memory.is_none() || thread.is_none();
        if incomplete {
            self.metrics.inc_aggregation_errors();
        }

        let external = *self.external.lock().unwrap_or_else(|e| e.into_inner());
        let mut snapshot = UnifiedSnapshot {
            timestamp: now,
            overall_score: overall_score(&memory, &thread, &external),
            optimization_potential: optimization_potential(&memory, &thread),
            memory,
            thread,
            render_latency_ms: external.render_latency_ms,
            network_throughput: external.network_throughput,
            active_alerts: Vec::new(),
            critical_issues: Vec::new(),
            incomplete,
        };

        // Aggregation happens-before alert evaluation
        let mut candidates = Vec::new();
        if let Some(memory) = &snapshot.memory {
            candidates.extend(memory_candidates(memory, &self.config));
        }
        if let Some(thread) = &snapshot.thread {
            candidates.extend(thread_candidates(thread, &self.config));
        }
        candidates.extend(self.evaluate_metrics(&snapshot, now));

        let mut admitted = Vec::new();
        for candidate in candidates {
            if let Some(alert) = self.alert_center.admit(candidate, now) {
                admitted.push(alert);
            }
        }
        self.alert_center.sweep(now);

        let active = self.alert_center.active();
        snapshot.active_alerts = active.iter().map(|a| a.id).collect();
        snapshot.critical_issues = active
            .iter()
            .filter(|a| a.severity == AlertSeverity::Critical)
            .map(|a| a.title.clone())
            .collect();

        {
            let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            let ordered = history.back().map(|s| s.timestamp < now).unwrap_or(true);
            if ordered {
                if history.len() == self.config.history_capacity {
                    history.pop_front();
                }
                history.push_back(snapshot.clone());
            }
        }
        self.metrics.inc_snapshots_aggregated();

        // Alert evaluation happens-before notification; no locks held here
        self.notify(&snapshot, &admitted);
        snapshot
    }

    /// Threshold and anomaly evaluation over every registered metric the
    /// snapshot reports
    fn evaluate_metrics(&self, snapshot: &UnifiedSnapshot, now: i64) -> Vec<AlertCandidate> {
        let mut candidates = Vec::new();
        let mut thresholds = self.thresholds.lock().unwrap_or_else(|e| e.into_inner());
        let mut anomalies = self.anomalies.lock().unwrap_or_else(|e| e.into_inner());

        for accessor in METRIC_REGISTRY {
            let Some(value) = (accessor.get)(snapshot) else {
                continue;
            };

            let evaluation = thresholds.evaluate(accessor.name, value);
            if evaluation.breached && evaluation.severity >= AlertSeverity::Warning {
                let band = thresholds.get(accessor.name);
                let threshold_value = band
                    .map(|t| if value > t.upper { t.upper } else { t.lower })
                    .unwrap_or(value);
                candidates.push(AlertCandidate {
                    category: accessor.category,
                    condition: format!("{}_band_breach", accessor.name),
                    severity: evaluation.severity,
                    title: format!("{} outside adaptive band", accessor.name),
                    description: format!(
                        "{} at {:.3}, {:.0}% past the adaptive band edge {:.3}",
                        accessor.name,
                        value,
                        evaluation.deviation * 100.0,
                        threshold_value
                    ),
                    current_value: value,
                    threshold_value,
                    metadata: HashMap::new(),
                });
            }
            thresholds.adapt(accessor.name, value, now);

            let anomaly = anomalies.observe(accessor.name, value, now);
            if anomaly.is_anomaly && anomaly.severity >= AlertSeverity::Warning {
                let kind = anomaly
                    .kind
                    .map(|k| format!("{:?}", k).to_lowercase())
                    .unwrap_or_default();
                let mut metadata = HashMap::new();
                metadata.insert("anomaly_kind".to_string(), kind.clone());
                metadata.insert("confidence".to_string(), format!("{:.3}", anomaly.confidence));
                candidates.push(AlertCandidate {
                    category: accessor.category,
                    condition: format!("{}_anomaly", accessor.name),
                    severity: anomaly.severity,
                    title: format!("Anomalous {} behavior", accessor.name),
                    description: format!(
                        "{} {} anomaly at {:.3} (deviation {:.2})",
                        accessor.name, kind, value, anomaly.deviation
                    ),
                    current_value: value,
                    threshold_value: value - anomaly.deviation,
                    metadata,
                });
            }
        }
        candidates
    }

    fn notify(&self, snapshot: &UnifiedSnapshot, admitted: &[PerformanceAlert]) {
        let subscribers = self
            .alert_subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner());
        for alert in admitted {
            for subscriber in subscribers.iter() {
                if catch_unwind(AssertUnwindSafe(|| subscriber(alert))).is_err() {
                    self.metrics.inc_subscriber_failures();
                }
            }
        }
        drop(subscribers);

        let subscribers = self
            .snapshot_subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner());
        for subscriber in subscribers.iter() {
            if catch_unwind(AssertUnwindSafe(|| subscriber(snapshot))).is_err() {
                self.metrics.inc_subscriber_failures();
            }
        }
    }

    /// Run the full analytics pass over a clone of history
    pub fn run_analytics(&self) -> AnalyticsReport {
        let history: Vec<UnifiedSnapshot> = {
            let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            history.iter().cloned().collect()
        };
        let generated_at = history.last().map(|s| s.timestamp).unwrap_or(0);
        let horizon = self.config.forecast_horizon;

        // Analysis failures are absorbed into an empty report, never a crash
        let report = catch_unwind(AssertUnwindSafe(|| {
            let predictor = TrendPredictor::new(horizon);
            let mut forecasts = Vec::new();
            for accessor in METRIC_REGISTRY {
                let (values, timestamps) = registry::series(accessor, history.iter());
                if let Some(forecast) =
                    predictor.predict(accessor.name, &values, &timestamps, None)
                {
                    forecasts.push(forecast);
                }
            }

            let bottlenecks = BottleneckAnalyzer::new().analyze(&history);
            let patterns = PatternAnalyzer::new().analyze(&history);
            let recommendations =
                OptimizationRecommender::new().generate(&bottlenecks, &forecasts, &patterns);

            AnalyticsReport {
                generated_at,
                forecasts,
                bottlenecks,
                patterns,
                recommendations,
            }
        }))
        .unwrap_or_else(|_| {
            self.metrics.inc_analysis_errors();
            AnalyticsReport {
                generated_at,
                ..AnalyticsReport::default()
            }
        });
        *self
            .analytics_report
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(report.clone());
        report
    }

    /// Push a render-path latency measurement from the host application
    pub fn report_render_latency(&self, latency_ms: f64) {
        self.external
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .render_latency_ms = latency_ms.max(0.0);
    }

    /// Push a network throughput measurement from the host application
    pub fn report_network_throughput(&self, throughput: f64) {
        self.external
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .network_throughput = throughput.max(0.0);
    }

    pub fn subscribe_snapshots(&self, subscriber: SnapshotSubscriber) {
        self.snapshot_subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(subscriber);
    }

    pub fn subscribe_alerts(&self, subscriber: AlertSubscriber) {
        self.alert_subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(subscriber);
    }

    /// The most recent snapshot, if any tick has run
    pub fn current_snapshot(&self) -> Option<UnifiedSnapshot> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .back()
            .cloned()
    }

    /// The most recent `n` snapshots, oldest first
    pub fn history(&self, n: usize) -> Vec<UnifiedSnapshot> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let skip = history.len().saturating_sub(n);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn active_alerts(&self) -> Vec<PerformanceAlert> {
        self.alert_center.active()
    }

    pub fn alert_history(&self) -> Vec<PerformanceAlert> {
        self.alert_center.history()
    }

    /// The latest analytics pass, if one has run
    pub fn latest_analytics(&self) -> Option<AnalyticsReport> {
        self.analytics_report
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let scores: Vec<f64> = history.iter().map(|s| s.overall_score).collect();
        let potentials: Vec<f64> = history.iter().map(|s| s.optimization_potential).collect();
        let incomplete = history.iter().filter(|s| s.incomplete).count();
        let generated_at = history.back().map(|s| s.timestamp).unwrap_or(0);
        drop(history);

        let (min_score, max_score) = if scores.is_empty() {
            (0.0, 0.0)
        } else {
            (
                scores.iter().copied().fold(f64::INFINITY, f64::min),
                scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };

        PerformanceSummary {
            generated_at,
            snapshot_count: scores.len(),
            mean_overall_score: crate::analytics::stats::mean(&scores),
            min_overall_score: min_score,
            max_overall_score: max_score,
            mean_optimization_potential: crate::analytics::stats::mean(&potentials),
            incomplete_snapshots: incomplete,
            active_alert_count: self.alert_center.active_count(),
            resolved_alert_count: self.alert_center.history().len(),
        }
    }

    /// Serialize history, alerts and the running summary to a file
    pub fn export_metrics(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let export = MetricsExport {
            exported_at: chrono::Utc::now().timestamp(),
            snapshots: self.history(usize::MAX),
            active_alerts: self.active_alerts(),
            alert_history: self.alert_history(),
            summary: self.performance_summary(),
        };
        export::write_export(path, format, &export)
    }
}

/// Mean of the available per-category health scores
fn overall_score(
    memory: &Option<MemoryMetrics>,
    thread: &Option<ThreadMetrics>,
    external: &ExternalInputs,
) -> f64 {
    let mut scores = Vec::with_capacity(3);
    if let Some(memory) = memory {
        scores.push((1.0 - memory.system_usage).clamp(0.0, 1.0));
    }
    if let Some(thread) = thread {
        let pressure = thread.cpu_utilization.max(thread.deadlock_risk);
        scores.push((1.0 - pressure).clamp(0.0, 1.0));
    }
    if external.render_latency_ms > 0.0 {
        scores.push((FRAME_BUDGET_MS / external.render_latency_ms).clamp(0.0, 1.0));
    }
    if scores.is_empty() {
        return 0.0;
    }
    crate::analytics::stats::mean(&scores)
}

/// Fixed-weight capped contributions from the recoverable inefficiencies
fn optimization_potential(
    memory: &Option<MemoryMetrics>,
    thread: &Option<ThreadMetrics>,
) -> f64 {
    let mut potential = 0.0;
    if let Some(memory) = memory {
        potential += 0.3 * (memory.fragmentation / 0.3).clamp(0.0, 1.0);
        potential += 0.3 * (memory.leak_trend / 0.05).clamp(0.0, 1.0);
    }
    if let Some(thread) = thread {
        potential += 0.2 * thread.deadlock_risk.clamp(0.0, 1.0);
        potential += 0.2 * (thread.queue_depth - 1.0).clamp(0.0, 1.0);
    }
    potential.clamp(0.0, 1.0)
}

fn condition_severity(condition: &str) -> AlertSeverity {
    match condition {
        "out_of_memory_imminent" | "high_system_memory_usage" | "deadlock_risk" => {
            AlertSeverity::Critical
        }
        "memory_leak_suspected" | "thread_leak_suspected" => AlertSeverity::Error,
        _ => AlertSeverity::Warning,
    }
}

fn memory_candidates(memory: &MemoryMetrics, config: &EngineConfig) -> Vec<AlertCandidate> {
    if memory.status == MemoryStatus::Error {
        return Vec::new();
    }
    let t = &config.memory;
    memory
        .active_conditions
        .iter()
        .map(|condition| {
            let (current, threshold) = match condition.as_str() {
                "out_of_memory_imminent" => (memory.system_usage, t.out_of_memory),
                "high_system_memory_usage" => (memory.system_usage, t.critical),
                "elevated_system_memory_usage" => (memory.system_usage, t.warning),
                "high_swap_usage" => (memory.swap_usage, t.swap_warning),
                "high_fragmentation" => (memory.fragmentation, t.fragmentation_warning),
                "memory_leak_suspected" => (memory.leak_trend, t.leak_trend_warning),
                _ => (memory.system_usage, t.warning),
            };
            AlertCandidate {
                category: crate::models::ResourceCategory::Memory,
                condition: condition.clone(),
                severity: condition_severity(condition),
                title: format!("Memory: {}", condition.replace('_', " ")),
                description: format!(
                    "{} at {:.3} against threshold {:.3}",
                    condition, current, threshold
                ),
                current_value: current,
                threshold_value: threshold,
                metadata: HashMap::new(),
            }
        })
        .collect()
}

fn thread_candidates(thread: &ThreadMetrics, config: &EngineConfig) -> Vec<AlertCandidate> {
    if thread.status == ThreadStatus::Error {
        return Vec::new();
    }
    let t = &config.thread;
    thread
        .active_conditions
        .iter()
        .map(|condition| {
            let (current, threshold) = match condition.as_str() {
                "high_cpu_utilization" => (thread.cpu_utilization, t.cpu_warning),
                "deadlock_risk" => (thread.deadlock_risk, t.deadlock_risk),
                "thread_contention" => (thread.deadlock_risk, t.blocked_risk),
                "thread_leak_suspected" => (
                    thread.thread_count as f64,
                    (thread.baseline_thread_count + t.thread_leak_increase) as f64,
                ),
                _ => (thread.cpu_utilization, t.cpu_warning),
            };
            AlertCandidate {
                category: crate::models::ResourceCategory::Thread,
                condition: condition.clone(),
                severity: condition_severity(condition),
                title: format!("Threads: {}", condition.replace('_', " ")),
                description: format!(
                    "{} at {:.3} against threshold {:.3}",
                    condition, current, threshold
                ),
                current_value: current,
                threshold_value: threshold,
                metadata: HashMap::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceCategory;

    fn memory_metrics(ts: i64, usage: f64) -> MemoryMetrics {
        MemoryMetrics {
            timestamp: ts,
            system_usage: usage,
            process_usage: usage * 0.4,
            swap_usage: 0.0,
            fragmentation: 0.05,
            leak_trend: 0.0,
            status: if usage >= 0.95 {
                MemoryStatus::Critical
            } else {
                MemoryStatus::Normal
            },
            active_conditions: if usage >= 0.95 {
                vec!["high_system_memory_usage".to_string()]
            } else {
                Vec::new()
            },
        }
    }

    fn thread_metrics(ts: i64) -> ThreadMetrics {
        ThreadMetrics {
            timestamp: ts,
            thread_count: 12,
            baseline_thread_count: 12,
            cpu_utilization: 0.3,
            context_switch_rate: 800.0,
            queue_depth: 0.4,
            deadlock_risk: 0.0,
            thread_leak_suspected: false,
            status: ThreadStatus::Running,
            active_conditions: Vec::new(),
        }
    }

    fn samples(ts: i64, usage: f64) -> Vec<CategorySample> {
        vec![
            CategorySample::Memory(memory_metrics(ts, usage)),
            CategorySample::Thread(thread_metrics(ts)),
        ]
    }

    fn coordinator() -> Arc<UnifiedCoordinator> {
        UnifiedCoordinator::initialize(EngineConfig::default(), Vec::new()).unwrap()
    }

    #[test]
    fn test_initialize_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.memory.warning = 0.99;
        config.memory.critical = 0.5;
        assert!(UnifiedCoordinator::initialize(config, Vec::new()).is_err());
    }

    #[test]
    fn test_snapshot_aggregation_and_scoring() {
        let coordinator = coordinator();
        let snapshot = coordinator.ingest(&samples(100, 0.5), 100);

        assert!(!snapshot.incomplete);
        assert!(snapshot.memory.is_some());
        assert!(snapshot.thread.is_some());
        // Mean of memory health 0.5 and thread health 0.7
        assert!((snapshot.overall_score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_missing_category_marks_incomplete() {
        let coordinator = coordinator();
        let only_thread = vec![CategorySample::Thread(thread_metrics(100))];
        let snapshot = coordinator.ingest(&only_thread, 100);
        assert!(snapshot.incomplete);
        assert!(snapshot.memory.is_none());
    }

    #[test]
    fn test_critical_memory_admits_alert() {
        let coordinator = coordinator();
        let snapshot = coordinator.ingest(&samples(100, 0.97), 100);

        let active = coordinator.active_alerts();
        let expected_id = alert_id(ResourceCategory::Memory, "high_system_memory_usage");
        assert!(active.iter().any(|a| a.id == expected_id));
        assert!(snapshot.active_alerts.contains(&expected_id));
        assert!(!snapshot.critical_issues.is_empty());
    }

    #[test]
    fn test_repeat_breach_within_cooldown_admits_once() {
        let coordinator = coordinator();
        coordinator.ingest(&samples(100, 0.97), 100);
        coordinator.ingest(&samples(105, 0.97), 105);

        let expected_id = alert_id(ResourceCategory::Memory, "high_system_memory_usage");
        let matching: Vec<_> = coordinator
            .active_alerts()
            .into_iter()
            .filter(|a| a.id == expected_id)
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].timestamp, 100);
    }

    #[test]
    fn test_history_bounded_and_ordered() {
        let mut config = EngineConfig::default();
        config.history_capacity = 10;
        let coordinator = UnifiedCoordinator::initialize(config, Vec::new()).unwrap();

        for i in 0..25 {
            coordinator.ingest(&samples(i * 10, 0.5), i * 10);
        }
        let history = coordinator.history(usize::MAX);
        assert_eq!(history.len(), 10);
        for pair in history.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn test_stale_tick_does_not_reorder_history() {
        let coordinator = coordinator();
        coordinator.ingest(&samples(200, 0.5), 200);
        coordinator.ingest(&samples(150, 0.5), 150);
        let history = coordinator.history(usize::MAX);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp, 200);
    }

    #[test]
    fn test_current_snapshot_is_idempotent() {
        let coordinator = coordinator();
        coordinator.ingest(&samples(100, 0.5), 100);
        let a = coordinator.current_snapshot().unwrap();
        let b = coordinator.current_snapshot().unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let coordinator = coordinator();
        coordinator.subscribe_snapshots(Box::new(|_| panic!("subscriber bug")));
        let seen = Arc::new(Mutex::new(0usize));
        let counter = seen.clone();
        coordinator.subscribe_snapshots(Box::new(move |_| {
            *counter.lock().unwrap() += 1;
        }));

        coordinator.ingest(&samples(100, 0.5), 100);
        // The panic was absorbed and the second subscriber still ran
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_alert_subscriber_receives_admissions() {
        let coordinator = coordinator();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        coordinator.subscribe_alerts(Box::new(move |alert| {
            sink.lock().unwrap().push(alert.id);
        }));

        coordinator.ingest(&samples(100, 0.97), 100);
        let expected_id = alert_id(ResourceCategory::Memory, "high_system_memory_usage");
        assert!(received.lock().unwrap().contains(&expected_id));
    }

    #[test]
    fn test_performance_summary_statistics() {
        let coordinator = coordinator();
        coordinator.ingest(&samples(100, 0.4), 100);
        coordinator.ingest(&samples(200, 0.6), 200);

        let summary = coordinator.performance_summary();
        assert_eq!(summary.snapshot_count, 2);
        assert_eq!(summary.generated_at, 200);
        assert!(summary.min_overall_score <= summary.mean_overall_score);
        assert!(summary.mean_overall_score <= summary.max_overall_score);
    }

    #[test]
    fn test_performance_summary_before_any_snapshot() {
        let coordinator = coordinator();
        let summary = coordinator.performance_summary();
        assert_eq!(summary.snapshot_count, 0);
        assert_eq!(summary.min_overall_score, 0.0);
        assert_eq!(summary.max_overall_score, 0.0);
        assert!(summary.min_overall_score <= summary.max_overall_score);
    }

    #[test]
    fn test_run_analytics_on_short_history_is_empty() {
        let coordinator = coordinator();
        coordinator.ingest(&samples(100, 0.5), 100);
        let report = coordinator.run_analytics();
        assert!(report.forecasts.is_empty());
        assert!(report.bottlenecks.is_empty());
        assert!(report.patterns.is_empty());
        assert!(report.recommendations.is_empty());
        assert!(coordinator.latest_analytics().is_some());
    }

    #[test]
    fn test_overall_score_empty_when_nothing_reports() {
        assert_eq!(
            overall_score(&None, &None, &ExternalInputs::default()),
            0.0
        );
    }

    #[test]
    fn test_optimization_potential_weights() {
        let mut memory = memory_metrics(0, 0.5);
        memory.fragmentation = 0.3;
        memory.leak_trend = 0.05;
        let mut thread = thread_metrics(0);
        thread.deadlock_risk = 1.0;
        thread.queue_depth = 2.0;
        let potential = optimization_potential(&Some(memory), &Some(thread));
        assert!((potential - 1.0).abs() < 1e-9);
    }
}
