//! End-to-end tests for the telemetry engine
//!
//! Drives collectors, coordinator and analytics with simulated readings and
//! simulated time; no OS sampling or background tasks involved.

use std::collections::HashMap;
use std::sync::Arc;
use telemetry_engine::analytics::{AnomalyDetector, BottleneckAnalyzer, TrendPredictor};
use telemetry_engine::collector::memory::{MemoryCollector, MemoryReading};
use telemetry_engine::collector::CategorySample;
use telemetry_engine::config::MemoryThresholds;
use telemetry_engine::coordinator::{alert_id, ExportFormat, UnifiedCoordinator};
use telemetry_engine::models::{
    AnomalyKind, ForecastModel, MemoryStatus, ResourceCategory, ThreadMetrics, ThreadStatus,
    TrendDirection,
};
use telemetry_engine::EngineConfig;

fn thread_sample(ts: i64) -> CategorySample {
    CategorySample::Thread(ThreadMetrics {
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
    })
}

fn coordinator() -> Arc<UnifiedCoordinator> {
    UnifiedCoordinator::initialize(EngineConfig::default(), Vec::new()).unwrap()
}

/// Scenario 1: monotonically rising memory usage reaching 97% ends in a
/// critical status and an admitted high_system_memory_usage alert.
#[test]
fn rising_memory_usage_raises_critical_alert() {
    let mut collector = MemoryCollector::new(MemoryThresholds::default()).unwrap();
    let coordinator = coordinator();

    let mut last_status = MemoryStatus::Normal;
    for i in 0..20 {
        let usage = 0.78 + i as f64 * 0.01;
        let now = i * 10;
        let metrics = collector.evaluate(
            MemoryReading {
                system_usage: usage,
                process_usage: usage * 0.4,
                swap_usage: 0.0,
                fragmentation: 0.05,
            },
            now,
        );
        last_status = metrics.status;
        coordinator.ingest(
            &[CategorySample::Memory(metrics), thread_sample(now)],
            now,
        );
    }

    assert_eq!(last_status, MemoryStatus::Critical);
    let expected_id = alert_id(ResourceCategory::Memory, "high_system_memory_usage");
    assert!(coordinator
        .active_alerts()
        .iter()
        .any(|a| a.id == expected_id && !a.resolved));
}

/// Scenario 2: a flat series then one extreme value is a spike with z > 3.
#[test]
fn spike_detected_after_stable_series() {
    let mut detector = AnomalyDetector::new();
    for i in 0..50 {
        let value = 10.0 + if i % 2 == 0 { 0.1 } else { -0.1 };
        detector.add_sample("render.latency_ms", value, i * 10);
    }

    let result = detector.detect("render.latency_ms", 100.0);
    assert!(result.is_anomaly);
    assert_eq!(result.kind, Some(AnomalyKind::Spike));
    assert!(result.deviation > 3.0);
}

/// Scenario 3: 40 points of y = 2x + noise forecast as a linear-family model
/// with an improving direction and accuracy above 0.7.
#[test]
fn linear_growth_forecast_is_accurate() {
    let predictor = TrendPredictor::default();
    let values: Vec<f64> = (0..40)
        .map(|i| 2.0 * i as f64 + if i % 3 == 0 { 0.4 } else { -0.2 })
        .collect();
    let timestamps: Vec<i64> = (0..40).map(|i| i * 10).collect();

    let forecast = predictor
        .predict("network.throughput", &values, &timestamps, None)
        .unwrap();
    assert!(matches!(
        forecast.model,
        ForecastModel::Linear | ForecastModel::Polynomial
    ));
    assert_eq!(forecast.trend_direction, TrendDirection::Improving);
    assert!(forecast.forecast_accuracy > 0.7);
}

/// Scenario 4: two breaches 5 seconds apart under a 60 second cooldown
/// admit exactly one alert.
#[test]
fn cooldown_suppresses_repeat_breach() {
    let coordinator = coordinator();

    let breach = |ts: i64| {
        CategorySample::Memory(telemetry_engine::models::MemoryMetrics {
            timestamp: ts,
            system_usage: 0.97,
            process_usage: 0.4,
            swap_usage: 0.0,
            fragmentation: 0.05,
            leak_trend: 0.0,
            status: MemoryStatus::Critical,
            active_conditions: vec!["high_system_memory_usage".to_string()],
        })
    };

    coordinator.ingest(&[breach(1000), thread_sample(1000)], 1000);
    coordinator.ingest(&[breach(1005), thread_sample(1005)], 1005);

    let expected_id = alert_id(ResourceCategory::Memory, "high_system_memory_usage");
    let matching: Vec<_> = coordinator
        .active_alerts()
        .into_iter()
        .filter(|a| a.id == expected_id)
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].timestamp, 1000);
}

/// Scenario 5: an untouched active alert is auto-resolved into history once
/// the expiry window elapses.
#[test]
fn stale_alert_auto_resolves_on_sweep() {
    let coordinator = coordinator();
    let breach = CategorySample::Memory(telemetry_engine::models::MemoryMetrics {
        timestamp: 1000,
        system_usage: 0.97,
        process_usage: 0.4,
        swap_usage: 0.0,
        fragmentation: 0.05,
        leak_trend: 0.0,
        status: MemoryStatus::Critical,
        active_conditions: vec!["high_system_memory_usage".to_string()],
    });
    coordinator.ingest(&[breach, thread_sample(1000)], 1000);
    assert_eq!(coordinator.active_alerts().len(), 1);

    // A later healthy tick past the 3600 s expiry sweeps it into history
    let healthy = CategorySample::Memory(telemetry_engine::models::MemoryMetrics {
        timestamp: 1000 + 3700,
        system_usage: 0.4,
        process_usage: 0.2,
        swap_usage: 0.0,
        fragmentation: 0.05,
        leak_trend: 0.0,
        status: MemoryStatus::Normal,
        active_conditions: Vec::new(),
    });
    coordinator.ingest(&[healthy, thread_sample(1000 + 3700)], 1000 + 3700);

    let expected_id = alert_id(ResourceCategory::Memory, "high_system_memory_usage");
    assert!(coordinator
        .active_alerts()
        .iter()
        .all(|a| a.id != expected_id));
    let resolved = coordinator
        .alert_history()
        .into_iter()
        .find(|a| a.id == expected_id)
        .expect("swept into history");
    assert!(resolved.resolved);
    assert_eq!(resolved.resolution_time, Some(1000 + 3700));
}

#[test]
fn predictor_and_analyzer_minimum_data_boundaries() {
    let predictor = TrendPredictor::default();
    let timestamps: Vec<i64> = (0..9).map(|i| i * 10).collect();
    assert!(predictor
        .predict("m", &[1.0; 9], &timestamps, None)
        .is_none());

    // With 10 to 19 flat points the moving-average model is selected
    for n in [10usize, 19] {
        let values = vec![5.0; n];
        let timestamps: Vec<i64> = (0..n as i64).map(|i| i * 10).collect();
        let forecast = predictor.predict("m", &values, &timestamps, None).unwrap();
        assert_eq!(forecast.model, ForecastModel::MovingAverage);
    }

    let analyzer = BottleneckAnalyzer::new();
    assert!(analyzer.analyze(&[]).is_empty());
}

#[test]
fn export_round_trip_preserves_state() {
    let coordinator = coordinator();
    for i in 0..15 {
        let usage = if i == 5 { 0.97 } else { 0.5 };
        let sample = CategorySample::Memory(telemetry_engine::models::MemoryMetrics {
            timestamp: i * 10,
            system_usage: usage,
            process_usage: 0.2,
            swap_usage: 0.0,
            fragmentation: 0.05,
            leak_trend: 0.0,
            status: if usage > 0.95 {
                MemoryStatus::Critical
            } else {
                MemoryStatus::Normal
            },
            active_conditions: if usage > 0.95 {
                vec!["high_system_memory_usage".to_string()]
            } else {
                Vec::new()
            },
        });
        coordinator.ingest(&[sample, thread_sample(i * 10)], i * 10);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");
    coordinator
        .export_metrics(&path, ExportFormat::Json)
        .unwrap();

    let reloaded = telemetry_engine::coordinator::export::read_export(&path).unwrap();
    assert_eq!(reloaded.snapshots.len(), 15);
    assert_eq!(
        reloaded.active_alerts.len(),
        coordinator.active_alerts().len()
    );
    assert_eq!(reloaded.summary, coordinator.performance_summary());
}

#[test]
fn analytics_pass_over_degrading_history_recommends_action() {
    let coordinator = coordinator();
    // Memory climbing from 80% to ~99% over 40 ticks
    for i in 0..40 {
        let usage = (0.80 + i as f64 * 0.005).min(0.99);
        let sample = CategorySample::Memory(telemetry_engine::models::MemoryMetrics {
            timestamp: i * 10,
            system_usage: usage,
            process_usage: 0.4,
            swap_usage: 0.0,
            fragmentation: 0.05,
            leak_trend: 0.06,
            status: MemoryStatus::Warning,
            active_conditions: Vec::new(),
        });
        coordinator.ingest(&[sample, thread_sample(i * 10)], i * 10);
    }

    let report = coordinator.run_analytics();
    assert!(report
        .bottlenecks
        .iter()
        .any(|b| b.kind == telemetry_engine::models::BottleneckKind::Memory));
    assert!(!report.forecasts.is_empty());
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.category == ResourceCategory::Memory));
}

#[test]
fn config_from_map_overrides_and_validates() {
    let mut overrides = HashMap::new();
    overrides.insert("collection_interval_secs".to_string(), "5".to_string());
    overrides.insert("alert_cooldown_secs".to_string(), "120".to_string());
    let config = EngineConfig::from_map(&overrides).unwrap();
    assert_eq!(config.collection_interval_secs, 5);
    assert_eq!(config.alert_cooldown_secs, 120);

    let mut bad = HashMap::new();
    bad.insert("memory.warning".to_string(), "0.99".to_string());
    bad.insert("memory.critical".to_string(), "0.5".to_string());
    assert!(EngineConfig::from_map(&bad).is_err());
}
