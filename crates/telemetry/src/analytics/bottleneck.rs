//! Bottleneck detection over snapshot history
//!
//! Independent per-category analyzers score memory, thread and rendering
//! pressure from weighted breach conditions, plus an overall analysis when
//! the composite score itself is low or falling. Every output field is a
//! deterministic function of the input history.

use crate::analytics::stats;
use crate::models::{BottleneckAnalysis, BottleneckKind, UnifiedSnapshot};
use crate::registry;

/// Snapshots required before any analysis is produced
const MIN_SNAPSHOTS: usize = 10;

/// Category severity below which no analysis is emitted
const EMISSION_THRESHOLD: f64 = 0.35;

/// Frame budget for a 60 fps target, in milliseconds
const FRAME_BUDGET_MS: f64 = 16.7;

/// Scores resource categories for bottleneck pressure
pub struct BottleneckAnalyzer {
    emission_threshold: f64,
}

impl BottleneckAnalyzer {
    pub fn new() -> Self {
        Self {
            emission_threshold: EMISSION_THRESHOLD,
        }
    }

    /// Analyze a run of snapshots. Empty below ten snapshots.
    pub fn analyze(&self, history: &[UnifiedSnapshot]) -> Vec<BottleneckAnalysis> {
        if history.len() < MIN_SNAPSHOTS {
            return Vec::new();
        }
        let detected_at = history.last().map(|s| s.timestamp).unwrap_or(0);

        let mut findings = Vec::new();
        for scored in [
            score_memory(history),
            score_thread(history),
            score_rendering(history),
        ]
        .into_iter()
        .flatten()
        {
            if scored.severity >= self.emission_threshold {
                findings.push(finalize(scored, history.len(), detected_at));
            }
        }

        if let Some(overall) = score_overall(history, &findings) {
            findings.push(finalize(overall, history.len(), detected_at));
        }

        findings
    }
}

impl Default for BottleneckAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Category score before the history-size confidence scaling
struct Scored {
    kind: BottleneckKind,
    severity: f64,
    affected_metrics: Vec<String>,
    root_causes: Vec<String>,
    suggested_solutions: Vec<String>,
}

fn finalize(scored: Scored, snapshots: usize, detected_at: i64) -> BottleneckAnalysis {
    let data_factor = (snapshots as f64 / 30.0).min(1.0);
    let confidence = (data_factor * (0.6 + 0.4 * scored.severity)).clamp(0.0, 1.0);
    let estimated_improvement = (scored.severity * 0.5).clamp(0.0, 0.5);
    let impact_assessment = format!(
        "{} pressure at severity {:.2}; addressing the root causes could recover roughly {:.0}% of capacity",
        scored.kind.category(),
        scored.severity,
        estimated_improvement * 100.0
    );
    BottleneckAnalysis {
        kind: scored.kind,
        severity: scored.severity,
        confidence,
        affected_metrics: scored.affected_metrics,
        root_causes: scored.root_causes,
        impact_assessment,
        suggested_solutions: scored.suggested_solutions,
        estimated_improvement,
        detected_at,
    }
}

fn metric_series(name: &str, history: &[UnifiedSnapshot]) -> Vec<f64> {
    registry::find_metric(name)
        .map(|accessor| registry::series(accessor, history.iter()).0)
        .unwrap_or_default()
}

fn score_memory(history: &[UnifiedSnapshot]) -> Option<Scored> {
    let usage = metric_series("memory.system_usage", history);
    if usage.is_empty() {
        return None;
    }
    let leak = metric_series("memory.leak_trend", history);
    let fragmentation = metric_series("memory.fragmentation", history);

    let max_usage = usage.iter().copied().fold(f64::MIN, f64::max);
    let avg_usage = stats::mean(&usage);
    let avg_leak = stats::mean(&leak);
    let avg_fragmentation = stats::mean(&fragmentation);

    let mut severity: f64 = 0.0;
    let mut affected = Vec::new();
    let mut causes = Vec::new();
    let mut solutions = Vec::new();

    if max_usage > 0.95 {
        severity += 0.4;
        affected.push("memory.system_usage".to_string());
        causes.push(format!("peak system memory usage at {:.0}%", max_usage * 100.0));
        solutions.push("reduce peak working set or raise available memory".to_string());
    }
    if avg_usage > 0.8 {
        severity += 0.3;
        if !affected.contains(&"memory.system_usage".to_string()) {
            affected.push("memory.system_usage".to_string());
        }
        causes.push(format!(
            "sustained memory usage averaging {:.0}%",
            avg_usage * 100.0
        ));
        solutions.push("trim caches and release idle allocations".to_string());
    }
    if avg_leak > 0.05 {
        severity += 0.3;
        affected.push("memory.leak_trend".to_string());
        causes.push(format!("usage growing {:.1}% per minute", avg_leak * 100.0));
        solutions.push("audit long-lived allocations for leaks".to_string());
    }
    if avg_fragmentation > 0.3 {
        severity += 0.2;
        affected.push("memory.fragmentation".to_string());
        causes.push("elevated heap fragmentation".to_string());
        solutions.push("pool or arena-allocate hot objects".to_string());
    }

    Some(Scored {
        kind: BottleneckKind::Memory,
        severity: severity.min(1.0),
        affected_metrics: affected,
        root_causes: causes,
        suggested_solutions: solutions,
    })
}

fn score_thread(history: &[UnifiedSnapshot]) -> Option<Scored> {
    let cpu = metric_series("thread.cpu_utilization", history);
    if cpu.is_empty() {
        return None;
    }
    let deadlock = metric_series("thread.deadlock_risk", history);
    let switches = metric_series("thread.context_switch_rate", history);
    let counts = metric_series("thread.count", history);

    let avg_cpu = stats::mean(&cpu);
    let max_deadlock = deadlock.iter().copied().fold(0.0, f64::max);
    let avg_switches = stats::mean(&switches);
    let count_fit = stats::linear_fit(&counts);

    let mut severity: f64 = 0.0;
    let mut affected = Vec::new();
    let mut causes = Vec::new();
    let mut solutions = Vec::new();

    if avg_cpu > 0.85 {
        severity += 0.4;
        affected.push("thread.cpu_utilization".to_string());
        causes.push(format!("CPU saturated at {:.0}% average", avg_cpu * 100.0));
        solutions.push("profile hot paths and shed or batch work".to_string());
    }
    if max_deadlock > 0.5 {
        severity += 0.3;
        affected.push("thread.deadlock_risk".to_string());
        causes.push("lock contention approaching deadlock conditions".to_string());
        solutions.push("shorten critical sections and order lock acquisition".to_string());
    }
    if count_fit.slope > 0.5 && count_fit.r_squared > 0.5 {
        severity += 0.2;
        affected.push("thread.count".to_string());
        causes.push("thread count climbing steadily".to_string());
        solutions.push("cap pool sizes and verify threads are joined".to_string());
    }
    if avg_switches > 5000.0 {
        severity += 0.1;
        affected.push("thread.context_switch_rate".to_string());
        causes.push("excessive context switching".to_string());
        solutions.push("reduce thread count toward core count".to_string());
    }

    Some(Scored {
        kind: BottleneckKind::Thread,
        severity: severity.min(1.0),
        affected_metrics: affected,
        root_causes: causes,
        suggested_solutions: solutions,
    })
}

fn score_rendering(history: &[UnifiedSnapshot]) -> Option<Scored> {
    let latency = metric_series("render.latency_ms", history);
    if latency.is_empty() {
        return None;
    }
    let avg = stats::mean(&latency);
    let max = latency.iter().copied().fold(f64::MIN, f64::max);
    let fit = stats::linear_fit(&latency);

    let mut severity: f64 = 0.0;
    let mut affected = Vec::new();
    let mut causes = Vec::new();
    let mut solutions = Vec::new();

    if avg > FRAME_BUDGET_MS {
        severity += 0.4;
        affected.push("render.latency_ms".to_string());
        causes.push(format!("average frame time {:.1} ms over budget", avg));
        solutions.push("move heavy work off the render path".to_string());
    }
    if max > 2.0 * FRAME_BUDGET_MS {
        severity += 0.3;
        if affected.is_empty() {
            affected.push("render.latency_ms".to_string());
        }
        causes.push(format!("worst frame took {:.1} ms", max));
        solutions.push("split long frames into incremental updates".to_string());
    }
    if fit.slope > 0.1 && fit.r_squared > 0.5 {
        severity += 0.3;
        if affected.is_empty() {
            affected.push("render.latency_ms".to_string());
        }
        causes.push("frame time rising over the observation window".to_string());
        solutions.push("check for unbounded scene or cache growth".to_string());
    }

    Some(Scored {
        kind: BottleneckKind::Rendering,
        severity: severity.min(1.0),
        affected_metrics: affected,
        root_causes: causes,
        suggested_solutions: solutions,
    })
}

/// Overall analysis when the composite score is low or falling, root-caused
/// by the most severe per-category finding
fn score_overall(history: &[UnifiedSnapshot], findings: &[BottleneckAnalysis]) -> Option<Scored> {
    let scores = metric_series("overall.score", history);
    if scores.is_empty() {
        return None;
    }
    let mean = stats::mean(&scores);
    let fit = stats::linear_fit(&scores);

    let low = mean < 0.7;
    let falling = fit.slope < -0.1;
    if !low && !falling {
        return None;
    }

    let shortfall = ((0.7 - mean) / 0.7).max(0.0);
    let decline = (-fit.slope).max(0.0).min(0.3);
    let severity = (shortfall + decline).clamp(0.0, 1.0);

    let mut causes = vec![format!("overall performance score averaging {:.2}", mean)];
    if falling {
        causes.push("composite score declining across the window".to_string());
    }
    let mut solutions = vec!["address the dominant category bottleneck first".to_string()];
    if let Some(worst) = findings
        .iter()
        .max_by(|a, b| a.severity.total_cmp(&b.severity))
    {
        causes.push(format!(
            "dominant pressure from {} (severity {:.2})",
            worst.kind.category(),
            worst.severity
        ));
        solutions.extend(worst.suggested_solutions.iter().cloned());
    }

    Some(Scored {
        kind: BottleneckKind::Overall,
        severity,
        affected_metrics: vec!["overall.score".to_string()],
        root_causes: causes,
        suggested_solutions: solutions,
    })
}
