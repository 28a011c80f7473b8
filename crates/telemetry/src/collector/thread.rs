//! Thread and CPU sampling
//!
//! Thread count and context-switch totals come from `/proc/self/status`;
//! global CPU utilization and the run queue come from `sysinfo`. The
//! deadlock-risk score combines run-queue over-subscription with a stalled
//! context-switch rate, and thread-leak detection compares the live count
//! against a baseline recorded at startup with a re-alert cooldown.

use crate::config::ThreadThresholds;
use crate::error::{Result, TelemetryError};
use crate::models::{ResourceCategory, ThreadMetrics, ThreadStatus};
use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

use super::{CategorySample, ResourceCollector};

/// Raw thread reading before classification
#[derive(Debug, Clone, Copy)]
pub struct ThreadReading {
    pub thread_count: u64,
    /// Global CPU utilization as a fraction
    pub cpu_utilization: f64,
    /// Context switches per second for the current process
    pub context_switch_rate: f64,
    /// One-minute load average divided by CPU count
    pub queue_depth: f64,
}

pub struct ThreadCollector {
    system: System,
    thresholds: ThreadThresholds,
    baseline_thread_count: Option<u64>,
    last_switch_total: Option<(u64, i64)>,
    last_leak_alert: Option<i64>,
}

impl ThreadCollector {
    pub fn new(thresholds: ThreadThresholds) -> Self {
        Self {
            system: System::new_with_specifics(
                RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage()),
            ),
            thresholds,
            baseline_thread_count: None,
            last_switch_total: None,
            last_leak_alert: None,
        }
    }

    fn read(&mut self, now: i64) -> Result<ThreadReading> {
        let (thread_count, switch_total) = read_proc_status()?;

        self.system.refresh_cpu_usage();
        let cpu_utilization = (self.system.global_cpu_info().cpu_usage() as f64 / 100.0)
            .clamp(0.0, 1.0);
        let cpus = self.system.cpus().len().max(1) as f64;
        let queue_depth = (System::load_average().one / cpus).max(0.0);

        let context_switch_rate = match self.last_switch_total {
            Some((prev_total, prev_ts)) if now > prev_ts => {
                switch_total.saturating_sub(prev_total) as f64 / (now - prev_ts) as f64
            }
            _ => 0.0,
        };
        self.last_switch_total = Some((switch_total, now));

        Ok(ThreadReading {
            thread_count,
            cpu_utilization,
            context_switch_rate,
            queue_depth,
        })
    }

    /// Classify a reading against the thresholds, updating leak state
    pub fn evaluate(&mut self, reading: ThreadReading, now: i64) -> ThreadMetrics {
        let baseline = *self
            .baseline_thread_count
            .get_or_insert(reading.thread_count);

        let deadlock_risk = deadlock_risk(
            reading.queue_depth,
            reading.context_switch_rate,
            self.thresholds.context_switch_nominal,
        );

        let mut conditions = Vec::new();
        let t = &self.thresholds;

        if reading.cpu_utilization > t.cpu_warning {
            conditions.push("high_cpu_utilization".to_string());
        }
        if deadlock_risk >= t.deadlock_risk {
            conditions.push("deadlock_risk".to_string());
        } else if deadlock_risk >= t.blocked_risk {
            conditions.push("thread_contention".to_string());
        }

        let leaked = reading.thread_count >= baseline + t.thread_leak_increase;
        let thread_leak_suspected = if leaked {
            let due = match self.last_leak_alert {
                Some(last) => now - last >= t.thread_leak_cooldown_secs as i64,
                None => true,
            };
            if due {
                self.last_leak_alert = Some(now);
            }
            due
        } else {
            false
        };
        if thread_leak_suspected {
            conditions.push("thread_leak_suspected".to_string());
        }

        let status = if deadlock_risk >= t.deadlock_risk {
            ThreadStatus::Deadlocked
        } else if deadlock_risk >= t.blocked_risk {
            ThreadStatus::Blocked
        } else if reading.cpu_utilization < t.idle_cpu {
            ThreadStatus::Idle
        } else {
            ThreadStatus::Running
        };

        ThreadMetrics {
            timestamp: now,
            thread_count: reading.thread_count,
            baseline_thread_count: baseline,
            cpu_utilization: reading.cpu_utilization,
            context_switch_rate: reading.context_switch_rate,
            queue_depth: reading.queue_depth,
            deadlock_risk,
            thread_leak_suspected,
            status,
            active_conditions: conditions,
        }
    }
}

#[async_trait]
impl ResourceCollector for ThreadCollector {
    fn category(&self) -> ResourceCategory {
        ResourceCategory::Thread
    }

    async fn sample(&mut self) -> Result<CategorySample> {
        let now = chrono::Utc::now().timestamp();
        let reading = self.read(now)?;
        Ok(CategorySample::Thread(self.evaluate(reading, now)))
    }
}

/// Over-subscription of the run queue, scaled up when context switching has
/// stalled relative to the nominal rate
fn deadlock_risk(queue_depth: f64, switch_rate: f64, nominal_rate: f64) -> f64 {
    let overload = (queue_depth - 1.0).clamp(0.0, 1.0);
    if overload <= 0.0 {
        return 0.0;
    }
    let stall = (1.0 - switch_rate / nominal_rate.max(f64::EPSILON)).clamp(0.0, 1.0);
    (overload * (0.4 + 0.6 * stall)).clamp(0.0, 1.0)
}

/// Thread count and total context switches from `/proc/self/status`
fn read_proc_status() -> Result<(u64, u64)> {
    let status = std::fs::read_to_string("/proc/self/status")
        .map_err(|e| TelemetryError::collection("thread", e.to_string()))?;

    let mut threads = None;
    let mut voluntary = 0u64;
    let mut nonvoluntary = 0u64;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("Threads:") {
            threads = rest.trim().parse::<u64>().ok();
        } else if let Some(rest) = line.strip_prefix("voluntary_ctxt_switches:") {
            voluntary = rest.trim().parse().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("nonvoluntary_ctxt_switches:") {
            nonvoluntary = rest.trim().parse().unwrap_or(0);
        }
    }

    let threads = threads.ok_or_else(|| {
        TelemetryError::collection("thread", "no Threads field in /proc/self/status")
    })?;
    Ok((threads, voluntary + nonvoluntary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> ThreadCollector {
        ThreadCollector::new(ThreadThresholds::default())
    }

    fn reading(thread_count: u64, cpu: f64, queue_depth: f64, switch_rate: f64) -> ThreadReading {
        ThreadReading {
            thread_count,
            cpu_utilization: cpu,
            context_switch_rate: switch_rate,
            queue_depth,
        }
    }

    #[test]
    fn test_running_status() {
        let mut c = collector();
        let metrics = c.evaluate(reading(12, 0.3, 0.5, 800.0), 100);
        assert_eq!(metrics.status, ThreadStatus::Running);
        assert_eq!(metrics.deadlock_risk, 0.0);
        assert!(metrics.active_conditions.is_empty());
    }

    #[test]
    fn test_idle_status_below_cpu_floor() {
        let mut c = collector();
        let metrics = c.evaluate(reading(12, 0.01, 0.2, 500.0), 100);
        assert_eq!(metrics.status, ThreadStatus::Idle);
    }

    #[test]
    fn test_high_cpu_condition() {
        let mut c = collector();
        let metrics = c.evaluate(reading(12, 0.95, 0.5, 800.0), 100);
        assert!(metrics
            .active_conditions
            .contains(&"high_cpu_utilization".to_string()));
    }

    #[test]
    fn test_deadlocked_on_stalled_overloaded_queue() {
        let mut c = collector();
        // Fully over-subscribed queue with no context switching at all
        let metrics = c.evaluate(reading(12, 0.9, 2.0, 0.0), 100);
        assert_eq!(metrics.deadlock_risk, 1.0);
        assert_eq!(metrics.status, ThreadStatus::Deadlocked);
        assert!(metrics
            .active_conditions
            .contains(&"deadlock_risk".to_string()));
    }

    #[test]
    fn test_blocked_between_risk_bands() {
        let mut c = collector();
        // Over-subscribed but switching at the nominal rate
        let metrics = c.evaluate(reading(12, 0.9, 2.0, 1000.0), 100);
        assert!((metrics.deadlock_risk - 0.4).abs() < 1e-9);
        assert_eq!(metrics.status, ThreadStatus::Running);

        // Half-stalled switching pushes past the blocked band
        let metrics = c.evaluate(reading(12, 0.9, 2.0, 400.0), 110);
        assert!(metrics.deadlock_risk >= 0.5);
        assert_eq!(metrics.status, ThreadStatus::Blocked);
    }

    #[test]
    fn test_thread_leak_against_baseline() {
        let mut c = collector();
        let metrics = c.evaluate(reading(10, 0.3, 0.2, 800.0), 0);
        assert_eq!(metrics.baseline_thread_count, 10);
        assert!(!metrics.thread_leak_suspected);

        // Default threshold is 50 above baseline
        let metrics = c.evaluate(reading(61, 0.3, 0.2, 800.0), 100);
        assert!(metrics.thread_leak_suspected);
        assert!(metrics
            .active_conditions
            .contains(&"thread_leak_suspected".to_string()));
    }

    #[test]
    fn test_thread_leak_realert_cooldown() {
        let mut c = collector();
        c.evaluate(reading(10, 0.3, 0.2, 800.0), 0);

        assert!(c.evaluate(reading(65, 0.3, 0.2, 800.0), 100).thread_leak_suspected);
        // Still leaking, but inside the 300 s cooldown
        assert!(!c.evaluate(reading(70, 0.3, 0.2, 800.0), 200).thread_leak_suspected);
        // Cooldown elapsed
        assert!(c.evaluate(reading(70, 0.3, 0.2, 800.0), 500).thread_leak_suspected);
    }

    #[test]
    fn test_proc_status_parses_on_linux() {
        let (threads, _switches) = read_proc_status().unwrap();
        assert!(threads >= 1);
    }
}
