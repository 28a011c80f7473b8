//! Memory sampling and status classification
//!
//! Samples system and process memory through `sysinfo`, tracks recent usage
//! in an owned window for the leak-trend regression, and classifies status
//! from the configured thresholds. Classification is pure over a raw reading
//! so the decision table is testable without touching the OS.

use crate::config::MemoryThresholds;
use crate::error::{Result, TelemetryError};
use crate::models::{MemoryMetrics, MemoryStatus, ResourceCategory};
use crate::window::MetricWindow;
use async_trait::async_trait;
use sysinfo::{MemoryRefreshKind, Pid, ProcessRefreshKind, RefreshKind, System};

use super::{CategorySample, ResourceCollector};

/// Usage samples kept for the leak-trend regression
const LEAK_WINDOW: usize = 60;

/// Samples required before a leak trend is reported
const LEAK_MIN_SAMPLES: usize = 10;

/// Raw memory reading before classification
#[derive(Debug, Clone, Copy)]
pub struct MemoryReading {
    /// System memory usage as a fraction of total
    pub system_usage: f64,
    /// Process resident memory as a fraction of total system memory
    pub process_usage: f64,
    /// Swap usage as a fraction of total swap
    pub swap_usage: f64,
    /// Reclaimable-but-not-free share of total memory
    pub fragmentation: f64,
}

pub struct MemoryCollector {
    system: System,
    pid: Pid,
    thresholds: MemoryThresholds,
    usage_window: MetricWindow,
}

impl MemoryCollector {
    pub fn new(thresholds: MemoryThresholds) -> Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| TelemetryError::collection("memory", e))?;
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_memory(MemoryRefreshKind::everything())
                .with_processes(ProcessRefreshKind::new().with_memory()),
        );
        Ok(Self {
            system,
            pid,
            thresholds,
            usage_window: MetricWindow::new(LEAK_WINDOW),
        })
    }

    fn read(&mut self) -> Result<MemoryReading> {
        self.system.refresh_memory();
        self.system
            .refresh_process_specifics(self.pid, ProcessRefreshKind::new().with_memory());

        let total = self.system.total_memory() as f64;
        if total <= 0.0 {
            return Err(TelemetryError::collection(
                "memory",
                "total system memory reported as zero",
            ));
        }

        let used = self.system.used_memory() as f64;
        let available = self.system.available_memory() as f64;
        let free = self.system.free_memory() as f64;
        let process = self
            .system
            .process(self.pid)
            .map(|p| p.memory() as f64)
            .unwrap_or(0.0);

        let total_swap = self.system.total_swap() as f64;
        let swap_usage = if total_swap > 0.0 {
            (self.system.used_swap() as f64 / total_swap).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(MemoryReading {
            system_usage: (used / total).clamp(0.0, 1.0),
            process_usage: (process / total).clamp(0.0, 1.0),
            swap_usage,
            fragmentation: ((available - free).max(0.0) / total).clamp(0.0, 1.0),
        })
    }

    /// Record a reading and classify it against the thresholds
    pub fn evaluate(&mut self, reading: MemoryReading, now: i64) -> MemoryMetrics {
        self.usage_window.push_value(now, reading.system_usage);
        let leak_trend = if self.usage_window.len() >= LEAK_MIN_SAMPLES {
            // Slope is fraction per second; report per minute
            self.usage_window.linear_fit().slope * 60.0
        } else {
            0.0
        };

        let mut conditions = Vec::new();
        let t = &self.thresholds;

        let status = if reading.system_usage >= t.out_of_memory {
            conditions.push("out_of_memory_imminent".to_string());
            MemoryStatus::OutOfMemory
        } else if reading.system_usage >= t.critical {
            conditions.push("high_system_memory_usage".to_string());
            MemoryStatus::Critical
        } else if reading.system_usage >= t.warning {
            conditions.push("elevated_system_memory_usage".to_string());
            MemoryStatus::Warning
        } else {
            MemoryStatus::Normal
        };

        if reading.swap_usage > t.swap_warning {
            conditions.push("high_swap_usage".to_string());
        }
        if reading.fragmentation > t.fragmentation_warning {
            conditions.push("high_fragmentation".to_string());
        }
        if leak_trend > t.leak_trend_warning {
            conditions.push("memory_leak_suspected".to_string());
        }
        // Secondary conditions never downgrade, only lift Normal to Warning
        let status = if status == MemoryStatus::Normal && !conditions.is_empty() {
            MemoryStatus::Warning
        } else {
            status
        };

        MemoryMetrics {
            timestamp: now,
            system_usage: reading.system_usage,
            process_usage: reading.process_usage,
            swap_usage: reading.swap_usage,
            fragmentation: reading.fragmentation,
            leak_trend,
            status,
            active_conditions: conditions,
        }
    }
}

#[async_trait]
impl ResourceCollector for MemoryCollector {
    fn category(&self) -> ResourceCategory {
        ResourceCategory::Memory
    }

    async fn sample(&mut self) -> Result<CategorySample> {
        let reading = self.read()?;
        let now = chrono::Utc::now().timestamp();
        Ok(CategorySample::Memory(self.evaluate(reading, now)))
    }
}
