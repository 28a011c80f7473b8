//! Alert lifecycle: admission, deduplication and expiry
//!
//! The alert id is a deterministic hash of (category, condition), with no
//! wall-clock component, so the same breach always maps to the same id.
//! Admission and cooldown checks happen under one lock with the active map,
//! making them atomic under overlapping ticks. A repeat breach of a still
//! active alert after the cooldown is a re-trigger: it refreshes the alert
//! in place so the expiry sweep measures staleness from the latest breach.
//! The sweep resolves stale alerts into bounded history; a resolved alert is
//! never re-activated.

use crate::models::{AlertSeverity, PerformanceAlert, ResourceCategory};
use crate::observability::{EngineMetrics, EventLogger};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Resolved alerts kept in history
const HISTORY_CAPACITY: usize = 500;

/// An alert before admission, keyed by its condition name
#[derive(Debug, Clone)]
pub struct AlertCandidate {
    pub category: ResourceCategory,
    pub condition: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub current_value: f64,
    pub threshold_value: f64,
    pub metadata: HashMap<String, String>,
}

/// Deterministic alert id from (category, condition). FNV-1a over the two
/// strings with a separator, stable across restarts.
pub fn alert_id(category: ResourceCategory, condition: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for byte in category.to_string().bytes().chain([0u8]).chain(condition.bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

struct AlertState {
    active: HashMap<u64, PerformanceAlert>,
    /// Last admission time per alert id, kept across resolution for cooldown
    last_raised: HashMap<u64, i64>,
    history: VecDeque<PerformanceAlert>,
}

/// Owns the active-alert map and alert history
pub struct AlertCenter {
    state: Mutex<AlertState>,
    cooldown_secs: i64,
    expiry_secs: i64,
    metrics: EngineMetrics,
    logger: EventLogger,
}

impl AlertCenter {
    pub fn new(cooldown_secs: u64, expiry_secs: u64, metrics: EngineMetrics) -> Self {
        Self {
            state: Mutex::new(AlertState {
                active: HashMap::new(),
                last_raised: HashMap::new(),
                history: VecDeque::with_capacity(HISTORY_CAPACITY),
            }),
            cooldown_secs: cooldown_secs as i64,
            expiry_secs: expiry_secs as i64,
            metrics,
            logger: EventLogger::new("alerts"),
        }
    }

    /// Admit a candidate unless the same (category, condition) was raised
    /// within the cooldown window. A candidate matching a still-active alert
    /// past its cooldown re-triggers it in place. Returns the admitted or
    /// re-triggered alert.
    pub fn admit(&self, candidate: AlertCandidate, now: i64) -> Option<PerformanceAlert> {
        let id = alert_id(candidate.category, &candidate.condition);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(last) = state.last_raised.get(&id) {
            if now - last < self.cooldown_secs {
                return None;
            }
        }
        if let Some(existing) = state.active.get_mut(&id) {
            existing.timestamp = now;
            existing.severity = candidate.severity;
            existing.current_value = candidate.current_value;
            existing.threshold_value = candidate.threshold_value;
            let alert = existing.clone();
            state.last_raised.insert(id, now);
            drop(state);

            self.metrics.inc_alerts_admitted();
            self.logger.log_alert_admitted(
                id,
                &alert.category.to_string(),
                &format!("{:?}", alert.severity),
                &alert.title,
                alert.current_value,
                alert.threshold_value,
            );
            return Some(alert);
        }

        let alert = PerformanceAlert {
            id,
            category: candidate.category,
            severity: candidate.severity,
            title: candidate.title,
            description: candidate.description,
            current_value: candidate.current_value,
            threshold_value: candidate.threshold_value,
            timestamp: now,
            resolved: false,
            resolution_time: None,
            metadata: candidate.metadata,
        };
        state.last_raised.insert(id, now);
        state.active.insert(id, alert.clone());
        drop(state);

        self.metrics.inc_alerts_admitted();
        self.logger.log_alert_admitted(
            id,
            &alert.category.to_string(),
            &format!("{:?}", alert.severity),
            &alert.title,
            alert.current_value,
            alert.threshold_value,
        );
        Some(alert)
    }

    /// Resolve active alerts older than the expiry window, moving them to
    /// history. Returns the number resolved.
    pub fn sweep(&self, now: i64) -> usize {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let expired: Vec<u64> = state
            .active
            .iter()
            .filter(|(_, a)| now - a.timestamp >= self.expiry_secs)
            .map(|(id, _)| *id)
            .collect();

        let mut resolved = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(mut alert) = state.active.remove(&id) {
                alert.resolved = true;
                alert.resolution_time = Some(now);
                if state.history.len() == HISTORY_CAPACITY {
                    state.history.pop_front();
                }
                state.history.push_back(alert.clone());
                resolved.push(alert);
            }
        }
        drop(state);

        for alert in &resolved {
            self.metrics.inc_alerts_resolved();
            self.logger.log_alert_resolved(
                alert.id,
                &alert.category.to_string(),
                alert.resolution_time.unwrap_or(now) - alert.timestamp,
            );
        }
        resolved.len()
    }

    pub fn active(&self) -> Vec<PerformanceAlert> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut alerts: Vec<PerformanceAlert> = state.active.values().cloned().collect();
        alerts.sort_by_key(|a| (a.timestamp, a.id));
        alerts
    }

    pub fn history(&self) -> Vec<PerformanceAlert> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.history.iter().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .active
            .len()
    }
}
