//! Point-in-time metrics export
//!
//! Serializes snapshot history, alert state and the running summary to a
//! structured file. Not a resumable store; each export is a complete
//! standalone document.

use crate::error::{Result, TelemetryError};
use crate::models::{PerformanceAlert, UnifiedSnapshot};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::PerformanceSummary;

/// Supported export encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Compact JSON
    #[default]
    Json,
    /// Indented JSON for human inspection
    JsonPretty,
}

/// The full exported document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsExport {
    pub exported_at: i64,
    pub snapshots: Vec<UnifiedSnapshot>,
    pub active_alerts: Vec<PerformanceAlert>,
    pub alert_history: Vec<PerformanceAlert>,
    pub summary: PerformanceSummary,
}

/// Write an export document to the given path
pub fn write_export(path: &Path, format: ExportFormat, export: &MetricsExport) -> Result<()> {
    let body = match format {
        ExportFormat::Json => serde_json::to_vec(export),
        ExportFormat::JsonPretty => serde_json::to_vec_pretty(export),
    }
    .map_err(|e| TelemetryError::Export(e.to_string()))?;
    std::fs::write(path, body).map_err(|e| TelemetryError::Export(e.to_string()))
}

/// Read an export document back from disk
pub fn read_export(path: &Path) -> Result<MetricsExport> {
    let body =
        std::fs::read(path).map_err(|e| TelemetryError::Export(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| TelemetryError::Export(e.to_string()))
}
