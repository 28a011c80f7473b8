//! Error taxonomy for the telemetry engine
//!
//! Collection, aggregation and analysis failures are absorbed where they
//! occur (counted and logged, never propagated as a crash). Only
//! configuration validation failures surface to the caller as a hard
//! initialization error.

use thiserror::Error;

/// Errors produced by the telemetry engine
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A sampling call failed or timed out
    #[error("collection failed for {category}: {reason}")]
    Collection { category: String, reason: String },

    /// One category's metrics were missing or partial during aggregation
    #[error("aggregation incomplete: {0}")]
    Aggregation(String),

    /// An analytics function failed
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// Invalid configuration rejected at load time
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Metrics export to file failed
    #[error("export failed: {0}")]
    Export(String),
}

impl TelemetryError {
    pub fn collection(category: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Collection {
            category: category.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
