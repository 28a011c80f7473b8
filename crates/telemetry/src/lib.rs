//! Self-monitoring performance telemetry engine
//!
//! This crate provides the core functionality for:
//! - Periodic memory and thread/CPU resource collection
//! - Unified snapshot aggregation with health scoring
//! - Alert lifecycle with cooldown deduplication and expiry
//! - Statistical anomaly detection and adaptive thresholds
//! - Trend forecasting, bottleneck and pattern analysis
//! - Optimization recommendations

pub mod analytics;
pub mod collector;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod observability;
pub mod registry;
pub mod runtime;
pub mod window;

pub use config::EngineConfig;
pub use coordinator::{
    AnalyticsReport, ExportFormat, PerformanceSummary, UnifiedCoordinator,
};
pub use error::{Result, TelemetryError};
pub use models::*;
pub use observability::{EngineMetrics, EventLogger};
