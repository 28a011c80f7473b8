//! Analytics layer: anomaly detection, adaptive thresholds, forecasting,
//! bottleneck analysis, pattern classification and recommendations.
//!
//! Everything here is pure over its inputs and runs off the collection path,
//! reading a cloned slice of history on the analysis cadence.

pub mod anomaly;
pub mod bottleneck;
pub mod forecast;
pub mod patterns;
pub mod recommend;
pub mod stats;
pub mod thresholds;

pub use anomaly::AnomalyDetector;
pub use bottleneck::BottleneckAnalyzer;
pub use forecast::TrendPredictor;
pub use patterns::PatternAnalyzer;
pub use recommend::OptimizationRecommender;
pub use thresholds::{SmartThreshold, SmartThresholdManager, ThresholdEvaluation};
