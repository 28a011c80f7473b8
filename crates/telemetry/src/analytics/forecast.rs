//! Model-selection trend forecasting
//!
//! Picks a forecasting model per metric from its recent history: seasonal
//! when the spectrum shows a dominant cycle, linear or polynomial when a
//! clear slope exists, moving-average for short windows and exponential
//! smoothing otherwise. Forecast steps are in units of the sampling cadence.

use crate::analytics::stats;
use crate::models::{ForecastModel, PerformanceForecast, TrendDirection};
use crate::registry;
use crate::window::LinearFit;

/// Minimum points before any forecast is produced
const MIN_POINTS: usize = 10;

/// Clean points kept after outlier stripping
const MAX_POINTS: usize = 50;

/// Dominant-cycle power share above which the seasonal model is chosen
const CYCLICAL_THRESHOLD: f64 = 0.3;

/// Slope significance factor relative to the series std
const SLOPE_FACTOR: f64 = 0.01;

/// 95% interval multiplier
const Z_95: f64 = 1.96;

/// Produces point forecasts with confidence bounds for one metric
pub struct TrendPredictor {
    horizon: usize,
}

impl TrendPredictor {
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon: horizon.max(1),
        }
    }

    /// Forecast `horizon` steps ahead from the given series. Returns None
    /// below ten points.
    pub fn predict(
        &self,
        metric: &str,
        values: &[f64],
        timestamps: &[i64],
        horizon: Option<usize>,
    ) -> Option<PerformanceForecast> {
        if values.len() < MIN_POINTS {
            return None;
        }
        let horizon = horizon.unwrap_or(self.horizon).max(1);

        let clean = strip_outliers(values);
        let skip = clean.len().saturating_sub(MAX_POINTS);
        let clean: Vec<f64> = clean.into_iter().skip(skip).collect();
        if clean.len() < 4 {
            return None;
        }

        let fit = stats::linear_fit(&clean);
        let std = stats::std_dev(&clean);
        let mean = stats::mean(&clean);
        let cycle = stats::dominant_cycle(&clean);
        let cyclical_strength = cycle.map(|(_, s)| s).unwrap_or(0.0);

        let model = if cyclical_strength > CYCLICAL_THRESHOLD {
            ForecastModel::Seasonal
        } else if fit.slope.abs() > SLOPE_FACTOR * std.max(f64::EPSILON) {
            if fit.r_squared > 0.8 {
                ForecastModel::Polynomial
            } else {
                ForecastModel::Linear
            }
        } else if clean.len() < 30 {
            ForecastModel::MovingAverage
        } else {
            ForecastModel::Exponential
        };

        let (predicted, sigma, accuracy, change_probability) = match model {
            ForecastModel::Linear => project_linear(&clean, &fit, horizon),
            ForecastModel::Polynomial => project_polynomial(&clean, &fit, horizon),
            ForecastModel::Seasonal => {
                let (period, strength) = cycle?;
                project_seasonal(&clean, &fit, period, strength, horizon)
            }
            ForecastModel::MovingAverage => project_moving_average(&clean, horizon),
            ForecastModel::Exponential => project_exponential(&clean, horizon),
        };

        let confidence_intervals = predicted
            .iter()
            .map(|p| (p - Z_95 * sigma, p + Z_95 * sigma))
            .collect();

        let trend_direction = direction(metric, &fit);
        let risk_level =
            (fit.slope.abs() * horizon as f64 / mean.abs().max(f64::EPSILON)).clamp(0.0, 1.0);

        Some(PerformanceForecast {
            metric: metric.to_string(),
            model,
            predicted_values: predicted,
            confidence_intervals,
            trend_direction,
            change_probability: change_probability.clamp(0.0, 1.0),
            risk_level,
            forecast_accuracy: accuracy.clamp(0.0, 1.0),
            generated_at: timestamps.last().copied().unwrap_or(0),
        })
    }
}

impl Default for TrendPredictor {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Drop values outside the 1.5·IQR fences, keeping order
fn strip_outliers(values: &[f64]) -> Vec<f64> {
    match stats::iqr_fences(values) {
        Some((low, high)) => values
            .iter()
            .copied()
            .filter(|v| *v >= low && *v <= high)
            .collect(),
        None => values.to_vec(),
    }
}

/// Slope sign snapped to stable under the slope's standard error, then
/// mapped to health terms by the metric's direction
fn direction(metric: &str, fit: &LinearFit) -> TrendDirection {
    if fit.slope.abs() <= fit.slope_std_err {
        return TrendDirection::Stable;
    }
    let rising = fit.slope > 0.0;
    if rising != registry::lower_is_better(metric) {
        TrendDirection::Improving
    } else {
        TrendDirection::Declining
    }
}

fn project_linear(values: &[f64], fit: &LinearFit, horizon: usize) -> (Vec<f64>, f64, f64, f64) {
    let n = values.len() as f64;
    let predicted = (1..=horizon)
        .map(|k| fit.predict(n - 1.0 + k as f64))
        .collect();
    let sigma = stats::residual_std(values, fit);
    (predicted, sigma, fit.r_squared, fit.r_squared)
}

fn project_polynomial(
    values: &[f64],
    fit: &LinearFit,
    horizon: usize,
) -> (Vec<f64>, f64, f64, f64) {
    let Some((a, b, c)) = stats::quadratic_fit(values) else {
        return project_linear(values, fit, horizon);
    };
    let quad = |x: f64| a + b * x + c * x * x;

    let n = values.len() as f64;
    let predicted: Vec<f64> = (1..=horizon).map(|k| quad(n - 1.0 + k as f64)).collect();

    let ss_res: f64 = values
        .iter()
        .enumerate()
        .map(|(i, y)| (y - quad(i as f64)).powi(2))
        .sum();
    let mean = stats::mean(values);
    let ss_tot: f64 = values.iter().map(|y| (y - mean).powi(2)).sum();
    let r_squared = if ss_tot > f64::EPSILON {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let sigma = (ss_res / (values.len().saturating_sub(3).max(1)) as f64).sqrt();
    (predicted, sigma, r_squared, r_squared)
}

/// Decompose into linear trend plus per-phase seasonal means, then project
fn project_seasonal(
    values: &[f64],
    fit: &LinearFit,
    period: usize,
    strength: f64,
    horizon: usize,
) -> (Vec<f64>, f64, f64, f64) {
    let n = values.len();
    let residuals: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(i, y)| y - fit.predict(i as f64))
        .collect();

    let mut phase_sums = vec![0.0; period];
    let mut phase_counts = vec![0usize; period];
    for (i, r) in residuals.iter().enumerate() {
        phase_sums[i % period] += r;
        phase_counts[i % period] += 1;
    }
    let seasonal: Vec<f64> = phase_sums
        .iter()
        .zip(&phase_counts)
        .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { 0.0 })
        .collect();

    let predicted: Vec<f64> = (1..=horizon)
        .map(|k| {
            let idx = n - 1 + k;
            fit.predict(idx as f64) + seasonal[idx % period]
        })
        .collect();

    let deseasoned: Vec<f64> = residuals
        .iter()
        .enumerate()
        .map(|(i, r)| r - seasonal[i % period])
        .collect();
    let sigma = stats::std_dev(&deseasoned);

    let var = stats::variance(values);
    let accuracy = if var > f64::EPSILON {
        (1.0 - stats::variance(&deseasoned) / var).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (predicted, sigma, accuracy, strength)
}

fn project_moving_average(values: &[f64], horizon: usize) -> (Vec<f64>, f64, f64, f64) {
    let tail_len = values.len().min(5);
    let tail = &values[values.len() - tail_len..];
    let level = stats::mean(tail);
    let sigma = stats::std_dev(tail);
    (vec![level; horizon], sigma, 0.5, 0.3)
}

fn project_exponential(values: &[f64], horizon: usize) -> (Vec<f64>, f64, f64, f64) {
    const ALPHA: f64 = 0.3;
    let mut level = values[0];
    let mut sq_err = 0.0;
    for v in &values[1..] {
        sq_err += (v - level).powi(2);
        level = stats::ema(level, *v, ALPHA);
    }
    let sigma = (sq_err / (values.len() - 1) as f64).sqrt();
    (vec![level; horizon], sigma, 0.45, 0.4)
}
