//! Bounded, time-ordered metric windows
//!
//! `MetricWindow` is the foundation for all statistics in the engine: a
//! fixed-capacity ring buffer of samples with FIFO eviction, owned
//! exclusively by the component that samples it.

use crate::models::MetricSample;
use std::collections::VecDeque;

/// Result of a least-squares linear fit over a window
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearFit {
    /// Slope in value units per x unit
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination in [0, 1]
    pub r_squared: f64,
    /// Standard error of the slope estimate
    pub slope_std_err: f64,
}

impl LinearFit {
    /// Projected value at the given x
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Bounded, time-ordered ring buffer of scalar samples for one metric
#[derive(Debug, Clone)]
pub struct MetricWindow {
    samples: VecDeque<MetricSample>,
    capacity: usize,
}

impl MetricWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Append a sample, evicting the oldest when at capacity
    pub fn push(&mut self, sample: MetricSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn push_value(&mut self, timestamp: i64, value: f64) {
        self.push(MetricSample { timestamp, value });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    pub fn first(&self) -> Option<&MetricSample> {
        self.samples.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSample> {
        self.samples.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.value).sum::<f64>() / self.samples.len() as f64
    }

    /// Sample standard deviation (Bessel's correction)
    pub fn std_dev(&self) -> f64 {
        let n = self.samples.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .samples
            .iter()
            .map(|s| (s.value - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        variance.sqrt()
    }

    pub fn min(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.value)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn max(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.value)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Quartiles (Q1, median, Q3) by nearest-rank on the sorted values
    pub fn quartiles(&self) -> Option<(f64, f64, f64)> {
        crate::analytics::stats::quartiles(&self.values())
    }

    /// Least-squares fit of value against elapsed seconds since the first
    /// sample. Slope is therefore value units per second.
    pub fn linear_fit(&self) -> LinearFit {
        let n = self.samples.len();
        if n < 2 {
            return LinearFit::default();
        }
        let t0 = self.samples.front().map(|s| s.timestamp).unwrap_or(0);
        let xs: Vec<f64> = self.samples.iter().map(|s| (s.timestamp - t0) as f64).collect();
        let ys: Vec<f64> = self.samples.iter().map(|s| s.value).collect();
        crate::analytics::stats::linear_fit_xy(&xs, &ys)
    }

    /// Slope per second over the most recent `count` samples
    pub fn recent_slope(&self, count: usize) -> f64 {
        let n = self.samples.len();
        if n < 2 || count < 2 {
            return 0.0;
        }
        let start = n.saturating_sub(count);
        let tail: Vec<&MetricSample> = self.samples.iter().skip(start).collect();
        let t0 = tail[0].timestamp;
        let xs: Vec<f64> = tail.iter().map(|s| (s.timestamp - t0) as f64).collect();
        let ys: Vec<f64> = tail.iter().map(|s| s.value).collect();
        crate::analytics::stats::linear_fit_xy(&xs, &ys).slope
    }

    /// Median spacing between consecutive samples, in seconds
    pub fn median_interval(&self) -> f64 {
        let ts = self.timestamps();
        if ts.len() < 2 {
            return 0.0;
        }
        let mut gaps: Vec<f64> = ts.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
        gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        gaps[gaps.len() / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(window: &mut MetricWindow, values: &[f64]) {
        for (i, v) in values.iter().enumerate() {
            window.push_value(i as i64 * 10, *v);
        }
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut window = MetricWindow::new(5);
        for i in 0..100 {
            window.push_value(i, i as f64);
        }
        assert_eq!(window.len(), 5);
        assert_eq!(window.capacity(), 5);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut window = MetricWindow::new(3);
        fill(&mut window, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(window.values(), vec![3.0, 4.0, 5.0]);
        assert_eq!(window.first().unwrap().value, 3.0);
        assert_eq!(window.last().unwrap().value, 5.0);
    }

    #[test]
    fn test_mean_and_std_dev() {
        let mut window = MetricWindow::new(100);
        fill(&mut window, &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((window.mean() - 5.0).abs() < 1e-9);
        // Sample std dev of this classic series is ~2.138
        assert!((window.std_dev() - 2.138).abs() < 0.01);
    }

    #[test]
    fn test_linear_fit_slope_per_second() {
        let mut window = MetricWindow::new(100);
        // Value rises by 1.0 every 10 seconds
        for i in 0..20 {
            window.push_value(i * 10, i as f64);
        }
        let fit = window.linear_fit();
        assert!((fit.slope - 0.1).abs() < 1e-9);
        assert!(fit.r_squared > 0.999);
    }

    #[test]
    fn test_recent_slope_ignores_old_samples() {
        let mut window = MetricWindow::new(100);
        // Flat for 30 samples, then rising steeply
        for i in 0..30 {
            window.push_value(i * 10, 1.0);
        }
        for i in 30..40 {
            window.push_value(i * 10, (i - 29) as f64);
        }
        let slope = window.recent_slope(10);
        assert!(slope > 0.05, "recent slope was {}", slope);
    }

    #[test]
    fn test_empty_window_statistics() {
        let window = MetricWindow::new(10);
        assert_eq!(window.mean(), 0.0);
        assert_eq!(window.std_dev(), 0.0);
        assert!(window.min().is_none());
        assert!(window.quartiles().is_none());
        assert_eq!(window.linear_fit().slope, 0.0);
    }

    #[test]
    fn test_median_interval() {
        let mut window = MetricWindow::new(10);
        for i in 0..5 {
            window.push_value(i * 10, 1.0);
        }
        assert!((window.median_interval() - 10.0).abs() < 1e-9);
    }
}
