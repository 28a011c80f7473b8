//! Shared numeric helpers for the analytics layer
//!
//! Windows are small (at most a few hundred points, forecasting clips to
//! 50), so the straightforward O(n) and O(n²) forms are used throughout.

use crate::window::LinearFit;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (Bessel's correction)
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Nearest-rank percentile over a copy of the input
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Quartiles (Q1, median, Q3); None below 4 points
pub fn quartiles(values: &[f64]) -> Option<(f64, f64, f64)> {
    if values.len() < 4 {
        return None;
    }
    Some((
        percentile(values, 25.0),
        percentile(values, 50.0),
        percentile(values, 75.0),
    ))
}

/// Tukey fences at 1.5·IQR; None below 4 points
pub fn iqr_fences(values: &[f64]) -> Option<(f64, f64)> {
    let (q1, _, q3) = quartiles(values)?;
    let iqr = q3 - q1;
    Some((q1 - 1.5 * iqr, q3 + 1.5 * iqr))
}

/// Least-squares fit of y against sample index
pub fn linear_fit(values: &[f64]) -> LinearFit {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    linear_fit_xy(&xs, values)
}

/// Least-squares fit of y against arbitrary x
pub fn linear_fit_xy(xs: &[f64], ys: &[f64]) -> LinearFit {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return LinearFit::default();
    }
    let nf = n as f64;
    let sum_x: f64 = xs[..n].iter().sum();
    let sum_y: f64 = ys[..n].iter().sum();
    let sum_xy: f64 = xs[..n].iter().zip(&ys[..n]).map(|(x, y)| x * y).sum();
    let sum_xx: f64 = xs[..n].iter().map(|x| x * x).sum();

    let denom = nf * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return LinearFit::default();
    }

    let slope = (nf * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / nf;

    let mean_y = sum_y / nf;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let pred = slope * x + intercept;
        ss_res += (y - pred).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }

    let r_squared = if ss_tot.abs() < f64::EPSILON {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    // Standard error of the slope: sqrt(SS_res / (n-2)) / sqrt(Sxx)
    let sxx = sum_xx - sum_x * sum_x / nf;
    let slope_std_err = if n > 2 && sxx > f64::EPSILON {
        (ss_res / (n - 2) as f64).sqrt() / sxx.sqrt()
    } else {
        0.0
    };

    LinearFit {
        slope,
        intercept,
        r_squared,
        slope_std_err,
    }
}

/// Residual standard deviation of values around an index-based linear fit
pub fn residual_std(values: &[f64], fit: &LinearFit) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let ss_res: f64 = values
        .iter()
        .enumerate()
        .map(|(i, y)| (y - fit.predict(i as f64)).powi(2))
        .sum();
    (ss_res / (values.len() - 2) as f64).sqrt()
}

/// Quadratic least-squares fit y = a + b·x + c·x² against sample index
///
/// Returns (a, b, c) solved from the normal equations; None when the system
/// is degenerate.
pub fn quadratic_fit(values: &[f64]) -> Option<(f64, f64, f64)> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mut s1 = 0.0;
    let mut s2 = 0.0;
    let mut s3 = 0.0;
    let mut s4 = 0.0;
    let mut sy = 0.0;
    let mut sxy = 0.0;
    let mut sx2y = 0.0;
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        s1 += x;
        s2 += x * x;
        s3 += x * x * x;
        s4 += x * x * x * x;
        sy += y;
        sxy += x * y;
        sx2y += x * x * y;
    }

    // 3x3 system via Cramer's rule
    let det = |m: [[f64; 3]; 3]| -> f64 {
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    };

    let base = [[nf, s1, s2], [s1, s2, s3], [s2, s3, s4]];
    let d = det(base);
    if d.abs() < 1e-12 {
        return None;
    }
    let da = det([[sy, s1, s2], [sxy, s2, s3], [sx2y, s3, s4]]);
    let db = det([[nf, sy, s2], [s1, sxy, s3], [s2, sx2y, s4]]);
    let dc = det([[nf, s1, sy], [s1, s2, sxy], [s2, s3, sx2y]]);
    Some((da / d, db / d, dc / d))
}

/// Exponential moving average step
pub fn ema(previous: f64, value: f64, alpha: f64) -> f64 {
    previous + alpha.clamp(0.0, 1.0) * (value - previous)
}

/// Magnitude spectrum of the mean-removed series for bins 1..n/2
///
/// Naive DFT; the forecasting and pattern windows are 50 points or fewer.
pub fn dft_magnitudes(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 4 {
        return Vec::new();
    }
    let m = mean(values);
    let centered: Vec<f64> = values.iter().map(|v| v - m).collect();
    let mut magnitudes = Vec::with_capacity(n / 2);
    for k in 1..=(n / 2) {
        let mut re = 0.0;
        let mut im = 0.0;
        for (i, v) in centered.iter().enumerate() {
            let angle = -2.0 * std::f64::consts::PI * (k * i) as f64 / n as f64;
            re += v * angle.cos();
            im += v * angle.sin();
        }
        magnitudes.push((re * re + im * im).sqrt());
    }
    magnitudes
}

/// Dominant cycle of a series: (period in samples, strength in [0, 1])
///
/// Strength is the dominant bin's power share of the total spectrum power.
pub fn dominant_cycle(values: &[f64]) -> Option<(usize, f64)> {
    let n = values.len();
    let magnitudes = dft_magnitudes(values);
    if magnitudes.is_empty() {
        return None;
    }
    let total_power: f64 = magnitudes.iter().map(|m| m * m).sum();
    if total_power < f64::EPSILON {
        return None;
    }
    let (best_bin, best_mag) = magnitudes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let k = best_bin + 1;
    let period = (n as f64 / k as f64).round() as usize;
    if period < 2 || period > n / 2 {
        return None;
    }
    let strength = (best_mag * best_mag) / total_power;
    Some((period, strength))
}
