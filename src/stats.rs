use crate::config::AnalysisParams;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Running mean, population variance and extrema (Welford's algorithm).
#[derive(Debug, Clone)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;

        self.min = self.min.min(val);
        self.max = self.max.max(val);
    }

    pub fn mean(&self) -> f64 {
        if self.n_vals == 0 {
            return f64::NAN;
        }
        self.mean
    }

    pub fn variance(&self) -> f64 {
        if self.n_vals == 0 {
            return f64::NAN;
        }
        self.diff_2_sum / self.n_vals as f64
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Accumulator::new();
        iter.into_iter().for_each(|val| acc.add(val));
        acc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Improving,
    Degrading,
}

/// Summary statistics of a metric time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub start: f64,
    pub end: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub variance: f64,
    /// Second-half mean compared with first-half mean (lower is improving).
    pub trend: Trend,
    /// Variance of the trailing stability window.
    pub trailing_variance: f64,
    pub is_stable: bool,
}

impl Summary {
    pub fn new(vals: &[f64], params: &AnalysisParams) -> Result<Self> {
        let (Some(&start), Some(&end)) = (vals.first(), vals.last()) else {
            bail!("time series must not be empty");
        };

        let acc: Accumulator = vals.iter().copied().collect();

        let trailing_variance = trailing_variance(vals, params.stability_window);

        Ok(Self {
            start,
            end,
            mean: acc.mean(),
            min: acc.min(),
            max: acc.max(),
            std_dev: acc.variance().sqrt(),
            variance: acc.variance(),
            trend: compute_trend(vals),
            trailing_variance,
            is_stable: trailing_variance < params.stability_threshold,
        })
    }
}

/// Population variance of the last `window` values (all values if fewer).
pub fn trailing_variance(vals: &[f64], window: usize) -> f64 {
    let i_start = vals.len().saturating_sub(window);
    vals[i_start..].iter().copied().collect::<Accumulator>().variance()
}

fn compute_trend(vals: &[f64]) -> Trend {
    let half = vals.len() / 2;
    if half == 0 {
        return Trend::Degrading;
    }
    let first = vals[..half].iter().copied().collect::<Accumulator>().mean();
    let second = vals[half..].iter().copied().collect::<Accumulator>().mean();
    if second < first {
        Trend::Improving
    } else {
        Trend::Degrading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(window: usize, threshold: f64) -> AnalysisParams {
        AnalysisParams {
            stability_window: window,
            stability_threshold: threshold,
        }
    }

    #[test]
    fn accumulator_matches_direct_computation() {
        let vals = [0.35, 0.6, 0.42, 0.5, 0.47];
        let acc: Accumulator = vals.iter().copied().collect();
        let mean = vals.iter().sum::<f64>() / vals.len() as f64;
        let var = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / vals.len() as f64;
        assert!((acc.mean() - mean).abs() < 1e-12);
        assert!((acc.variance() - var).abs() < 1e-12);
        assert_eq!(acc.min(), 0.35);
        assert_eq!(acc.max(), 0.6);
    }

    #[test]
    fn summary_reports_endpoints_and_bounds() {
        let vals = [0.5, 0.2, 0.9, 0.4];
        let summary = Summary::new(&vals, &params(2, 0.01)).unwrap();
        assert_eq!(summary.start, 0.5);
        assert_eq!(summary.end, 0.4);
        assert_eq!(summary.min, 0.2);
        assert_eq!(summary.max, 0.9);
        assert!((summary.std_dev.powi(2) - summary.variance).abs() < 1e-12);
        assert_eq!(summary.trend, Trend::Degrading);
    }

    #[test]
    fn constant_tail_is_stable_despite_noisy_head() {
        let mut vals = vec![0.0, 1.0, 0.0, 1.0];
        vals.extend(std::iter::repeat_n(0.5, 10));
        let summary = Summary::new(&vals, &params(10, 0.01)).unwrap();
        assert_eq!(summary.trailing_variance, 0.0);
        assert!(summary.is_stable);
        assert!(summary.variance > 0.01);
    }

    #[test]
    fn oscillating_tail_is_unstable() {
        let vals: Vec<_> = (0..20).map(|i| (i % 2) as f64).collect();
        let summary = Summary::new(&vals, &params(10, 0.01)).unwrap();
        assert!((summary.trailing_variance - 0.25).abs() < 1e-12);
        assert!(!summary.is_stable);
    }

    #[test]
    fn stability_threshold_is_strict() {
        let vals = [0.0, 1.0];
        let summary = Summary::new(&vals, &params(10, 0.25)).unwrap();
        assert_eq!(summary.trailing_variance, 0.25);
        assert!(!summary.is_stable);
    }

    #[test]
    fn short_series_use_the_whole_history() {
        assert_eq!(trailing_variance(&[0.3], 100), 0.0);
        let summary = Summary::new(&[0.3], &params(100, 0.01)).unwrap();
        assert_eq!(summary.trend, Trend::Degrading);
        assert!(summary.is_stable);
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(Summary::new(&[], &params(10, 0.01)).is_err());
    }

    #[test]
    fn equal_halves_are_degrading() {
        assert_eq!(compute_trend(&[0.5; 4]), Trend::Degrading);
    }

    #[test]
    fn decreasing_series_is_improving() {
        let vals: Vec<_> = (0..10).map(|i| 1.0 - i as f64 / 10.0).collect();
        assert_eq!(compute_trend(&vals), Trend::Improving);
    }
}
