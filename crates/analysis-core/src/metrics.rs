//! Pure numeric helpers shared by every analysis family.
//!
//! All functions are total: zero denominators, empty inputs and constant
//! series produce a neutral value instead of NaN or a panic.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// `numerator / denominator`, 0 when the denominator is 0 or the result is not finite.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let r = numerator / denominator;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// Ratio expressed as a percentage.
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    ratio(numerator, denominator) * 100.0
}

/// `(current - previous) / previous`, 0 when `previous` is 0.
pub fn growth_rate(previous: f64, current: f64) -> f64 {
    ratio(current - previous, previous)
}

/// Growth rate as a percentage.
pub fn growth_percent(previous: f64, current: f64) -> f64 {
    growth_rate(previous, current) * 100.0
}

/// Compound growth per period between the first and last value.
pub fn cagr(first: f64, last: f64, periods: usize) -> f64 {
    if periods == 0 || first <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    (last / first).powf(1.0 / periods as f64) - 1.0
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_variance()
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Period-over-period returns, skipping periods whose base is zero.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter_map(|w| {
            if w[0] != 0.0 {
                Some((w[1] - w[0]) / w[0].abs())
            } else {
                None
            }
        })
        .collect()
}

/// Summary statistics over one series (population formulas).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptiveStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub variance: f64,
    pub standard_deviation: f64,
    pub coefficient_of_variation: f64,
    pub skewness: f64,
    /// Excess kurtosis (raw fourth standardized moment minus 3).
    pub kurtosis: f64,
}

pub fn descriptive_stats(values: &[f64]) -> DescriptiveStats {
    if values.is_empty() {
        return DescriptiveStats::default();
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let m = sum / n;
    let var = variance(values);
    let sd = var.sqrt();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let (skewness, kurtosis) = if sd > 0.0 {
        let m3 = values.iter().map(|v| ((v - m) / sd).powi(3)).sum::<f64>() / n;
        let m4 = values.iter().map(|v| ((v - m) / sd).powi(4)).sum::<f64>() / n;
        (m3, m4 - 3.0)
    } else {
        (0.0, 0.0)
    };

    DescriptiveStats {
        count: values.len(),
        sum,
        mean: m,
        median: Data::new(values.to_vec()).median(),
        mode: mode(values),
        min,
        max,
        range: max - min,
        variance: var,
        standard_deviation: sd,
        coefficient_of_variation: ratio(sd, m),
        skewness,
        kurtosis,
    }
}

/// Most frequent value; ties resolve to the smallest value.
fn mode(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut best = sorted.first().copied().unwrap_or(0.0);
    let mut best_run = 0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_run {
            best_run = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

/// Indices whose |value - mean| / stddev exceeds `threshold`.
/// A constant series has no outliers.
pub fn z_score_outliers(values: &[f64], threshold: f64) -> Vec<usize> {
    let sd = std_dev(values);
    if sd == 0.0 {
        return Vec::new();
    }
    let m = mean(values);
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| ((*v - m) / sd).abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// z-score of `value` relative to `sample`, 0 for a constant sample.
pub fn z_score_of(value: f64, sample: &[f64]) -> f64 {
    let sd = std_dev(sample);
    if sd == 0.0 {
        return 0.0;
    }
    (value - mean(sample)) / sd
}

/// Percentile rank (0-100) of `value` within `sample`; ties count half.
/// An empty sample yields the neutral 50.
pub fn percentile_rank(value: f64, sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return 50.0;
    }
    let below = sample.iter().filter(|&&x| x < value).count();
    let equal = sample.iter().filter(|&&x| x == value).count();
    (below as f64 + 0.5 * equal as f64) / sample.len() as f64 * 100.0
}

/// Aligns two series on their most recent common tail.
fn aligned<'a>(a: &'a [f64], b: &'a [f64]) -> (&'a [f64], &'a [f64]) {
    let n = a.len().min(b.len());
    (&a[a.len() - n..], &b[b.len() - n..])
}

/// Population covariance over the aligned tail, 0 with fewer than two points.
pub fn covariance(a: &[f64], b: &[f64]) -> f64 {
    let (a, b) = aligned(a, b);
    if a.len() < 2 {
        return 0.0;
    }
    a.iter().population_covariance(b.iter())
}

/// Pearson correlation over the aligned tail, 0 when either side is constant.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let (a, b) = aligned(a, b);
    if a.len() < 2 {
        return 0.0;
    }
    let denom = std_dev(a) * std_dev(b);
    ratio(covariance(a, b), denom)
}

/// Sensitivity of `asset` to `market`; 1.0 (market-neutral) when the market
/// series is too short or constant.
pub fn beta(asset: &[f64], market: &[f64]) -> f64 {
    let (a, m) = aligned(asset, market);
    if a.len() < 2 {
        return 1.0;
    }
    let market_var = variance(m);
    if market_var == 0.0 {
        return 1.0;
    }
    covariance(a, m) / market_var
}

/// Least-squares line through `values` against their index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl Trend {
    /// Value the line predicts `steps` periods after the last observation.
    pub fn project(&self, len: usize, steps: usize) -> f64 {
        let x = (len + steps) as f64 - 1.0;
        self.intercept + self.slope * x
    }
}

pub fn linear_trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend {
            slope: 0.0,
            intercept: values.first().copied().unwrap_or(0.0),
            r_squared: 0.0,
        };
    }
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let slope = ratio(covariance(&xs, values), variance(&xs));
    let intercept = mean(values) - slope * mean(&xs);
    let r = correlation(&xs, values);
    Trend {
        slope,
        intercept,
        r_squared: r * r,
    }
}

/// Lag-k autocorrelation, 0 when the series is too short or constant.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if lag == 0 || values.len() <= lag + 1 {
        return 0.0;
    }
    let m = mean(values);
    let denom: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denom == 0.0 {
        return 0.0;
    }
    let num: f64 = values
        .windows(lag + 1)
        .map(|w| (w[0] - m) * (w[lag] - m))
        .sum();
    num / denom
}

/// Share of period-over-period changes that were increases, as a percentage.
pub fn consistency(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let ups = values.windows(2).filter(|w| w[1] > w[0]).count();
    ups as f64 / (values.len() - 1) as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ratio_is_total() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(ratio(6.0, 3.0), 2.0);
        assert_eq!(percent(1.0, 4.0), 25.0);
    }

    #[test]
    fn growth_rate_zero_base() {
        assert_eq!(growth_rate(0.0, 10.0), 0.0);
        assert_relative_eq!(growth_rate(100.0, 120.0), 0.2, epsilon = 1e-12);
        assert_relative_eq!(growth_percent(100.0, 80.0), -20.0, epsilon = 1e-9);
    }

    #[test]
    fn descriptive_stats_population_formulas() {
        let s = descriptive_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.count, 8);
        assert_relative_eq!(s.mean, 5.0);
        assert_relative_eq!(s.variance, 4.0);
        assert_relative_eq!(s.standard_deviation, 2.0);
        assert_relative_eq!(s.median, 4.5);
        assert_relative_eq!(s.mode, 4.0);
        assert_relative_eq!(s.range, 7.0);
        assert_relative_eq!(s.coefficient_of_variation, 0.4);
    }

    #[test]
    fn kurtosis_is_excess() {
        // symmetric two-point distribution: raw kurtosis 1, excess -2
        let s = descriptive_stats(&[1.0, -1.0, 1.0, -1.0]);
        assert_relative_eq!(s.skewness, 0.0, epsilon = 1e-12);
        assert_relative_eq!(s.kurtosis, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_stats_are_zero() {
        assert_eq!(descriptive_stats(&[]), DescriptiveStats::default());
    }

    #[test]
    fn constant_series_has_no_outliers() {
        assert!(z_score_outliers(&[3.0; 6], 2.0).is_empty());
        let mut v = vec![10.0; 9];
        v.push(100.0);
        assert_eq!(z_score_outliers(&v, 2.0), vec![9]);
    }

    #[test]
    fn percentile_rank_neutral_on_empty() {
        assert_eq!(percentile_rank(5.0, &[]), 50.0);
        assert_eq!(percentile_rank(5.0, &[1.0, 2.0, 3.0, 4.0]), 100.0);
        assert_eq!(percentile_rank(0.0, &[1.0, 2.0]), 0.0);
        assert_eq!(percentile_rank(2.0, &[1.0, 2.0, 3.0, 4.0]), 37.5);
    }

    #[test]
    fn beta_and_correlation() {
        let market = [0.01, 0.02, -0.01, 0.03];
        let asset: Vec<f64> = market.iter().map(|m| m * 2.0).collect();
        assert_relative_eq!(beta(&asset, &market), 2.0, epsilon = 1e-9);
        assert_relative_eq!(correlation(&asset, &market), 1.0, epsilon = 1e-9);
        assert_eq!(beta(&asset, &[0.0, 0.0, 0.0, 0.0]), 1.0);
        assert_eq!(beta(&[0.1], &[0.2]), 1.0);
    }

    #[test]
    fn trend_fits_a_line() {
        let t = linear_trend(&[1.0, 3.0, 5.0, 7.0]);
        assert_relative_eq!(t.slope, 2.0, epsilon = 1e-9);
        assert_relative_eq!(t.intercept, 1.0, epsilon = 1e-9);
        assert_relative_eq!(t.r_squared, 1.0, epsilon = 1e-9);
        assert_relative_eq!(t.project(4, 1), 9.0, epsilon = 1e-9);
    }

    #[test]
    fn consistency_counts_increases() {
        assert_eq!(consistency(&[1.0, 2.0, 3.0]), 100.0);
        assert_eq!(consistency(&[1.0, 2.0, 1.0]), 50.0);
        assert_eq!(consistency(&[1.0]), 0.0);
    }

    #[test]
    fn cagr_requires_positive_endpoints() {
        assert_relative_eq!(cagr(100.0, 121.0, 2), 0.1, epsilon = 1e-9);
        assert_eq!(cagr(0.0, 10.0, 2), 0.0);
    }
}
