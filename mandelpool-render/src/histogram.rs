use std::sync::atomic::{AtomicU64, Ordering};

use crate::color::{iteration_color, BLACK};
use crate::iteration_buffer::IterationBuffer;

/// Count of pixels per floored iteration value, `max_iterations + 1` buckets.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
}

impl Histogram {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            buckets: (0..=max_iterations as usize)
                .map(|_| AtomicU64::new(0))
                .collect(),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        (self.buckets.len() - 1) as u32
    }

    pub fn reset(&self) {
        for b in &self.buckets {
            b.store(0, Ordering::Relaxed);
        }
    }

    /// Count `value` in bucket `floor(value)`.
    #[inline]
    pub fn record(&self, value: f64) {
        self.buckets[self.bucket_of(value)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, bucket: usize) -> u64 {
        self.buckets[bucket].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).sum()
    }

    #[inline]
    fn bucket_of(&self, value: f64) -> usize {
        (value.max(0.0).floor() as usize).min(self.buckets.len() - 1)
    }
}

/// Histogram-equalized color mapping for the second pass.
///
/// `cdf[j] = Σ_{k≤j} (count[k] / total)^¼`; the fourth root damps the weight
/// of the (usually dominant) interior bucket. Values are ranked by linear
/// interpolation inside their bucket and normalized against the lowest and
/// highest bucket actually observed.
#[derive(Debug, Clone, PartialEq)]
pub struct Equalizer {
    cdf: Vec<f64>,
    min: usize,
    max: usize,
    max_iterations: u32,
}

impl Equalizer {
    /// Build from the pass-1 histogram and the raw values of all `total` pixels.
    pub fn new(histogram: &Histogram, values: &IterationBuffer, total: usize) -> Self {
        let counts: Vec<u64> = (0..histogram.buckets.len())
            .map(|b| histogram.count(b))
            .collect();
        Self::from_counts(&counts, values.iter().take(total), total)
    }

    /// Build from plain bucket counts and an iterator over the raw values.
    pub fn from_counts(counts: &[u64], values: impl Iterator<Item = f64>, total: usize) -> Self {
        let max_iterations = counts.len().saturating_sub(1) as u32;
        let mut cdf = Vec::with_capacity(counts.len());
        let mut acc = 0.0;
        for &count in counts {
            if total > 0 {
                acc += (count as f64 / total as f64).powf(0.25);
            }
            cdf.push(acc);
        }

        let last = counts.len().saturating_sub(1);
        let (mut min, mut max) = (max_iterations as usize, 0usize);
        for v in values {
            let d = (v.max(0.0).floor() as usize).min(last);
            min = min.min(d);
            max = max.max(d);
        }

        Self {
            cdf,
            min,
            max,
            max_iterations,
        }
    }

    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    /// Lowest and highest floored value seen in pass 1.
    pub fn observed_range(&self) -> (usize, usize) {
        (self.min, self.max)
    }

    /// Equalized rank of `value` in `[0, 1]`.
    ///
    /// A flat distribution (`cdf[max] == cdf[min]`) ranks everything 0.
    pub fn rank(&self, value: f64) -> f64 {
        if self.cdf.is_empty() {
            return 0.0;
        }
        let floor = value.max(0.0).floor();
        let d = (floor as usize).min(self.cdf.len() - 1);
        let frac = value - floor;
        let prev = if d > 0 { self.cdf[d - 1] } else { 0.0 };
        let r = self.cdf[d] - (self.cdf[d] - prev) * (1.0 - frac);

        let lo = self.cdf[self.min.min(self.cdf.len() - 1)];
        let hi = self.cdf[self.max.min(self.cdf.len() - 1)];
        let span = hi - lo;
        if !(span > 0.0) || !span.is_finite() {
            return 0.0;
        }
        let r = (r - lo) / span;
        if r.is_nan() {
            0.0
        } else {
            r.clamp(0.0, 1.0)
        }
    }

    /// Final color for a pass-1 value. Non-escaped values stay black.
    #[inline]
    pub fn color(&self, value: f64) -> u32 {
        if value >= self.max_iterations as f64 {
            return BLACK;
        }
        iteration_color(self.rank(value) * self.max_iterations as f64, self.max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equalizer(values: &[f64], max_iterations: u32) -> Equalizer {
        let hist = Histogram::new(max_iterations);
        let buf = IterationBuffer::new(values.len());
        for (i, &v) in values.iter().enumerate() {
            hist.record(v);
            buf.set(i, v);
        }
        Equalizer::new(&hist, &buf, values.len())
    }

    #[test]
    fn histogram_buckets_by_floor() {
        let h = Histogram::new(10);
        for v in [0.0, 0.9, 1.0, 9.99, 10.0, 10.0] {
            h.record(v);
        }
        assert_eq!(h.count(0), 2);
        assert_eq!(h.count(1), 1);
        assert_eq!(h.count(9), 1);
        assert_eq!(h.count(10), 2);
        assert_eq!(h.total(), 6);
        h.reset();
        assert_eq!(h.total(), 0);
        assert_eq!(h.max_iterations(), 10);
    }

    #[test]
    fn cdf_follows_fourth_root_sum() {
        let eq = equalizer(&[0.0, 1.0, 1.5, 4.0], 4);
        let cdf = eq.cdf();
        assert_eq!(cdf.len(), 5);
        let quarter = 0.25f64.powf(0.25);
        let half = 0.5f64.powf(0.25);
        assert!((cdf[0] - quarter).abs() < 1e-12);
        assert!((cdf[1] - (quarter + half)).abs() < 1e-12);
        assert!((cdf[3] - cdf[1]).abs() < 1e-12);
        assert!((cdf[4] - (2.0 * quarter + half)).abs() < 1e-12);
        assert_eq!(eq.observed_range(), (0, 4));
    }

    #[test]
    fn cdf_is_monotonic() {
        let values: Vec<f64> = (0..500).map(|i| ((i * 37) % 101) as f64 * 0.99).collect();
        let eq = equalizer(&values, 100);
        assert!(eq.cdf().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn rank_stays_in_unit_interval() {
        let values: Vec<f64> = (0..300).map(|i| (i as f64 * 0.731) % 60.0).collect();
        let eq = equalizer(&values, 60);
        for i in 0..=600 {
            let r = eq.rank(i as f64 * 0.1);
            assert!((0.0..=1.0).contains(&r), "rank({}) = {r}", i as f64 * 0.1);
        }
    }

    #[test]
    fn rank_interpolates_within_bucket() {
        let eq = equalizer(&[2.0, 3.0, 3.5, 7.0], 8);
        let lo = eq.rank(3.0);
        let mid = eq.rank(3.5);
        let hi = eq.rank(3.999);
        assert!(lo < mid && mid < hi);
    }

    #[test]
    fn flat_distribution_ranks_zero() {
        let eq = equalizer(&[3.0, 3.2, 3.7], 10);
        assert_eq!(eq.rank(3.5), 0.0);
        assert_eq!(eq.color(3.5), iteration_color(0.0, 10));
    }

    #[test]
    fn interior_stays_black() {
        let eq = equalizer(&[0.0, 2.0, 5.0, 5.0], 5);
        assert_eq!(eq.color(5.0), BLACK);
        assert_ne!(eq.color(0.0), BLACK);
    }

    #[test]
    fn zero_max_iterations_is_all_black() {
        let eq = equalizer(&[0.0, 0.0], 0);
        assert_eq!(eq.color(0.0), BLACK);
    }
}
