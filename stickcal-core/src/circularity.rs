//! # Circularity Module
//!
//! Estimates how closely the rim excursions of a stick trace the ideal
//! unit circle.
//!
//! ## Algorithm
//! - Samples at or inside the detection radius are centre noise and dropped
//! - The remaining samples are sorted into angle buckets; each bucket keeps
//!   only the farthest sample seen during the test
//! - The error is the mean deviation of the *out-of-tolerance* buckets only,
//!   so a handful of mechanical defects is not diluted by the many
//!   near-perfect samples

use crate::config::CircularityConfig;
use crate::StickSample;
use std::fmt;

/// Farthest sample seen in one angle bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPoint {
    pub sample: StickSample,
    pub radius_squared: f32,
}

/// Farthest sample per angle bucket, stored as a fixed slot vector.
///
/// Bucket keys run from `round(-180 / precision)` to `round(180 / precision)`;
/// slot `i` holds key `min_key + i`, `None` marks an empty bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketMap {
    precision: f32,
    min_key: i32,
    slots: Vec<Option<BucketPoint>>,
    len: usize,
}

impl BucketMap {
    pub fn new(angle_precision: f32) -> Self {
        let min_key = (-180.0 / angle_precision).round() as i32;
        let max_key = (180.0 / angle_precision).round() as i32;
        let slot_count = (max_key - min_key + 1).max(1) as usize;
        Self {
            precision: angle_precision,
            min_key,
            slots: vec![None; slot_count],
            len: 0,
        }
    }

    /// Bucket key for the direction of a sample.
    pub fn key_for(&self, sample: StickSample) -> i32 {
        let angle_deg = sample.y.atan2(sample.x).to_degrees();
        (angle_deg / self.precision).round() as i32
    }

    /// Keeps `sample` if it is farther out than what its bucket holds.
    /// Returns true when the bucket was filled or replaced.
    pub fn offer(&mut self, sample: StickSample) -> bool {
        let radius_squared = sample.radius_squared();
        let key = self.key_for(sample);
        let Some(slot) = usize::try_from(key - self.min_key)
            .ok()
            .and_then(|index| self.slots.get_mut(index))
        else {
            return false;
        };

        match slot {
            Some(existing) if existing.radius_squared >= radius_squared => false,
            _ => {
                if slot.is_none() {
                    self.len += 1;
                }
                *slot = Some(BucketPoint {
                    sample,
                    radius_squared,
                });
                true
            }
        }
    }

    pub fn get(&self, key: i32) -> Option<&BucketPoint> {
        usize::try_from(key - self.min_key)
            .ok()
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
    }

    pub fn points(&self) -> impl Iterator<Item = &BucketPoint> {
        self.slots.iter().flatten()
    }

    /// Number of filled buckets.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Upper bound on `len()`.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.len = 0;
    }
}

/// Outcome of one circularity evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircularityReport {
    /// The test has not produced a value yet.
    Pending,
    /// Fewer filled buckets than required.
    InsufficientData,
    /// Enough buckets, but not enough of them on the rim.
    InsufficientOuterData,
    /// Mean deviation of out-of-tolerance buckets, in percent (2 decimals).
    Error { percent: f32 },
}

impl fmt::Display for CircularityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircularityReport::Pending => write!(f, "Circularity error: --%"),
            CircularityReport::InsufficientData => write!(f, "Insufficient data"),
            CircularityReport::InsufficientOuterData => write!(f, "Insufficient outer data"),
            CircularityReport::Error { percent } => {
                write!(f, "Circularity error: {:.2}%", percent)
            }
        }
    }
}

/// Per-stick circularity state owned by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct CircularityState {
    pub buckets: BucketMap,
    /// Whether live samples are currently accepted.
    pub enabled: bool,
    pub report: CircularityReport,
}

/// Stateless circularity logic over a [`CircularityState`].
#[derive(Debug, Clone)]
pub struct CircularitySampler {
    config: CircularityConfig,
}

impl CircularitySampler {
    pub fn new(config: CircularityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CircularityConfig {
        &self.config
    }

    /// Fresh, disabled state sized for this sampler's bucket width.
    pub fn new_state(&self) -> CircularityState {
        CircularityState {
            buckets: BucketMap::new(self.config.angle_precision),
            enabled: false,
            report: CircularityReport::Pending,
        }
    }

    /// Starts (or restarts) a test: previous buckets are discarded.
    pub fn enable(&self, state: &mut CircularityState) {
        state.buckets.clear();
        state.report = CircularityReport::Pending;
        state.enabled = true;
    }

    /// Stops accepting samples and freezes a final report.
    pub fn disable(&self, state: &mut CircularityState) {
        if !state.enabled {
            return;
        }
        state.enabled = false;
        state.report = self.evaluate(&state.buckets);
    }

    /// Feeds one live sample. Returns true when a bucket changed.
    pub fn record(&self, state: &mut CircularityState, sample: StickSample) -> bool {
        if !state.enabled || !sample.x.is_finite() || !sample.y.is_finite() {
            return false;
        }
        let min_radius = self.config.min_detection_radius;
        if sample.radius_squared() <= min_radius * min_radius {
            return false;
        }
        state.buckets.offer(sample)
    }

    /// Periodic refresh while the test runs.
    pub fn refresh(&self, state: &mut CircularityState) -> CircularityReport {
        if state.enabled {
            state.report = self.evaluate(&state.buckets);
        }
        state.report
    }

    /// Computes the circularity error of the retained samples.
    ///
    /// 1. At least `min_data_points` buckets must be filled
    /// 2. At least `min_data_points` of them must lie outside the detection radius
    /// 3. Only deviations above `min_error_threshold` enter the mean
    pub fn evaluate(&self, buckets: &BucketMap) -> CircularityReport {
        let config = &self.config;
        if buckets.len() < config.min_data_points {
            return CircularityReport::InsufficientData;
        }

        let min_radius = config.min_detection_radius as f64;
        let outer_radii: Vec<f64> = buckets
            .points()
            .map(|p| (p.radius_squared as f64).sqrt())
            .filter(|&r| r > min_radius)
            .collect();
        if outer_radii.len() < config.min_data_points {
            return CircularityReport::InsufficientOuterData;
        }

        let theoretical = config.theoretical_radius as f64;
        let threshold = config.min_error_threshold as f64;
        let (total_deviation, count) = outer_radii
            .iter()
            .map(|r| (r - theoretical).abs())
            .filter(|&deviation| deviation > threshold)
            .fold((0.0f64, 0usize), |(sum, n), d| (sum + d, n + 1));

        let mean_deviation = if count > 0 {
            total_deviation / count as f64
        } else {
            0.0
        };
        let percent = (mean_deviation * 100.0 * 100.0).round() / 100.0;

        CircularityReport::Error {
            percent: percent as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_circle(angle_deg: f32, radius: f32) -> StickSample {
        let a = angle_deg.to_radians();
        StickSample::new(radius * a.cos(), radius * a.sin())
    }

    fn enabled_sampler() -> (CircularitySampler, CircularityState) {
        let sampler = CircularitySampler::new(CircularityConfig::default());
        let mut state = sampler.new_state();
        sampler.enable(&mut state);
        (sampler, state)
    }

    #[test]
    fn test_bucket_map_is_bounded() {
        let map = BucketMap::new(3.0);
        // keys -60..=60
        assert_eq!(map.capacity(), 121);
        assert!(map.is_empty());
    }

    #[test]
    fn test_bucket_keeps_farthest_sample() {
        let mut map = BucketMap::new(3.0);
        assert!(map.offer(on_circle(30.0, 0.9)));
        assert!(map.offer(on_circle(30.5, 0.95)));
        assert!(!map.offer(on_circle(29.8, 0.91)));
        assert_eq!(map.len(), 1);

        let point = map.get(10).unwrap();
        assert!((point.sample.radius() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_center_noise_is_never_enough() {
        let (sampler, mut state) = enabled_sampler();
        for i in 0..5000 {
            let angle = i as f32 * 0.73;
            sampler.record(&mut state, on_circle(angle, 0.85 * ((i % 100) as f32 / 100.0)));
        }
        sampler.record(&mut state, on_circle(12.0, 0.849));
        assert!(state.buckets.is_empty());
        assert_eq!(sampler.refresh(&mut state), CircularityReport::InsufficientData);
        assert_eq!(state.report.to_string(), "Insufficient data");
    }

    #[test]
    fn test_perfect_circle_reports_zero() {
        let (sampler, mut state) = enabled_sampler();
        for k in 0..24 {
            sampler.record(&mut state, on_circle(k as f32 * 15.0, 1.0));
        }
        assert_eq!(state.buckets.len(), 24);

        let report = sampler.refresh(&mut state);
        assert_eq!(report, CircularityReport::Error { percent: 0.0 });
        assert_eq!(report.to_string(), "Circularity error: 0.00%");
    }

    #[test]
    fn test_single_outlier_sets_error() {
        let (sampler, mut state) = enabled_sampler();
        sampler.record(&mut state, StickSample::new(1.10, 0.0));
        for k in 1..24 {
            sampler.record(&mut state, on_circle(k as f32 * 15.0, 1.0));
        }
        assert_eq!(state.buckets.len(), 24);

        let report = sampler.refresh(&mut state);
        assert_eq!(report.to_string(), "Circularity error: 10.00%");
    }

    #[test]
    fn test_inner_and_outer_defects_average() {
        let (sampler, mut state) = enabled_sampler();
        sampler.record(&mut state, on_circle(0.0, 1.2));
        sampler.record(&mut state, on_circle(90.0, 0.9));
        for k in 0..40 {
            let angle = 100.0 + k as f32 * 6.0;
            sampler.record(&mut state, on_circle(angle, 1.01));
        }
        // (0.2 + 0.1) / 2
        assert_eq!(sampler.refresh(&mut state).to_string(), "Circularity error: 15.00%");
    }

    #[test]
    fn test_insufficient_outer_data() {
        let sampler = CircularitySampler::new(CircularityConfig::default());
        let mut map = BucketMap::new(3.0);
        for k in 0..30 {
            map.offer(on_circle(k as f32 * 12.0, if k < 10 { 1.0 } else { 0.5 }));
        }
        assert_eq!(map.len(), 30);
        assert_eq!(sampler.evaluate(&map), CircularityReport::InsufficientOuterData);
    }

    #[test]
    fn test_disable_freezes_final_report() {
        let (sampler, mut state) = enabled_sampler();
        for k in 0..24 {
            sampler.record(&mut state, on_circle(k as f32 * 15.0, 1.0));
        }
        sampler.disable(&mut state);
        let frozen = state.report;
        assert_eq!(frozen, CircularityReport::Error { percent: 0.0 });

        // Samples after disable are ignored and the value stays put.
        assert!(!sampler.record(&mut state, on_circle(7.0, 1.3)));
        assert_eq!(sampler.refresh(&mut state), frozen);
        assert_eq!(state.buckets.len(), 24);
    }

    #[test]
    fn test_reenable_clears_buckets() {
        let (sampler, mut state) = enabled_sampler();
        sampler.record(&mut state, on_circle(45.0, 1.0));
        sampler.disable(&mut state);
        sampler.enable(&mut state);
        assert!(state.buckets.is_empty());
        assert_eq!(state.report, CircularityReport::Pending);
    }

    #[test]
    fn test_non_finite_samples_are_dropped() {
        let (sampler, mut state) = enabled_sampler();
        assert!(!sampler.record(&mut state, StickSample::new(f32::NAN, 1.0)));
        assert!(!sampler.record(&mut state, StickSample::new(f32::INFINITY, 0.0)));
        assert!(state.buckets.is_empty());
    }
}
