//! # Configuration Module
//!
//! Tunables for the calibration workbench: timer periods, the size of the
//! trajectory surfaces and the circularity thresholds. Every field has a
//! default, so a partial JSON file only needs to name what it changes.

use crate::error::{CalibrationError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Largest accepted trajectory surface edge, in pixels.
pub const MAX_SURFACE_SIZE: u32 = 4096;
/// Finest accepted bucket width, in degrees.
pub const MIN_ANGLE_PRECISION: f32 = 0.1;

/// Top-level workbench configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Period of the calibration-state poll while a session runs.
    pub poll_interval_ms: u64,
    /// Period of the circularity error refresh while the test runs.
    pub circularity_refresh_ms: u64,
    /// Edge length in pixels of each (square) trajectory surface.
    pub surface_size: u32,
    pub circularity: CircularityConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            circularity_refresh_ms: 300,
            surface_size: 240,
            circularity: CircularityConfig::default(),
        }
    }
}

/// Thresholds of the circularity analysis.
///
/// All radii are in normalized stick units, where the ideal rim of the
/// stick gate is the unit circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularityConfig {
    /// Radius of the ideal circle the stick is measured against.
    pub theoretical_radius: f32,
    /// Samples at or below this radius are centre noise and ignored.
    pub min_detection_radius: f32,
    /// Deviation below which a sample counts as on the circle.
    pub min_error_threshold: f32,
    /// Retained samples needed before an error is reported.
    pub min_data_points: usize,
    /// Width of one angle bucket in degrees.
    pub angle_precision: f32,
}

impl Default for CircularityConfig {
    fn default() -> Self {
        Self {
            theoretical_radius: 1.0,
            min_detection_radius: 0.85,
            min_error_threshold: 0.05,
            min_data_points: 24,
            angle_precision: 3.0,
        }
    }
}

impl CalibrationConfig {
    /// Loads configuration from a JSON file and validates it.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON configuration file
    ///
    /// # Returns
    /// * `Ok(config)` - Parsed and validated configuration
    /// * `Err(e)` - File could not be read, parsed or failed validation
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: CalibrationConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 || self.circularity_refresh_ms == 0 {
            return Err(CalibrationError::InvalidConfig(
                "timer periods must be non-zero".to_string(),
            ));
        }
        if self.surface_size == 0 || self.surface_size > MAX_SURFACE_SIZE {
            return Err(CalibrationError::InvalidConfig(format!(
                "surface_size must be in [1, {}], got {}",
                MAX_SURFACE_SIZE, self.surface_size
            )));
        }
        self.circularity.validate()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn circularity_refresh(&self) -> Duration {
        Duration::from_millis(self.circularity_refresh_ms)
    }
}

impl CircularityConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.angle_precision >= MIN_ANGLE_PRECISION && self.angle_precision <= 180.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "angle_precision must be in [{}, 180], got {}",
                MIN_ANGLE_PRECISION, self.angle_precision
            )));
        }
        if !(self.theoretical_radius > 0.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "theoretical_radius must be positive, got {}",
                self.theoretical_radius
            )));
        }
        if !(self.min_detection_radius > 0.0
            && self.min_detection_radius <= self.theoretical_radius)
        {
            return Err(CalibrationError::InvalidConfig(format!(
                "min_detection_radius must be in (0, {}], got {}",
                self.theoretical_radius, self.min_detection_radius
            )));
        }
        if self.min_error_threshold < 0.0 {
            return Err(CalibrationError::InvalidConfig(format!(
                "min_error_threshold must not be negative, got {}",
                self.min_error_threshold
            )));
        }
        Ok(())
    }

    /// Radius beyond which a sample is drawn as overshoot.
    pub fn overshoot_radius(&self) -> f32 {
        self.theoretical_radius + self.min_error_threshold
    }
}
