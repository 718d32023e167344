//! Calibration data shared with the calibration service.
//!
//! These are the shapes the backend reports on every poll. They are plain
//! data; transitions live in the backend and are only mirrored here.

use crate::{StickSample, StickSide};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Step of a stick calibration as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationStep {
    #[default]
    Idle,
    CenterCheck,
    RangeDetection,
    Complete,
    /// Any step name this build does not know about.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for CalibrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalibrationStep::Idle => "Idle",
            CalibrationStep::CenterCheck => "CenterCheck",
            CalibrationStep::RangeDetection => "RangeDetection",
            CalibrationStep::Complete => "Complete",
            CalibrationStep::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Extremes reached by a stick during range detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StickRange {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl StickRange {
    /// An empty range: the first widened sample becomes both bounds.
    pub fn unset() -> Self {
        Self {
            x_min: f32::MAX,
            x_max: f32::MIN,
            y_min: f32::MAX,
            y_max: f32::MIN,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    pub fn widen(&mut self, sample: StickSample) {
        self.x_min = self.x_min.min(sample.x);
        self.x_max = self.x_max.max(sample.x);
        self.y_min = self.y_min.min(sample.y);
        self.y_max = self.y_max.max(sample.y);
    }
}

impl Default for StickRange {
    fn default() -> Self {
        Self::unset()
    }
}

/// Shape of the stick gate the calibration assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickCaliMode {
    Circle,
    #[default]
    Square,
}

impl fmt::Display for StickCaliMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StickCaliMode::Circle => write!(f, "circle"),
            StickCaliMode::Square => write!(f, "square"),
        }
    }
}

/// Backend record for one stick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StickCalibration {
    pub step: CalibrationStep,
    pub stick_center: (f32, f32),
    pub stick_range: StickRange,
    /// Files written before the mode existed load as `Square`.
    #[serde(default)]
    pub mode: StickCaliMode,
}

impl StickCalibration {
    /// Drops the measured data; the gate mode is a user setting and stays.
    pub fn reset(&mut self) {
        let mode = self.mode;
        *self = Self::default();
        self.mode = mode;
    }
}

/// Snapshot returned by the backend's `get_state`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationState {
    pub left_stick: StickCalibration,
    pub right_stick: StickCalibration,
}

impl CalibrationState {
    pub fn stick(&self, side: StickSide) -> &StickCalibration {
        match side {
            StickSide::Left => &self.left_stick,
            StickSide::Right => &self.right_stick,
        }
    }

    pub fn stick_mut(&mut self, side: StickSide) -> &mut StickCalibration {
        match side {
            StickSide::Left => &mut self.left_stick,
            StickSide::Right => &mut self.right_stick,
        }
    }
}

/// The controller's local mirror of the one calibration in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationSession {
    /// Stick being calibrated, `None` when idle.
    pub stick: Option<StickSide>,
    pub step: CalibrationStep,
    pub stick_center: (f32, f32),
    pub stick_range: StickRange,
}

impl CalibrationSession {
    pub fn is_active(&self) -> bool {
        self.stick.is_some()
    }

    /// Copies the backend record of the active stick, if any.
    pub fn mirror(&mut self, state: &CalibrationState) {
        if let Some(side) = self.stick {
            let record = state.stick(side);
            self.step = record.step;
            self.stick_center = record.stick_center;
            self.stick_range = record.stick_range;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
