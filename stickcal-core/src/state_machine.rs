//! # Calibration State Machine Proxy
//!
//! Mirrors the calibration step reported by the backend for the active
//! session and derives the hint shown to the user. The proxy never decides a
//! transition itself: the backend walks `Idle → CenterCheck →
//! RangeDetection → Complete` and the proxy only observes it.

use crate::session::CalibrationStep;

/// Hint shown for every step, including `Idle`.
pub const IDLE_HINT: &str = "Select a stick to begin calibration.";
const CENTER_CHECK_HINT: &str =
    "Step 1: Release the stick completely and do not touch it, then click \"Next\".";
const RANGE_DETECTION_HINT: &str =
    "Step 2: Push the stick to its edge and trace a few full circles along the rim, then click \"Finish\".";
const COMPLETE_HINT: &str =
    "Calibration complete! Click \"Save\" to keep the result, or \"Cancel\" to discard it.";

/// Returns the user-facing hint for a calibration step.
///
/// Total over every step value: anything this build does not recognize
/// yields an empty hint instead of an error.
pub fn hint_for(step: CalibrationStep) -> &'static str {
    match step {
        CalibrationStep::Idle => IDLE_HINT,
        CalibrationStep::CenterCheck => CENTER_CHECK_HINT,
        CalibrationStep::RangeDetection => RANGE_DETECTION_HINT,
        CalibrationStep::Complete => COMPLETE_HINT,
        CalibrationStep::Unknown => "",
    }
}

/// Local reflection of the backend step for the stick being calibrated.
#[derive(Debug, Clone, PartialEq)]
pub struct StepProxy {
    step: CalibrationStep,
    hint: &'static str,
}

impl Default for StepProxy {
    fn default() -> Self {
        Self {
            step: CalibrationStep::Idle,
            hint: IDLE_HINT,
        }
    }
}

impl StepProxy {
    pub fn step(&self) -> CalibrationStep {
        self.step
    }

    pub fn hint(&self) -> &'static str {
        self.hint
    }

    /// Records a step reported by the backend.
    /// Returns true when the step changed.
    pub fn observe(&mut self, step: CalibrationStep) -> bool {
        let changed = self.step != step;
        if changed {
            log::debug!("Calibration step {} -> {}", self.step, step);
        }
        self.step = step;
        self.hint = hint_for(step);
        changed
    }

    /// Back to `Idle`, the state after cancel or save.
    pub fn reset(&mut self) {
        self.observe(CalibrationStep::Idle);
    }

    /// `Next`/`Finish` is only meaningful before the session completes.
    pub fn allows_advance(&self) -> bool {
        matches!(
            self.step,
            CalibrationStep::CenterCheck | CalibrationStep::RangeDetection
        )
    }

    pub fn allows_save(&self) -> bool {
        self.step == CalibrationStep::Complete
    }
}
