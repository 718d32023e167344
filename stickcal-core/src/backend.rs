//! # Calibration Backend Module
//!
//! The calibration service the workbench talks to. The controller only
//! consumes the [`CalibrationBackend`] trait; [`LocalBackend`] is the
//! in-process implementation used by the GUI.
//!
//! ## LocalBackend
//! - Walks one stick at a time through `CenterCheck → RangeDetection → Complete`
//! - Records the rest position and the reached range from the live input
//!   through an [`InputRecorder`] handle
//! - Persists both sticks to a JSON calibration file on save
//! - Keeps the circle/square gate mode in the same file

use crate::error::{CalibrationError, Result};
use crate::session::{CalibrationState, CalibrationStep, StickCaliMode, StickCalibration};
use crate::{ControllerSnapshot, StickSide};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Operations of the calibration service.
///
/// Every call is fallible; callers must turn failures into status text
/// rather than propagate them to the user as a crash.
pub trait CalibrationBackend {
    fn start_session(&mut self, stick: StickSide) -> Result<()>;
    fn advance(&mut self, stick: StickSide) -> Result<()>;
    fn cancel(&mut self, stick: StickSide) -> Result<()>;
    fn save(&mut self) -> Result<()>;
    fn reset_to_default(&mut self) -> Result<()>;
    /// Sets the gate mode of both sticks.
    fn set_calibration_mode(&mut self, mode: StickCaliMode) -> Result<()>;
    fn get_state(&mut self) -> Result<CalibrationState>;
}

/// On-disk layout of a saved calibration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationFile {
    pub left_stick_calibration: StickCalibration,
    pub right_stick_calibration: StickCalibration,
}

#[derive(Debug, Default)]
struct Shared {
    state: CalibrationState,
    /// Stick whose session is still collecting input.
    active: Option<StickSide>,
}

/// In-process calibration service backed by a JSON file.
#[derive(Debug)]
pub struct LocalBackend {
    shared: Arc<RwLock<Shared>>,
    path: PathBuf,
}

impl LocalBackend {
    /// Opens the backend, loading a previously saved calibration.
    ///
    /// A missing or unreadable file is not an error: the backend starts from
    /// default (uncalibrated) records and logs why.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut state = CalibrationState::default();

        if path.exists() {
            match read_calibration_file(&path) {
                Ok(file) => {
                    state.left_stick = file.left_stick_calibration;
                    state.right_stick = file.right_stick_calibration;
                    state.left_stick.step = CalibrationStep::Idle;
                    state.right_stick.step = CalibrationStep::Idle;
                    log::info!("Loaded calibration from {}", path.display());
                }
                Err(e) => {
                    log::error!(
                        "Failed to read calibration file {}: {}, using defaults",
                        path.display(),
                        e
                    );
                }
            }
        } else {
            log::info!("No calibration file at {}, using defaults", path.display());
        }

        Self {
            shared: Arc::new(RwLock::new(Shared {
                state,
                active: None,
            })),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle for the input feed; may be moved to another thread.
    pub fn recorder(&self) -> InputRecorder {
        InputRecorder {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn active_stick(&self) -> Option<StickSide> {
        self.shared.read().active
    }

    /// Stores `mode` in the calibration file without touching the saved
    /// centre and range, nor any session in progress.
    fn persist_mode(&self, mode: StickCaliMode) -> Result<()> {
        let mut file = if self.path.exists() {
            read_calibration_file(&self.path)?
        } else {
            CalibrationFile::default()
        };
        file.left_stick_calibration.mode = mode;
        file.right_stick_calibration.mode = mode;
        write_calibration_file(&self.path, &file)
    }
}

impl CalibrationBackend for LocalBackend {
    fn start_session(&mut self, stick: StickSide) -> Result<()> {
        let mut shared = self.shared.write();
        if let Some(running) = shared.active {
            log::warn!("Calibration already running for the {} stick", running);
            return Err(CalibrationError::SessionInProgress(running));
        }

        let record = shared.state.stick_mut(stick);
        record.reset();
        record.step = CalibrationStep::CenterCheck;
        shared.active = Some(stick);
        log::info!("Started calibration of the {} stick", stick);
        Ok(())
    }

    fn advance(&mut self, stick: StickSide) -> Result<()> {
        let mut shared = self.shared.write();
        if shared.active != Some(stick) {
            return Ok(());
        }

        let record = shared.state.stick_mut(stick);
        record.step = match record.step {
            CalibrationStep::CenterCheck => CalibrationStep::RangeDetection,
            CalibrationStep::RangeDetection => CalibrationStep::Complete,
            other => other,
        };
        let step = record.step;
        log::info!("Calibration of the {} stick now at {}", stick, step);

        if step == CalibrationStep::Complete {
            shared.active = None;
        }
        Ok(())
    }

    fn cancel(&mut self, stick: StickSide) -> Result<()> {
        let mut shared = self.shared.write();
        shared.state.stick_mut(stick).reset();
        if shared.active == Some(stick) {
            shared.active = None;
        }
        log::info!("Cancelled calibration of the {} stick", stick);
        Ok(())
    }

    /// Writes both records; the in-memory state only changes once the file
    /// is on disk, so a failed write can be retried.
    fn save(&mut self) -> Result<()> {
        let mut saved = self.shared.read().state;
        saved.left_stick.step = CalibrationStep::Idle;
        saved.right_stick.step = CalibrationStep::Idle;
        write_calibration_file(
            &self.path,
            &CalibrationFile {
                left_stick_calibration: saved.left_stick,
                right_stick_calibration: saved.right_stick,
            },
        )?;

        let mut shared = self.shared.write();
        shared.state.left_stick.step = CalibrationStep::Idle;
        shared.state.right_stick.step = CalibrationStep::Idle;
        shared.active = None;
        log::info!("Saved calibration to {}", self.path.display());
        Ok(())
    }

    fn reset_to_default(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        let mode = {
            let mut shared = self.shared.write();
            let mode = shared.state.left_stick.mode;
            shared.state.left_stick.reset();
            shared.state.right_stick.reset();
            shared.active = None;
            mode
        };
        log::info!("Calibration reset to defaults");

        // Without a file the mode would fall back to the default on restart.
        if mode != StickCaliMode::default() {
            self.persist_mode(mode)?;
        }
        Ok(())
    }

    fn set_calibration_mode(&mut self, mode: StickCaliMode) -> Result<()> {
        self.persist_mode(mode)?;
        let mut shared = self.shared.write();
        shared.state.left_stick.mode = mode;
        shared.state.right_stick.mode = mode;
        log::info!("Calibration mode set to {}", mode);
        Ok(())
    }

    fn get_state(&mut self) -> Result<CalibrationState> {
        Ok(self.shared.read().state)
    }
}

/// Feeds live input into the running calibration session.
#[derive(Debug, Clone)]
pub struct InputRecorder {
    shared: Arc<RwLock<Shared>>,
}

impl InputRecorder {
    /// Records the centre during `CenterCheck` and widens the range during
    /// `RangeDetection`; any other step ignores the input.
    pub fn record(&self, snapshot: &ControllerSnapshot) {
        let mut shared = self.shared.write();
        let Some(side) = shared.active else {
            return;
        };
        let sample = snapshot.stick(side);
        let record = shared.state.stick_mut(side);
        match record.step {
            CalibrationStep::CenterCheck => record.stick_center = (sample.x, sample.y),
            CalibrationStep::RangeDetection => record.stick_range.widen(sample),
            _ => {}
        }
    }
}

fn read_calibration_file(path: &Path) -> Result<CalibrationFile> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn write_calibration_file(path: &Path, file: &CalibrationFile) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json_string = serde_json::to_string_pretty(file)?;
    fs::write(path, json_string)?;
    Ok(())
}
