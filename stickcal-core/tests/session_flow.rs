// stickcal-core/tests/session_flow.rs

use std::fs;
use stickcal_core::backend::{CalibrationBackend, LocalBackend};
use stickcal_core::circularity::CircularityReport;
use stickcal_core::config::CalibrationConfig;
use stickcal_core::controller::CalibrationController;
use stickcal_core::session::{CalibrationState, CalibrationStep, StickCaliMode};
use stickcal_core::state_machine::IDLE_HINT;
use stickcal_core::{CalibrationError, ControllerSnapshot, Result, StickSample, StickSide};
use tempfile::TempDir;

/// Backend double that walks the steps itself and fails on request.
#[derive(Default)]
struct ScriptedBackend {
    state: CalibrationState,
    starts: Vec<StickSide>,
    saves: usize,
    polls: usize,
    fail_start: bool,
    fail_advance: bool,
    fail_cancel: bool,
    fail_save: bool,
    fail_reset: bool,
    fail_poll: bool,
}

impl CalibrationBackend for ScriptedBackend {
    fn start_session(&mut self, stick: StickSide) -> Result<()> {
        if self.fail_start {
            return Err(CalibrationError::Backend("device unplugged".into()));
        }
        self.starts.push(stick);
        self.state.stick_mut(stick).step = CalibrationStep::CenterCheck;
        Ok(())
    }

    fn advance(&mut self, stick: StickSide) -> Result<()> {
        if self.fail_advance {
            return Err(CalibrationError::Backend("step rejected".into()));
        }
        let record = self.state.stick_mut(stick);
        record.step = match record.step {
            CalibrationStep::CenterCheck => CalibrationStep::RangeDetection,
            CalibrationStep::RangeDetection => CalibrationStep::Complete,
            other => other,
        };
        Ok(())
    }

    fn cancel(&mut self, stick: StickSide) -> Result<()> {
        if self.fail_cancel {
            return Err(CalibrationError::Backend("cancel rejected".into()));
        }
        self.state.stick_mut(stick).reset();
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        if self.fail_save {
            return Err(CalibrationError::Backend("disk full".into()));
        }
        self.saves += 1;
        self.state.left_stick.step = CalibrationStep::Idle;
        self.state.right_stick.step = CalibrationStep::Idle;
        Ok(())
    }

    fn reset_to_default(&mut self) -> Result<()> {
        if self.fail_reset {
            return Err(CalibrationError::Backend("read-only storage".into()));
        }
        self.state = CalibrationState::default();
        Ok(())
    }

    fn set_calibration_mode(&mut self, mode: StickCaliMode) -> Result<()> {
        self.state.left_stick.mode = mode;
        self.state.right_stick.mode = mode;
        Ok(())
    }

    fn get_state(&mut self) -> Result<CalibrationState> {
        self.polls += 1;
        if self.fail_poll {
            return Err(CalibrationError::Backend("timeout".into()));
        }
        Ok(self.state)
    }
}

fn controller() -> CalibrationController<ScriptedBackend> {
    CalibrationController::new(ScriptedBackend::default(), CalibrationConfig::default())
}

fn both(sample: StickSample) -> ControllerSnapshot {
    ControllerSnapshot {
        left_stick: sample,
        right_stick: sample,
    }
}

#[test]
fn test_cancel_returns_to_idle_and_stops_polling() {
    let mut ctl = controller();

    ctl.start(StickSide::Left);
    assert!(ctl.poll_timer().is_running());
    assert_eq!(ctl.step(), CalibrationStep::CenterCheck);

    ctl.advance();
    assert_eq!(ctl.step(), CalibrationStep::RangeDetection);

    ctl.cancel();
    assert_eq!(ctl.step(), CalibrationStep::Idle);
    assert_eq!(ctl.hint(), IDLE_HINT);
    assert_eq!(ctl.active_stick(), None);
    assert!(!ctl.poll_timer().is_running());

    // A late tick and a backend that moved on must not touch the proxy.
    ctl.backend_mut().state.left_stick.step = CalibrationStep::RangeDetection;
    ctl.on_poll_tick();
    ctl.poll();
    assert_eq!(ctl.step(), CalibrationStep::Idle);
}

#[test]
fn test_second_start_is_ignored() {
    let mut ctl = controller();
    ctl.start(StickSide::Left);
    ctl.start(StickSide::Left);
    ctl.start(StickSide::Right);

    assert_eq!(ctl.backend().starts, vec![StickSide::Left]);
    assert_eq!(ctl.active_stick(), Some(StickSide::Left));
}

#[test]
fn test_save_requires_complete() {
    let mut ctl = controller();
    ctl.save();
    assert_eq!(ctl.backend().saves, 0);

    ctl.start(StickSide::Right);
    ctl.save();
    ctl.advance();
    ctl.save();
    assert_eq!(ctl.backend().saves, 0);

    ctl.advance();
    assert_eq!(ctl.step(), CalibrationStep::Complete);
    ctl.save();
    assert_eq!(ctl.backend().saves, 1);
    assert_eq!(ctl.step(), CalibrationStep::Idle);
    assert!(!ctl.poll_timer().is_running());

    let status = ctl.status().unwrap();
    assert_eq!(status.text, "Calibration data saved.");
    assert!(!status.is_error);
}

#[test]
fn test_failed_save_keeps_session() {
    let mut ctl = controller();
    ctl.backend_mut().fail_save = true;
    ctl.start(StickSide::Left);
    ctl.advance();
    ctl.advance();
    ctl.save();

    assert_eq!(ctl.step(), CalibrationStep::Complete);
    assert_eq!(ctl.active_stick(), Some(StickSide::Left));
    let status = ctl.status().unwrap();
    assert!(status.is_error);
    assert!(status.text.starts_with("Save failed: "));

    ctl.backend_mut().fail_save = false;
    ctl.save();
    assert_eq!(ctl.backend().saves, 1);
}

#[test]
fn test_failed_advance_reports_without_polling() {
    let mut ctl = controller();
    ctl.start(StickSide::Left);
    let polls = ctl.backend().polls;

    ctl.backend_mut().fail_advance = true;
    ctl.advance();

    assert_eq!(ctl.backend().polls, polls);
    assert_eq!(ctl.step(), CalibrationStep::CenterCheck);
    assert_eq!(ctl.active_stick(), Some(StickSide::Left));
    let status = ctl.status().unwrap();
    assert!(status.is_error);
    assert!(status.text.starts_with("Failed to advance calibration: "));
}

#[test]
fn test_failed_reset_keeps_state() {
    let mut ctl = controller();
    ctl.start(StickSide::Right);
    ctl.advance();
    ctl.backend_mut().fail_reset = true;
    ctl.reset_to_default();

    assert_eq!(ctl.step(), CalibrationStep::RangeDetection);
    assert_eq!(ctl.active_stick(), Some(StickSide::Right));
    assert_eq!(ctl.backend().state.right_stick.step, CalibrationStep::RangeDetection);
    let status = ctl.status().unwrap();
    assert!(status.is_error);
    assert!(status.text.starts_with("Restore defaults failed: "));
}

#[test]
fn test_calibration_mode_round_trip() {
    let mut ctl = controller();
    ctl.open_surface();
    assert_eq!(ctl.calibration_mode(), StickCaliMode::Square);

    ctl.set_calibration_mode(StickCaliMode::Circle);
    assert_eq!(ctl.calibration_mode(), StickCaliMode::Circle);
    assert_eq!(ctl.backend().state.right_stick.mode, StickCaliMode::Circle);
}

#[test]
fn test_failed_start_reverts_to_idle() {
    let mut ctl = controller();
    ctl.backend_mut().fail_start = true;
    ctl.start(StickSide::Right);

    assert_eq!(ctl.active_stick(), None);
    assert_eq!(ctl.step(), CalibrationStep::Idle);
    assert!(!ctl.poll_timer().is_running());
    assert!(ctl.status().unwrap().is_error);

    ctl.backend_mut().fail_start = false;
    ctl.start(StickSide::Right);
    assert_eq!(ctl.active_stick(), Some(StickSide::Right));
}

#[test]
fn test_poll_failure_keeps_polling() {
    let mut ctl = controller();
    ctl.start(StickSide::Left);
    ctl.backend_mut().fail_poll = true;
    ctl.on_poll_tick();

    assert!(ctl.poll_timer().is_running());
    assert_eq!(ctl.step(), CalibrationStep::CenterCheck);
    assert!(ctl.status().unwrap().is_error);
}

#[test]
fn test_failed_cancel_keeps_state() {
    let mut ctl = controller();
    ctl.backend_mut().fail_cancel = true;
    ctl.start(StickSide::Left);
    ctl.cancel();

    assert_eq!(ctl.active_stick(), Some(StickSide::Left));
    assert_eq!(ctl.step(), CalibrationStep::CenterCheck);
    assert!(ctl.poll_timer().is_running());
}

#[test]
fn test_close_surface_tears_down_even_if_cancel_fails() {
    let mut ctl = controller();
    ctl.open_surface();
    ctl.set_circularity_test(true);
    ctl.backend_mut().fail_cancel = true;
    ctl.start(StickSide::Right);
    ctl.close_surface();

    assert_eq!(ctl.active_stick(), None);
    assert!(!ctl.poll_timer().is_running());
    assert!(!ctl.circularity_test_enabled());
    assert!(!ctl.has_pending_frame());
    assert!(!ctl.is_surface_open());
}

#[test]
fn test_reset_to_default_keeps_active_stick() {
    let mut ctl = controller();
    ctl.start(StickSide::Left);
    ctl.advance();
    ctl.reset_to_default();

    assert_eq!(ctl.active_stick(), Some(StickSide::Left));
    assert_eq!(ctl.step(), CalibrationStep::Idle);
    assert_eq!(ctl.status().unwrap().text, "Calibration restored to defaults.");
}

#[test]
fn test_circularity_toggle_releases_frames_and_buffers() {
    let mut ctl = controller();
    ctl.open_surface();
    ctl.set_circularity_test(true);
    assert!(ctl.has_pending_frame());
    assert!(ctl.circularity_timer().is_running());

    ctl.on_input(both(StickSample::new(1.0, 0.0)));
    assert!(ctl.on_frame());
    ctl.on_input(both(StickSample::new(0.0, 1.0)));
    assert!(ctl.on_frame());

    ctl.set_circularity_test(false);
    assert!(!ctl.has_pending_frame());
    assert!(!ctl.circularity_timer().is_running());
    for side in StickSide::BOTH {
        assert!(ctl.analysis(side).render.buffers().is_none());
    }
    assert!(!ctl.on_frame());
}

#[test]
fn test_circularity_test_needs_open_surface() {
    let mut ctl = controller();
    ctl.set_circularity_test(true);
    assert!(!ctl.circularity_test_enabled());
    assert!(!ctl.has_pending_frame());
}

#[test]
fn test_perfect_circle_scores_zero() {
    let mut ctl = controller();
    ctl.open_surface();
    ctl.set_circularity_test(true);

    for i in 0..120 {
        let angle = (i as f32 * 3.0).to_radians();
        ctl.on_input(ControllerSnapshot {
            left_stick: StickSample::new(angle.cos(), angle.sin()),
            right_stick: StickSample::new(1.1 * angle.cos(), 1.1 * angle.sin()),
        });
    }
    ctl.on_circularity_tick();

    assert_eq!(
        ctl.circularity_report(StickSide::Left),
        CircularityReport::Error { percent: 0.0 }
    );
    match ctl.circularity_report(StickSide::Right) {
        CircularityReport::Error { percent } => assert!((percent - 10.0).abs() < 0.011),
        other => panic!("unexpected report {other:?}"),
    }

    // Disabling freezes the last value.
    ctl.set_circularity_test(false);
    assert_eq!(
        ctl.circularity_report(StickSide::Left),
        CircularityReport::Error { percent: 0.0 }
    );
}

#[test]
fn test_input_ignored_while_surface_closed() {
    let mut ctl = controller();
    ctl.on_input(both(StickSample::new(1.0, 0.0)));
    ctl.on_circularity_tick();
    assert_eq!(ctl.circularity_report(StickSide::Left), CircularityReport::Pending);
    assert!(ctl.analysis(StickSide::Left).circularity.buckets.is_empty());
}

#[test]
fn test_local_backend_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stick_calibration.json");
    let backend = LocalBackend::open(&path);
    let recorder = backend.recorder();
    let mut ctl = CalibrationController::new(backend, CalibrationConfig::default());

    ctl.open_surface();
    ctl.start(StickSide::Left);
    recorder.record(&both(StickSample::new(0.01, -0.02)));
    ctl.advance();
    recorder.record(&both(StickSample::new(0.97, 0.0)));
    recorder.record(&both(StickSample::new(-0.96, 0.0)));
    ctl.advance();
    assert_eq!(ctl.step(), CalibrationStep::Complete);
    assert_eq!(ctl.session().stick_center, (0.01, -0.02));
    assert_eq!(ctl.session().stick_range.x_max, 0.97);

    ctl.save();
    assert!(path.exists());
    assert_eq!(ctl.step(), CalibrationStep::Idle);

    ctl.reset_to_default();
    assert!(!path.exists());
    assert_eq!(*ctl.backend_state(), CalibrationState::default());
}

#[test]
fn test_local_backend_save_can_be_retried() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("calibrations");
    fs::write(&blocker, "occupied").unwrap();
    let path = blocker.join("stick_calibration.json");
    let mut ctl = CalibrationController::new(LocalBackend::open(&path), CalibrationConfig::default());

    ctl.start(StickSide::Left);
    ctl.advance();
    ctl.advance();
    ctl.save();
    assert!(ctl.status().unwrap().text.starts_with("Save failed: "));

    // The next poll still sees a completed session.
    ctl.on_poll_tick();
    assert_eq!(ctl.step(), CalibrationStep::Complete);
    assert_eq!(ctl.backend_state().left_stick.step, CalibrationStep::Complete);

    fs::remove_file(&blocker).unwrap();
    ctl.save();
    assert!(path.exists());
    assert_eq!(ctl.step(), CalibrationStep::Idle);
    assert_eq!(ctl.status().unwrap().text, "Calibration data saved.");
}

#[test]
fn test_local_backend_mode_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stick_calibration.json");
    let mut ctl = CalibrationController::new(LocalBackend::open(&path), CalibrationConfig::default());
    ctl.open_surface();
    ctl.set_calibration_mode(StickCaliMode::Circle);

    let mut reopened =
        CalibrationController::new(LocalBackend::open(&path), CalibrationConfig::default());
    reopened.open_surface();
    assert_eq!(reopened.calibration_mode(), StickCaliMode::Circle);
}
