//! # Calibration Session Controller
//!
//! Single entry point of the calibration workbench. The controller
//! - lets at most one stick be calibrated at a time,
//! - mirrors the backend state while a session runs (polling timer),
//! - owns the per-stick circularity and trajectory state and feeds both
//!   from the live input stream,
//! - turns every backend failure into status text.
//!
//! It is a plain `&mut self` state machine: the host drives it with timer,
//! frame and input messages and reads the timers back to decide which of
//! those messages to deliver.

use crate::backend::CalibrationBackend;
use crate::circularity::{CircularityReport, CircularitySampler, CircularityState};
use crate::config::CalibrationConfig;
use crate::error::CalibrationError;
use crate::session::{CalibrationSession, CalibrationState, CalibrationStep, StickCaliMode};
use crate::state_machine::StepProxy;
use crate::trajectory::{RenderState, TrajectoryRenderer};
use crate::{ControllerSnapshot, StickPair, StickSide};
use std::time::Duration;

/// Line shown in the status bar after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// A fixed-period timer the host runs while `is_running()` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    period: Duration,
    running: bool,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Analysis and render state of one stick.
#[derive(Debug, Clone, PartialEq)]
pub struct StickAnalysis {
    pub circularity: CircularityState,
    pub render: RenderState,
}

pub struct CalibrationController<B: CalibrationBackend> {
    backend: B,
    config: CalibrationConfig,
    sampler: CircularitySampler,
    renderer: TrajectoryRenderer,

    // --- Calibration session ---
    session: CalibrationSession,
    proxy: StepProxy,
    backend_state: CalibrationState,
    poll_timer: Ticker,

    // --- Circularity test ---
    circularity_test: bool,
    circularity_timer: Ticker,
    sticks: StickPair<StickAnalysis>,

    surface_open: bool,
    latest_input: ControllerSnapshot,
    status: Option<StatusMessage>,
}

impl<B: CalibrationBackend> CalibrationController<B> {
    pub fn new(backend: B, config: CalibrationConfig) -> Self {
        let sampler = CircularitySampler::new(config.circularity.clone());
        let renderer = TrajectoryRenderer::new(&config.circularity);
        let sticks = StickPair::from_fn(|_| StickAnalysis {
            circularity: sampler.new_state(),
            render: RenderState::default(),
        });

        Self {
            backend,
            poll_timer: Ticker::new(config.poll_interval()),
            circularity_timer: Ticker::new(config.circularity_refresh()),
            config,
            sampler,
            renderer,
            session: CalibrationSession::default(),
            proxy: StepProxy::default(),
            backend_state: CalibrationState::default(),
            circularity_test: false,
            sticks,
            surface_open: false,
            latest_input: ControllerSnapshot::default(),
            status: None,
        }
    }

    // --- Accessors ---

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn session(&self) -> &CalibrationSession {
        &self.session
    }

    pub fn active_stick(&self) -> Option<StickSide> {
        self.session.stick
    }

    pub fn step(&self) -> CalibrationStep {
        self.proxy.step()
    }

    pub fn proxy(&self) -> &StepProxy {
        &self.proxy
    }

    pub fn hint(&self) -> &'static str {
        self.proxy.hint()
    }

    /// Last full snapshot read from the backend.
    pub fn backend_state(&self) -> &CalibrationState {
        &self.backend_state
    }

    /// Gate mode as last read from the backend (both sticks share it).
    pub fn calibration_mode(&self) -> StickCaliMode {
        self.backend_state.left_stick.mode
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn poll_timer(&self) -> Ticker {
        self.poll_timer
    }

    pub fn circularity_timer(&self) -> Ticker {
        self.circularity_timer
    }

    pub fn is_surface_open(&self) -> bool {
        self.surface_open
    }

    pub fn circularity_test_enabled(&self) -> bool {
        self.circularity_test
    }

    pub fn circularity_report(&self, side: StickSide) -> CircularityReport {
        self.sticks[side].circularity.report
    }

    pub fn analysis(&self, side: StickSide) -> &StickAnalysis {
        &self.sticks[side]
    }

    pub fn latest_input(&self) -> ControllerSnapshot {
        self.latest_input
    }

    /// True while either stick has a frame waiting to be drawn.
    pub fn has_pending_frame(&self) -> bool {
        self.sticks
            .iter()
            .any(|(_, analysis)| analysis.render.pending_frame().is_some())
    }

    // --- Calibration session ---

    /// Starts calibrating `stick` unless a session is already running.
    pub fn start(&mut self, stick: StickSide) {
        if let Some(active) = self.session.stick {
            log::debug!("Ignoring start for the {} stick: {} stick is calibrating", stick, active);
            return;
        }

        self.session.stick = Some(stick);
        if let Err(e) = self.backend.start_session(stick) {
            self.session.reset();
            self.proxy.reset();
            self.report_error("Failed to start calibration", &e);
            return;
        }

        log::info!("Calibration session started for the {} stick", stick);
        self.report_ok(format!("Calibrating the {} stick.", stick));
        self.poll_timer.start();
        self.poll();
    }

    /// Asks the backend for the next step of the running session.
    pub fn advance(&mut self) {
        let Some(stick) = self.session.stick else {
            log::debug!("Ignoring advance: no calibration session");
            return;
        };

        if let Err(e) = self.backend.advance(stick) {
            self.report_error("Failed to advance calibration", &e);
            return;
        }
        self.poll();
    }

    /// Cancels the running session. On backend failure nothing changes.
    pub fn cancel(&mut self) {
        self.cancel_session(false);
    }

    /// Persists a completed calibration.
    ///
    /// Only valid once the observed step is `Complete`; a failed save keeps
    /// the session so the user can retry.
    pub fn save(&mut self) {
        if !self.proxy.allows_save() {
            log::debug!("Ignoring save at step {}", self.proxy.step());
            return;
        }

        match self.backend.save() {
            Ok(()) => {
                log::info!("Calibration saved");
                self.report_ok("Calibration data saved.");
                self.end_session();
            }
            Err(e) => self.report_error("Save failed", &e),
        }
    }

    /// Restores the backend defaults and refreshes the local snapshot.
    /// Which stick is mid-calibration is left untouched.
    pub fn reset_to_default(&mut self) {
        match self.backend.reset_to_default() {
            Ok(()) => {
                log::info!("Calibration restored to defaults");
                self.report_ok("Calibration restored to defaults.");
                self.poll();
            }
            Err(e) => self.report_error("Restore defaults failed", &e),
        }
    }

    /// Switches both sticks between circle and square gates.
    pub fn set_calibration_mode(&mut self, mode: StickCaliMode) {
        match self.backend.set_calibration_mode(mode) {
            Ok(()) => {
                log::info!("Calibration mode set to {}", mode);
                self.poll();
            }
            Err(e) => self.report_error("Failed to set calibration mode", &e),
        }
    }

    /// Reads the backend state and mirrors the active stick.
    pub fn poll(&mut self) {
        match self.backend.get_state() {
            Ok(state) => {
                self.backend_state = state;
                if self.session.is_active() {
                    self.session.mirror(&state);
                    self.proxy.observe(self.session.step);
                }
            }
            Err(e) => self.report_error("Failed to read calibration state", &e),
        }
    }

    /// Poll-timer tick; late ticks after the timer stopped are dropped.
    pub fn on_poll_tick(&mut self) {
        if self.poll_timer.is_running() {
            self.poll();
        }
    }

    fn cancel_session(&mut self, force_local: bool) {
        let Some(stick) = self.session.stick else {
            log::debug!("Ignoring cancel: no calibration session");
            return;
        };

        match self.backend.cancel(stick) {
            Ok(()) => {
                log::info!("Calibration of the {} stick cancelled", stick);
                self.report_ok("Calibration cancelled.");
            }
            Err(e) => {
                self.report_error("Failed to cancel calibration", &e);
                if !force_local {
                    return;
                }
            }
        }
        self.end_session();
    }

    fn end_session(&mut self) {
        self.session.reset();
        self.proxy.reset();
        self.poll_timer.stop();
    }

    // --- Calibration surface ---

    /// Shows the calibration surface with a fresh backend snapshot; any
    /// leftover circularity test is off.
    pub fn open_surface(&mut self) {
        self.surface_open = true;
        self.set_circularity_test(false);
        self.poll();
    }

    /// Hides the calibration surface, cancelling an active session and the
    /// circularity test. Local teardown happens even if the backend fails.
    pub fn close_surface(&mut self) {
        self.cancel_session(true);
        self.set_circularity_test(false);
        self.surface_open = false;
    }

    // --- Circularity test ---

    pub fn set_circularity_test(&mut self, enabled: bool) {
        if enabled == self.circularity_test {
            return;
        }
        if enabled && !self.surface_open {
            log::debug!("Ignoring circularity test: calibration surface is closed");
            return;
        }

        let size = self.config.surface_size;
        for side in StickSide::BOTH {
            let analysis = &mut self.sticks[side];
            if enabled {
                self.sampler.enable(&mut analysis.circularity);
                self.renderer.setup(&mut analysis.render, size, size);
            } else {
                self.renderer.teardown(&mut analysis.render);
                self.sampler.disable(&mut analysis.circularity);
            }
        }

        self.circularity_test = enabled;
        if enabled {
            self.circularity_timer.start();
            log::info!("Circularity test enabled");
        } else {
            self.circularity_timer.stop();
            log::info!("Circularity test disabled");
        }
    }

    /// Circularity-timer tick: recomputes both error reports.
    pub fn on_circularity_tick(&mut self) {
        if !self.circularity_timer.is_running() {
            return;
        }
        for side in StickSide::BOTH {
            self.sampler.refresh(&mut self.sticks[side].circularity);
        }
    }

    // --- Live input ---

    /// Takes one controller snapshot from the input feed.
    pub fn on_input(&mut self, snapshot: ControllerSnapshot) {
        self.latest_input = snapshot;
        if !self.surface_open || !self.circularity_test {
            return;
        }
        for side in StickSide::BOTH {
            self.sampler
                .record(&mut self.sticks[side].circularity, snapshot.stick(side));
        }
    }

    /// Animation-frame tick: draws every pending frame with the latest input.
    /// Returns true while a next frame is scheduled.
    pub fn on_frame(&mut self) -> bool {
        let mut scheduled = false;
        for side in StickSide::BOTH {
            let sample = self.latest_input.stick(side);
            scheduled |= self
                .renderer
                .draw_frame(&mut self.sticks[side].render, sample);
        }
        scheduled
    }

    // --- Status ---

    fn report_ok(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    fn report_error(&mut self, context: &str, error: &CalibrationError) {
        log::warn!("{}: {}", context, error);
        self.status = Some(StatusMessage {
            text: format!("{}: {}", context, error),
            is_error: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_lifecycle() {
        let mut ticker = Ticker::new(Duration::from_millis(100));
        assert!(!ticker.is_running());
        ticker.start();
        assert!(ticker.is_running());
        ticker.stop();
        assert!(!ticker.is_running());
        assert_eq!(ticker.period(), Duration::from_millis(100));
    }
}
