//! # Stick Calibration - Analog Stick Calibration Workbench
//!
//! GUI front end for calibrating a controller's analog sticks and checking
//! how circular their travel is.
//!
//! ## Architecture
//! - **Main Thread**: Iced application, owns the [`CalibrationController`]
//! - **Input Thread**: Produces controller snapshots and feeds the backend recorder
//! - **Communication**: Crossbeam channel from the input thread to the GUI
//! - **Timers**: Subscriptions follow the controller's poll, circularity and
//!   frame timers, so a stopped timer simply stops delivering messages

mod input;
mod ui;
mod widgets;

use anyhow::{Context, Result};
use iced::{Element, Subscription, Task, Theme, time, window};
use input::InputWorker;
use std::path::Path;
use std::time::Duration;
use stickcal_core::StickSide;
use stickcal_core::backend::LocalBackend;
use stickcal_core::config::CalibrationConfig;
use stickcal_core::controller::CalibrationController;
use stickcal_core::session::StickCaliMode;
use ui::main_display::create_main_view;

/// Optional configuration file in the working directory.
const CONFIG_PATH: &str = "stickcal.json";
/// Where the local backend keeps the saved calibration.
const CALIBRATION_PATH: &str = "calibrations/stick_calibration.json";
/// Rate of the input feed and of draining it on the GUI thread.
const INPUT_INTERVAL: Duration = Duration::from_millis(16);

/// Main entry point for the calibration workbench.
pub fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting stick calibration workbench");

    let app = CalibrationApp::new()?;
    iced::application("Stick Calibration", CalibrationApp::update, CalibrationApp::view)
        .subscription(CalibrationApp::subscription)
        .theme(CalibrationApp::theme)
        .run_with(move || (app, Task::none()))
        .context("GUI event loop failed")?;

    log::info!("Application finished");
    Ok(())
}

/// Application messages.
#[derive(Debug, Clone)]
pub enum Message {
    // Calibration surface
    OpenCalibration,
    CloseCalibration,

    // --- Calibration session ---
    StartCalibration(StickSide),
    Advance,
    Cancel,
    Save,
    ResetToDefault,

    SetCalibrationMode(StickCaliMode),
    ToggleCircularityTest(bool),

    // Timers
    InputTick,
    PollTick,
    CircularityTick,
    Frame,
}

struct CalibrationApp {
    controller: CalibrationController<LocalBackend>,
    input_worker: InputWorker,
}

impl CalibrationApp {
    fn new() -> Result<Self> {
        let config = load_config()?;
        let backend = LocalBackend::open(CALIBRATION_PATH);
        log::info!("Calibration file: {}", backend.path().display());
        let input_worker = InputWorker::spawn(backend.recorder(), INPUT_INTERVAL)?;

        let mut controller = CalibrationController::new(backend, config);
        controller.poll();

        Ok(Self {
            controller,
            input_worker,
        })
    }

    fn update(&mut self, message: Message) {
        log::trace!("Received message: {:?}", message);

        match message {
            Message::OpenCalibration => self.controller.open_surface(),
            Message::CloseCalibration => self.controller.close_surface(),
            Message::StartCalibration(stick) => self.controller.start(stick),
            Message::Advance => self.controller.advance(),
            Message::Cancel => self.controller.cancel(),
            Message::Save => self.controller.save(),
            Message::ResetToDefault => self.controller.reset_to_default(),
            Message::SetCalibrationMode(mode) => self.controller.set_calibration_mode(mode),
            Message::ToggleCircularityTest(enabled) => {
                self.controller.set_circularity_test(enabled)
            }
            Message::InputTick => {
                for snapshot in self.input_worker.drain() {
                    self.controller.on_input(snapshot);
                }
            }
            Message::PollTick => self.controller.on_poll_tick(),
            Message::CircularityTick => self.controller.on_circularity_tick(),
            Message::Frame => {
                self.controller.on_frame();
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.controller)
    }

    /// Timers the controller currently asks for.
    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![time::every(INPUT_INTERVAL).map(|_| Message::InputTick)];

        let poll = self.controller.poll_timer();
        if poll.is_running() {
            subscriptions.push(time::every(poll.period()).map(|_| Message::PollTick));
        }
        let circularity = self.controller.circularity_timer();
        if circularity.is_running() {
            subscriptions.push(time::every(circularity.period()).map(|_| Message::CircularityTick));
        }
        if self.controller.has_pending_frame() {
            subscriptions.push(window::frames().map(|_| Message::Frame));
        }

        Subscription::batch(subscriptions)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn load_config() -> Result<CalibrationConfig> {
    let path = Path::new(CONFIG_PATH);
    if !path.exists() {
        log::info!("No {} found, using default configuration", CONFIG_PATH);
        return Ok(CalibrationConfig::default());
    }
    let config = CalibrationConfig::load(path)
        .with_context(|| format!("failed to load configuration from {}", CONFIG_PATH))?;
    log::info!("Loaded configuration from {}", CONFIG_PATH);
    Ok(config)
}
