//! # Main Display Module
//!
//! This module contains the main display components and layout logic
//! for the stick calibration workbench.

use iced::widget::{
    button, checkbox, column, container, horizontal_space, progress_bar, radio, row, text, Space,
};
use iced::{Alignment, Background, Border, Color, Element, Length, Theme};
use stickcal_core::backend::CalibrationBackend;
use stickcal_core::controller::{CalibrationController, StatusMessage, StickAnalysis};
use stickcal_core::session::{CalibrationStep, StickCaliMode};
use stickcal_core::state_machine::StepProxy;
use stickcal_core::{StickSample, StickSide};

use super::stick_gauge::StickGauge;
use crate::widgets::trajectory_view::TrajectoryView;
use crate::Message;

/// A session button and the message it sends.
#[derive(Debug, Clone)]
struct ButtonConfig {
    label: &'static str,
    message: Message,
}

const SESSION_BUTTONS: &[ButtonConfig] = &[
    ButtonConfig { label: "Calibrate left", message: Message::StartCalibration(StickSide::Left) },
    ButtonConfig { label: "Calibrate right", message: Message::StartCalibration(StickSide::Right) },
    ButtonConfig { label: "Cancel", message: Message::Cancel },
    ButtonConfig { label: "Save", message: Message::Save },
    ButtonConfig { label: "Restore defaults", message: Message::ResetToDefault },
];

/// Creates the complete main application view
pub fn create_main_view<B: CalibrationBackend>(
    controller: &CalibrationController<B>,
) -> Element<'static, Message> {
    let title = text("Stick Calibration").size(28);

    let input = controller.latest_input();
    let mode = controller.calibration_mode();
    let live_row = row![
        create_stick_panel(StickSide::Left, input.left_stick, mode),
        Space::with_width(10),
        create_stick_panel(StickSide::Right, input.right_stick, mode),
    ]
    .align_y(Alignment::Start);

    let body: Element<'static, Message> = if controller.is_surface_open() {
        create_calibration_panel(controller)
    } else {
        button(text("Calibrate sticks").size(16))
            .padding([8, 16])
            .on_press(Message::OpenCalibration)
            .into()
    };

    let mut content = column![title, Space::with_height(20), live_row, Space::with_height(10), body]
        .width(Length::Fill)
        .spacing(10);
    if let Some(status) = controller.status() {
        content = content.push(create_status_line(status));
    }

    container(content.padding(20))
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn side_title(side: StickSide) -> &'static str {
    match side {
        StickSide::Left => "Left stick",
        StickSide::Right => "Right stick",
    }
}

/// Live gauge, per-axis deflection bars and value readouts of one stick.
fn create_stick_panel(
    side: StickSide,
    sample: StickSample,
    mode: StickCaliMode,
) -> Element<'static, Message> {
    let axis = |label: &str, value: f32| {
        row![
            text(format!("{}: {:.3}", label, value)).size(14).width(Length::Fixed(70.0)),
            axis_bar(value),
        ]
        .spacing(8)
        .align_y(Alignment::Center)
    };

    container(
        column![
            text(side_title(side)).size(18),
            Space::with_height(10),
            StickGauge::new(sample, mode).view(),
            axis("X", sample.x),
            axis("Y", sample.y),
        ]
        .spacing(5)
        .padding(15),
    )
    .into()
}

/// Deflection magnitude of one axis: blue when positive, red when negative.
fn axis_bar(value: f32) -> Element<'static, Message> {
    let color = if value >= 0.0 {
        Color::from_rgb8(0x4C, 0x8B, 0xF5)
    } else {
        Color::from_rgb8(0xE5, 0x4B, 0x4B)
    };

    progress_bar(0.0..=1.0, value.abs().min(1.0))
        .width(Length::Fixed(120.0))
        .height(Length::Fixed(8.0))
        .style(move |theme: &Theme| progress_bar::Style {
            background: Background::Color(theme.extended_palette().background.strong.color),
            bar: Background::Color(color),
            border: Border::default(),
        })
        .into()
}

/// Session controls, the circularity test toggle and both trajectory views.
fn create_calibration_panel<B: CalibrationBackend>(
    controller: &CalibrationController<B>,
) -> Element<'static, Message> {
    let header = row![
        text("Calibration").size(18),
        horizontal_space(),
        button(text("Close").size(14))
            .padding([6, 10])
            .on_press(Message::CloseCalibration),
    ]
    .align_y(Alignment::Center);

    let buttons = SESSION_BUTTONS.iter().fold(
        row![make_advance_button(controller.proxy())].spacing(8),
        |row, config| row.push(make_button(config, controller)),
    );

    let mode = Some(controller.calibration_mode());
    let mode_choice = row![
        text("Gate").size(14),
        radio("Square", StickCaliMode::Square, mode, Message::SetCalibrationMode).size(14),
        radio("Circle", StickCaliMode::Circle, mode, Message::SetCalibrationMode).size(14),
    ]
    .spacing(12)
    .align_y(Alignment::Center);

    let test_toggle = checkbox("Circularity test", controller.circularity_test_enabled())
        .on_toggle(Message::ToggleCircularityTest);

    let size = controller.config().surface_size;
    let detection_radius = controller.config().circularity.min_detection_radius;
    let trajectories = row![
        create_trajectory_panel(StickSide::Left, controller.analysis(StickSide::Left), size, detection_radius),
        Space::with_width(10),
        create_trajectory_panel(StickSide::Right, controller.analysis(StickSide::Right), size, detection_radius),
    ]
    .align_y(Alignment::Start);

    container(
        column![
            header,
            text(controller.hint()).size(14),
            buttons,
            mode_choice,
            Space::with_height(10),
            test_toggle,
            trajectories,
        ]
        .spacing(10)
        .padding(15),
    )
    .width(Length::Fill)
    .into()
}

fn create_trajectory_panel(
    side: StickSide,
    analysis: &StickAnalysis,
    size: u32,
    detection_radius: f32,
) -> Element<'static, Message> {
    column![
        text(side_title(side)).size(14),
        TrajectoryView::new(&analysis.render, size, detection_radius).view(),
        text(analysis.circularity.report.to_string()).size(14),
    ]
    .spacing(5)
    .into()
}

/// "Next" while checking the center, "Finish" once the range is being traced.
fn make_advance_button(proxy: &StepProxy) -> Element<'static, Message> {
    let label = match proxy.step() {
        CalibrationStep::RangeDetection => "Finish",
        _ => "Next",
    };
    button(text(label).size(14))
        .padding([6, 10])
        .on_press_maybe(proxy.allows_advance().then_some(Message::Advance))
        .into()
}

/// Creates a session button, enabled only where the controller would act.
fn make_button<B: CalibrationBackend>(
    config: &ButtonConfig,
    controller: &CalibrationController<B>,
) -> Element<'static, Message> {
    let enabled = match config.message {
        Message::StartCalibration(_) => controller.active_stick().is_none(),
        Message::Cancel => controller.active_stick().is_some(),
        Message::Save => controller.proxy().allows_save(),
        _ => true,
    };

    button(text(config.label).size(14))
        .padding([6, 10])
        .on_press_maybe(enabled.then(|| config.message.clone()))
        .into()
}

fn create_status_line(status: &StatusMessage) -> Element<'static, Message> {
    let color = if status.is_error {
        Color::from_rgb(0.9, 0.3, 0.3)
    } else {
        Color::from_rgb(0.3, 0.8, 0.4)
    };
    text(status.text.clone()).size(14).color(color).into()
}
