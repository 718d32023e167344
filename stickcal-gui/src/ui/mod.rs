//! # UI Module
//!
//! Layout and live readouts of the calibration workbench.

pub mod main_display;
pub mod stick_gauge;
