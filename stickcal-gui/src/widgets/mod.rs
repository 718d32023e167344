//! # Widgets Module
//!
//! Custom widgets backed by core render state.

pub mod trajectory_view;
