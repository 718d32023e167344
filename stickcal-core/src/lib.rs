// stickcal-core/src/lib.rs

//! The core logic for the analog-stick calibration workbench.
//! This crate is responsible for mirroring the calibration service,
//! measuring stick circularity and rasterizing stick trajectories.
//! It is completely headless and contains no GUI code.

pub mod backend;
pub mod circularity;
pub mod config;
pub mod controller;
pub mod error;
pub mod session;
pub mod state_machine;
pub mod trajectory;

pub use error::{CalibrationError, Result};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Instantaneous normalized position of one analog stick.
///
/// Both components are expected in [-1, 1]; a worn or badly calibrated
/// stick may report slightly more along the diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StickSample {
    pub x: f32,
    pub y: f32,
}

impl StickSample {
    pub const CENTER: StickSample = StickSample { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn radius_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn radius(&self) -> f32 {
        self.radius_squared().sqrt()
    }
}

/// Full controller state as pushed by the input feed.
/// The calibration workbench only ever reads the two stick vectors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub left_stick: StickSample,
    pub right_stick: StickSample,
}

impl ControllerSnapshot {
    pub fn stick(&self, side: StickSide) -> StickSample {
        match side {
            StickSide::Left => self.left_stick,
            StickSide::Right => self.right_stick,
        }
    }
}

/// Which analog stick an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickSide {
    Left,
    Right,
}

impl StickSide {
    pub const BOTH: [StickSide; 2] = [StickSide::Left, StickSide::Right];
}

impl fmt::Display for StickSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StickSide::Left => write!(f, "left"),
            StickSide::Right => write!(f, "right"),
        }
    }
}

/// One value per stick side, indexable by [`StickSide`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StickPair<T> {
    pub left: T,
    pub right: T,
}

impl<T> StickPair<T> {
    /// Builds both sides from the same constructor.
    pub fn from_fn(mut f: impl FnMut(StickSide) -> T) -> Self {
        Self {
            left: f(StickSide::Left),
            right: f(StickSide::Right),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (StickSide, &T)> {
        [(StickSide::Left, &self.left), (StickSide::Right, &self.right)].into_iter()
    }
}

impl<T> Index<StickSide> for StickPair<T> {
    type Output = T;

    fn index(&self, side: StickSide) -> &T {
        match side {
            StickSide::Left => &self.left,
            StickSide::Right => &self.right,
        }
    }
}

impl<T> IndexMut<StickSide> for StickPair<T> {
    fn index_mut(&mut self, side: StickSide) -> &mut T {
        match side {
            StickSide::Left => &mut self.left,
            StickSide::Right => &mut self.right,
        }
    }
}
