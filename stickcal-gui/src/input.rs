//! # Input Feed
//!
//! Background thread that produces controller snapshots for the GUI.
//! Without a device attached it plays a deterministic pattern: the sticks
//! rest near the center for a while, then sweep along the rim.
//!
//! Every snapshot is handed to the backend's [`InputRecorder`] before it is
//! sent to the GUI thread, so calibration sessions see the same input that
//! is drawn on screen.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::f32::consts::TAU;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use stickcal_core::backend::InputRecorder;
use stickcal_core::{ControllerSnapshot, StickSample};

/// Snapshots buffered between the worker and the GUI thread.
const SNAPSHOT_QUEUE: usize = 64;

/// Length of one rest + sweep cycle, in ticks.
const CYCLE_TICKS: u64 = 600;
const REST_TICKS: u64 = 150;
/// Ticks per full revolution while sweeping.
const REVOLUTION_TICKS: f32 = 150.0;

/// Handle to the running input thread.
#[derive(Debug)]
pub struct InputWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
    snapshots: Receiver<ControllerSnapshot>,
}

impl InputWorker {
    /// Spawns the feed, emitting one snapshot every `interval`.
    pub fn spawn(recorder: InputRecorder, interval: Duration) -> Result<Self> {
        let (snapshot_tx, snapshot_rx) = crossbeam_channel::bounded(SNAPSHOT_QUEUE);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let thread_handle = thread::Builder::new()
            .name("input-feed".into())
            .spawn(move || {
                log::info!("Input feed started ({} ms interval)", interval.as_millis());
                let mut tick: u64 = 0;
                loop {
                    crossbeam_channel::select! {
                        recv(shutdown_rx) -> _ => {
                            log::info!("Input feed received shutdown signal");
                            break;
                        },
                        default(interval) => {
                            let snapshot = simulated_snapshot(tick);
                            tick = tick.wrapping_add(1);
                            recorder.record(&snapshot);
                            match snapshot_tx.try_send(snapshot) {
                                Ok(()) | Err(TrySendError::Full(_)) => {}
                                Err(TrySendError::Disconnected(_)) => {
                                    log::warn!("GUI stopped receiving input, exiting feed");
                                    break;
                                }
                            }
                        },
                    }
                }
                log::info!("Input feed finished");
            })
            .context("failed to spawn the input feed thread")?;

        Ok(Self {
            shutdown_tx,
            thread_handle: Some(thread_handle),
            snapshots: snapshot_rx,
        })
    }

    /// Snapshots received since the last call.
    pub fn drain(&self) -> impl Iterator<Item = ControllerSnapshot> + '_ {
        self.snapshots.try_iter()
    }
}

impl Drop for InputWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Input feed thread panicked");
            }
        }
    }
}

/// Deterministic stand-in for a real controller.
///
/// Left stick traces a slightly four-lobed gate that pokes past the unit
/// circle; the right stick turns the other way just inside it.
pub fn simulated_snapshot(tick: u64) -> ControllerSnapshot {
    let phase = tick % CYCLE_TICKS;
    if phase < REST_TICKS {
        let drift = 0.01 * (phase as f32 * 0.2).sin();
        return ControllerSnapshot {
            left_stick: StickSample::new(drift, -drift),
            right_stick: StickSample::new(-drift, drift),
        };
    }

    let theta = (phase - REST_TICKS) as f32 / REVOLUTION_TICKS * TAU;
    let left_radius = 1.0 + 0.08 * (4.0 * theta).cos();
    let right_radius = 0.97;
    ControllerSnapshot {
        left_stick: StickSample::new(left_radius * theta.cos(), left_radius * theta.sin()),
        right_stick: StickSample::new(right_radius * theta.cos(), -right_radius * theta.sin()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_rests_then_sweeps() {
        let rest = simulated_snapshot(10);
        assert!(rest.left_stick.radius() < 0.05);

        let sweep = simulated_snapshot(REST_TICKS + 10);
        assert!(sweep.left_stick.radius() > 0.9);
        assert!((sweep.right_stick.radius() - 0.97).abs() < 1e-4);
        assert_eq!(simulated_snapshot(42), simulated_snapshot(42 + CYCLE_TICKS));
    }
}
