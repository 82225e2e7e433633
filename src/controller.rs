//! Adaptive sampling controller
//!
//! After every analog smoothing pass the controller retunes two parameters
//! from the fresh a2d value: how many reads the next analog pass averages,
//! and how long the session must wait between persisted saves.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::tier::ThresholdTable;

/// Mutable controller parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Reads averaged per analog pass (>= 1)
    pub analog_sample_count: u32,
    /// Minimum seconds between persisted saves (>= 0)
    pub min_save_interval_secs: f64,
    /// When the last save was recorded
    pub last_saved_at: NaiveDateTime,
}

/// Retunes [`ControllerState`] from tier tables
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    samples_table: ThresholdTable<u32>,
    interval_table: ThresholdTable<f64>,
    state: ControllerState,
}

impl AdaptiveController {
    /// Create a controller with its initial parameters
    pub fn new(
        samples_table: ThresholdTable<u32>,
        interval_table: ThresholdTable<f64>,
        initial: ControllerState,
    ) -> Self {
        Self {
            samples_table,
            interval_table,
            state: initial,
        }
    }

    /// Adopt the tiers selected by `a2d`
    pub fn retune(&mut self, a2d: f64) {
        let samples = self.samples_table.resolve(a2d);
        let interval = self.interval_table.resolve(a2d);

        if samples != self.state.analog_sample_count
            || interval != self.state.min_save_interval_secs
        {
            log::debug!(
                "retune at a2d {}: samples {} -> {}, save interval {}s -> {}s",
                a2d,
                self.state.analog_sample_count,
                samples,
                self.state.min_save_interval_secs,
                interval
            );
        }

        self.state.analog_sample_count = samples;
        self.state.min_save_interval_secs = interval;
    }

    /// Record that a save happened at `at`
    pub fn mark_saved(&mut self, at: NaiveDateTime) {
        self.state.last_saved_at = at;
    }

    /// Seconds elapsed since the last save (negative if `now` is earlier)
    pub fn elapsed_secs(&self, now: NaiveDateTime) -> f64 {
        let elapsed = now - self.state.last_saved_at;
        match elapsed.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => elapsed.num_milliseconds() as f64 / 1_000.0,
        }
    }

    /// Current parameters
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn analog_sample_count(&self) -> u32 {
        self.state.analog_sample_count
    }

    pub fn min_save_interval_secs(&self) -> f64 {
        self.state.min_save_interval_secs
    }

    pub fn last_saved_at(&self) -> NaiveDateTime {
        self.state.last_saved_at
    }
}
