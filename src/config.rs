//! Session configuration.
//!
//! [`SessionConfig`] is the immutable description of a sampling session:
//! which pins to watch, how to smooth them and when to save. It is read
//! from JSON and validated before a session is built.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::snapshot::SignalSnapshot;
use crate::tier::{ThresholdTable, Tier};

/// Default a2d resolution of a 10-bit converter
pub const DEFAULT_SCALE: f64 = 1023.0;

/// Configuration of a sampling session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Source identifier written into every record (e.g. the board name).
    pub source: String,

    /// Pins to sample, e.g. `["A1", "D2"]`. Order is the record order.
    pub pins: Vec<String>,

    /// Full-range a2d resolution.
    pub scale: f64,

    /// Reads averaged per analog pass before the first retune.
    pub initial_analog_samples: u32,

    /// Minimum seconds between saves before the first retune.
    pub initial_save_interval_secs: f64,

    /// a2d bound -> reads averaged.
    pub analog_samples_table: Vec<Tier<u32>>,

    /// a2d bound -> minimum seconds between saves.
    pub save_interval_table: Vec<Tier<f64>>,

    /// Minimum analog delta that counts as a change (0 disables the gate).
    pub noise_threshold: f64,

    /// Consecutive identical reads required to accept a digital level.
    pub debounce_run_length: u32,

    /// Reads allowed per debounce pass before holding the last level.
    pub debounce_max_reads: u32,

    /// Pause after each raw read, in milliseconds.
    pub read_delay_ms: u64,

    /// Fractional digits written for analog values.
    pub analog_decimals: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source: "uno".to_string(),
            pins: vec!["A1".to_string(), "D2".to_string(), "D3".to_string()],
            scale: DEFAULT_SCALE,
            initial_analog_samples: 10,
            initial_save_interval_secs: 60.0,
            analog_samples_table: vec![
                Tier::new(25.0, 100),
                Tier::new(50.0, 75),
                Tier::new(100.0, 25),
                Tier::new(2048.0, 25),
            ],
            save_interval_table: vec![
                Tier::new(30.0, 300.0),
                Tier::new(100.0, 240.0),
                Tier::new(200.0, 60.0),
                Tier::new(400.0, 30.0),
                Tier::new(500.0, 60.0),
                Tier::new(2048.0, 240.0),
            ],
            noise_threshold: 0.0,
            debounce_run_length: 5,
            debounce_max_reads: 200,
            read_delay_ms: 100,
            analog_decimals: 0,
        }
    }
}

impl SessionConfig {
    /// Parse from JSON text. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Pause after each raw read
    pub fn read_delay(&self) -> Duration {
        Duration::from_millis(self.read_delay_ms)
    }

    /// Check every field; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.trim().is_empty() {
            return Err(invalid("source", "must not be empty"));
        }

        SignalSnapshot::from_names(&self.pins)?;

        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(invalid("scale", "must be a positive number"));
        }
        if self.initial_analog_samples == 0 {
            return Err(invalid("initial_analog_samples", "must be at least 1"));
        }
        if !self.initial_save_interval_secs.is_finite() || self.initial_save_interval_secs < 0.0 {
            return Err(invalid(
                "initial_save_interval_secs",
                "must be a non-negative number",
            ));
        }

        self.samples_table()?;
        self.interval_table()?;

        if !self.noise_threshold.is_finite() || self.noise_threshold < 0.0 {
            return Err(invalid("noise_threshold", "must be a non-negative number"));
        }
        if self.debounce_run_length == 0 {
            return Err(invalid("debounce_run_length", "must be at least 1"));
        }
        if self.debounce_max_reads < self.debounce_run_length {
            return Err(invalid(
                "debounce_max_reads",
                "must be at least debounce_run_length",
            ));
        }

        Ok(())
    }

    /// Build the sample-count table
    pub fn samples_table(&self) -> Result<ThresholdTable<u32>, ConfigError> {
        if self.analog_samples_table.iter().any(|t| t.value == 0) {
            return Err(invalid("analog_samples_table", "sample counts must be at least 1"));
        }
        ThresholdTable::new("analog_samples_table", self.analog_samples_table.iter().copied())
    }

    /// Build the save-interval table
    pub fn interval_table(&self) -> Result<ThresholdTable<f64>, ConfigError> {
        if self
            .save_interval_table
            .iter()
            .any(|t| !t.value.is_finite() || t.value < 0.0)
        {
            return Err(invalid(
                "save_interval_table",
                "intervals must be non-negative numbers",
            ));
        }
        ThresholdTable::new("save_interval_table", self.save_interval_table.iter().copied())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}
