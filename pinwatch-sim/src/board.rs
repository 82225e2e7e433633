// Pinwatch Sim - Simulated board
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! A seeded, pattern-driven [`PinReader`].

use pinwatch::{PinReader, ReadError};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::HashMap;

use crate::error::SimError;
use crate::patterns::{add_noise, AnalogPattern, DigitalPattern, PatternState};

/// Simulated analog input.
#[derive(Debug, Clone)]
pub struct AnalogChannel {
    pattern: AnalogPattern,
    noise_std: f64,
    dropout_probability: f64,
    state: PatternState,
}

impl AnalogChannel {
    /// Create a noiseless channel.
    pub fn new(pattern: AnalogPattern) -> Self {
        let state = PatternState::for_pattern(&pattern);
        Self {
            pattern,
            noise_std: 0.0,
            dropout_probability: 0.0,
            state,
        }
    }

    /// Add Gaussian noise with this standard deviation.
    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    /// Fail reads with this probability.
    pub fn with_dropout(mut self, probability: f64) -> Self {
        self.dropout_probability = probability;
        self
    }

    fn validate(&self) -> Result<(), SimError> {
        self.pattern.validate()?;
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "noise_std must be >= 0, got {}",
                self.noise_std
            )));
        }
        check_probability("dropout_probability", self.dropout_probability)
    }
}

/// Simulated digital input.
#[derive(Debug, Clone)]
pub struct DigitalChannel {
    pattern: DigitalPattern,
    reads: u64,
}

impl DigitalChannel {
    pub fn new(pattern: DigitalPattern) -> Self {
        Self { pattern, reads: 0 }
    }
}

fn check_probability(name: &str, p: f64) -> Result<(), SimError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimError::InvalidParameter(format!(
            "{} must be in 0..=1, got {}",
            name, p
        )))
    }
}

/// Board whose pins follow configured patterns.
///
/// The same seed and channel setup always produce the same reads.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    rng: StdRng,
    analog: HashMap<u8, AnalogChannel>,
    digital: HashMap<u8, DigitalChannel>,
}

impl SimulatedBoard {
    /// Create a board with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            analog: HashMap::new(),
            digital: HashMap::new(),
        }
    }

    /// Create a board seeded from entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            analog: HashMap::new(),
            digital: HashMap::new(),
        }
    }

    /// Attach an analog channel to input `index`.
    pub fn with_analog(mut self, index: u8, channel: AnalogChannel) -> Result<Self, SimError> {
        channel.validate()?;
        self.analog.insert(index, channel);
        Ok(self)
    }

    /// Attach a digital pattern to input `index`.
    pub fn with_digital(mut self, index: u8, pattern: DigitalPattern) -> Result<Self, SimError> {
        pattern.validate()?;
        self.digital.insert(index, DigitalChannel::new(pattern));
        Ok(self)
    }

    /// Reads served so far on analog input `index`.
    pub fn analog_reads(&self, index: u8) -> u64 {
        self.analog.get(&index).map_or(0, |c| c.state.reads)
    }

    /// Reads served so far on digital input `index`.
    pub fn digital_reads(&self, index: u8) -> u64 {
        self.digital.get(&index).map_or(0, |c| c.reads)
    }
}

impl PinReader for SimulatedBoard {
    fn read_analog(&mut self, index: u8) -> Result<f64, ReadError> {
        let channel = self
            .analog
            .get_mut(&index)
            .ok_or_else(|| ReadError::UnknownPin {
                pin: format!("A{}", index),
            })?;

        let level = channel.state.next_analog(&channel.pattern, &mut self.rng);
        if channel.dropout_probability > 0.0 && self.rng.gen::<f64>() < channel.dropout_probability
        {
            return Err(ReadError::NoData {
                pin: format!("A{}", index),
            });
        }
        Ok(add_noise(level, channel.noise_std, &mut self.rng))
    }

    fn read_digital(&mut self, index: u8) -> Result<bool, ReadError> {
        let channel = self
            .digital
            .get_mut(&index)
            .ok_or_else(|| ReadError::UnknownPin {
                pin: format!("D{}", index),
            })?;

        let n = channel.reads;
        channel.reads += 1;
        Ok(channel.pattern.evaluate(n, &mut self.rng))
    }
}
