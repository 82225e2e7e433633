// Pinwatch Sim - Signal patterns
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Signal patterns for simulated pins.
//!
//! Patterns are evaluated per read, not per wall-clock instant: the `n`th
//! read of a pin sees the pattern at step `n`. Analog patterns produce a
//! normalized level in `0.0..=1.0`; digital patterns produce a level.

use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::SimError;

/// Analog signal shape, normalized to the converter range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalogPattern {
    /// Fixed level.
    Constant { level: f64 },

    /// Sinusoid.
    ///
    /// `level = offset + amplitude * sin(2*PI*n/period_reads + phase)`
    Sine {
        offset: f64,
        amplitude: f64,
        period_reads: u64,
        #[serde(default)]
        phase: f64,
    },

    /// Brownian motion starting at `start`.
    RandomWalk { start: f64, step_std: f64 },

    /// Piecewise constant levels, as `(from_read, level)` pairs.
    Step { levels: Vec<(u64, f64)> },

    /// Linear ramp from `min` to `max`, restarting every period.
    Sawtooth { min: f64, max: f64, period_reads: u64 },
}

impl AnalogPattern {
    /// Check the parameters.
    pub fn validate(&self) -> Result<(), SimError> {
        match self {
            AnalogPattern::Sine { period_reads, .. }
            | AnalogPattern::Sawtooth { period_reads, .. }
                if *period_reads == 0 =>
            {
                Err(SimError::InvalidParameter(
                    "period_reads must be at least 1".to_string(),
                ))
            }
            AnalogPattern::RandomWalk { step_std, .. }
                if !step_std.is_finite() || *step_std < 0.0 =>
            {
                Err(SimError::InvalidParameter(format!(
                    "step_std must be >= 0, got {}",
                    step_std
                )))
            }
            _ => Ok(()),
        }
    }

    /// Evaluate the stateless part of the pattern at read `n`.
    ///
    /// `RandomWalk` returns its start level here; use [`PatternState`] for
    /// the walk itself.
    pub fn evaluate(&self, n: u64) -> f64 {
        match self {
            AnalogPattern::Constant { level } => *level,

            AnalogPattern::Sine {
                offset,
                amplitude,
                period_reads,
                phase,
            } => {
                let t = n as f64 / *period_reads as f64;
                offset + amplitude * (2.0 * PI * t + phase).sin()
            }

            AnalogPattern::RandomWalk { start, .. } => *start,

            AnalogPattern::Step { levels } => {
                let mut current = levels.first().map(|(_, v)| *v).unwrap_or(0.0);
                for (from, level) in levels {
                    if n >= *from {
                        current = *level;
                    } else {
                        break;
                    }
                }
                current
            }

            AnalogPattern::Sawtooth {
                min,
                max,
                period_reads,
            } => {
                let fraction = (n % period_reads) as f64 / *period_reads as f64;
                min + (max - min) * fraction
            }
        }
    }

    /// A slow sine spanning most of the range.
    pub fn slow_sine(period_reads: u64) -> Self {
        AnalogPattern::Sine {
            offset: 0.5,
            amplitude: 0.4,
            period_reads,
            phase: 0.0,
        }
    }
}

/// Digital signal shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DigitalPattern {
    /// Fixed level.
    Steady { level: bool },

    /// Nominal level with each read independently flipped.
    Chatter { level: bool, flip_probability: f64 },

    /// Contact bounce: `bounce_reads` alternating reads, then `level`.
    Bounce { level: bool, bounce_reads: u64 },

    /// Square wave, `half_period_reads` high then as many low.
    Square { half_period_reads: u64 },

    /// Every read differs from the previous one. Never debounces.
    Alternating,
}

impl DigitalPattern {
    /// Check the parameters.
    pub fn validate(&self) -> Result<(), SimError> {
        match self {
            DigitalPattern::Chatter {
                flip_probability, ..
            } if !(0.0..=1.0).contains(flip_probability) => Err(SimError::InvalidParameter(
                format!("flip_probability must be in 0..=1, got {}", flip_probability),
            )),
            DigitalPattern::Square { half_period_reads } if *half_period_reads == 0 => Err(
                SimError::InvalidParameter("half_period_reads must be at least 1".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Level at read `n`.
    pub fn evaluate(&self, n: u64, rng: &mut (impl Rng + ?Sized)) -> bool {
        match self {
            DigitalPattern::Steady { level } => *level,

            DigitalPattern::Chatter {
                level,
                flip_probability,
            } => {
                if rng.gen::<f64>() < *flip_probability {
                    !level
                } else {
                    *level
                }
            }

            DigitalPattern::Bounce {
                level,
                bounce_reads,
            } => {
                if n < *bounce_reads {
                    // starts on the settled level, as a closing contact does
                    (n % 2 == 0) == *level
                } else {
                    *level
                }
            }

            DigitalPattern::Square { half_period_reads } => (n / half_period_reads) % 2 == 0,

            DigitalPattern::Alternating => n % 2 == 0,
        }
    }
}

/// Per-pin evolving state.
#[derive(Debug, Clone)]
pub struct PatternState {
    /// Reads served so far.
    pub reads: u64,
    /// Current random walk level.
    pub walk_level: f64,
}

impl PatternState {
    /// Create state initialized for a pattern.
    pub fn for_pattern(pattern: &AnalogPattern) -> Self {
        let walk_level = match pattern {
            AnalogPattern::RandomWalk { start, .. } => *start,
            _ => 0.0,
        };
        Self {
            reads: 0,
            walk_level,
        }
    }

    /// Evaluate `pattern` at the next read, advancing the state.
    pub fn next_analog(&mut self, pattern: &AnalogPattern, rng: &mut (impl Rng + ?Sized)) -> f64 {
        let n = self.reads;
        self.reads += 1;

        match pattern {
            AnalogPattern::RandomWalk { step_std, .. } => {
                if *step_std > 0.0 {
                    if let Ok(normal) = Normal::new(0.0, *step_std) {
                        self.walk_level = (self.walk_level + normal.sample(rng)).clamp(0.0, 1.0);
                    }
                }
                self.walk_level
            }
            other => other.evaluate(n),
        }
    }
}

/// Add Gaussian noise and clamp to the converter range.
pub fn add_noise(level: f64, noise_std: f64, rng: &mut (impl Rng + ?Sized)) -> f64 {
    let noisy = match Normal::new(0.0, noise_std) {
        Ok(normal) if noise_std > 0.0 => level + normal.sample(rng),
        _ => level,
    };
    noisy.clamp(0.0, 1.0)
}
