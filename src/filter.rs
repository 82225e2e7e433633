//! Smoothing filters
//!
//! - [`smooth_analog`]: average N reads and scale to the a2d resolution
//! - [`DebounceFilter`]: wait for K consecutive identical reads
//!
//! Both filters pause between reads through a [`Pacer`] so that a long
//! averaging pass can be cancelled.

use std::time::Duration;

use crate::error::{ConfigError, ReadError, Result};
use crate::reader::{Pacer, PinReader};

/// Settings for the analog averaging filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogFilter {
    /// Full-range a2d resolution (1023 for a 10-bit converter)
    pub scale: f64,
    /// Pause after each read
    pub read_delay: Duration,
}

impl AnalogFilter {
    /// Create a filter with no inter-read pause
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            read_delay: Duration::ZERO,
        }
    }

    /// Set the pause after each read
    pub fn with_read_delay(mut self, read_delay: Duration) -> Self {
        self.read_delay = read_delay;
        self
    }

    /// Average `samples` reads of analog pin `index`.
    ///
    /// Returns `round(sum / samples * scale)`. A failed or non-finite read
    /// aborts the pass; partial sums are discarded.
    pub fn smooth<R, P>(&self, reader: &mut R, pacer: &mut P, index: u8, samples: u32) -> Result<f64>
    where
        R: PinReader + ?Sized,
        P: Pacer + ?Sized,
    {
        if samples == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analog_sample_count",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        let mut sum = 0.0;
        for _ in 0..samples {
            let value = reader.read_analog(index)?;
            if !value.is_finite() {
                return Err(ReadError::InvalidValue {
                    pin: format!("A{}", index),
                    value,
                }
                .into());
            }
            sum += value;
            pacer.pause(self.read_delay)?;
        }

        Ok((sum / f64::from(samples) * self.scale).round())
    }
}

/// Shorthand for [`AnalogFilter::smooth`] without pacing
pub fn smooth_analog<R: PinReader + ?Sized>(
    reader: &mut R,
    index: u8,
    samples: u32,
    scale: f64,
) -> Result<f64> {
    AnalogFilter::new(scale).smooth(reader, &mut crate::reader::NoPause, index, samples)
}

/// Result of a debounce pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debounced {
    /// Debounced level
    pub value: bool,
    /// False when the read budget ran out and `value` is the fallback
    pub settled: bool,
    /// Reads consumed
    pub reads: u32,
}

/// Settings for the digital debounce filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebounceFilter {
    /// Consecutive identical reads required (K)
    pub run_length: u32,
    /// Read budget before giving up (M)
    pub max_reads: u32,
    /// Pause after each read
    pub read_delay: Duration,
}

impl DebounceFilter {
    /// Create a filter requiring `run_length` agreeing reads within `max_reads`
    pub fn new(run_length: u32, max_reads: u32) -> Self {
        Self {
            run_length,
            max_reads,
            read_delay: Duration::ZERO,
        }
    }

    /// Set the pause after each read
    pub fn with_read_delay(mut self, read_delay: Duration) -> Self {
        self.read_delay = read_delay;
        self
    }

    /// Debounce digital pin `index`.
    ///
    /// Reads until `run_length` consecutive identical values are seen. A read
    /// that differs from the previous one resets both counters and starts a
    /// new run. When `max_reads` reads pass without a winner, `fallback` is
    /// returned with `settled == false`.
    pub fn debounce<R, P>(
        &self,
        reader: &mut R,
        pacer: &mut P,
        index: u8,
        fallback: bool,
    ) -> Result<Debounced>
    where
        R: PinReader + ?Sized,
        P: Pacer + ?Sized,
    {
        if self.run_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "debounce_run_length",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        let mut true_run = 0u32;
        let mut false_run = 0u32;
        let mut previous: Option<bool> = None;
        let mut reads = 0u32;

        while reads < self.max_reads {
            let current = reader.read_digital(index)?;
            reads += 1;

            if previous != Some(current) {
                true_run = 0;
                false_run = 0;
            }
            if current {
                true_run += 1;
            } else {
                false_run += 1;
            }
            previous = Some(current);

            if true_run >= self.run_length || false_run >= self.run_length {
                return Ok(Debounced {
                    value: true_run >= self.run_length,
                    settled: true,
                    reads,
                });
            }

            pacer.pause(self.read_delay)?;
        }

        log::warn!(
            "D{} did not settle after {} reads, holding {}",
            index,
            reads,
            fallback
        );
        Ok(Debounced {
            value: fallback,
            settled: false,
            reads,
        })
    }
}
