// Pinwatch - Adaptive pin sampling with change detection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Hardware seams: pin reading and inter-read pacing
//!
//! The core never talks to a board directly. A [`PinReader`] supplies raw
//! reads and a [`Pacer`] implements the pause between consecutive reads.
//! [`CancellableSleep`] lets an orchestrator abort a sampling cycle while it
//! is waiting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{PinwatchError, ReadError, Result};
use crate::pin::{Pin, PinKind};

/// Source of raw pin reads
pub trait PinReader {
    /// Read an analog pin, normalized to 0.0..=1.0
    fn read_analog(&mut self, index: u8) -> std::result::Result<f64, ReadError>;

    /// Read a digital pin
    fn read_digital(&mut self, index: u8) -> std::result::Result<bool, ReadError>;
}

impl<R: PinReader + ?Sized> PinReader for &mut R {
    fn read_analog(&mut self, index: u8) -> std::result::Result<f64, ReadError> {
        (**self).read_analog(index)
    }

    fn read_digital(&mut self, index: u8) -> std::result::Result<bool, ReadError> {
        (**self).read_digital(index)
    }
}

impl<R: PinReader + ?Sized> PinReader for Box<R> {
    fn read_analog(&mut self, index: u8) -> std::result::Result<f64, ReadError> {
        (**self).read_analog(index)
    }

    fn read_digital(&mut self, index: u8) -> std::result::Result<bool, ReadError> {
        (**self).read_digital(index)
    }
}

/// Waits between consecutive reads of a pin
pub trait Pacer {
    /// Pause for `delay`. Returns [`PinwatchError::Cancelled`] if interrupted.
    fn pause(&mut self, delay: Duration) -> Result<()>;
}

/// Pacer that never waits (tests, replays)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPause;

impl Pacer for NoPause {
    fn pause(&mut self, _delay: Duration) -> Result<()> {
        Ok(())
    }
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Thread sleep that wakes up in short slices to honor a [`CancelToken`]
#[derive(Debug, Clone)]
pub struct CancellableSleep {
    token: CancelToken,
    slice: Duration,
}

impl CancellableSleep {
    /// Default wake-up granularity
    pub const DEFAULT_SLICE: Duration = Duration::from_millis(20);

    /// Create a sleeper bound to `token`
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            slice: Self::DEFAULT_SLICE,
        }
    }

    /// Set the wake-up granularity
    pub fn with_slice(mut self, slice: Duration) -> Self {
        self.slice = slice.max(Duration::from_millis(1));
        self
    }

    /// Token this sleeper observes
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Pacer for CancellableSleep {
    fn pause(&mut self, delay: Duration) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(PinwatchError::Cancelled);
        }

        let deadline = Instant::now() + delay;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(self.slice.min(deadline - now));
            if self.token.is_cancelled() {
                return Err(PinwatchError::Cancelled);
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Script<T> {
    values: Vec<T>,
    position: usize,
    reads: usize,
}

impl<T: Copy> Script<T> {
    fn next(&mut self, looping: bool) -> Option<T> {
        if self.values.is_empty() {
            return None;
        }
        if self.position >= self.values.len() {
            if !looping {
                return None;
            }
            self.position = 0;
        }
        let value = self.values[self.position];
        self.position += 1;
        self.reads += 1;
        Some(value)
    }
}

/// Reader that plays back fixed per-pin sequences
///
/// Useful for tests and for replaying captured reads. Without looping, a
/// pin whose script has run out reports [`ReadError::Exhausted`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedReader {
    analog: HashMap<u8, Script<f64>>,
    digital: HashMap<u8, Script<bool>>,
    looping: bool,
}

impl ScriptedReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart every script from the beginning when it runs out
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Script the reads of analog pin `index`
    pub fn with_analog(mut self, index: u8, values: impl IntoIterator<Item = f64>) -> Self {
        self.analog.insert(
            index,
            Script {
                values: values.into_iter().collect(),
                position: 0,
                reads: 0,
            },
        );
        self
    }

    /// Script the reads of digital pin `index`
    pub fn with_digital(mut self, index: u8, values: impl IntoIterator<Item = bool>) -> Self {
        self.digital.insert(
            index,
            Script {
                values: values.into_iter().collect(),
                position: 0,
                reads: 0,
            },
        );
        self
    }

    /// Script a pin from 0/1 bits, e.g. `"1100111"`
    pub fn with_digital_bits(self, index: u8, bits: &str) -> Self {
        self.with_digital(index, bits.chars().filter(|c| !c.is_whitespace()).map(|c| c == '1'))
    }

    /// Number of reads consumed so far on a pin
    pub fn consumed(&self, pin: &Pin) -> usize {
        match pin.kind {
            PinKind::Analog => self.analog.get(&pin.index).map_or(0, |s| s.reads),
            PinKind::Digital => self.digital.get(&pin.index).map_or(0, |s| s.reads),
        }
    }
}

impl PinReader for ScriptedReader {
    fn read_analog(&mut self, index: u8) -> std::result::Result<f64, ReadError> {
        let pin = format!("A{}", index);
        let script = self
            .analog
            .get_mut(&index)
            .ok_or_else(|| ReadError::UnknownPin { pin: pin.clone() })?;
        script
            .next(self.looping)
            .ok_or(ReadError::Exhausted { pin })
    }

    fn read_digital(&mut self, index: u8) -> std::result::Result<bool, ReadError> {
        let pin = format!("D{}", index);
        let script = self
            .digital
            .get_mut(&index)
            .ok_or_else(|| ReadError::UnknownPin { pin: pin.clone() })?;
        script
            .next(self.looping)
            .ok_or(ReadError::Exhausted { pin })
    }
}
