// Pinwatch Sim - Simulated boards for pinwatch
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Pinwatch Sim
//!
//! Simulated microcontroller boards for exercising pinwatch without
//! hardware.
//!
//! - **Analog patterns**: constant, sine, random walk, step, sawtooth,
//!   each with optional Gaussian noise and read dropouts
//! - **Digital patterns**: steady, chatter, contact bounce, square wave,
//!   alternating
//! - **Profiles**: whole boards described in JSON
//!
//! ## Quick Start
//!
//! ```rust
//! use pinwatch::{smooth_analog, PinReader};
//! use pinwatch_sim::{AnalogChannel, AnalogPattern, DigitalPattern, SimulatedBoard};
//!
//! let mut board = SimulatedBoard::with_seed(42)
//!     .with_analog(1, AnalogChannel::new(AnalogPattern::Constant { level: 0.3 }))
//!     .unwrap()
//!     .with_digital(2, DigitalPattern::Steady { level: true })
//!     .unwrap();
//!
//! assert_eq!(smooth_analog(&mut board, 1, 10, 1023.0).unwrap(), 307.0);
//! assert!(board.read_digital(2).unwrap());
//! ```

pub mod board;
pub mod error;
pub mod patterns;
pub mod profile;

// Re-exports for convenience
pub use board::{AnalogChannel, DigitalChannel, SimulatedBoard};
pub use error::SimError;
pub use patterns::{AnalogPattern, DigitalPattern, PatternState};
pub use profile::{AnalogSpec, DigitalSpec, SimProfile};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
