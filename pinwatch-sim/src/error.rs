// Pinwatch Sim - Errors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Simulation errors.

use pinwatch::ConfigError;
use thiserror::Error;

/// Errors from building a simulated board.
#[derive(Debug, Error)]
pub enum SimError {
    /// I/O error reading a profile.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Profile JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pin name did not parse.
    #[error("Invalid pin: {0}")]
    Pin(#[from] ConfigError),

    /// Pin used with a pattern of the other kind.
    #[error("Pin {pin} is not {expected}")]
    WrongKind { pin: String, expected: &'static str },

    /// Pattern parameter out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
