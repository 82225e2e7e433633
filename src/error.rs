//! Error types for pinwatch
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for pinwatch operations
pub type Result<T> = std::result::Result<T, PinwatchError>;

/// Main error type for pinwatch operations
///
/// Encoding and persistence failures never abort a cycle; they are reported
/// through [`PersistOutcome::Failed`](crate::PersistOutcome::Failed).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PinwatchError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pin read error
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// A pause was interrupted by cancellation
    #[error("Sampling cancelled")]
    Cancelled,
}

/// Errors detected while validating configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Pin name is not `A<n>` or `D<n>`
    #[error("Invalid pin name '{0}': expected A<index> or D<index>")]
    InvalidPinName(String),

    /// Same pin configured twice
    #[error("Duplicate pin: {0}")]
    DuplicatePin(String),

    /// No pins configured
    #[error("No pins configured")]
    NoPins,

    /// Threshold table without entries
    #[error("Threshold table '{table}' is empty")]
    EmptyTable { table: &'static str },

    /// Threshold table bound is NaN or infinite
    #[error("Threshold table '{table}' has a non-finite bound")]
    NonFiniteBound { table: &'static str },

    /// Two entries share a bound
    #[error("Threshold table '{table}' has duplicate bound {bound}")]
    DuplicateBound { table: &'static str, bound: f64 },

    /// Numeric setting outside its allowed range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// Configuration file could not be read
    #[error("Failed to read config '{path}': {reason}")]
    Io { path: String, reason: String },

    /// Configuration text is not valid JSON for the schema
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Errors reported by a pin reader
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    /// Hardware or transport failure
    #[error("I/O failure on pin {pin}: {reason}")]
    Io { pin: String, reason: String },

    /// Board has not reported a value yet
    #[error("No data available on pin {pin}")]
    NoData { pin: String },

    /// Reported value is NaN or infinite
    #[error("Invalid reading on pin {pin}: {value}")]
    InvalidValue { pin: String, value: f64 },

    /// Pin is not wired to this reader
    #[error("Unknown pin: {pin}")]
    UnknownPin { pin: String },

    /// Scripted input ran out of samples
    #[error("Input exhausted on pin {pin}")]
    Exhausted { pin: String },
}

/// Errors while encoding a change record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// Analog value cannot be represented as a JSON number
    #[error("Non-finite value for pin {pin}")]
    NonFinite { pin: String },

    /// String field could not be serialized
    #[error("Serialization failed: {0}")]
    Serialize(String),
}

/// Errors returned by a persistence sink
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    /// Sink endpoint could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// Sink answered with a failure status
    #[error("Rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Local write failed
    #[error("Write failed: {0}")]
    Write(String),
}
