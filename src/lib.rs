//! # Pinwatch - Adaptive pin sampling with change detection
//!
//! Watches the analog and digital inputs of a microcontroller, smooths the
//! raw reads, adapts its own sampling effort to the signal level, and hands
//! a record to a persistence sink only when something actually changed.
//!
//! ## Key Features
//!
//! - **Smoothing**: averaged analog reads, debounced digital reads
//! - **Adaptive control**: sample count and save interval follow the signal
//! - **Change detection**: time gate plus per-pin value gate
//! - **Stable records**: deterministic, order-preserving JSON encoding
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, NaiveDate};
//! use pinwatch::{MemorySink, NoPause, SamplingSession, ScriptedReader, SessionConfig};
//!
//! let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let config = SessionConfig {
//!     pins: vec!["A0".into(), "D2".into()],
//!     read_delay_ms: 0,
//!     ..SessionConfig::default()
//! };
//! let mut session = SamplingSession::new(config, start).unwrap();
//!
//! let mut reader = ScriptedReader::new()
//!     .looping()
//!     .with_analog(0, [0.5])
//!     .with_digital_bits(2, "1");
//! let mut sink = MemorySink::new();
//!
//! let report = session
//!     .tick(&mut reader, &mut NoPause, &mut sink, start + Duration::minutes(10))
//!     .unwrap();
//! assert!(report.changed);
//! assert_eq!(sink.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`pin`]: Pin descriptors and signal values
//! - [`reader`]: Hardware seams and pacing
//! - [`filter`]: Analog averaging and digital debouncing
//! - [`tier`]: Threshold tables
//! - [`controller`]: Adaptive parameter controller
//! - [`snapshot`]: Per-pin state
//! - [`detector`]: Change detection
//! - [`record`]: Record encoding
//! - [`sink`]: Persistence sinks
//! - [`session`]: The sampling cycle

// Modules
pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod filter;
pub mod pin;
pub mod reader;
pub mod record;
pub mod session;
pub mod sink;
pub mod snapshot;
pub mod tier;

// Re-exports for convenient access
pub use config::{SessionConfig, DEFAULT_SCALE};
pub use controller::{AdaptiveController, ControllerState};
pub use detector::{ChangeDetector, ChangeVerdict};
pub use error::{ConfigError, EncodeError, PersistError, PinwatchError, ReadError, Result};
pub use filter::{smooth_analog, AnalogFilter, DebounceFilter, Debounced};
pub use pin::{Pin, PinKind, SignalValue};
pub use reader::{CancelToken, CancellableSleep, NoPause, Pacer, PinReader, ScriptedReader};
pub use record::{format_timestamp, ChangeRecord, TIMESTAMP_FORMAT};
pub use session::{CycleReport, PersistOutcome, SamplingSession};
pub use sink::{JsonLinesSink, MemorySink, PersistenceSink, SinkReceipt};
pub use snapshot::SignalSnapshot;
pub use tier::{ThresholdTable, Tier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
