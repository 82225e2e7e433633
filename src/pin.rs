//! Pin descriptors and signal values
//!
//! A [`Pin`] is one monitored microcontroller input. Its kind and index are
//! derived from the configured name: `A1` is analog input 1, `D12` is digital
//! input 12.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Kind of signal a pin carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    /// Analog input, smoothed by averaging
    Analog,
    /// Digital input, smoothed by debouncing
    Digital,
}

impl PinKind {
    /// Lowercase name, as shown in pin listings
    pub fn as_str(&self) -> &'static str {
        match self {
            PinKind::Analog => "analog",
            PinKind::Digital => "digital",
        }
    }

    /// Value a pin of this kind holds before its first sample
    pub fn initial_value(&self) -> SignalValue {
        match self {
            PinKind::Analog => SignalValue::Analog(0.0),
            PinKind::Digital => SignalValue::Digital(false),
        }
    }
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smoothed value of one pin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Scaled a2d count
    Analog(f64),
    /// Debounced level
    Digital(bool),
}

impl SignalValue {
    /// Kind matching this value
    pub fn kind(&self) -> PinKind {
        match self {
            SignalValue::Analog(_) => PinKind::Analog,
            SignalValue::Digital(_) => PinKind::Digital,
        }
    }

    /// Numeric view: analog count, or 0/1 for digital
    pub fn as_f64(&self) -> f64 {
        match *self {
            SignalValue::Analog(v) => v,
            SignalValue::Digital(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Analog count, if this is an analog value
    pub fn as_analog(&self) -> Option<f64> {
        match *self {
            SignalValue::Analog(v) => Some(v),
            SignalValue::Digital(_) => None,
        }
    }

    /// Digital level, if this is a digital value
    pub fn as_digital(&self) -> Option<bool> {
        match *self {
            SignalValue::Digital(b) => Some(b),
            SignalValue::Analog(_) => None,
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SignalValue::Analog(v) => write!(f, "{}", v),
            SignalValue::Digital(b) => write!(f, "{}", u8::from(b)),
        }
    }
}

/// A monitored input pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Configured name, e.g. `A1`
    pub name: String,
    /// Signal kind
    pub kind: PinKind,
    /// Board pin number
    pub index: u8,
    /// Latest smoothed value
    pub value: SignalValue,
}

impl Pin {
    /// Parse a pin from its configured name
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidPinName(name.to_string());

        let mut chars = name.chars();
        let kind = match chars.next() {
            Some('A') | Some('a') => PinKind::Analog,
            Some('D') | Some('d') => PinKind::Digital,
            _ => return Err(invalid()),
        };

        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let index: u8 = digits.parse().map_err(|_| invalid())?;

        Ok(Self {
            name: name.to_string(),
            kind,
            index,
            value: kind.initial_value(),
        })
    }

    /// Check whether this pin is analog
    pub fn is_analog(&self) -> bool {
        self.kind == PinKind::Analog
    }

    /// Check whether this pin is digital
    pub fn is_digital(&self) -> bool {
        self.kind == PinKind::Digital
    }
}

impl FromStr for Pin {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pin::parse(s)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.index, self.value)
    }
}
