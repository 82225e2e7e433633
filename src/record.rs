//! Change records and their wire encoding
//!
//! A [`ChangeRecord`] is the flat key/value document handed to the
//! persistence sink. Field order is fixed: `ts`, `src`, then every pin in
//! configured order.
//!
//! ```
//! use chrono::NaiveDate;
//! use pinwatch::{ChangeRecord, SignalSnapshot, SignalValue};
//!
//! let mut snapshot = SignalSnapshot::from_names(&["A1", "D2", "D3"]).unwrap();
//! snapshot.set("A1", SignalValue::Analog(307.0));
//! snapshot.set("D2", SignalValue::Digital(true));
//!
//! let ts = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let record = ChangeRecord::from_snapshot(ts, "test", &snapshot);
//! assert_eq!(
//!     record.encode().unwrap(),
//!     r#"{"ts":"2021-01-01 00:00:00","src":"test","A1":307,"D2":true,"D3":false}"#
//! );
//! ```

use chrono::NaiveDateTime;
use std::fmt::Write as _;

use crate::error::EncodeError;
use crate::pin::SignalValue;
use crate::snapshot::SignalSnapshot;

/// Timestamp layout used in records; the fraction is omitted when zero
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Format a record timestamp
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// One persisted observation of every pin
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Cycle timestamp
    pub timestamp: NaiveDateTime,
    /// Source identifier
    pub source: String,
    /// Pin values in configured order
    pub values: Vec<(String, SignalValue)>,
    /// Fractional digits written for analog values
    pub analog_decimals: u8,
}

impl ChangeRecord {
    /// Capture `snapshot` at `timestamp`
    pub fn from_snapshot(
        timestamp: NaiveDateTime,
        source: impl Into<String>,
        snapshot: &SignalSnapshot,
    ) -> Self {
        Self {
            timestamp,
            source: source.into(),
            values: snapshot
                .iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            analog_decimals: 0,
        }
    }

    /// Write analog values with `analog_decimals` fractional digits
    pub fn with_analog_decimals(mut self, analog_decimals: u8) -> Self {
        self.analog_decimals = analog_decimals;
        self
    }

    /// Encode as compact JSON.
    ///
    /// Digital values become `true`/`false`; analog values are written with
    /// exactly [`analog_decimals`](Self::analog_decimals) fractional digits.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let precision = usize::from(self.analog_decimals);
        let mut out = String::with_capacity(48 + self.values.len() * 12);

        out.push_str("{\"ts\":");
        out.push_str(&json_string(&format_timestamp(self.timestamp))?);
        out.push_str(",\"src\":");
        out.push_str(&json_string(&self.source)?);

        for (name, value) in &self.values {
            out.push(',');
            out.push_str(&json_string(name)?);
            out.push(':');
            match *value {
                SignalValue::Digital(level) => out.push_str(if level { "true" } else { "false" }),
                SignalValue::Analog(count) => {
                    if !count.is_finite() {
                        return Err(EncodeError::NonFinite { pin: name.clone() });
                    }
                    let start = out.len();
                    let _ = write!(out, "{:.*}", precision, count);
                    // values rounding to zero keep their sign, e.g. "-0.00"
                    if out[start..].starts_with('-')
                        && out[start + 1..].bytes().all(|b| b == b'0' || b == b'.')
                    {
                        out.remove(start);
                    }
                }
            }
        }

        out.push('}');
        Ok(out)
    }

    /// Value of one pin
    pub fn get(&self, name: &str) -> Option<SignalValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

fn json_string(s: &str) -> Result<String, EncodeError> {
    serde_json::to_string(s).map_err(|e| EncodeError::Serialize(e.to_string()))
}
