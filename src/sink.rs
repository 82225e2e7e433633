// Pinwatch - Adaptive pin sampling with change detection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Persistence sinks
//!
//! A [`PersistenceSink`] receives every record the session decides to save.
//! The core ships two implementations: [`MemorySink`] keeps encoded records
//! in memory and [`JsonLinesSink`] appends them to any writer, one per line.

use std::io::Write;

use crate::error::{EncodeError, PersistError};
use crate::record::ChangeRecord;

/// Acknowledgement from a sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReceipt {
    /// Response body, if the sink produced one
    pub payload: Option<String>,
}

impl SinkReceipt {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }
}

/// Destination for change records
pub trait PersistenceSink {
    /// Store one record
    fn persist(&mut self, record: &ChangeRecord) -> Result<SinkReceipt, PersistError>;
}

impl<S: PersistenceSink + ?Sized> PersistenceSink for &mut S {
    fn persist(&mut self, record: &ChangeRecord) -> Result<SinkReceipt, PersistError> {
        (**self).persist(record)
    }
}

impl<S: PersistenceSink + ?Sized> PersistenceSink for Box<S> {
    fn persist(&mut self, record: &ChangeRecord) -> Result<SinkReceipt, PersistError> {
        (**self).persist(record)
    }
}

fn encode(record: &ChangeRecord) -> Result<String, PersistError> {
    record
        .encode()
        .map_err(|e: EncodeError| PersistError::Write(e.to_string()))
}

/// Sink that keeps encoded records in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<String>,
    fail_with: Option<PersistError>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `error`
    pub fn fail_with(&mut self, error: PersistError) {
        self.fail_with = Some(error);
    }

    /// Accept records again
    pub fn recover(&mut self) {
        self.fail_with = None;
    }

    /// Encoded records in arrival order
    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent record
    pub fn last(&self) -> Option<&str> {
        self.records.last().map(String::as_str)
    }
}

impl PersistenceSink for MemorySink {
    fn persist(&mut self, record: &ChangeRecord) -> Result<SinkReceipt, PersistError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let line = encode(record)?;
        self.records.push(line);
        Ok(SinkReceipt::empty())
    }
}

/// Sink that writes one JSON document per line
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
        }
    }

    /// Records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PersistenceSink for JsonLinesSink<W> {
    fn persist(&mut self, record: &ChangeRecord) -> Result<SinkReceipt, PersistError> {
        let mut line = encode(record)?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| PersistError::Write(e.to_string()))?;
        self.written += 1;
        Ok(SinkReceipt::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::SignalValue;
    use crate::snapshot::SignalSnapshot;
    use chrono::NaiveDate;

    fn record_with(a1: f64, analog_decimals: u8) -> ChangeRecord {
        let mut snap = SignalSnapshot::from_names(&["A1", "D2"]).unwrap();
        snap.set("A1", SignalValue::Analog(a1));
        snap.set("D2", SignalValue::Digital(true));
        let ts = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ChangeRecord::from_snapshot(ts, "test", &snap).with_analog_decimals(analog_decimals)
    }

    fn record(a1: f64) -> ChangeRecord {
        record_with(a1, 0)
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.persist(&record(307.0)).unwrap();
        sink.persist(&record(12.0)).unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.last(),
            Some(r#"{"ts":"2021-01-01 00:00:00","src":"test","A1":12,"D2":true}"#)
        );
    }

    #[test]
    fn test_memory_sink_failure_and_recover() {
        let mut sink = MemorySink::new();
        sink.fail_with(PersistError::Transport("connection refused".into()));
        assert!(sink.persist(&record(1.0)).is_err());
        assert!(sink.is_empty());

        sink.recover();
        assert!(sink.persist(&record(1.0)).is_ok());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_memory_sink_rejects_non_finite() {
        let mut sink = MemorySink::new();
        let err = sink.persist(&record(f64::NAN)).unwrap_err();
        assert!(matches!(err, PersistError::Write(_)));
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.persist(&record_with(307.0, 1)).unwrap();
        sink.persist(&record(5.0)).unwrap();
        assert_eq!(sink.written(), 2);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""A1":307.0,"#));
        assert!(lines[1].contains(r#""A1":5,"#));
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(parsed["src"], "test");
        }
    }

    #[test]
    fn test_boxed_sink() {
        let mut sink: Box<dyn PersistenceSink> = Box::new(MemorySink::new());
        assert_eq!(sink.persist(&record(1.0)).unwrap(), SinkReceipt::empty());
    }
}
