// Pinwatch Sampler - Capture replay
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Replay of captured pin reads from a CSV file.
//!
//! The header names the pins; each row holds one raw read per pin. Analog
//! cells are normalized levels in `0.0..=1.0`, digital cells are `0`/`1`,
//! `true`/`false` or `high`/`low`. An empty cell means the pin was not
//! read in that row.
//!
//! ```text
//! A1,D2
//! 0.30,1
//! 0.31,1
//! 0.29,
//! ```

use pinwatch::{Pin, PinKind, PinReader, ReadError, ScriptedReader};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Pin reads loaded from a capture file.
#[derive(Debug, Clone)]
pub struct CsvReader {
    pins: Vec<Pin>,
    rows: usize,
    reader: ScriptedReader,
}

impl CsvReader {
    /// Load a capture file. Each pin restarts from its first read when
    /// `loop_replay` is set, and reports exhaustion otherwise.
    pub fn from_path(path: impl AsRef<Path>, loop_replay: bool) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReplayError::FileNotFound(path.display().to_string()));
        }
        let reader = csv::Reader::from_path(path)?;
        let loaded = Self::from_csv(reader, loop_replay)?;
        info!(
            "Loaded {} rows for {} pins from {}",
            loaded.rows,
            loaded.pins.len(),
            path.display()
        );
        Ok(loaded)
    }

    /// Parse capture text already in memory.
    pub fn from_text(text: &str, loop_replay: bool) -> Result<Self, ReplayError> {
        Self::from_csv(csv::Reader::from_reader(text.as_bytes()), loop_replay)
    }

    fn from_csv<R: std::io::Read>(
        mut reader: csv::Reader<R>,
        loop_replay: bool,
    ) -> Result<Self, ReplayError> {
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(ReplayError::InvalidFormat("Missing header row".to_string()));
        }

        let mut pins = Vec::with_capacity(headers.len());
        for name in headers.iter() {
            let pin = Pin::parse(name.trim())
                .map_err(|e| ReplayError::InvalidFormat(e.to_string()))?;
            if pins.iter().any(|p: &Pin| p.kind == pin.kind && p.index == pin.index) {
                return Err(ReplayError::InvalidFormat(format!(
                    "Pin {} appears twice",
                    pin.name
                )));
            }
            pins.push(pin);
        }

        let mut analog: HashMap<u8, Vec<f64>> = HashMap::new();
        let mut digital: HashMap<u8, Vec<bool>> = HashMap::new();
        let mut rows = 0;

        for result in reader.records() {
            let record = result?;
            rows += 1;
            for (pin, cell) in pins.iter().zip(record.iter()) {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                match pin.kind {
                    PinKind::Analog => analog
                        .entry(pin.index)
                        .or_default()
                        .push(parse_level(&pin.name, rows, cell)?),
                    PinKind::Digital => digital
                        .entry(pin.index)
                        .or_default()
                        .push(parse_bit(&pin.name, rows, cell)?),
                }
            }
        }

        if rows == 0 {
            return Err(ReplayError::EmptyDataset);
        }

        let mut scripted = ScriptedReader::new();
        if loop_replay {
            scripted = scripted.looping();
        }
        for (index, values) in analog {
            scripted = scripted.with_analog(index, values);
        }
        for (index, values) in digital {
            scripted = scripted.with_digital(index, values);
        }

        Ok(Self {
            pins,
            rows,
            reader: scripted,
        })
    }

    /// Pin names from the header, in column order.
    pub fn pin_names(&self) -> Vec<String> {
        self.pins.iter().map(|p| p.name.clone()).collect()
    }

    /// Data rows in the file.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Reads served so far on `pin`.
    pub fn consumed(&self, pin: &Pin) -> usize {
        self.reader.consumed(pin)
    }
}

fn parse_level(pin: &str, row: usize, cell: &str) -> Result<f64, ReplayError> {
    let level: f64 = cell.parse().map_err(|_| {
        ReplayError::InvalidFormat(format!("Row {}: '{}' is not a number for {}", row, cell, pin))
    })?;
    if !(0.0..=1.0).contains(&level) {
        return Err(ReplayError::InvalidFormat(format!(
            "Row {}: level {} for {} is outside 0..=1",
            row, level, pin
        )));
    }
    Ok(level)
}

fn parse_bit(pin: &str, row: usize, cell: &str) -> Result<bool, ReplayError> {
    match cell.to_ascii_lowercase().as_str() {
        "1" | "true" | "high" => Ok(true),
        "0" | "false" | "low" => Ok(false),
        _ => Err(ReplayError::InvalidFormat(format!(
            "Row {}: '{}' is not a digital level for {}",
            row, cell, pin
        ))),
    }
}

impl PinReader for CsvReader {
    fn read_analog(&mut self, index: u8) -> Result<f64, ReadError> {
        self.reader.read_analog(index)
    }

    fn read_digital(&mut self, index: u8) -> Result<bool, ReadError> {
        self.reader.read_digital(index)
    }
}

/// Replay errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Empty dataset")]
    EmptyDataset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "A1,D2").unwrap();
        writeln!(file, "0.25,1").unwrap();
        writeln!(file, "0.50,high").unwrap();
        writeln!(file, "0.75,").unwrap();
        file
    }

    #[test]
    fn test_parse_csv() {
        let file = create_test_csv();
        let mut reader = CsvReader::from_path(file.path(), false).unwrap();

        assert_eq!(reader.pin_names(), vec!["A1", "D2"]);
        assert_eq!(reader.rows(), 3);

        assert_eq!(reader.read_analog(1).unwrap(), 0.25);
        assert_eq!(reader.read_analog(1).unwrap(), 0.50);
        assert_eq!(reader.read_analog(1).unwrap(), 0.75);
        assert!(matches!(
            reader.read_analog(1),
            Err(ReadError::Exhausted { .. })
        ));

        // empty cell skipped
        assert!(reader.read_digital(2).unwrap());
        assert!(reader.read_digital(2).unwrap());
        assert!(matches!(
            reader.read_digital(2),
            Err(ReadError::Exhausted { .. })
        ));
    }

    #[test]
    fn test_looping_replay() {
        let file = create_test_csv();
        let mut reader = CsvReader::from_path(file.path(), true).unwrap();
        let reads: Vec<f64> = (0..5).map(|_| reader.read_analog(1).unwrap()).collect();
        assert_eq!(reads, vec![0.25, 0.50, 0.75, 0.25, 0.50]);
        assert_eq!(reader.consumed(&Pin::parse("A1").unwrap()), 5);
    }

    #[test]
    fn test_unknown_pin() {
        let mut reader = CsvReader::from_text("A1\n0.5\n", true).unwrap();
        assert!(matches!(
            reader.read_analog(4),
            Err(ReadError::UnknownPin { .. })
        ));
    }

    #[test]
    fn test_invalid_cells() {
        assert!(matches!(
            CsvReader::from_text("A1\n1.5\n", false),
            Err(ReplayError::InvalidFormat(_))
        ));
        assert!(matches!(
            CsvReader::from_text("D2\nmaybe\n", false),
            Err(ReplayError::InvalidFormat(_))
        ));
        assert!(matches!(
            CsvReader::from_text("X9\n1\n", false),
            Err(ReplayError::InvalidFormat(_))
        ));
        assert!(matches!(
            CsvReader::from_text("A1,a1\n0.1,0.2\n", false),
            Err(ReplayError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_empty_dataset() {
        assert!(matches!(
            CsvReader::from_text("A1,D2\n", false),
            Err(ReplayError::EmptyDataset)
        ));
    }

    #[test]
    fn test_file_not_found() {
        assert!(matches!(
            CsvReader::from_path("/nonexistent/capture.csv", false),
            Err(ReplayError::FileNotFound(_))
        ));
    }
}
