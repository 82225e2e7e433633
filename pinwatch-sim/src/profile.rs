// Pinwatch Sim - Board profiles
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! JSON description of a simulated board.
//!
//! ```json
//! {
//!   "seed": 42,
//!   "analog": [
//!     {"pin": "A1", "pattern": {"type": "constant", "level": 0.3}, "noise_std": 0.02}
//!   ],
//!   "digital": [
//!     {"pin": "D2", "pattern": {"type": "bounce", "level": true, "bounce_reads": 4}}
//!   ]
//! }
//! ```

use pinwatch::{Pin, PinKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::board::{AnalogChannel, SimulatedBoard};
use crate::error::SimError;
use crate::patterns::{AnalogPattern, DigitalPattern};

/// One simulated analog pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogSpec {
    /// Pin name, e.g. `A1`.
    pub pin: String,
    /// Signal shape.
    pub pattern: AnalogPattern,
    /// Gaussian noise standard deviation.
    #[serde(default)]
    pub noise_std: f64,
    /// Probability that a read fails.
    #[serde(default)]
    pub dropout_probability: f64,
}

/// One simulated digital pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalSpec {
    /// Pin name, e.g. `D2`.
    pub pin: String,
    /// Signal shape.
    pub pattern: DigitalPattern,
}

/// Complete board description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimProfile {
    /// Random seed; entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub analog: Vec<AnalogSpec>,
    #[serde(default)]
    pub digital: Vec<DigitalSpec>,
}

impl SimProfile {
    /// Parse a profile from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a profile from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Profile for the default three-pin deployment: a slow sine on A1,
    /// a bouncing switch on D2 and a chattering line on D3.
    pub fn demo() -> Self {
        Self {
            seed: Some(42),
            analog: vec![AnalogSpec {
                pin: "A1".to_string(),
                pattern: AnalogPattern::slow_sine(20_000),
                noise_std: 0.01,
                dropout_probability: 0.0,
            }],
            digital: vec![
                DigitalSpec {
                    pin: "D2".to_string(),
                    pattern: DigitalPattern::Bounce {
                        level: true,
                        bounce_reads: 4,
                    },
                },
                DigitalSpec {
                    pin: "D3".to_string(),
                    pattern: DigitalPattern::Chatter {
                        level: false,
                        flip_probability: 0.05,
                    },
                },
            ],
        }
    }

    /// Names of every simulated pin, analog first.
    pub fn pin_names(&self) -> Vec<String> {
        self.analog
            .iter()
            .map(|a| a.pin.clone())
            .chain(self.digital.iter().map(|d| d.pin.clone()))
            .collect()
    }

    /// Build the board.
    pub fn build(&self) -> Result<SimulatedBoard, SimError> {
        let mut board = match self.seed {
            Some(seed) => SimulatedBoard::with_seed(seed),
            None => SimulatedBoard::from_entropy(),
        };

        for spec in &self.analog {
            let pin = parse_kind(&spec.pin, PinKind::Analog)?;
            let channel = AnalogChannel::new(spec.pattern.clone())
                .with_noise(spec.noise_std)
                .with_dropout(spec.dropout_probability);
            board = board.with_analog(pin.index, channel)?;
        }

        for spec in &self.digital {
            let pin = parse_kind(&spec.pin, PinKind::Digital)?;
            board = board.with_digital(pin.index, spec.pattern.clone())?;
        }

        Ok(board)
    }
}

fn parse_kind(name: &str, kind: PinKind) -> Result<Pin, SimError> {
    let pin = Pin::parse(name)?;
    if pin.kind != kind {
        return Err(SimError::WrongKind {
            pin: pin.name,
            expected: kind.as_str(),
        });
    }
    Ok(pin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinwatch::PinReader;

    const PROFILE: &str = r#"{
        "seed": 42,
        "analog": [
            {"pin": "A1", "pattern": {"type": "constant", "level": 0.3}, "noise_std": 0.02}
        ],
        "digital": [
            {"pin": "D2", "pattern": {"type": "bounce", "level": true, "bounce_reads": 4}},
            {"pin": "D3", "pattern": {"type": "steady", "level": false}}
        ]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let profile = SimProfile::from_json(PROFILE).unwrap();
        assert_eq!(profile.seed, Some(42));
        assert_eq!(profile.pin_names(), vec!["A1", "D2", "D3"]);

        let mut board = profile.build().unwrap();
        let level = board.read_analog(1).unwrap();
        assert!((0.0..=1.0).contains(&level));
        assert!(!board.read_digital(3).unwrap());
    }

    #[test]
    fn test_wrong_kind() {
        let mut profile = SimProfile::from_json(PROFILE).unwrap();
        profile.digital[0].pin = "A4".to_string();
        assert!(matches!(
            profile.build(),
            Err(SimError::WrongKind { expected: "digital", .. })
        ));
    }

    #[test]
    fn test_bad_pin_name() {
        let mut profile = SimProfile::from_json(PROFILE).unwrap();
        profile.analog[0].pin = "Z1".to_string();
        assert!(matches!(profile.build(), Err(SimError::Pin(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        std::fs::write(&path, serde_json::to_string_pretty(&SimProfile::demo()).unwrap()).unwrap();

        let loaded = SimProfile::from_file(&path).unwrap();
        assert_eq!(loaded, SimProfile::demo());
        assert!(loaded.build().is_ok());

        assert!(matches!(
            SimProfile::from_file(dir.path().join("missing.json")),
            Err(SimError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            SimProfile::from_json("{\"analog\": 3}"),
            Err(SimError::Json(_))
        ));
    }
}
