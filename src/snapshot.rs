//! Signal snapshots
//!
//! A [`SignalSnapshot`] holds one value per configured pin, in configured
//! order. The pin set is fixed at construction: writes to unknown pins or
//! with a value of the wrong kind are rejected.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pin::{Pin, SignalValue};

/// Values of every configured pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pins: Vec<Pin>,
    /// When this state was last persisted
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub saved_at: Option<NaiveDateTime>,
}

impl SignalSnapshot {
    /// Build a snapshot from pin names, each starting at its initial value.
    ///
    /// Fails on an empty list, an unparseable name, or a repeated pin.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Err(ConfigError::NoPins);
        }

        let mut pins: Vec<Pin> = Vec::with_capacity(names.len());
        for name in names {
            let pin = Pin::parse(name.as_ref())?;
            if pins
                .iter()
                .any(|p| p.name == pin.name || (p.kind == pin.kind && p.index == pin.index))
            {
                return Err(ConfigError::DuplicatePin(pin.name));
            }
            pins.push(pin);
        }

        Ok(Self {
            pins,
            saved_at: None,
        })
    }

    /// Pins in configured order
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Analog pins in configured order
    pub fn analog_pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.is_analog())
    }

    /// Digital pins in configured order
    pub fn digital_pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.is_digital())
    }

    /// Look up a pin by name
    pub fn pin(&self, name: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.name == name)
    }

    /// Value of a pin by name
    pub fn get(&self, name: &str) -> Option<SignalValue> {
        self.pin(name).map(|p| p.value)
    }

    /// Set a pin's value.
    ///
    /// Returns `false` when the pin is unknown or `value` has the wrong kind;
    /// the snapshot is left untouched in that case.
    pub fn set(&mut self, name: &str, value: SignalValue) -> bool {
        match self.pins.iter_mut().find(|p| p.name == name) {
            Some(pin) if pin.kind == value.kind() => {
                pin.value = value;
                true
            }
            _ => false,
        }
    }

    /// Copy one pin's value from `other`
    pub fn copy_from(&mut self, other: &SignalSnapshot, name: &str) -> bool {
        match other.get(name) {
            Some(value) => self.set(name, value),
            None => false,
        }
    }

    /// Number of pins
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Always false for a constructed snapshot
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Iterate `(name, value)` pairs in configured order
    pub fn iter(&self) -> impl Iterator<Item = (&str, SignalValue)> {
        self.pins.iter().map(|p| (p.name.as_str(), p.value))
    }
}
