//! Change detection.
//!
//! Two gates decide whether the current snapshot is worth persisting:
//!
//! 1. **Time gate**: nothing is evaluated until more than the minimum save
//!    interval has passed since the last save.
//! 2. **Value gate**: an analog pin changed when `|current - former|` reaches
//!    the noise threshold; a digital pin changed when it differs at all.
//!
//! Changed pins are copied into the former snapshot. The detector never
//! touches the last-save timestamp; that is the persistence step's job.

use serde::{Deserialize, Serialize};

use crate::pin::SignalValue;
use crate::snapshot::SignalSnapshot;

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeVerdict {
    /// Whether the time gate was open
    pub gate_open: bool,
    /// Names of pins that changed, in configured order
    pub changed_pins: Vec<String>,
}

impl ChangeVerdict {
    /// Verdict for a closed time gate
    pub fn gated() -> Self {
        Self {
            gate_open: false,
            changed_pins: Vec::new(),
        }
    }

    /// True if any pin changed
    pub fn changed(&self) -> bool {
        !self.changed_pins.is_empty()
    }
}

/// Stateless change detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeDetector {
    noise_threshold: f64,
}

impl ChangeDetector {
    /// Create a detector. A `noise_threshold` of 0 disables the analog gate.
    pub fn new(noise_threshold: f64) -> Self {
        Self { noise_threshold }
    }

    pub fn noise_threshold(&self) -> f64 {
        self.noise_threshold
    }

    /// Compare `current` against `former` and copy changed pins forward.
    ///
    /// `elapsed_secs` is the time since the last save; the value gate is
    /// only reached when it exceeds `min_interval_secs`.
    pub fn evaluate(
        &self,
        current: &SignalSnapshot,
        former: &mut SignalSnapshot,
        elapsed_secs: f64,
        min_interval_secs: f64,
    ) -> ChangeVerdict {
        if elapsed_secs <= min_interval_secs {
            return ChangeVerdict::gated();
        }

        let mut changed_pins = Vec::new();

        for pin in current.pins() {
            let Some(previous) = former.get(&pin.name) else {
                continue;
            };

            let changed = match (pin.value, previous) {
                (SignalValue::Analog(now), SignalValue::Analog(before)) => {
                    (now - before).abs() >= self.noise_threshold
                }
                (SignalValue::Digital(now), SignalValue::Digital(before)) => now != before,
                _ => false,
            };

            if changed {
                former.copy_from(current, &pin.name);
                changed_pins.push(pin.name.clone());
            }
        }

        ChangeVerdict {
            gate_open: true,
            changed_pins,
        }
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn pair() -> (SignalSnapshot, SignalSnapshot) {
        let names = ["A1", "D2", "D3"];
        let mut former = SignalSnapshot::from_names(&names).unwrap();
        let mut current = SignalSnapshot::from_names(&names).unwrap();

        former.set("A1", SignalValue::Analog(300.0));
        former.set("D2", SignalValue::Digital(true));
        former.set("D3", SignalValue::Digital(false));
        current.set("A1", SignalValue::Analog(307.0));
        current.set("D2", SignalValue::Digital(false));
        current.set("D3", SignalValue::Digital(true));
        (current, former)
    }

    #[test]
    fn test_changed_copies_forward() {
        let (current, mut former) = pair();
        let verdict = ChangeDetector::new(0.0).evaluate(&current, &mut former, 90.0, 30.0);

        assert!(verdict.gate_open);
        assert!(verdict.changed());
        assert_eq!(verdict.changed_pins, vec!["A1", "D2", "D3"]);
        assert_eq!(former.get("A1"), Some(SignalValue::Analog(307.0)));
        assert_eq!(former.get("D2"), Some(SignalValue::Digital(false)));
        assert_eq!(former.get("D3"), Some(SignalValue::Digital(true)));
        assert_eq!(former.pins(), current.pins());
    }

    #[test]
    fn test_time_gate_blocks() {
        let (current, mut former) = pair();
        let before = former.clone();
        let detector = ChangeDetector::new(0.0);

        let verdict = detector.evaluate(&current, &mut former, 30.0, 30.0);
        assert!(!verdict.gate_open);
        assert!(!verdict.changed());
        assert_eq!(former, before);

        let verdict = detector.evaluate(&current, &mut former, 10.0, 30.0);
        assert!(!verdict.changed());
    }

    #[test]
    fn test_time_gate_random_deltas() {
        let detector = ChangeDetector::new(0.0);
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let (mut current, mut former) = pair();
            current.set("A1", SignalValue::Analog(rng.gen_range(0.0..1023.0)));
            let interval: f64 = rng.gen_range(0.0..600.0);
            let elapsed = rng.gen_range(-5.0..=interval);
            assert!(!detector.evaluate(&current, &mut former, elapsed, interval).changed());
        }
    }

    #[test]
    fn test_noise_threshold() {
        let (mut current, mut former) = pair();
        current.set("D2", SignalValue::Digital(true));
        current.set("D3", SignalValue::Digital(false));

        // |307 - 300| = 7 is below the threshold
        let verdict = ChangeDetector::new(8.0).evaluate(&current, &mut former, 90.0, 30.0);
        assert!(verdict.gate_open);
        assert!(!verdict.changed());
        assert_eq!(former.get("A1"), Some(SignalValue::Analog(300.0)));

        // reaching the threshold counts
        let verdict = ChangeDetector::new(7.0).evaluate(&current, &mut former, 90.0, 30.0);
        assert_eq!(verdict.changed_pins, vec!["A1"]);
    }

    #[test]
    fn test_zero_threshold_counts_any_delta() {
        let (mut current, mut former) = pair();
        current.set("D2", SignalValue::Digital(true));
        current.set("D3", SignalValue::Digital(false));
        current.set("A1", SignalValue::Analog(300.5));

        let verdict = ChangeDetector::default().evaluate(&current, &mut former, 61.0, 60.0);
        assert_eq!(verdict.changed_pins, vec!["A1"]);
    }

    #[test]
    fn test_digital_only_change() {
        let (mut current, mut former) = pair();
        current.set("A1", SignalValue::Analog(300.0));
        current.set("D3", SignalValue::Digital(false));

        let verdict = ChangeDetector::new(1.0).evaluate(&current, &mut former, 61.0, 60.0);
        assert_eq!(verdict.changed_pins, vec!["D2"]);
        assert_eq!(former.get("D3"), Some(SignalValue::Digital(false)));
    }
}
