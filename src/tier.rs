//! Threshold tables
//!
//! A [`ThresholdTable`] maps an analog magnitude to a control value. The
//! selected tier is the one with the smallest bound strictly greater than
//! the input. Inputs at or above the highest bound clamp to the highest tier.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One `(bound, value)` entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier<V> {
    /// Exclusive upper bound on the a2d magnitude
    pub bound: f64,
    /// Control value selected below `bound`
    pub value: V,
}

impl<V> Tier<V> {
    pub fn new(bound: f64, value: V) -> Self {
        Self { bound, value }
    }
}

/// Ordered tier table, sorted ascending by bound
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdTable<V> {
    name: &'static str,
    tiers: Vec<Tier<V>>,
}

impl<V: Copy> ThresholdTable<V> {
    /// Build a table from unsorted entries.
    ///
    /// Fails on an empty table, a non-finite bound or a repeated bound.
    pub fn new(
        name: &'static str,
        entries: impl IntoIterator<Item = Tier<V>>,
    ) -> Result<Self, ConfigError> {
        let mut tiers: Vec<Tier<V>> = entries.into_iter().collect();
        if tiers.is_empty() {
            return Err(ConfigError::EmptyTable { table: name });
        }
        if tiers.iter().any(|t| !t.bound.is_finite()) {
            return Err(ConfigError::NonFiniteBound { table: name });
        }

        tiers.sort_by(|a, b| a.bound.total_cmp(&b.bound));
        if let Some(pair) = tiers.windows(2).find(|w| w[0].bound == w[1].bound) {
            return Err(ConfigError::DuplicateBound {
                table: name,
                bound: pair[0].bound,
            });
        }

        Ok(Self { name, tiers })
    }

    /// Table name, used in log and error messages
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Tiers in ascending bound order
    pub fn tiers(&self) -> &[Tier<V>] {
        &self.tiers
    }

    /// Tier with the smallest bound strictly greater than `a2d`, if any
    pub fn lookup(&self, a2d: f64) -> Option<&Tier<V>> {
        let idx = self.tiers.partition_point(|t| t.bound <= a2d);
        self.tiers.get(idx)
    }

    /// Highest tier
    pub fn top(&self) -> &Tier<V> {
        // new() rejects empty tables
        &self.tiers[self.tiers.len() - 1]
    }

    /// Value for `a2d`, clamping to the highest tier when no bound exceeds it
    pub fn resolve(&self, a2d: f64) -> V {
        match self.lookup(a2d) {
            Some(tier) => tier.value,
            None => {
                log::debug!(
                    "{}: a2d {} at or above top bound {}, clamping",
                    self.name,
                    a2d,
                    self.top().bound
                );
                self.top().value
            }
        }
    }
}
