// Pinwatch - Adaptive pin sampling with change detection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sampling session
//!
//! [`SamplingSession`] owns everything one monitoring loop needs: the
//! configuration, the current and last-saved snapshots, and the adaptive
//! controller. Each call to [`SamplingSession::tick`] runs one cycle:
//!
//! ```text
//! collect_inputs ──► evaluate ──► persist (only when changed)
//!   smooth A*          time gate      mark saved
//!   retune             value gate     encode + sink
//!   debounce D*
//! ```
//!
//! The session is synchronous and single-owner. Callers that need a
//! background loop run it on a dedicated thread and pass a
//! [`CancellableSleep`](crate::reader::CancellableSleep) as the pacer.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::SessionConfig;
use crate::controller::{AdaptiveController, ControllerState};
use crate::detector::{ChangeDetector, ChangeVerdict};
use crate::error::Result;
use crate::filter::{AnalogFilter, DebounceFilter};
use crate::pin::{Pin, PinKind, SignalValue};
use crate::reader::{Pacer, PinReader};
use crate::record::{format_timestamp, ChangeRecord};
use crate::sink::{PersistenceSink, SinkReceipt};
use crate::snapshot::SignalSnapshot;

/// What happened to the cycle's record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PersistOutcome {
    /// Nothing changed, nothing was sent
    Skipped,
    /// The sink accepted the record
    Saved {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<String>,
    },
    /// The sink failed; session state was not rolled back
    Failed { error: String },
}

impl PersistOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistOutcome::Saved { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PersistOutcome::Failed { .. })
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            PersistOutcome::Skipped => "skipped",
            PersistOutcome::Saved { .. } => "saved",
            PersistOutcome::Failed { .. } => "failed",
        }
    }
}

impl From<SinkReceipt> for PersistOutcome {
    fn from(receipt: SinkReceipt) -> Self {
        PersistOutcome::Saved {
            payload: receipt.payload,
        }
    }
}

/// Summary of one cycle, suitable for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    /// Cycle timestamp in record format
    pub timestamp: String,
    /// Source identifier
    pub source: String,
    /// Current values in configured order
    pub pins: Vec<Pin>,
    /// Whether the time gate was open
    pub gate_open: bool,
    /// Whether any pin changed
    pub changed: bool,
    /// Names of changed pins
    pub changed_pins: Vec<String>,
    /// Digital pins that fell back to their previous level
    pub unsettled_pins: Vec<String>,
    /// Result of the save attempt
    pub persist: PersistOutcome,
    /// Reads the next analog pass will average
    pub analog_sample_count: u32,
    /// Minimum seconds between saves
    pub min_save_interval_secs: f64,
}

impl CycleReport {
    /// Current value of one pin
    pub fn value(&self, name: &str) -> Option<SignalValue> {
        self.pins.iter().find(|p| p.name == name).map(|p| p.value)
    }
}

/// One monitoring session
#[derive(Debug, Clone)]
pub struct SamplingSession {
    config: SessionConfig,
    current: SignalSnapshot,
    former: SignalSnapshot,
    controller: AdaptiveController,
    detector: ChangeDetector,
    analog_filter: AnalogFilter,
    debounce_filter: DebounceFilter,
}

impl SamplingSession {
    /// Validate `config` and build a session whose last save is `started_at`
    pub fn new(config: SessionConfig, started_at: NaiveDateTime) -> Result<Self> {
        config.validate()?;

        let current = SignalSnapshot::from_names(&config.pins)?;
        let former = current.clone();
        let controller = AdaptiveController::new(
            config.samples_table()?,
            config.interval_table()?,
            ControllerState {
                analog_sample_count: config.initial_analog_samples,
                min_save_interval_secs: config.initial_save_interval_secs,
                last_saved_at: started_at,
            },
        );
        let analog_filter = AnalogFilter::new(config.scale).with_read_delay(config.read_delay());
        let debounce_filter =
            DebounceFilter::new(config.debounce_run_length, config.debounce_max_reads)
                .with_read_delay(config.read_delay());

        log::info!(
            "session '{}' started with pins {:?}",
            config.source,
            config.pins
        );

        Ok(Self {
            detector: ChangeDetector::new(config.noise_threshold),
            config,
            current,
            former,
            controller,
            analog_filter,
            debounce_filter,
        })
    }

    /// Sample every pin into the current snapshot.
    ///
    /// Analog pins are smoothed first, each followed by a retune, then
    /// digital pins are debounced. A digital pin that does not settle keeps
    /// its previous level; its name is returned. The first read error
    /// aborts the pass, leaving pins already read updated.
    pub fn collect_inputs<R, P>(&mut self, reader: &mut R, pacer: &mut P) -> Result<Vec<String>>
    where
        R: PinReader + ?Sized,
        P: Pacer + ?Sized,
    {
        let layout: Vec<Pin> = self.current.pins().to_vec();

        for pin in layout.iter().filter(|p| p.kind == PinKind::Analog) {
            let a2d = self.analog_filter.smooth(
                reader,
                pacer,
                pin.index,
                self.controller.analog_sample_count(),
            )?;
            self.current.set(&pin.name, SignalValue::Analog(a2d));
            self.controller.retune(a2d);
        }

        let mut unsettled = Vec::new();
        for pin in layout.iter().filter(|p| p.kind == PinKind::Digital) {
            let fallback = self
                .current
                .get(&pin.name)
                .and_then(|v| v.as_digital())
                .unwrap_or(false);
            let result = self
                .debounce_filter
                .debounce(reader, pacer, pin.index, fallback)?;
            self.current.set(&pin.name, SignalValue::Digital(result.value));
            if !result.settled {
                unsettled.push(pin.name.clone());
            }
        }

        Ok(unsettled)
    }

    /// Run change detection against the last saved state
    pub fn evaluate(&mut self, now: NaiveDateTime) -> ChangeVerdict {
        let elapsed = self.controller.elapsed_secs(now);
        let interval = self.controller.min_save_interval_secs();
        let verdict = self
            .detector
            .evaluate(&self.current, &mut self.former, elapsed, interval);

        if !verdict.gate_open {
            log::debug!(
                "time gate closed: {:.1}s elapsed of {}s",
                elapsed,
                interval
            );
        } else if verdict.changed() {
            log::debug!("changed pins: {:?}", verdict.changed_pins);
        }

        verdict
    }

    /// Save the current snapshot.
    ///
    /// The save time is recorded before the sink is called and is kept even
    /// when the sink fails.
    pub fn persist<S>(&mut self, now: NaiveDateTime, sink: &mut S) -> PersistOutcome
    where
        S: PersistenceSink + ?Sized,
    {
        self.controller.mark_saved(now);
        self.former.saved_at = Some(now);

        let record = ChangeRecord::from_snapshot(now, self.config.source.as_str(), &self.current)
            .with_analog_decimals(self.config.analog_decimals);
        let encoded = match record.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("record at {} not encodable: {}", format_timestamp(now), e);
                return PersistOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match sink.persist(&record) {
            Ok(receipt) => {
                log::info!("saved {}", encoded);
                receipt.into()
            }
            Err(e) => {
                log::warn!("failed to save {}: {}", encoded, e);
                PersistOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Run one full cycle at `now`
    pub fn tick<R, P, S>(
        &mut self,
        reader: &mut R,
        pacer: &mut P,
        sink: &mut S,
        now: NaiveDateTime,
    ) -> Result<CycleReport>
    where
        R: PinReader + ?Sized,
        P: Pacer + ?Sized,
        S: PersistenceSink + ?Sized,
    {
        let unsettled_pins = self.collect_inputs(reader, pacer)?;
        let verdict = self.evaluate(now);

        let persist = if verdict.changed() {
            self.persist(now, sink)
        } else {
            PersistOutcome::Skipped
        };

        Ok(CycleReport {
            timestamp: format_timestamp(now),
            source: self.config.source.clone(),
            pins: self.current.pins().to_vec(),
            gate_open: verdict.gate_open,
            changed: verdict.changed(),
            changed_pins: verdict.changed_pins,
            unsettled_pins,
            persist,
            analog_sample_count: self.controller.analog_sample_count(),
            min_save_interval_secs: self.controller.min_save_interval_secs(),
        })
    }

    /// Most recently sampled values
    pub fn current(&self) -> &SignalSnapshot {
        &self.current
    }

    /// Values as of the last detected change
    pub fn former(&self) -> &SignalSnapshot {
        &self.former
    }

    pub fn controller(&self) -> &AdaptiveController {
        &self.controller
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// When the last save was recorded
    pub fn last_saved_at(&self) -> NaiveDateTime {
        self.controller.last_saved_at()
    }
}
