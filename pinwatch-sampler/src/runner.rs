// Pinwatch Sampler - Sampling loop
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! The blocking sampling loop and the state it shares with the server.

use crate::metrics;
use chrono::NaiveDateTime;
use pinwatch::{
    CancellableSleep, CycleReport, Pacer, PersistenceSink, PinReader, PinwatchError, ReadError,
    SamplingSession,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// State of the sampling loop, shared with HTTP handlers.
#[derive(Debug, Default)]
pub struct SamplerState {
    /// Completed cycles.
    pub cycles: AtomicU64,
    /// Cycles aborted by an error.
    pub errors: AtomicU64,
    /// Successful saves.
    pub saves: AtomicU64,
    /// Whether the loop is running.
    pub running: AtomicBool,
    latest: RwLock<Option<CycleReport>>,
}

impl SamplerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report of the most recent completed cycle.
    pub fn latest(&self) -> Option<CycleReport> {
        match self.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, report: CycleReport) {
        self.cycles.fetch_add(1, Ordering::SeqCst);
        if report.persist.is_saved() {
            self.saves.fetch_add(1, Ordering::SeqCst);
        }
        match self.latest.write() {
            Ok(mut guard) => *guard = Some(report),
            Err(poisoned) => *poisoned.into_inner() = Some(report),
        }
    }
}

/// Totals returned when the loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub errors: u64,
    pub saves: u64,
}

type Clock = Box<dyn FnMut() -> NaiveDateTime + Send>;

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Drives a [`SamplingSession`] until cancelled.
pub struct Runner<R, S> {
    session: SamplingSession,
    reader: R,
    sink: S,
    pacer: CancellableSleep,
    tick: Duration,
    max_cycles: Option<u64>,
    clock: Clock,
    state: std::sync::Arc<SamplerState>,
}

impl<R, S> Runner<R, S>
where
    R: PinReader,
    S: PersistenceSink,
{
    pub fn new(
        session: SamplingSession,
        reader: R,
        sink: S,
        pacer: CancellableSleep,
        state: std::sync::Arc<SamplerState>,
    ) -> Self {
        Self {
            session,
            reader,
            sink,
            pacer,
            tick: Duration::from_secs(1),
            max_cycles: None,
            clock: Box::new(local_now),
            state,
        }
    }

    /// Pause between cycles.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Stop after this many cycles, counting failed ones.
    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: impl FnMut() -> NaiveDateTime + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Run cycles until cancelled, the cycle limit is hit or the input
    /// runs out.
    pub fn run(mut self) -> RunSummary {
        self.state.running.store(true, Ordering::SeqCst);
        info!(
            "Sampling {} pins every {:?}",
            self.session.config().pins.len(),
            self.tick
        );

        let mut attempts: u64 = 0;
        loop {
            if self.max_cycles.is_some_and(|max| attempts >= max) {
                info!("Reached {} cycles", attempts);
                break;
            }
            attempts += 1;

            let now = (self.clock)();
            match self
                .session
                .tick(&mut self.reader, &mut self.pacer, &mut self.sink, now)
            {
                Ok(report) => {
                    debug!(
                        "cycle at {}: changed={} persist={}",
                        report.timestamp,
                        report.changed,
                        report.persist.label()
                    );
                    metrics::record_cycle(&report);
                    self.state.record(report);
                }
                Err(PinwatchError::Cancelled) => break,
                Err(PinwatchError::Read(ReadError::Exhausted { pin })) => {
                    info!("Input for {} exhausted, stopping", pin);
                    break;
                }
                Err(e) => {
                    warn!("Sampling cycle failed: {}", e);
                    metrics::record_cycle_error(&e);
                    self.state.errors.fetch_add(1, Ordering::SeqCst);
                }
            }

            if let Err(PinwatchError::Cancelled) = self.pacer.pause(self.tick) {
                break;
            }
        }

        self.state.running.store(false, Ordering::SeqCst);
        let summary = RunSummary {
            cycles: self.state.cycles.load(Ordering::SeqCst),
            errors: self.state.errors.load(Ordering::SeqCst),
            saves: self.state.saves.load(Ordering::SeqCst),
        };
        info!(
            "Sampling stopped after {} cycles ({} saves, {} errors)",
            summary.cycles, summary.saves, summary.errors
        );
        summary
    }
}
