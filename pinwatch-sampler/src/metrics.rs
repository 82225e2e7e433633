// Pinwatch Sampler - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for the sampling loop.

use lazy_static::lazy_static;
use pinwatch::{CycleReport, PinwatchError, SignalValue};
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter,
    CounterVec, Encoder, Gauge, GaugeVec, TextEncoder,
};

lazy_static! {
    // ============================================================
    // Signal Metrics
    // ============================================================

    /// Latest smoothed value per pin (a2d count, or 0/1 for digital).
    pub static ref PIN_VALUE: GaugeVec = register_gauge_vec!(
        "pinwatch_pin_value",
        "Latest smoothed pin value",
        &["pin", "kind"]
    ).expect("pinwatch_pin_value registers once");

    /// Reads the next analog pass will average.
    pub static ref ANALOG_SAMPLE_COUNT: Gauge = register_gauge!(
        "pinwatch_analog_sample_count",
        "Reads averaged per analog smoothing pass"
    ).expect("pinwatch_analog_sample_count registers once");

    /// Current minimum interval between saves.
    pub static ref SAVE_INTERVAL_SECONDS: Gauge = register_gauge!(
        "pinwatch_save_interval_seconds",
        "Minimum seconds between persisted saves"
    ).expect("pinwatch_save_interval_seconds registers once");

    // ============================================================
    // Event Counters
    // ============================================================

    /// Completed sampling cycles.
    pub static ref CYCLES_TOTAL: Counter = register_counter!(
        "pinwatch_cycles_total",
        "Completed sampling cycles"
    ).expect("pinwatch_cycles_total registers once");

    /// Cycles that detected a change, by pin.
    pub static ref CHANGES_TOTAL: CounterVec = register_counter_vec!(
        "pinwatch_changes_total",
        "Detected pin changes",
        &["pin"]
    ).expect("pinwatch_changes_total registers once");

    /// Persistence attempts by outcome.
    pub static ref PERSIST_TOTAL: CounterVec = register_counter_vec!(
        "pinwatch_persist_total",
        "Persistence attempts by outcome",
        &["outcome"]
    ).expect("pinwatch_persist_total registers once");

    /// Debounce passes that ran out of reads, by pin.
    pub static ref UNSETTLED_TOTAL: CounterVec = register_counter_vec!(
        "pinwatch_unsettled_total",
        "Digital reads that did not settle",
        &["pin"]
    ).expect("pinwatch_unsettled_total registers once");

    /// Cycles aborted by an error, by kind.
    pub static ref CYCLE_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "pinwatch_cycle_errors_total",
        "Sampling cycles aborted by an error",
        &["kind"]
    ).expect("pinwatch_cycle_errors_total registers once");
}

/// Update every metric from a finished cycle.
pub fn record_cycle(report: &CycleReport) {
    CYCLES_TOTAL.inc();

    for pin in &report.pins {
        let value = match pin.value {
            SignalValue::Analog(v) => v,
            SignalValue::Digital(level) => f64::from(u8::from(level)),
        };
        PIN_VALUE
            .with_label_values(&[pin.name.as_str(), pin.kind.as_str()])
            .set(value);
    }

    for name in &report.changed_pins {
        CHANGES_TOTAL.with_label_values(&[name.as_str()]).inc();
    }
    for name in &report.unsettled_pins {
        UNSETTLED_TOTAL.with_label_values(&[name.as_str()]).inc();
    }

    PERSIST_TOTAL
        .with_label_values(&[report.persist.label()])
        .inc();
    ANALOG_SAMPLE_COUNT.set(f64::from(report.analog_sample_count));
    SAVE_INTERVAL_SECONDS.set(report.min_save_interval_secs);
}

/// Count an aborted cycle.
pub fn record_cycle_error(error: &PinwatchError) {
    let kind = match error {
        PinwatchError::Config(_) => "config",
        PinwatchError::Read(_) => "read",
        PinwatchError::Cancelled => "cancelled",
    };
    CYCLE_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
