// Pinwatch - Adaptive pin sampling with change detection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Integration tests for the sampling session
//!
//! These tests drive full cycles through scripted readers and in-memory
//! sinks and check the behaviour across several ticks.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pinwatch::*;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Mock deployment: every tier maps to 10 samples and 30 seconds
fn mock_config() -> SessionConfig {
    SessionConfig {
        source: "test".to_string(),
        pins: vec!["A1".into(), "D2".into(), "D3".into()],
        analog_samples_table: vec![
            Tier::new(25.0, 10),
            Tier::new(50.0, 10),
            Tier::new(100.0, 10),
            Tier::new(2048.0, 10),
        ],
        save_interval_table: vec![
            Tier::new(30.0, 30.0),
            Tier::new(100.0, 30.0),
            Tier::new(200.0, 30.0),
            Tier::new(2048.0, 30.0),
        ],
        read_delay_ms: 0,
        ..SessionConfig::default()
    }
}

/// Ten reads symmetric around zero, biased so they sum to 3
fn biased_reads() -> Vec<f64> {
    let mut reads: Vec<f64> = (-5..=5).filter(|v| *v != 0).map(f64::from).collect();
    reads[9] += 3.0;
    reads
}

fn mock_reader() -> ScriptedReader {
    let mut d2 = String::from("1100");
    d2.push_str(&"1".repeat(60));
    let mut d3 = String::from("1100");
    d3.push_str(&"0".repeat(60));

    ScriptedReader::new()
        .looping()
        .with_analog(1, biased_reads())
        .with_digital_bits(2, &d2)
        .with_digital_bits(3, &d3)
}

// ============================================================================
// Section 1: Golden record
// ============================================================================

#[test]
fn test_golden_record_through_session() {
    let mut session = SamplingSession::new(mock_config(), start()).unwrap();
    session
        .collect_inputs(&mut mock_reader(), &mut NoPause)
        .unwrap();

    let record = ChangeRecord::from_snapshot(start(), "test", session.current());
    assert_eq!(
        record.encode().unwrap(),
        r#"{"ts":"2021-01-01 00:00:00","src":"test","A1":307,"D2":true,"D3":false}"#
    );
}

#[test]
fn test_json_lines_output() {
    let mut session = SamplingSession::new(mock_config(), start()).unwrap();
    let mut sink = JsonLinesSink::new(Vec::new());
    let mut reader = mock_reader();

    for minute in 1..=3 {
        let now = start() + Duration::minutes(minute);
        let report = session
            .tick(&mut reader, &mut NoPause, &mut sink, now)
            .unwrap();
        assert!(report.persist.is_saved());
    }

    let text = String::from_utf8(sink.into_inner()).unwrap();
    let first = text.lines().next().unwrap();
    assert_eq!(
        first,
        r#"{"ts":"2021-01-01 00:01:00","src":"test","A1":307,"D2":true,"D3":false}"#
    );
}

#[test]
fn test_configured_precision_reaches_every_sink() {
    let config = SessionConfig {
        analog_decimals: 1,
        ..mock_config()
    };
    let now = start() + Duration::minutes(1);
    let expected = r#"{"ts":"2021-01-01 00:01:00","src":"test","A1":307.0,"D2":true,"D3":false}"#;

    let mut memory = MemorySink::new();
    SamplingSession::new(config.clone(), start())
        .unwrap()
        .tick(&mut mock_reader(), &mut NoPause, &mut memory, now)
        .unwrap();
    assert_eq!(memory.last(), Some(expected));

    let mut lines = JsonLinesSink::new(Vec::new());
    SamplingSession::new(config, start())
        .unwrap()
        .tick(&mut mock_reader(), &mut NoPause, &mut lines, now)
        .unwrap();
    let text = String::from_utf8(lines.into_inner()).unwrap();
    assert_eq!(text.trim_end(), expected);
}

// ============================================================================
// Section 2: Time gating across ticks
// ============================================================================

#[test]
fn test_time_gate_across_ticks() {
    let mut config = mock_config();
    config.noise_threshold = 1.0;
    let mut session = SamplingSession::new(config, start()).unwrap();
    let mut reader = mock_reader();
    let mut sink = MemorySink::new();

    // 10s: inside the 30s interval
    let report = session
        .tick(&mut reader, &mut NoPause, &mut sink, start() + Duration::seconds(10))
        .unwrap();
    assert!(!report.gate_open);

    // 31s: gate opens, everything differs from the initial state
    let saved_at = start() + Duration::seconds(31);
    let report = session
        .tick(&mut reader, &mut NoPause, &mut sink, saved_at)
        .unwrap();
    assert!(report.changed);
    assert_eq!(report.changed_pins, vec!["A1", "D2"]);
    assert_eq!(session.last_saved_at(), saved_at);

    // 50s: gated again relative to the new save
    let report = session
        .tick(&mut reader, &mut NoPause, &mut sink, start() + Duration::seconds(50))
        .unwrap();
    assert!(!report.gate_open);

    // 120s: gate open but the signal is unchanged
    let report = session
        .tick(&mut reader, &mut NoPause, &mut sink, start() + Duration::seconds(120))
        .unwrap();
    assert!(report.gate_open);
    assert!(!report.changed);
    assert_eq!(report.persist, PersistOutcome::Skipped);

    assert_eq!(sink.len(), 1);
    assert_eq!(session.last_saved_at(), saved_at);
}

#[test]
fn test_zero_threshold_saves_every_open_gate() {
    let mut session = SamplingSession::new(mock_config(), start()).unwrap();
    let mut reader = mock_reader();
    let mut sink = MemorySink::new();

    for step in 1..=4 {
        let now = start() + Duration::seconds(31 * step);
        let report = session
            .tick(&mut reader, &mut NoPause, &mut sink, now)
            .unwrap();
        assert!(report.changed_pins.contains(&"A1".to_string()));
    }
    assert_eq!(sink.len(), 4);
}

// ============================================================================
// Section 3: Failure handling
// ============================================================================

#[test]
fn test_failed_persist_is_not_rolled_back() {
    let mut session = SamplingSession::new(mock_config(), start()).unwrap();
    let mut reader = mock_reader();
    let mut sink = MemorySink::new();
    sink.fail_with(PersistError::Transport("connection refused".into()));

    let failed_at = start() + Duration::seconds(40);
    let report = session
        .tick(&mut reader, &mut NoPause, &mut sink, failed_at)
        .unwrap();

    match &report.persist {
        PersistOutcome::Failed { error } => assert!(error.contains("connection refused")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(session.last_saved_at(), failed_at);
    assert_eq!(session.former().get("D2"), Some(SignalValue::Digital(true)));

    // Next tick within the interval is gated even though nothing was stored
    sink.recover();
    let report = session
        .tick(&mut reader, &mut NoPause, &mut sink, failed_at + Duration::seconds(5))
        .unwrap();
    assert!(!report.gate_open);
    assert!(sink.is_empty());
}

#[test]
fn test_read_failure_propagates() {
    let mut session = SamplingSession::new(mock_config(), start()).unwrap();
    let mut reader = ScriptedReader::new().with_analog(1, [0.5, 0.5]);
    let mut sink = MemorySink::new();

    let err = session
        .tick(&mut reader, &mut NoPause, &mut sink, start() + Duration::minutes(5))
        .unwrap_err();

    assert_eq!(
        err,
        PinwatchError::Read(ReadError::Exhausted {
            pin: "A1".to_string()
        })
    );
    assert!(sink.is_empty());
    assert_eq!(session.last_saved_at(), start());
}

#[test]
fn test_cancellation_aborts_cycle() {
    let mut config = mock_config();
    config.read_delay_ms = 50;
    let mut session = SamplingSession::new(config, start()).unwrap();

    let token = CancelToken::new();
    token.cancel();
    let mut pacer = CancellableSleep::new(token);

    let err = session
        .tick(
            &mut mock_reader(),
            &mut pacer,
            &mut MemorySink::new(),
            start() + Duration::minutes(5),
        )
        .unwrap_err();
    assert_eq!(err, PinwatchError::Cancelled);
}

// ============================================================================
// Section 4: Adaptive control
// ============================================================================

#[test]
fn test_sample_count_follows_signal() {
    let config = SessionConfig {
        pins: vec!["A0".into()],
        read_delay_ms: 0,
        ..SessionConfig::default()
    };
    let mut session = SamplingSession::new(config, start()).unwrap();
    let mut sink = MemorySink::new();

    // a2d 10: 100 samples, 300s interval
    let mut low = ScriptedReader::new().looping().with_analog(0, [10.0 / 1023.0]);
    let report = session
        .tick(&mut low, &mut NoPause, &mut sink, start() + Duration::seconds(1))
        .unwrap();
    assert_eq!(report.analog_sample_count, 100);
    assert_eq!(report.min_save_interval_secs, 300.0);
    assert_eq!(report.value("A0"), Some(SignalValue::Analog(10.0)));

    // next pass averages 100 reads
    let mut mid = ScriptedReader::new().looping().with_analog(0, [307.0 / 1023.0]);
    session
        .tick(&mut mid, &mut NoPause, &mut sink, start() + Duration::seconds(2))
        .unwrap();
    assert_eq!(mid.consumed(&Pin::parse("A0").unwrap()), 100);
    assert_eq!(session.controller().analog_sample_count(), 25);
    assert_eq!(session.controller().min_save_interval_secs(), 30.0);
}

#[test]
fn test_config_file_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(
        &path,
        r#"{
            "source": "bench",
            "pins": ["D7"],
            "debounce_run_length": 2,
            "debounce_max_reads": 4,
            "read_delay_ms": 0
        }"#,
    )
    .unwrap();

    let config = SessionConfig::from_file(&path).unwrap();
    let mut session = SamplingSession::new(config, start()).unwrap();
    let mut reader = ScriptedReader::new().with_digital_bits(7, "0101");
    let unsettled = session.collect_inputs(&mut reader, &mut NoPause).unwrap();

    assert_eq!(unsettled, vec!["D7"]);
    assert_eq!(session.current().get("D7"), Some(SignalValue::Digital(false)));
}
