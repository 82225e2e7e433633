// Pinwatch Sampler - Sampling daemon with status server
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Pinwatch Sampler
//!
//! Runs a sampling session against a simulated board or a captured CSV,
//! persists change records and serves Prometheus metrics.
//!
//! ## Usage
//!
//! ```bash
//! # Demo board, records logged
//! pinwatch-sampler
//!
//! # Replay a capture and post records to a database endpoint
//! pinwatch-sampler --replay capture.csv --db-url http://localhost:8000/samples
//!
//! # Simulated board from a profile, records appended to a file
//! pinwatch-sampler --profile board.json --jsonl records.jsonl --port 9110
//! ```

mod metrics;
mod replay;
mod runner;
mod settings;
mod sink;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use clap::Parser;
use metrics::encode_metrics;
use pinwatch::{
    CancelToken, CancellableSleep, CycleReport, JsonLinesSink, PersistenceSink, PinReader,
    SamplingSession,
};
use pinwatch_sim::SimProfile;
use replay::CsvReader;
use runner::{RunSummary, Runner, SamplerState};
use serde::Serialize;
use settings::SamplerSettings;
use sink::{HttpSink, LogSink};
use std::error::Error;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn Error + Send + Sync>;

/// Pinwatch sampling daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated board profile (JSON)
    #[arg(long, conflicts_with = "replay")]
    profile: Option<PathBuf>,

    /// Captured reads to replay (CSV)
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Stop when the replay reaches its end instead of looping
    #[arg(long, requires = "replay")]
    replay_once: bool,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Endpoint receiving change records
    #[arg(long)]
    db_url: Option<String>,

    /// Bearer token for the endpoint
    #[arg(long)]
    token: Option<String>,

    /// Append records to this file as JSON lines
    #[arg(long, conflicts_with = "db_url")]
    jsonl: Option<PathBuf>,

    /// Pause between cycles in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Where change records go.
#[derive(Debug, Clone)]
enum SinkPlan {
    Http {
        url: String,
        token: Option<String>,
        timeout: std::time::Duration,
    },
    JsonLines(PathBuf),
    Log,
}

/// Application state shared across handlers.
struct AppState {
    sampler: Arc<SamplerState>,
    settings: SamplerSettings,
    input: String,
    start_time: std::time::Instant,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Pinwatch Sampler v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = match &args.config {
        Some(path) => SamplerSettings::from_file(path)?,
        None => SamplerSettings::default(),
    };
    apply_overrides(&mut settings, &args);

    let (reader, input, input_pins) = open_input(&args)?;
    if args.config.is_none() {
        settings.session.pins = input_pins;
    }
    settings.validate()?;
    info!("Input: {}", input);

    let plan = sink_plan(&settings, &args);
    let session = SamplingSession::new(
        settings.session.clone(),
        chrono::Local::now().naive_local(),
    )?;

    let token = CancelToken::new();
    let sampler = Arc::new(SamplerState::new());
    let (done_tx, done_rx) = oneshot::channel::<RunSummary>();

    // reqwest's blocking client must live outside the async runtime
    let sampler_thread = {
        let token = token.clone();
        let sampler = Arc::clone(&sampler);
        let tick = settings.tick();
        let max_cycles = args.cycles;
        std::thread::Builder::new()
            .name("pinwatch-sampler".to_string())
            .spawn(move || {
                let summary = match build_sink(&plan) {
                    Ok(sink) => Runner::new(
                        session,
                        reader,
                        sink,
                        CancellableSleep::new(token),
                        sampler,
                    )
                    .with_tick(tick)
                    .with_max_cycles(max_cycles)
                    .run(),
                    Err(e) => {
                        error!("Failed to open sink: {}", e);
                        RunSummary {
                            cycles: 0,
                            errors: 1,
                            saves: 0,
                        }
                    }
                };
                let _ = done_tx.send(summary);
            })?
    };

    // Create app state
    let state = Arc::new(AppState {
        sampler,
        settings: settings.clone(),
        input,
        start_time: std::time::Instant::now(),
    });

    // Build router
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    let listener = TcpListener::bind(addr).await?;
    let shutdown_token = token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
                summary = done_rx => {
                    if let Ok(summary) = summary {
                        info!("Sampler finished: {} cycles, {} saves", summary.cycles, summary.saves);
                    }
                }
            }
            shutdown_token.cancel();
        })
        .await?;

    token.cancel();
    match tokio::task::spawn_blocking(move || sampler_thread.join()).await {
        Ok(Ok(())) => {}
        _ => warn!("Sampler thread did not exit cleanly"),
    }
    Ok(())
}

fn apply_overrides(settings: &mut SamplerSettings, args: &Args) {
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(url) = &args.db_url {
        settings.db_url = Some(url.clone());
    }
    if let Some(token) = &args.token {
        settings.auth_token = Some(token.clone());
    }
    if let Some(tick_ms) = args.tick_ms {
        settings.tick_ms = tick_ms;
    }
}

/// Open the pin source: a replay, a profile, or the demo board.
fn open_input(args: &Args) -> Result<(Box<dyn PinReader + Send>, String, Vec<String>), BoxError> {
    if let Some(path) = &args.replay {
        let reader = CsvReader::from_path(path, !args.replay_once)?;
        let pins = reader.pin_names();
        return Ok((
            Box::new(reader),
            format!("replay {}", path.display()),
            pins,
        ));
    }

    let (profile, label) = match &args.profile {
        Some(path) => (
            SimProfile::from_file(path)?,
            format!("simulated board {}", path.display()),
        ),
        None => (SimProfile::demo(), "demo board".to_string()),
    };
    let pins = profile.pin_names();
    Ok((Box::new(profile.build()?), label, pins))
}

fn sink_plan(settings: &SamplerSettings, args: &Args) -> SinkPlan {
    if let Some(path) = &args.jsonl {
        return SinkPlan::JsonLines(path.clone());
    }
    match &settings.db_url {
        Some(url) => SinkPlan::Http {
            url: url.clone(),
            token: settings.auth_token.clone(),
            timeout: settings.request_timeout(),
        },
        None => SinkPlan::Log,
    }
}

fn build_sink(plan: &SinkPlan) -> Result<Box<dyn PersistenceSink>, BoxError> {
    match plan {
        SinkPlan::Http { url, token, timeout } => {
            info!("Posting records to {}", url);
            let mut sink = HttpSink::new(url.clone(), *timeout)?;
            if let Some(token) = token {
                sink = sink.with_token(token.clone());
            }
            Ok(Box::new(sink))
        }
        SinkPlan::JsonLines(path) => {
            info!("Appending records to {}", path.display());
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Box::new(JsonLinesSink::new(BufWriter::new(file))))
        }
        SinkPlan::Log => {
            warn!("No database configured, records are only logged");
            Ok(Box::new(LogSink::new()))
        }
    }
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Pinwatch Sampler</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #2c3e50; }
        a { color: #3498db; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { margin: 10px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>Pinwatch Sampler</h1>
    <p>Samples microcontroller pins and saves a record whenever they change.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div class="endpoint"><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><a href="/health">/health</a> - Health check</div>
        <div class="endpoint"><a href="/ready">/ready</a> - Readiness check</div>
        <div class="endpoint"><a href="/status">/status</a> - Latest cycle (JSON)</div>
    </div>

    <h2>Metrics</h2>
    <ul>
        <li><code>pinwatch_pin_value</code> - Latest smoothed value per pin</li>
        <li><code>pinwatch_analog_sample_count</code> - Reads per analog pass</li>
        <li><code>pinwatch_save_interval_seconds</code> - Minimum seconds between saves</li>
        <li><code>pinwatch_changes_total</code> - Detected changes per pin</li>
        <li><code>pinwatch_persist_total</code> - Save attempts by outcome</li>
        <li><code>pinwatch_cycle_errors_total</code> - Aborted cycles</li>
    </ul>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = encode_metrics();
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler.
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.sampler.running.load(Ordering::SeqCst) {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
    }
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    source: String,
    input: String,
    pins: Vec<String>,
    running: bool,
    cycles: u64,
    saves: u64,
    errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<CycleReport>,
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let sampler = &state.sampler;
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        source: state.settings.session.source.clone(),
        input: state.input.clone(),
        pins: state.settings.session.pins.clone(),
        running: sampler.running.load(Ordering::SeqCst),
        cycles: sampler.cycles.load(Ordering::SeqCst),
        saves: sampler.saves.load(Ordering::SeqCst),
        errors: sampler.errors.load(Ordering::SeqCst),
        latest: sampler.latest(),
    })
}
