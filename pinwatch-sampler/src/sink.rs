// Pinwatch Sampler - Persistence sinks
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sinks used by the sampler binary.
//!
//! [`HttpSink`] posts each record to a remote database endpoint and
//! [`LogSink`] only logs it. Both block; run them on the sampling thread,
//! never inside the async runtime.

use pinwatch::{ChangeRecord, PersistError, PersistenceSink, SinkReceipt};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info};

fn encode(record: &ChangeRecord) -> Result<String, PersistError> {
    record
        .encode()
        .map_err(|e| PersistError::Write(e.to_string()))
}

/// Posts records as JSON to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    url: String,
    auth_token: Option<String>,
}

impl HttpSink {
    /// Create a sink for `url`; each request gives up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PersistError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PersistError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            auth_token: None,
        })
    }

    /// Send `token` as a bearer credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PersistenceSink for HttpSink {
    fn persist(&mut self, record: &ChangeRecord) -> Result<SinkReceipt, PersistError> {
        let body = encode(record)?;

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| PersistError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response.text().unwrap_or_default();
        debug!("{} answered {}", self.url, status);

        if !status.is_success() {
            return Err(PersistError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.is_empty() {
            Ok(SinkReceipt::empty())
        } else {
            Ok(SinkReceipt::with_payload(text))
        }
    }
}

/// Logs records instead of storing them.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    logged: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records logged so far.
    pub fn logged(&self) -> u64 {
        self.logged
    }
}

impl PersistenceSink for LogSink {
    fn persist(&mut self, record: &ChangeRecord) -> Result<SinkReceipt, PersistError> {
        let line = encode(record)?;
        info!(target: "pinwatch::record", "{}", line);
        self.logged += 1;
        Ok(SinkReceipt::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use chrono::NaiveDate;
    use pinwatch::{SignalSnapshot, SignalValue};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(Option<String>, String)>>>;

    fn record() -> ChangeRecord {
        let mut snap = SignalSnapshot::from_names(&["A1", "D2"]).unwrap();
        snap.set("A1", SignalValue::Analog(307.4));
        snap.set("D2", SignalValue::Digital(true));
        let ts = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 31)
            .unwrap();
        ChangeRecord::from_snapshot(ts, "uno", &snap)
    }

    /// Serve `POST /samples` on a background runtime, answering `status`.
    fn spawn_server(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::clone(&captured);
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let app = Router::new().route(
                    "/samples",
                    post(move |headers: HeaderMap, body: String| {
                        let state = Arc::clone(&state);
                        async move {
                            let auth = headers
                                .get(AUTHORIZATION)
                                .and_then(|v| v.to_str().ok())
                                .map(String::from);
                            state.lock().unwrap().push((auth, body));
                            (status, "stored")
                        }
                    }),
                );
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        (format!("http://{}/samples", addr), captured)
    }

    #[test]
    fn test_http_sink_posts_record() {
        let (url, captured) = spawn_server(StatusCode::CREATED);
        let mut sink = HttpSink::new(url, Duration::from_secs(5))
            .unwrap()
            .with_token("secret");

        let receipt = sink.persist(&record()).unwrap();
        assert_eq!(receipt.payload.as_deref(), Some("stored"));

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].0.as_deref(), Some("Bearer secret"));
        assert_eq!(
            captured[0].1,
            r#"{"ts":"2021-01-01 00:00:31","src":"uno","A1":307,"D2":true}"#
        );
    }

    #[test]
    fn test_http_sink_keeps_record_precision() {
        let (url, captured) = spawn_server(StatusCode::OK);
        let mut sink = HttpSink::new(url, Duration::from_secs(5)).unwrap();

        sink.persist(&record().with_analog_decimals(1)).unwrap();

        let captured = captured.lock().unwrap();
        assert!(captured[0].1.contains(r#""A1":307.4,"#));
    }

    #[test]
    fn test_http_sink_rejected() {
        let (url, _captured) = spawn_server(StatusCode::UNPROCESSABLE_ENTITY);
        let mut sink = HttpSink::new(url, Duration::from_secs(5)).unwrap();

        match sink.persist(&record()) {
            Err(PersistError::Rejected { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "stored");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_http_sink_unreachable() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let mut sink =
            HttpSink::new(format!("http://{}/samples", addr), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            sink.persist(&record()),
            Err(PersistError::Transport(_))
        ));
    }

    #[test]
    fn test_log_sink() {
        let mut sink = LogSink::new();
        sink.persist(&record()).unwrap();
        sink.persist(&record()).unwrap();
        assert_eq!(sink.logged(), 2);
    }
}
