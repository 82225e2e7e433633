// Pinwatch Sampler - Settings
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sampler settings: the session configuration plus deployment details.
//!
//! Settings come from an optional JSON file; command-line flags override
//! individual values afterwards.

use pinwatch::{ConfigError, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Sampling session configuration.
    #[serde(flatten)]
    pub session: SessionConfig,

    /// Endpoint that receives change records. Records are only logged when
    /// absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_url: Option<String>,

    /// Bearer token sent with each record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Pause between cycles, in milliseconds.
    pub tick_ms: u64,

    /// Status server port.
    pub port: u16,

    /// Timeout for one persistence request, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            db_url: None,
            auth_token: None,
            tick_ms: 1_000,
            port: 9_110,
            request_timeout_ms: 5_000,
        }
    }
}

impl SamplerSettings {
    /// Load settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check the session part and the sampler-only fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        if let Some(url) = &self.db_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "db_url",
                    reason: format!("'{}' is not an http(s) URL", url),
                });
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SamplerSettings::default();
        assert_eq!(settings.session.source, "uno");
        assert!(settings.db_url.is_none());
        assert_eq!(settings.tick(), Duration::from_secs(1));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_flattened_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampler.json");
        std::fs::write(
            &path,
            r#"{
                "source": "coop",
                "pins": ["A0", "D7"],
                "noise_threshold": 4,
                "db_url": "http://localhost:8000/samples",
                "auth_token": "secret",
                "tick_ms": 250
            }"#,
        )
        .unwrap();

        let settings = SamplerSettings::from_file(&path).unwrap();
        assert_eq!(settings.session.source, "coop");
        assert_eq!(settings.session.pins, vec!["A0", "D7"]);
        assert_eq!(settings.session.noise_threshold, 4.0);
        assert_eq!(settings.session.debounce_run_length, 5);
        assert_eq!(settings.db_url.as_deref(), Some("http://localhost:8000/samples"));
        assert_eq!(settings.tick_ms, 250);
        assert_eq!(settings.port, 9_110);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let settings = SamplerSettings {
            db_url: Some("localhost:8000".to_string()),
            ..SamplerSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { field: "db_url", .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SamplerSettings::from_file("/nonexistent/sampler.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
