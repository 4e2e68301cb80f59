use std::path::Path;
use std::{env, fs, io};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Default location of the optional JSON config file.
pub const DEFAULT_CONFIG_PATH: &str = "ipintel.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the intelligence API, without trailing slash.
    pub api_base_url: String,
    /// Pre-shared key sent as `X-API-Key` on every request.
    pub api_key: String,
    /// File name offered for the CSV report.
    pub report_filename: String,
    /// Address the embedded UI listens on.
    pub bind: String,
    /// Per-request timeout. `None` leaves the transport default in place.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".to_string(),
            api_key: String::new(),
            report_filename: "ip_intelligence_report.csv".to_string(),
            bind: "127.0.0.1:8080".to_string(),
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    /// Load the JSON file at `path` (or `IPINTEL_CONFIG`, or the default path), then
    /// apply `IPINTEL_*` environment overrides.
    ///
    /// Only a missing file at the default path falls back to built-in defaults. A file
    /// named explicitly must be readable.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match env::var("IPINTEL_CONFIG") {
                Ok(p) => (p.into(), true),
                Err(_) => (DEFAULT_CONFIG_PATH.into(), false),
            },
        };
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(e) if !explicit && e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read config file {}", path.display()))
            }
        };
        let file_cfg: Option<ClientConfig> = raw
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        let mut cfg = file_cfg.unwrap_or_default();

        if let Ok(v) = env::var("IPINTEL_API_URL") {
            cfg.api_base_url = v;
        }
        if let Ok(v) = env::var("IPINTEL_API_KEY") {
            cfg.api_key = v;
        }
        if let Ok(v) = env::var("IPINTEL_BIND") {
            cfg.bind = v;
        }

        Ok(cfg.normalized())
    }

    /// Strip a trailing `/` from the base URL so paths can be appended directly.
    pub fn normalized(mut self) -> Self {
        while self.api_base_url.ends_with('/') {
            self.api_base_url.pop();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_removed() {
        let cfg = ClientConfig {
            api_base_url: "http://api.local:5000//".into(),
            ..Default::default()
        }
        .normalized();
        assert_eq!(cfg.api_base_url, "http://api.local:5000");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"report_filename": "out.csv"}"#).unwrap();
        let cfg = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.report_filename, "out.csv");
        assert!(cfg.request_timeout_ms.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, "{not json").unwrap();
        assert!(ClientConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = ClientConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn unreadable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClientConfig::load(Some(dir.path())).is_err());
    }
}
