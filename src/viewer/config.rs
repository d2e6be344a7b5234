//! Configuration for the viewer

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::get_default_port;

/// Viewer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewerConfig {
    /// Hub base URL; the push channel lives at `<api_url>/ws`
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Seconds to wait before redialing a dropped push channel (default: 5)
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// REST request timeout in seconds (default: 10)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Enable debug mode (default: false)
    #[serde(default)]
    pub debug: bool,
}

fn default_api_url() -> String {
    format!("http://localhost:{}", get_default_port())
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    10
}

impl ViewerConfig {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            let home = dirs::home_dir()?;
            let default_path = home.join(".config/agentwatch/viewer.toml");
            if default_path.exists() {
                Some(default_path)
            } else {
                None
            }
        });

        if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            reconnect_delay_secs: default_reconnect_delay(),
            request_timeout_secs: default_request_timeout(),
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_url = \"http://hub.internal:9000\"").unwrap();
        writeln!(file, "debug = true").unwrap();

        let config = ViewerConfig::load(Some(file.path())).unwrap();

        assert_eq!(
            config,
            ViewerConfig {
                api_url: "http://hub.internal:9000".to_string(),
                debug: true,
                ..ViewerConfig::default()
            }
        );
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_points_at_local_hub() {
        let config = ViewerConfig::default();
        assert_eq!(config.api_url, "http://localhost:3001");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "reconnect_delay_secs = \"soon\"").unwrap();

        let err = ViewerConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        assert!(ViewerConfig::load(Some(&missing)).is_err());
    }
}
