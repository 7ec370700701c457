//! TOML configuration for the relay daemon
//!
//! Every section and key is optional; a missing file section falls back to
//! the defaults below. Command-line flags are applied on top with
//! [`RelayConfig::apply_overrides`].
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [auth]
//! api_key = "change-me"
//! header = "x-api-key"
//!
//! [backend]
//! default_url = "http://localhost:8080"
//! forward_timeout_ms = 5000
//!
//! [registry]
//! sweep_interval_secs = 60
//! stale_after_secs = 300
//! default_display_name = "Unknown device"
//!
//! [assistant]
//! client_id = "living-room"
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use camrelay_api::DEFAULT_API_KEY_HEADER;
use camrelay_core::DEFAULT_DISPLAY_NAME;
use serde::Deserialize;
use url::Url;

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Shared-secret settings for the protected routes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret expected on protected routes; unset leaves them open
    pub api_key: Option<String>,
    /// Header the secret is read from
    pub header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            header: DEFAULT_API_KEY_HEADER.to_string(),
        }
    }
}

/// Where commands go when no registered device matches
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub default_url: String,
    pub forward_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            default_url: "http://localhost:8080".to_string(),
            forward_timeout_ms: 5000,
        }
    }
}

/// Registry expiry settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub sweep_interval_secs: u64,
    pub stale_after_secs: u64,
    pub default_display_name: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            stale_after_secs: 300,
            default_display_name: DEFAULT_DISPLAY_NAME.to_string(),
        }
    }
}

/// Voice-assistant endpoint settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Device targeted by `POST /alexa` when the request names none
    pub client_id: Option<String>,
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub backend: BackendConfig,
    pub registry: RegistryConfig,
    pub assistant: AssistantConfig,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub default_backend: Option<String>,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file '{}'", path))
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command-line values on top of the file
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(key) = overrides.api_key {
            self.auth.api_key = Some(key);
        }
        if let Some(url) = overrides.default_backend {
            self.backend.default_url = url;
        }
    }

    /// Reject values the relay cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.backend.default_url).with_context(|| {
            format!("Invalid default backend url '{}'", self.backend.default_url)
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "Default backend url must be http or https, got '{}'",
                self.backend.default_url
            );
        }

        if self.backend.forward_timeout_ms == 0 {
            bail!("backend.forward_timeout_ms must be greater than zero");
        }
        if self.registry.sweep_interval_secs == 0 {
            bail!("registry.sweep_interval_secs must be greater than zero");
        }
        if self.registry.stale_after_secs == 0 {
            bail!("registry.stale_after_secs must be greater than zero");
        }
        if self.auth.header.trim().is_empty() {
            bail!("auth.header must not be empty");
        }

        self.listen_addr()?;
        Ok(())
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address '{}:{}'",
                    self.server.host, self.server.port
                )
            })
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.forward_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.registry.sweep_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.registry.stale_after_secs)
    }

    /// The configured secret, ignoring blank values
    pub fn api_key(&self) -> Option<&str> {
        self.auth
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let config = RelayConfig::parse("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.header, "x-api-key");
        assert_eq!(config.api_key(), None);
        assert_eq!(config.backend.default_url, "http://localhost:8080");
        assert_eq!(config.forward_timeout(), Duration::from_secs(5));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.stale_after(), Duration::from_secs(300));
        assert_eq!(config.registry.default_display_name, "Unknown device");
        assert_eq!(config.assistant.client_id, None);
        config.validate().unwrap();
    }

    #[test]
    fn loads_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 4100

[auth]
api_key = "s3cret"

[assistant]
client_id = "living-room"
"#
        )
        .unwrap();

        let config = RelayConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.api_key(), Some("s3cret"));
        assert_eq!(config.assistant.client_id.as_deref(), Some("living-room"));
        assert_eq!(config.backend.forward_timeout_ms, 5000);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = RelayConfig::load("/nonexistent/camrelay.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn overrides_win_over_file() {
        let mut config = RelayConfig::parse("[server]\nport = 4100\n").unwrap();
        config.apply_overrides(Overrides {
            port: Some(5000),
            api_key: Some("from-cli".to_string()),
            default_backend: Some("http://10.0.0.2:8080".to_string()),
        });

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.api_key(), Some("from-cli"));
        assert_eq!(config.backend.default_url, "http://10.0.0.2:8080");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = RelayConfig::default();
        config.backend.default_url = "ftp://camera.local".to_string();
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.backend.default_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.backend.forward_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.registry.sweep_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.server.host = "not-an-ip".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let config = RelayConfig::parse("[auth]\napi_key = \"  \"\n").unwrap();
        assert_eq!(config.api_key(), None);
    }
}
