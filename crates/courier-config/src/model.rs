use crate::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_SESSION_KEY: &str = "courier.auth";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub version: u32,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    pub storage_key: String,
    pub popup_width: u32,
    pub popup_height: u32,
    pub store_poll_interval_ms: u64,
}

/// Loopback listener the desktop host uses to receive login messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_SESSION_KEY.to_string(),
            popup_width: 500,
            popup_height: 600,
            store_poll_interval_ms: 1_000,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1:8765".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            service: ServiceConfig::default(),
            session: SessionConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.base_url.trim()).map_err(|source| ConfigError::BaseUrl {
            value: self.base_url.clone(),
            source,
        })
    }

    /// Serialized origin (`scheme://host[:port]`) login messages must come from.
    pub fn origin(&self) -> Result<String, ConfigError> {
        Ok(self.base_url()?.origin().ascii_serialization())
    }

    /// `{base_url}{path}`, keeping any path prefix the base URL carries.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        let raw = format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|source| ConfigError::BaseUrl { value: raw, source })
    }

    pub fn agent_run_url(&self) -> Result<Url, ConfigError> {
        self.endpoint("/agent/run")
    }

    pub fn login_url(&self) -> Result<Url, ConfigError> {
        self.endpoint("/auth/google/login")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_point_at_local_service() {
        let config = AppConfig::default();
        assert_eq!(
            config.service.agent_run_url().expect("url").as_str(),
            "http://localhost:8000/agent/run"
        );
        assert_eq!(
            config.service.origin().expect("origin"),
            "http://localhost:8000"
        );
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        let service = ServiceConfig {
            base_url: "https://courier.example.com/api/".to_string(),
        };
        assert_eq!(
            service.login_url().expect("url").as_str(),
            "https://courier.example.com/api/auth/google/login"
        );
        assert_eq!(
            service.origin().expect("origin"),
            "https://courier.example.com"
        );
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let service = ServiceConfig {
            base_url: "not a url".to_string(),
        };
        assert!(matches!(
            service.origin(),
            Err(ConfigError::BaseUrl { .. })
        ));
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: AppConfig = toml::from_str("version = 1\n").expect("config parsed");
        assert_eq!(config, AppConfig::default());
    }
}
