use crate::api::endpoint::parse_absolute;
use crate::api::ServiceUrls;
use crate::error::ConfigError;
use crate::panels::PanelKind;
use crate::session::Credentials;
use crate::state::OverlapPolicy;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Base URL of the main data API
pub const API_URL_ENV: &str = "VITE_API_URL";
/// Base URL of the users and tenants API
pub const USERS_API_URL_ENV: &str = "VITE_USERS_API_URL";
/// Session token
pub const TOKEN_ENV: &str = "AGRITWIN_TOKEN";
/// Session tenant
pub const TENANT_ENV: &str = "AGRITWIN_TENANT_ID";

/// Application configuration
///
/// Loaded from a TOML file; every section is optional and falls back to
/// defaults. Environment variables override the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub polling: PollingConfig,
    pub panels: BTreeMap<PanelKind, PanelConfig>,
    pub sources: SourcesConfig,
}

/// Backend service locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub users_base_url: String,
    /// No timeout when absent
    pub request_timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            users_base_url: "http://localhost:8001".to_string(),
            request_timeout_seconds: None,
        }
    }
}

/// Session seeded at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub token: Option<String>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    pub overlap: OverlapPolicy,
}

/// Per-panel settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    pub enabled: bool,
    /// Overrides the panel's default cadence
    pub interval_seconds: Option<u64>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: None,
        }
    }
}

/// Data provider selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    /// Tenants whose field sensors report through Fyllo instead of IoT
    pub fyllo_tenants: Vec<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML for this schema, and
    /// `ConfigError::ValidationError` if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("api.base_url", &self.api.base_url),
            ("api.users_base_url", &self.api.users_base_url),
        ] {
            parse_absolute(url)
                .map_err(|e| ConfigError::ValidationError(format!("{}: {}", name, e)))?;
        }

        if self.api.request_timeout_seconds == Some(0) {
            return Err(ConfigError::ValidationError(
                "api.request_timeout_seconds must be greater than zero".to_string(),
            ));
        }

        for (kind, panel) in &self.panels {
            if panel.interval_seconds == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "panels.{}.interval_seconds must be greater than zero",
                    kind.key()
                )));
            }
        }

        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = value(API_URL_ENV) {
            info!("Using {} from environment", API_URL_ENV);
            self.api.base_url = url;
        }
        if let Some(url) = value(USERS_API_URL_ENV) {
            info!("Using {} from environment", USERS_API_URL_ENV);
            self.api.users_base_url = url;
        }
        if let Some(token) = value(TOKEN_ENV) {
            self.session.token = Some(token);
        }
        if let Some(tenant) = value(TENANT_ENV) {
            self.session.tenant_id = Some(tenant);
        }
    }

    /// Settings for a panel, defaults if the file does not mention it
    pub fn panel(&self, kind: PanelKind) -> PanelConfig {
        self.panels.get(&kind).cloned().unwrap_or_default()
    }

    pub fn panel_interval(&self, kind: PanelKind) -> Duration {
        self.panel(kind)
            .interval_seconds
            .map(Duration::from_secs)
            .unwrap_or_else(|| kind.default_interval())
    }

    /// Panels to mount, in grid order
    pub fn enabled_panels(&self) -> Vec<PanelKind> {
        PanelKind::ALL
            .into_iter()
            .filter(|kind| self.panel(*kind).enabled)
            .collect()
    }

    /// Credentials to seed the session with, if any were configured
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.session.token, &self.session.tenant_id) {
            (None, None) => None,
            (token, tenant) => Some(Credentials::new(
                token.clone().unwrap_or_default(),
                tenant.clone().unwrap_or_default(),
            )),
        }
    }

    pub fn service_urls(&self) -> ServiceUrls {
        ServiceUrls::new(self.api.base_url.clone(), self.api.users_base_url.clone())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.api.request_timeout_seconds.map(Duration::from_secs)
    }
}
