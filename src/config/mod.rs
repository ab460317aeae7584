/// TOML configuration with environment overrides
#[allow(clippy::module_inception)]
pub mod config;

pub use config::{
    ApiConfig, Config, PanelConfig, PollingConfig, SessionConfig, SourcesConfig, API_URL_ENV,
    TENANT_ENV, TOKEN_ENV, USERS_API_URL_ENV,
};
