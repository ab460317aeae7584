//! Dashboard panels
//!
//! A panel knows where its data lives, how often to refresh it, and how to turn
//! the raw JSON reply into display fields. Everything else (timers, state,
//! error handling) is the poller's job.

use crate::api::Endpoint;
use crate::session::Credentials;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Field analytics from the IoT or Fyllo data source
pub mod field_analytics;

/// Tenants known to the users service
pub mod tenants;

/// Irrigation pump status
pub mod irrigation;

/// Current weather at the farm
pub mod weather;

/// Crop yield forecast
pub mod yield_forecast;

pub use field_analytics::{AnalyticsSource, FieldAnalytics, FieldAnalyticsPanel};
pub use irrigation::{IrrigationPanel, IrrigationStatus};
pub use tenants::{TenantSummary, TenantsPanel};
pub use weather::{WeatherPanel, WeatherReport};
pub use yield_forecast::{YieldForecast, YieldForecastPanel};

/// Placeholder shown for fields the backend did not provide
pub const NOT_AVAILABLE: &str = "N/A";

/// A self-contained dashboard card backed by one REST resource
pub trait Panel: Send + Sync + 'static {
    /// Display model produced from each successful fetch
    type View: DisplayFields + Clone + Send + Sync + 'static;

    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// Fixed refresh cadence
    fn interval(&self) -> Duration;

    /// Resource to fetch for the current session
    fn endpoint(&self, credentials: Option<&Credentials>) -> Endpoint;

    /// Map the raw reply into display fields
    ///
    /// Must not fail: fields missing from the payload become `None`.
    fn map(&self, payload: &Value) -> Self::View;
}

/// Ordered label/value pairs for plain-text display
pub trait DisplayFields {
    fn fields(&self) -> Vec<(&'static str, String)>;
}

/// Panels the dashboard knows how to build
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    FieldAnalytics,
    Weather,
    Irrigation,
    YieldForecast,
    Tenants,
}

impl PanelKind {
    /// Every panel, in dashboard grid order
    pub const ALL: [PanelKind; 5] = [
        PanelKind::FieldAnalytics,
        PanelKind::Weather,
        PanelKind::Irrigation,
        PanelKind::YieldForecast,
        PanelKind::Tenants,
    ];

    /// Key used for this panel in configuration files
    pub fn key(self) -> &'static str {
        match self {
            PanelKind::FieldAnalytics => "field_analytics",
            PanelKind::Weather => "weather",
            PanelKind::Irrigation => "irrigation",
            PanelKind::YieldForecast => "yield_forecast",
            PanelKind::Tenants => "tenants",
        }
    }

    /// Refresh cadence used when configuration does not override it
    pub fn default_interval(self) -> Duration {
        match self {
            PanelKind::FieldAnalytics => Duration::from_secs(30),
            PanelKind::Irrigation => Duration::from_secs(5),
            PanelKind::Weather | PanelKind::YieldForecast | PanelKind::Tenants => {
                Duration::from_secs(300)
            }
        }
    }
}

/// Number at a JSON pointer, accepting numeric strings
pub(crate) fn number_at(payload: &Value, pointer: &str) -> Option<f64> {
    match payload.pointer(pointer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text at a JSON pointer; numbers and booleans are rendered as text
pub(crate) fn text_at(payload: &Value, pointer: &str) -> Option<String> {
    match payload.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Render a reading with at most two decimals and no trailing zeros
pub fn format_number(value: f64) -> String {
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Display a reading, or `N/A` when absent
pub fn show_number(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Display text, or `N/A` when absent
pub fn show_text(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}
