use crate::api::Endpoint;
use crate::panels::{
    format_number, number_at, show_text, text_at, DisplayFields, Panel, PanelKind, NOT_AVAILABLE,
};
use crate::session::Credentials;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Forecast yield for the tenant's main crop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldForecast {
    pub crop: Option<String>,
    pub expected_yield: Option<f64>,
    pub unit: Option<String>,
    /// Model confidence, 0.0 to 1.0
    pub confidence: Option<f64>,
    pub harvest_date: Option<String>,
}

impl DisplayFields for YieldForecast {
    fn fields(&self) -> Vec<(&'static str, String)> {
        let expected = match (self.expected_yield, self.unit.as_deref()) {
            (Some(amount), Some(unit)) => format!("{} {}", format_number(amount), unit),
            (Some(amount), None) => format_number(amount),
            (None, _) => NOT_AVAILABLE.to_string(),
        };
        let confidence = self
            .confidence
            .map(|c| format!("{}%", format_number(c * 100.0)))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        vec![
            ("Crop", show_text(self.crop.as_deref())),
            ("Expected yield", expected),
            ("Confidence", confidence),
            ("Harvest date", show_text(self.harvest_date.as_deref())),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct YieldForecastPanel {
    interval: Duration,
}

impl Default for YieldForecastPanel {
    fn default() -> Self {
        Self {
            interval: PanelKind::YieldForecast.default_interval(),
        }
    }
}

impl YieldForecastPanel {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Panel for YieldForecastPanel {
    type View = YieldForecast;

    fn name(&self) -> &str {
        "yield forecast"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn endpoint(&self, credentials: Option<&Credentials>) -> Endpoint {
        Endpoint::api("/api/v1/yield/forecast").for_tenant(credentials)
    }

    fn map(&self, payload: &Value) -> YieldForecast {
        YieldForecast {
            crop: text_at(payload, "/data/forecast/crop"),
            expected_yield: number_at(payload, "/data/forecast/expectedYield"),
            unit: text_at(payload, "/data/forecast/unit"),
            confidence: number_at(payload, "/data/forecast/confidence"),
            harvest_date: text_at(payload, "/data/forecast/harvestDate"),
        }
    }
}
