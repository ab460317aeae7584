use crate::api::Endpoint;
use crate::panels::{number_at, show_number, show_text, text_at, DisplayFields, Panel, PanelKind};
use crate::session::Credentials;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Current conditions at the farm
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub condition: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub rainfall: Option<f64>,
}

impl DisplayFields for WeatherReport {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Condition", show_text(self.condition.as_deref())),
            ("Temperature (°C)", show_number(self.temperature)),
            ("Humidity (%)", show_number(self.humidity)),
            ("Wind speed (km/h)", show_number(self.wind_speed)),
            ("Rainfall (mm)", show_number(self.rainfall)),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct WeatherPanel {
    interval: Duration,
}

impl Default for WeatherPanel {
    fn default() -> Self {
        Self {
            interval: PanelKind::Weather.default_interval(),
        }
    }
}

impl WeatherPanel {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Panel for WeatherPanel {
    type View = WeatherReport;

    fn name(&self) -> &str {
        "weather"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn endpoint(&self, credentials: Option<&Credentials>) -> Endpoint {
        Endpoint::api("/api/v1/weather/current").for_tenant(credentials)
    }

    fn map(&self, payload: &Value) -> WeatherReport {
        WeatherReport {
            condition: text_at(payload, "/data/current/condition"),
            temperature: number_at(payload, "/data/current/temperature"),
            humidity: number_at(payload, "/data/current/humidity"),
            wind_speed: number_at(payload, "/data/current/windSpeed"),
            rainfall: number_at(payload, "/data/current/rainfall"),
        }
    }
}
