use crate::api::Endpoint;
use crate::panels::{number_at, show_number, DisplayFields, Panel, PanelKind};
use crate::session::Credentials;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Backend data provider for field sensors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsSource {
    Iot,
    Fyllo,
}

/// JSON keys under `data.analytics.<root>` for each metric
struct MetricKeys {
    root: &'static str,
    light: &'static str,
    temperature: &'static str,
    humidity: &'static str,
    soil_moisture: &'static str,
}

const IOT_KEYS: MetricKeys = MetricKeys {
    root: "iotData",
    light: "lux",
    temperature: "temperature",
    humidity: "humidity",
    soil_moisture: "soilMoisture",
};

const FYLLO_KEYS: MetricKeys = MetricKeys {
    root: "fylloData",
    light: "lightIntensity",
    temperature: "airTemperature",
    humidity: "airHumidity",
    soil_moisture: "soilMoisture",
};

impl AnalyticsSource {
    /// Pick the provider for a tenant: listed Fyllo tenants use Fyllo, everyone else IoT
    pub fn for_tenant(tenant_id: Option<&str>, fyllo_tenants: &[String]) -> Self {
        match tenant_id {
            Some(id) if fyllo_tenants.iter().any(|t| t == id) => AnalyticsSource::Fyllo,
            _ => AnalyticsSource::Iot,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            AnalyticsSource::Iot => "/api/v1/iot/analytics",
            AnalyticsSource::Fyllo => "/api/v1/fyllo/analytics",
        }
    }

    fn keys(self) -> &'static MetricKeys {
        match self {
            AnalyticsSource::Iot => &IOT_KEYS,
            AnalyticsSource::Fyllo => &FYLLO_KEYS,
        }
    }

    /// Latest reading of one metric in this provider's payload
    fn reading(self, payload: &Value, metric: &str) -> Option<f64> {
        let pointer = format!(
            "/data/analytics/{}/{}/latestReading",
            self.keys().root,
            metric
        );
        number_at(payload, &pointer)
    }
}

/// Latest field sensor readings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAnalytics {
    pub source: AnalyticsSource,
    /// Light intensity in lux
    pub light_intensity: Option<f64>,
    /// Air temperature in °C
    pub temperature: Option<f64>,
    /// Relative humidity in %
    pub humidity: Option<f64>,
    /// Volumetric soil moisture in %
    pub soil_moisture: Option<f64>,
}

impl DisplayFields for FieldAnalytics {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Light intensity (lux)", show_number(self.light_intensity)),
            ("Temperature (°C)", show_number(self.temperature)),
            ("Humidity (%)", show_number(self.humidity)),
            ("Soil moisture (%)", show_number(self.soil_moisture)),
        ]
    }
}

/// Field sensor analytics, polled every 30 seconds by default
#[derive(Debug, Clone)]
pub struct FieldAnalyticsPanel {
    interval: Duration,
    fyllo_tenants: Vec<String>,
}

impl Default for FieldAnalyticsPanel {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FieldAnalyticsPanel {
    /// # Arguments
    ///
    /// * `fyllo_tenants` - Tenants whose sensors report through Fyllo
    pub fn new(fyllo_tenants: Vec<String>) -> Self {
        Self {
            interval: PanelKind::FieldAnalytics.default_interval(),
            fyllo_tenants,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn source_for(&self, credentials: Option<&Credentials>) -> AnalyticsSource {
        AnalyticsSource::for_tenant(
            credentials.map(|c| c.tenant_id.as_str()),
            &self.fyllo_tenants,
        )
    }
}

impl Panel for FieldAnalyticsPanel {
    type View = FieldAnalytics;

    fn name(&self) -> &str {
        "field analytics"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn endpoint(&self, credentials: Option<&Credentials>) -> Endpoint {
        Endpoint::api(self.source_for(credentials).path()).for_tenant(credentials)
    }

    fn map(&self, payload: &Value) -> FieldAnalytics {
        // The reply itself says which provider produced it
        let source = if payload.pointer("/data/analytics/fylloData").is_some() {
            AnalyticsSource::Fyllo
        } else {
            AnalyticsSource::Iot
        };
        let keys = source.keys();

        FieldAnalytics {
            source,
            light_intensity: source.reading(payload, keys.light),
            temperature: source.reading(payload, keys.temperature),
            humidity: source.reading(payload, keys.humidity),
            soil_moisture: source.reading(payload, keys.soil_moisture),
        }
    }
}
