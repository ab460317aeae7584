use crate::api::Endpoint;
use crate::panels::{number_at, show_number, show_text, text_at, DisplayFields, Panel, PanelKind};
use crate::session::Credentials;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Live irrigation status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrigationStatus {
    /// Pump state as reported (`on`, `off`, `fault`, ...)
    pub pump: Option<String>,
    /// Litres per minute
    pub flow_rate: Option<f64>,
    /// Litres since midnight
    pub water_used_today: Option<f64>,
    pub next_run: Option<String>,
}

impl IrrigationStatus {
    pub fn is_running(&self) -> bool {
        matches!(self.pump.as_deref(), Some(p) if p.eq_ignore_ascii_case("on"))
    }
}

impl DisplayFields for IrrigationStatus {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Pump", show_text(self.pump.as_deref())),
            ("Flow rate (L/min)", show_number(self.flow_rate)),
            ("Water used today (L)", show_number(self.water_used_today)),
            ("Next run", show_text(self.next_run.as_deref())),
        ]
    }
}

/// Irrigation status, polled every 5 seconds by default
#[derive(Debug, Clone)]
pub struct IrrigationPanel {
    interval: Duration,
}

impl Default for IrrigationPanel {
    fn default() -> Self {
        Self {
            interval: PanelKind::Irrigation.default_interval(),
        }
    }
}

impl IrrigationPanel {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Panel for IrrigationPanel {
    type View = IrrigationStatus;

    fn name(&self) -> &str {
        "irrigation"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn endpoint(&self, credentials: Option<&Credentials>) -> Endpoint {
        Endpoint::api("/api/v1/irrigation/status").for_tenant(credentials)
    }

    fn map(&self, payload: &Value) -> IrrigationStatus {
        IrrigationStatus {
            pump: text_at(payload, "/data/pumpStatus"),
            flow_rate: number_at(payload, "/data/flowRate"),
            water_used_today: number_at(payload, "/data/waterUsedToday"),
            next_run: text_at(payload, "/data/nextScheduledRun"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_irrigation() {
        let payload = json!({"data": {
            "pumpStatus": "ON",
            "flowRate": 35.5,
            "waterUsedToday": 1250,
            "nextScheduledRun": "2026-10-20T05:30:00Z",
        }});

        let status = IrrigationPanel::default().map(&payload);
        assert!(status.is_running());
        assert_eq!(
            status.fields(),
            vec![
                ("Pump", "ON".to_string()),
                ("Flow rate (L/min)", "35.5".to_string()),
                ("Water used today (L)", "1250".to_string()),
                ("Next run", "2026-10-20T05:30:00Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_pump_is_not_running() {
        let status = IrrigationPanel::default().map(&json!({}));
        assert!(!status.is_running());
        assert_eq!(status.fields()[0].1, "N/A");
    }
}
