use crate::config::Config;
use crate::error::PollerError;
use crate::panels::{
    DisplayFields, FieldAnalyticsPanel, IrrigationPanel, Panel, PanelKind, TenantsPanel,
    WeatherPanel, YieldForecastPanel,
};
use crate::poller::{DataPoller, PollContext};
use crate::state::{FetchState, Timestamp};
use log::info;
use serde::Serialize;
use std::fmt::Write;

/// Coarse status of a panel for display
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PanelStatus {
    /// Nothing has arrived yet
    Loading,
    /// Showing data from the latest applied cycle
    Ready,
    /// Never loaded; the latest cycle failed
    Failed,
    /// Showing older data because the latest cycle failed
    Stale,
}

impl PanelStatus {
    pub fn label(self) -> &'static str {
        match self {
            PanelStatus::Loading => "loading",
            PanelStatus::Ready => "ready",
            PanelStatus::Failed => "failed",
            PanelStatus::Stale => "stale",
        }
    }
}

/// Point-in-time copy of a panel's view state, with display fields rendered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSnapshot {
    pub name: String,
    pub status: PanelStatus,
    pub fields: Vec<(String, String)>,
    pub error: Option<String>,
    pub last_updated: Option<Timestamp>,
    /// Whether any cycle has settled since mount
    pub settled: bool,
}

impl PanelSnapshot {
    pub fn from_state<V: DisplayFields>(name: &str, state: &FetchState<V>) -> Self {
        let status = match (&state.data, &state.error) {
            (Some(_), Some(_)) => PanelStatus::Stale,
            (Some(_), None) => PanelStatus::Ready,
            (None, Some(_)) => PanelStatus::Failed,
            (None, None) => PanelStatus::Loading,
        };

        let fields = state
            .data
            .as_ref()
            .map(|data| {
                data.fields()
                    .into_iter()
                    .map(|(label, value)| (label.to_string(), value))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: name.to_string(),
            status,
            fields,
            error: state.error.clone(),
            last_updated: state.last_updated,
            settled: state.has_settled(),
        }
    }

    /// Value of a display field by label
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, value)| value.as_str())
    }
}

/// A mounted panel with its view type erased
pub trait MountedPanel: Send {
    fn name(&self) -> &str;
    fn snapshot(&self) -> PanelSnapshot;
    fn is_polling(&self) -> bool;
    fn unmount(&mut self);
}

impl<V> MountedPanel for DataPoller<V>
where
    V: DisplayFields + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        DataPoller::name(self)
    }

    fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot::from_state(DataPoller::name(self), &self.state())
    }

    fn is_polling(&self) -> bool {
        DataPoller::is_polling(self)
    }

    fn unmount(&mut self) {
        DataPoller::unmount(self)
    }
}

/// Static grid of mounted panels
#[derive(Default)]
pub struct Dashboard {
    panels: Vec<Box<dyn MountedPanel>>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount every panel enabled in the configuration, in grid order
    ///
    /// # Errors
    ///
    /// Returns `PollerError` if a panel cannot be mounted; panels mounted
    /// before the failure are unmounted again when the partial dashboard drops.
    pub fn from_config(config: &Config, context: PollContext) -> Result<Self, PollerError> {
        let mut dashboard = Self::new();
        for kind in config.enabled_panels() {
            let interval = config.panel_interval(kind);
            let ctx = context.clone();
            match kind {
                PanelKind::FieldAnalytics => dashboard.mount(
                    FieldAnalyticsPanel::new(config.sources.fyllo_tenants.clone())
                        .with_interval(interval),
                    ctx,
                )?,
                PanelKind::Weather => {
                    dashboard.mount(WeatherPanel::default().with_interval(interval), ctx)?
                }
                PanelKind::Irrigation => {
                    dashboard.mount(IrrigationPanel::default().with_interval(interval), ctx)?
                }
                PanelKind::YieldForecast => {
                    dashboard.mount(YieldForecastPanel::default().with_interval(interval), ctx)?
                }
                PanelKind::Tenants => {
                    dashboard.mount(TenantsPanel::default().with_interval(interval), ctx)?
                }
            }
        }
        info!("Dashboard mounted with {} panels", dashboard.len());
        Ok(dashboard)
    }

    /// Mount one more panel at the end of the grid
    pub fn mount<P: Panel>(&mut self, panel: P, context: PollContext) -> Result<(), PollerError> {
        let poller = DataPoller::mount(panel, context)?;
        self.panels.push(Box::new(poller));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn panel_names(&self) -> Vec<&str> {
        self.panels.iter().map(|p| p.name()).collect()
    }

    pub fn snapshots(&self) -> Vec<PanelSnapshot> {
        self.panels.iter().map(|p| p.snapshot()).collect()
    }

    /// Whether every panel has settled at least one cycle
    pub fn all_settled(&self) -> bool {
        self.panels.iter().all(|p| p.snapshot().settled)
    }

    pub fn is_polling(&self) -> bool {
        self.panels.iter().any(|p| p.is_polling())
    }

    /// Plain-text dump of every panel's display fields
    pub fn render(&self) -> String {
        let mut out = String::new();
        for snapshot in self.snapshots() {
            let _ = write!(out, "== {} [{}]", snapshot.name, snapshot.status.label());
            if let Some(updated) = snapshot.last_updated {
                let _ = write!(out, " updated {}", updated.format("%H:%M:%S UTC"));
            }
            out.push('\n');

            for (label, value) in &snapshot.fields {
                let _ = writeln!(out, "  {}: {}", label, value);
            }
            if let Some(error) = &snapshot.error {
                let _ = writeln!(out, "  ! {}", error);
            }
        }
        out
    }

    /// Stop every panel
    pub fn unmount(&mut self) {
        for panel in &mut self.panels {
            panel.unmount();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, MockTransport, ServiceUrls};
    use crate::error::ApiError;
    use crate::panels::{AnalyticsSource, FieldAnalytics};
    use crate::session::{Credentials, SessionStore};
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    /// One reply that satisfies every panel's pointers at once
    fn farm_payload() -> Value {
        json!({"data": {
            "analytics": {"iotData": {"lux": {"latestReading": 42}}},
            "current": {"condition": "Sunny", "temperature": 29},
            "pumpStatus": "on",
            "flowRate": 12,
            "forecast": {"crop": "Maize", "expectedYield": 8.5, "unit": "t/ha"},
            "tenants": [{"id": "t1", "name": "North Orchard"}],
        }})
    }

    fn context(transport: Arc<MockTransport>) -> PollContext {
        PollContext::new(
            ApiClient::new(transport),
            Arc::new(SessionStore::with_credentials(Credentials::new("tok", "farm-1"))),
            ServiceUrls::new("https://api.test", "https://users.test"),
        )
    }

    #[test]
    fn test_snapshot_status() {
        let mut state: FetchState<FieldAnalytics> = FetchState::new();
        assert_eq!(
            PanelSnapshot::from_state("field analytics", &state).status,
            PanelStatus::Loading
        );

        state.begin_cycle();
        state.settle(1, Err("down".to_string()), Default::default(), Utc::now());
        assert_eq!(
            PanelSnapshot::from_state("field analytics", &state).status,
            PanelStatus::Failed
        );

        let analytics = FieldAnalytics {
            source: AnalyticsSource::Iot,
            light_intensity: Some(42.0),
            temperature: None,
            humidity: None,
            soil_moisture: None,
        };
        state.begin_cycle();
        state.settle(2, Ok(analytics), Default::default(), Utc::now());
        let ready = PanelSnapshot::from_state("field analytics", &state);
        assert_eq!(ready.status, PanelStatus::Ready);
        assert_eq!(ready.field("Light intensity (lux)"), Some("42"));

        state.begin_cycle();
        state.settle(3, Err("down".to_string()), Default::default(), Utc::now());
        assert_eq!(
            PanelSnapshot::from_state("field analytics", &state).status,
            PanelStatus::Stale
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_mounts_enabled_panels_in_order() {
        let mut config = Config::default();
        config.panels.insert(
            PanelKind::Tenants,
            crate::config::PanelConfig {
                enabled: false,
                interval_seconds: None,
            },
        );

        let transport = Arc::new(MockTransport::json(farm_payload()));
        let dashboard = Dashboard::from_config(&config, context(transport)).unwrap();

        assert_eq!(
            dashboard.panel_names(),
            vec!["field analytics", "weather", "irrigation", "yield forecast"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dashboard_renders_settled_panels() {
        let transport = Arc::new(MockTransport::json(farm_payload()));
        let dashboard =
            Dashboard::from_config(&Config::default(), context(transport.clone())).unwrap();
        assert!(!dashboard.all_settled());

        sleep(Duration::from_millis(1)).await;
        assert!(dashboard.all_settled());
        assert_eq!(transport.call_count(), 5);

        let rendered = dashboard.render();
        assert!(rendered.contains("== field analytics [ready]"));
        assert!(rendered.contains("  Light intensity (lux): 42\n"));
        assert!(rendered.contains("  Condition: Sunny\n"));
        assert!(rendered.contains("  Pump: on\n"));
        assert!(rendered.contains("  Expected yield: 8.5 t/ha\n"));
        assert!(rendered.contains("  Names: North Orchard\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dashboard_shows_failures_inline() {
        let transport = Arc::new(MockTransport::failing(ApiError::Network(
            "dns error".to_string(),
        )));
        let dashboard = Dashboard::from_config(&Config::default(), context(transport)).unwrap();

        sleep(Duration::from_millis(1)).await;
        let snapshots = dashboard.snapshots();
        assert!(snapshots.iter().all(|s| s.status == PanelStatus::Failed));
        assert!(dashboard
            .render()
            .contains("  ! Failed to fetch weather data: Network error: dns error\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dashboard_panels_keep_their_own_cadence() {
        let transport = Arc::new(MockTransport::json(farm_payload()));
        let _dashboard =
            Dashboard::from_config(&Config::default(), context(transport.clone())).unwrap();

        // Mount: 5 fetches. Irrigation (5s) refreshes 6 more times within 30s,
        // field analytics (30s) once more at exactly 30s.
        sleep(Duration::from_millis(30_001)).await;
        assert_eq!(transport.call_count(), 5 + 6 + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_stops_every_panel() {
        let transport = Arc::new(MockTransport::json(farm_payload()));
        let mut dashboard =
            Dashboard::from_config(&Config::default(), context(transport.clone())).unwrap();

        sleep(Duration::from_millis(1)).await;
        dashboard.unmount();
        assert!(!dashboard.is_polling());

        sleep(Duration::from_secs(600)).await;
        assert_eq!(transport.call_count(), 5);
    }
}
