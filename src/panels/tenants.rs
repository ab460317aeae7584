use crate::api::Endpoint;
use crate::panels::{DisplayFields, Panel, PanelKind, NOT_AVAILABLE};
use crate::session::Credentials;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Tenants visible to the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantSummary {
    pub names: Vec<String>,
}

impl DisplayFields for TenantSummary {
    fn fields(&self) -> Vec<(&'static str, String)> {
        let names = if self.names.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            self.names.join(", ")
        };
        vec![("Tenants", self.names.len().to_string()), ("Names", names)]
    }
}

/// Tenant list from the users service
///
/// Not tenant-scoped: the list is what the user picks a tenant from.
#[derive(Debug, Clone)]
pub struct TenantsPanel {
    interval: Duration,
}

impl Default for TenantsPanel {
    fn default() -> Self {
        Self {
            interval: PanelKind::Tenants.default_interval(),
        }
    }
}

impl TenantsPanel {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Panel for TenantsPanel {
    type View = TenantSummary;

    fn name(&self) -> &str {
        "tenants"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn endpoint(&self, _credentials: Option<&Credentials>) -> Endpoint {
        Endpoint::users("/api/v1/tenants/list")
    }

    fn map(&self, payload: &Value) -> TenantSummary {
        let names = payload
            .pointer("/data/tenants")
            .and_then(Value::as_array)
            .map(|tenants| {
                tenants
                    .iter()
                    .filter_map(|tenant| {
                        tenant
                            .get("name")
                            .or_else(|| tenant.get("id"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default();

        TenantSummary { names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Service, ServiceUrls};
    use serde_json::json;

    #[test]
    fn test_map_tenants() {
        let payload = json!({"data": {"tenants": [
            {"id": "t1", "name": "North Orchard"},
            {"id": "t2"},
            {"name": 7},
        ]}});

        let summary = TenantsPanel::default().map(&payload);
        assert_eq!(summary.names, vec!["North Orchard", "t2"]);
        assert_eq!(summary.fields()[0].1, "2");
        assert_eq!(summary.fields()[1].1, "North Orchard, t2");
    }

    #[test]
    fn test_tenants_use_users_service_without_tenant_scope() {
        let endpoint = TenantsPanel::default().endpoint(Some(&Credentials::new("t", "farm")));
        assert_eq!(endpoint.service(), Service::Users);

        let url = endpoint
            .url(&ServiceUrls::new("https://api.test", "https://users.test"))
            .unwrap();
        assert_eq!(url, "https://users.test/api/v1/tenants/list");
    }

    #[test]
    fn test_empty_tenant_list() {
        let summary = TenantsPanel::default().map(&json!({"data": {"tenants": []}}));
        assert_eq!(summary.fields()[1].1, NOT_AVAILABLE);
    }
}
