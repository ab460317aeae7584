use crate::error::ApiError;
use crate::session::Credentials;
use reqwest::Url;

/// Query parameter carrying the tenant on tenant-scoped endpoints
pub const TENANT_QUERY_KEY: &str = "tenantId";

/// Backend service an endpoint lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Main data API (`VITE_API_URL`)
    Api,
    /// Users and tenants API (`VITE_USERS_API_URL`)
    Users,
}

/// Base URLs of the backend services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrls {
    pub api: String,
    pub users: String,
}

impl ServiceUrls {
    pub fn new(api: impl Into<String>, users: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            users: users.into(),
        }
    }

    /// Base URL for a service
    pub fn base(&self, service: Service) -> &str {
        match service {
            Service::Api => &self.api,
            Service::Users => &self.users,
        }
    }
}

/// Path and query of a backend resource, resolved against a service base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    service: Service,
    path: String,
    query: Vec<(String, String)>,
}

impl Endpoint {
    /// Endpoint on the main data API
    pub fn api(path: impl Into<String>) -> Self {
        Self::on(Service::Api, path)
    }

    /// Endpoint on the users API
    pub fn users(path: impl Into<String>) -> Self {
        Self::on(Service::Users, path)
    }

    pub fn on(service: Service, path: impl Into<String>) -> Self {
        Self {
            service,
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Scope the endpoint to the session's tenant, if there is a session
    pub fn for_tenant(self, credentials: Option<&Credentials>) -> Self {
        match credentials {
            Some(credentials) if !credentials.tenant_id.is_empty() => {
                self.query(TENANT_QUERY_KEY, credentials.tenant_id.as_str())
            }
            _ => self,
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Build the absolute URL for this endpoint
    ///
    /// The base URL may carry its own path prefix; it is kept, and the endpoint
    /// path is appended after it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the result is not an absolute http(s) URL.
    pub fn url(&self, services: &ServiceUrls) -> Result<String, ApiError> {
        let base = services.base(self.service).trim_end_matches('/');
        let raw = if self.path.starts_with('/') {
            format!("{}{}", base, self.path)
        } else {
            format!("{}/{}", base, self.path)
        };

        let mut url = parse_absolute(&raw)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url.into())
    }
}

/// Parse an absolute http(s) URL
pub fn parse_absolute(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
