use crate::api::endpoint::parse_absolute;
use crate::api::transport::{ApiRequest, HttpTransport, Transport};
use crate::error::ApiError;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Thin client for the dashboard backend
///
/// Every call carries `Content-Type: application/json` and, when a token is
/// given, `Authorization: <token>` (the token is opaque and sent trimmed).
/// Failures are logged here and returned as `ApiError`, so callers can tell a
/// failed request apart from a request that legitimately returned nothing.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Create a client over any transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a client backed by reqwest
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Client` if the HTTP client cannot be built.
    pub fn http(timeout: Option<Duration>) -> Result<Self, ApiError> {
        Ok(Self::new(Arc::new(HttpTransport::new(timeout)?)))
    }

    /// Prepare a request with the uniform header contract
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP verb
    /// * `url` - Absolute http(s) URL
    /// * `body` - Optional JSON body
    /// * `token` - Optional token; blank tokens are treated as absent
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` for relative or non-http URLs and
    /// `ApiError::InvalidHeader` if the token cannot be sent as a header value.
    pub fn build_request(
        method: Method,
        url: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<ApiRequest, ApiError> {
        let url = parse_absolute(url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(token)
                .map_err(|e| ApiError::InvalidHeader(format!("authorization token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(ApiRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Issue a request and return the parsed body
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = match Self::build_request(method.clone(), url, body, token) {
            Ok(request) => request,
            Err(e) => {
                warn!("Refusing to send {} {}: {}", method, url, e);
                return Err(e);
            }
        };

        debug!("{} {}", method, url);
        match self.transport.execute(request).await {
            Ok(value) => {
                debug!("{} {} succeeded", method, url);
                Ok(value)
            }
            Err(e) => {
                warn!("{} {} failed: {}", method, url, e);
                Err(e)
            }
        }
    }

    pub async fn get(&self, url: &str, token: Option<&str>) -> Result<Value, ApiError> {
        self.send(Method::GET, url, None, token).await
    }

    pub async fn post(&self, url: &str, body: Value, token: Option<&str>) -> Result<Value, ApiError> {
        self.send(Method::POST, url, Some(body), token).await
    }

    pub async fn put(&self, url: &str, body: Value, token: Option<&str>) -> Result<Value, ApiError> {
        self.send(Method::PUT, url, Some(body), token).await
    }

    pub async fn delete(
        &self,
        url: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.send(Method::DELETE, url, body, token).await
    }

    /// Issue a request with the swallowed-error policy
    ///
    /// Failures are logged and collapse to `None`, exactly like a successful
    /// empty or `null` body. Use the `Result`-returning verbs when the caller
    /// needs to know which of the two happened.
    pub async fn fetch_or_none(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Option<Value> {
        match self.send(method, url, body, token).await {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::MockTransport;
    use serde_json::json;

    fn client_with(transport: Arc<MockTransport>) -> ApiClient {
        ApiClient::new(transport)
    }

    #[test]
    fn test_build_request_sets_content_type() {
        let request =
            ApiClient::build_request(Method::GET, "https://api.test/x", None, None).unwrap();
        assert_eq!(
            request.headers.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_build_request_without_token_omits_authorization() {
        let request =
            ApiClient::build_request(Method::GET, "https://api.test/x", None, None).unwrap();
        assert!(request.headers.get(AUTHORIZATION).is_none());

        let blank =
            ApiClient::build_request(Method::GET, "https://api.test/x", None, Some("   "))
                .unwrap();
        assert!(blank.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_build_request_sends_token_verbatim() {
        let request = ApiClient::build_request(
            Method::POST,
            "https://api.test/x",
            Some(json!({"a": 1})),
            Some("eyJhbGciOi.session"),
        )
        .unwrap();
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap(),
            "eyJhbGciOi.session"
        );
        assert_eq!(request.body, Some(json!({"a": 1})));
    }

    #[test]
    fn test_build_request_trims_token() {
        let request = ApiClient::build_request(
            Method::GET,
            "https://api.test/x",
            None,
            Some("  padded-token \t"),
        )
        .unwrap();
        assert_eq!(request.headers.get(AUTHORIZATION).unwrap(), "padded-token");
    }

    #[test]
    fn test_build_request_rejects_relative_url() {
        let result = ApiClient::build_request(Method::GET, "/api/v1/iot/analytics", None, None);
        assert!(matches!(result, Err(ApiError::InvalidUrl { .. })));
    }

    #[test]
    fn test_build_request_rejects_unsendable_token() {
        let result =
            ApiClient::build_request(Method::GET, "https://api.test/x", None, Some("bad\ntoken"));
        assert!(matches!(result, Err(ApiError::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_verbs_map_to_methods() {
        let transport = Arc::new(MockTransport::json(json!({"ok": true})));
        let client = client_with(transport.clone());

        client.get("https://api.test/r", Some("t")).await.unwrap();
        client
            .post("https://api.test/r", json!({"name": "plot"}), Some("t"))
            .await
            .unwrap();
        client
            .put("https://api.test/r/1", json!({"name": "plot 2"}), Some("t"))
            .await
            .unwrap();
        client
            .delete("https://api.test/r/1", Some(json!({"id": 1})), None)
            .await
            .unwrap();

        let methods: Vec<Method> = transport
            .requests()
            .into_iter()
            .map(|r| r.method)
            .collect();
        assert_eq!(
            methods,
            vec![Method::GET, Method::POST, Method::PUT, Method::DELETE]
        );

        let delete = transport.last_request().unwrap();
        assert_eq!(delete.body, Some(json!({"id": 1})));
        assert!(delete.headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_failure_is_distinguishable_from_empty_body() {
        let failing = client_with(Arc::new(MockTransport::failing(ApiError::Status {
            status: 500,
            body: String::new(),
        })));
        let empty = client_with(Arc::new(MockTransport::json(Value::Null)));

        assert!(failing.get("https://api.test/x", None).await.is_err());
        assert_eq!(empty.get("https://api.test/x", None).await, Ok(Value::Null));
    }

    #[tokio::test]
    async fn test_fetch_or_none_swallows_failures() {
        let failing = client_with(Arc::new(MockTransport::failing(ApiError::Network(
            "connection reset".to_string(),
        ))));
        let empty = client_with(Arc::new(MockTransport::json(Value::Null)));
        let full = client_with(Arc::new(MockTransport::json(json!({"lux": 3}))));

        let failed = failing
            .fetch_or_none(Method::GET, "https://api.test/x", None, None)
            .await;
        let nothing = empty
            .fetch_or_none(Method::GET, "https://api.test/x", None, None)
            .await;
        let something = full
            .fetch_or_none(Method::GET, "https://api.test/x", None, None)
            .await;

        // A failed request and an empty reply look the same through this entry point
        assert_eq!(failed, nothing);
        assert_eq!(failed, None);
        assert_eq!(something, Some(json!({"lux": 3})));
    }

    #[tokio::test]
    async fn test_invalid_url_never_reaches_transport() {
        let transport = Arc::new(MockTransport::json(json!({})));
        let client = client_with(transport.clone());

        let result = client.get("not a url", None).await;
        assert!(result.is_err());
        assert_eq!(transport.call_count(), 0);
    }
}
