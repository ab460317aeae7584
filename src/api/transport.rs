use crate::error::ApiError;
use log::{debug, trace};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Url};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A fully prepared request: verb, absolute URL, headers and optional JSON body
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// Future returned by a transport
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send + 'a>>;

/// Trait for anything that can carry an `ApiRequest` to the backend
///
/// A successful exchange resolves to the parsed JSON body (`Value::Null` for an
/// empty body). Transport failures, non-2xx statuses and undecodable bodies all
/// resolve to an `ApiError`.
pub trait Transport: Send + Sync {
    fn execute<'a>(&'a self, request: ApiRequest) -> TransportFuture<'a>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with an optional overall request timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - Per-request timeout; `None` leaves requests unbounded
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Client` if the underlying HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn new(timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn execute<'a>(&'a self, request: ApiRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            let ApiRequest {
                method,
                url,
                headers,
                body,
            } = request;

            let mut builder = self.client.request(method, url).headers(headers);
            if let Some(body) = &body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let bytes = response.bytes().await?;
            trace!("Received {} byte response body", bytes.len());
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            Ok(serde_json::from_slice(&bytes)?)
        })
    }
}

/// One scripted reply of a `MockTransport`
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub result: Result<Value, ApiError>,
    /// How long the reply takes to arrive
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn ok(value: Value) -> Self {
        Self {
            result: Ok(value),
            delay: None,
        }
    }

    pub fn err(error: ApiError) -> Self {
        Self {
            result: Err(error),
            delay: None,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Scripted transport for testing and offline development
///
/// Replies are returned in order; after the last one the script cycles back to
/// the first. Every request is recorded so callers can inspect headers and URLs.
pub struct MockTransport {
    responses: Vec<MockResponse>,
    default_delay: Option<Duration>,
    current_index: Mutex<usize>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Transport that always replies with the same result
    pub fn with_response(result: Result<Value, ApiError>) -> Self {
        Self::with_responses(vec![result])
    }

    /// Transport that replies with each result in turn
    pub fn with_responses(results: Vec<Result<Value, ApiError>>) -> Self {
        Self::with_script(
            results
                .into_iter()
                .map(|result| MockResponse {
                    result,
                    delay: None,
                })
                .collect(),
        )
    }

    /// Transport with per-reply delays
    pub fn with_script(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            default_delay: None,
            current_index: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Transport that always returns the given JSON body
    pub fn json(value: Value) -> Self {
        Self::with_response(Ok(value))
    }

    /// Transport that always fails with the given error
    pub fn failing(error: ApiError) -> Self {
        Self::with_response(Err(error))
    }

    /// Delay applied to replies that have no delay of their own
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Number of requests executed so far
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Most recent request, if any
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// All requests in execution order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget recorded requests and restart the script
    pub fn reset(&self) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self
            .current_index
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = 0;
    }

    fn next_response(&self) -> Option<MockResponse> {
        if self.responses.is_empty() {
            return None;
        }
        let mut index = self
            .current_index
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let response = self.responses[*index % self.responses.len()].clone();
        *index += 1;
        Some(response)
    }
}

impl Transport for MockTransport {
    fn execute<'a>(&'a self, request: ApiRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            debug!("Mock transport handling {} {}", request.method, request.url);
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);

            let Some(response) = self.next_response() else {
                return Err(ApiError::Network(
                    "mock transport has no scripted responses".to_string(),
                ));
            };

            if let Some(delay) = response.delay.or(self.default_delay) {
                tokio::time::sleep(delay).await;
            }
            response.result
        })
    }
}
