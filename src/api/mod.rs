/// HTTP client with the uniform header and failure contract
pub mod client;

/// URL construction for backend services
pub mod endpoint;

/// Transport seam: reqwest and scripted implementations
pub mod transport;

pub use client::ApiClient;
pub use endpoint::{Endpoint, Service, ServiceUrls};
pub use transport::{ApiRequest, HttpTransport, MockResponse, MockTransport, Transport};
