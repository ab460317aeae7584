/// Error types for the dashboard data layer
pub mod error;

/// Per-panel view state and overlap policy
pub mod state;

/// Session credentials and the source pollers read them from
pub mod session;

/// REST client, transports and endpoint construction
pub mod api;

/// Polling lifecycle for mounted panels
pub mod poller;

/// Panel definitions and payload mapping
pub mod panels;

/// Static composition of panels
pub mod dashboard;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use api::{ApiClient, Endpoint, ServiceUrls};
pub use dashboard::{Dashboard, PanelSnapshot, PanelStatus};
pub use error::{ApiError, ConfigError, PollerError};
pub use poller::{DataPoller, PollContext};
pub use session::{Credentials, SessionSource, SessionStore};
pub use state::{FetchState, OverlapPolicy};
