//! Session credentials consumed by the fetch layer
//!
//! Credentials are acquired elsewhere (an external auth provider). Pollers only
//! ever read them, through the `SessionSource` seam, once per fetch cycle.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// Token and tenant identifier for the current session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Opaque token, sent trimmed in the `Authorization` header
    pub token: String,
    /// Tenant used to scope backend queries
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Token to attach to a request, `None` when blank
    pub fn bearer(&self) -> Option<&str> {
        let token = self.token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

/// Read-only access to the current session
#[cfg_attr(test, mockall::automock)]
pub trait SessionSource: Send + Sync {
    /// Current credentials, or `None` when nobody is signed in
    fn credentials(&self) -> Option<Credentials>;
}

/// In-memory session store
///
/// Holds the single credential pair shared by every panel. Written by whoever
/// owns sign-in (the CLI seeds it from configuration), read by pollers.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<Credentials>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            current: RwLock::new(Some(credentials)),
        }
    }

    /// Replace the stored credentials
    pub fn sign_in(&self, credentials: Credentials) {
        info!("Session established for tenant '{}'", credentials.tenant_id);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    /// Forget the stored credentials
    pub fn sign_out(&self) {
        debug!("Session cleared");
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionSource for SessionStore {
    fn credentials(&self) -> Option<Credentials> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
