use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capability token lifetime: five minutes.
pub const DEFAULT_TOKEN_VALIDITY_SECS: u64 = 300;

/// Configuration of an authenticator instance.
///
/// The signing secret is not part of this struct; it is handed to the token
/// codec directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorConfig {
    /// Identifier of the service this instance protects (a DID).
    pub service_id: String,
    /// Capability token lifetime in seconds.
    pub token_validity_secs: u64,
}

impl AuthenticatorConfig {
    /// Create a config with the default token lifetime.
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            token_validity_secs: DEFAULT_TOKEN_VALIDITY_SECS,
        }
    }

    /// Override the token lifetime.
    pub fn with_token_validity(mut self, validity: Duration) -> Self {
        self.token_validity_secs = validity.as_secs();
        self
    }

    /// Token lifetime as a [`Duration`].
    pub fn token_validity(&self) -> Duration {
        Duration::from_secs(self.token_validity_secs)
    }
}
