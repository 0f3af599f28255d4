// Shared transport configuration for building the long-lived HTTP session.
//
// One `reqwest::Client` is built per configured vehicle and shared by the
// client and anything else that talks to the vendor for that entry.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("niuly/", env!("CARGO_PKG_VERSION"));

/// Settings for the HTTP session handed to [`NiuClient`](crate::NiuClient).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout. Expiry surfaces as [`Error::Network`].
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Network)
    }
}
