// ── Runtime entry configuration ──
//
// Describes one configured vehicle: which account, which endpoint, and how
// often to poll. Never touches disk; the host builds an `EntryConfig` and
// hands it in.

use std::time::Duration;

use niuly_api::{Credentials, TransportConfig};

use crate::error::CoreError;
use secrecy::SecretString;
use url::Url;

/// Default polling cadence (5 minutes).
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(300);

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one vehicle entry.
#[derive(Debug, Clone)]
pub struct EntryConfig {
    pub credentials: Credentials,
    /// Vendor API root (e.g. `https://api-factory.niu.com`).
    pub base_url: Url,
    /// Interval between periodic refreshes. Zero disables the scheduler.
    pub scan_interval: Duration,
    /// Whole-request timeout for the HTTP session.
    pub timeout: Duration,
}

impl EntryConfig {
    pub fn new(credentials: Credentials, base_url: Url) -> Self {
        Self {
            credentials,
            base_url,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn vehicle_id(&self) -> &str {
        self.credentials.vehicle_id()
    }

    /// Entry identity; one entry per vehicle.
    pub fn unique_id(&self) -> &str {
        self.vehicle_id()
    }

    pub fn title(&self) -> String {
        format!("Niu Vehicle {}", self.vehicle_id())
    }

    /// HTTP session settings for this entry.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
        }
    }

    /// Build the long-lived HTTP session for this entry.
    pub fn http_session(&self) -> Result<reqwest::Client, CoreError> {
        Ok(self.transport().build_client()?)
    }

    /// Copy of this config with the account credentials replaced wholesale.
    pub fn with_account(&self, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            credentials: self.credentials.with_account(username, password),
            ..self.clone()
        }
    }
}
