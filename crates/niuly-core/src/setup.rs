// ── Setup and re-authentication flow ──
//
// Validates credentials before an entry is created or updated. Callers only
// ever learn "cannot connect"; the underlying API error is logged.

use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, error};

use niuly_api::NiuClient;

use crate::config::EntryConfig;
use crate::error::CoreError;

/// Identity of a validated entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryIdentity {
    pub unique_id: String,
    pub title: String,
}

impl EntryIdentity {
    pub fn of(config: &EntryConfig) -> Self {
        Self {
            unique_id: config.unique_id().to_owned(),
            title: config.title(),
        }
    }
}

/// Connection test: authenticate, then fetch the vehicle status once.
pub async fn validate_entry(
    config: &EntryConfig,
    http: reqwest::Client,
) -> Result<EntryIdentity, CoreError> {
    debug!(vehicle_id = config.vehicle_id(), "validating credentials");

    let probe = async {
        let mut client = NiuClient::new(&config.base_url, config.credentials.clone(), http)?;
        client.authenticate().await?;
        client.fetch_vehicle_status().await?;
        Ok::<(), niuly_api::Error>(())
    };

    if let Err(e) = probe.await {
        error!(vehicle_id = config.vehicle_id(), error = %e, "error connecting to Niu API");
        return Err(CoreError::CannotConnect);
    }

    Ok(EntryIdentity::of(config))
}

/// Refuse a vehicle that already has an entry.
pub fn ensure_not_configured<'a>(
    configured: impl IntoIterator<Item = &'a str>,
    vehicle_id: &str,
) -> Result<(), CoreError> {
    if configured.into_iter().any(|id| id == vehicle_id) {
        return Err(CoreError::AlreadyConfigured {
            vehicle_id: vehicle_id.to_owned(),
        });
    }
    Ok(())
}

/// Validate replacement account credentials for an existing entry.
///
/// Returns the updated config (same vehicle, new account) for the host to
/// persist and reload. The existing config is left untouched on failure.
pub async fn reauthenticate_entry(
    existing: &EntryConfig,
    username: impl Into<String>,
    password: SecretString,
    http: reqwest::Client,
) -> Result<EntryConfig, CoreError> {
    let updated = existing.with_account(username, password);
    if let Err(e) = validate_entry(&updated, http).await {
        error!(vehicle_id = existing.vehicle_id(), "error reauthenticating with Niu API");
        return Err(e);
    }
    Ok(updated)
}
