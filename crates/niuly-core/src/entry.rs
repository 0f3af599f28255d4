// ── Vehicle entry lifecycle ──
//
// One entry = one configured vehicle = one coordinator, one client, one HTTP
// session and the readings built on them. Ownership is explicit: whoever
// holds the `VehicleEntry` owns the whole bundle, and unloading it stops the
// polling.

use tracing::info;

use crate::config::EntryConfig;
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::reading::{Reading, ReadingSnapshot, readings_for};

/// A set-up vehicle entry.
pub struct VehicleEntry {
    config: EntryConfig,
    coordinator: Coordinator,
    readings: Vec<Reading>,
}

impl VehicleEntry {
    /// Build the coordinator on `http`, run the first refresh, start the
    /// periodic task and register one reading per field.
    ///
    /// Fails if the first refresh fails; nothing keeps running in that case.
    pub async fn setup(config: EntryConfig, http: reqwest::Client) -> Result<Self, CoreError> {
        let coordinator = Coordinator::from_entry(&config, http)?;

        if let Err(e) = coordinator.start().await {
            coordinator.shutdown().await;
            return Err(e);
        }

        let readings = readings_for(&coordinator);
        info!(
            vehicle_id = config.vehicle_id(),
            readings = readings.len(),
            "vehicle entry set up"
        );

        Ok(Self {
            config,
            coordinator,
            readings,
        })
    }

    /// Set up for a long-running host: a failed first refresh leaves the
    /// readings unavailable and the periodic task keeps retrying.
    ///
    /// Fails only on errors no retry can fix (e.g. an unusable base URL).
    pub async fn setup_retrying(
        config: EntryConfig,
        http: reqwest::Client,
    ) -> Result<Self, CoreError> {
        let coordinator = Coordinator::from_entry(&config, http)?;
        coordinator.start_retrying().await?;

        let readings = readings_for(&coordinator);
        info!(
            vehicle_id = config.vehicle_id(),
            available = coordinator.last_update_success(),
            "vehicle entry set up"
        );

        Ok(Self {
            config,
            coordinator,
            readings,
        })
    }

    /// Stop polling and hand back the config.
    pub async fn unload(self) -> EntryConfig {
        self.coordinator.shutdown().await;
        info!(vehicle_id = self.config.vehicle_id(), "vehicle entry unloaded");
        self.config
    }

    /// Unload, then set up again with `config` (e.g. after re-authentication).
    pub async fn reload(
        self,
        config: EntryConfig,
        http: reqwest::Client,
    ) -> Result<Self, CoreError> {
        self.unload().await;
        Self::setup(config, http).await
    }

    pub fn config(&self) -> &EntryConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn unique_id(&self) -> &str {
        self.config.unique_id()
    }

    pub fn title(&self) -> String {
        self.config.title()
    }

    /// Render every reading.
    pub fn snapshot(&self) -> Vec<ReadingSnapshot> {
        self.readings.iter().map(Reading::snapshot).collect()
    }
}
