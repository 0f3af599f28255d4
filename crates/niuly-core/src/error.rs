// ── Core error types ──
//
// What hosts see. API failures collapse into `UpdateFailed` at the refresh
// boundary and into `CannotConnect` during setup; the specific
// `niuly_api::Error` kind only survives as text for logs.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Refresh ──────────────────────────────────────────────────────
    /// A refresh cycle failed. Readings keep their last value but report
    /// themselves unavailable.
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    /// The coordinator was shut down; no further fetches are issued.
    #[error("Coordinator for vehicle {vehicle_id} is shut down")]
    ShutDown { vehicle_id: String },

    // ── Setup flow ───────────────────────────────────────────────────
    /// Credential validation failed for any reason.
    #[error("Cannot connect to the Niu cloud")]
    CannotConnect,

    #[error("Vehicle {vehicle_id} is already configured")]
    AlreadyConfigured { vehicle_id: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from API errors ───────────────────────────────────────

impl From<niuly_api::Error> for CoreError {
    fn from(err: niuly_api::Error) -> Self {
        match err {
            niuly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid base URL: {e}"),
            },
            other => CoreError::UpdateFailed {
                message: other.to_string(),
            },
        }
    }
}
