//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use niuly_config::ConfigError;
use niuly_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot connect to the Niu cloud")]
    #[diagnostic(
        code(niuly::cannot_connect),
        help(
            "Check the username, password and vehicle serial number.\n\
             Run with -v for the underlying error."
        )
    )]
    CannotConnect,

    #[error("Fetching vehicle data failed: {message}")]
    #[diagnostic(
        code(niuly::update_failed),
        help("If the password changed, run: niuly reauth")
    )]
    UpdateFailed { message: String },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("No password configured for vehicle '{vehicle_id}'")]
    #[diagnostic(
        code(niuly::no_credentials),
        help(
            "Store one with: niuly reauth --vehicle {vehicle_id}\n\
             Or set the NIULY_PASSWORD environment variable."
        )
    )]
    NoCredentials { vehicle_id: String },

    #[error("Keyring access failed: {reason}")]
    #[diagnostic(
        code(niuly::keyring),
        help("Use --plaintext to keep the password in the config file instead.")
    )]
    Keyring { reason: String },

    // ── Vehicles ─────────────────────────────────────────────────────
    #[error("Vehicle '{vehicle_id}' is not configured")]
    #[diagnostic(code(niuly::not_found), help("Run: niuly vehicles"))]
    VehicleNotFound { vehicle_id: String },

    #[error("Vehicle '{vehicle_id}' is already configured")]
    #[diagnostic(
        code(niuly::already_configured),
        help("Use `niuly reauth --vehicle {vehicle_id}` to change its credentials.")
    )]
    AlreadyConfigured { vehicle_id: String },

    #[error("No vehicles configured")]
    #[diagnostic(
        code(niuly::no_vehicles),
        help(
            "Add one with: niuly setup <VEHICLE_ID> --username <USER>\n\
             Config path: {path}"
        )
    )]
    NoVehicles { path: String },

    #[error("Several vehicles are configured")]
    #[diagnostic(
        code(niuly::ambiguous_vehicle),
        help("Pass --vehicle <VEHICLE_ID> or set default_vehicle in the config file.")
    )]
    AmbiguousVehicle,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(niuly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(niuly::config))]
    Config(ConfigError),

    #[error("Coordinator stopped: {message}")]
    #[diagnostic(code(niuly::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON rendering failed: {0}")]
    #[diagnostic(code(niuly::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CannotConnect | Self::UpdateFailed { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::VehicleNotFound { .. } => exit_code::NOT_FOUND,
            Self::AlreadyConfigured { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::AmbiguousVehicle => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CannotConnect => CliError::CannotConnect,
            CoreError::UpdateFailed { message } => CliError::UpdateFailed { message },
            CoreError::AlreadyConfigured { vehicle_id } => {
                CliError::AlreadyConfigured { vehicle_id }
            }
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            err @ CoreError::ShutDown { .. } => CliError::Internal {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { vehicle_id } => CliError::NoCredentials { vehicle_id },
            ConfigError::UnknownVehicle { vehicle_id } => CliError::VehicleNotFound { vehicle_id },
            ConfigError::NoVehicles => CliError::NoVehicles {
                path: String::new(),
            },
            ConfigError::AmbiguousVehicle => CliError::AmbiguousVehicle,
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Keyring(e) => CliError::Keyring {
                reason: e.to_string(),
            },
            other => CliError::Config(other),
        }
    }
}
