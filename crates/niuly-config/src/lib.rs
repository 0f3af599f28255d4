//! Shared configuration for the niuly CLI and other hosts.
//!
//! TOML vehicle entries, password resolution (env + keyring + plaintext),
//! and translation to `niuly_core::EntryConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use niuly_core::{Credentials, EntryConfig};

const KEYRING_SERVICE: &str = "niuly";
const PASSWORD_ENV: &str = "NIULY_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for vehicle '{vehicle_id}'")]
    NoCredentials { vehicle_id: String },

    #[error("vehicle '{vehicle_id}' is not configured")]
    UnknownVehicle { vehicle_id: String },

    #[error("no vehicles configured")]
    NoVehicles,

    #[error("several vehicles configured; pick one or set default_vehicle")]
    AmbiguousVehicle,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Vehicle used when a command doesn't name one.
    pub default_vehicle: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Configured vehicles, keyed by vehicle serial number.
    #[serde(default)]
    pub vehicles: BTreeMap<String, Vehicle>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds between periodic refreshes.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            scan_interval: default_scan_interval(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    niuly_core::DEFAULT_BASE_URL.into()
}
fn default_scan_interval() -> u64 {
    niuly_core::DEFAULT_SCAN_INTERVAL.as_secs()
}
fn default_timeout() -> u64 {
    niuly_core::DEFAULT_TIMEOUT.as_secs()
}

/// One configured vehicle entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Vehicle {
    /// Niu account e-mail or username.
    pub username: String,

    /// Account password (plaintext -- prefer keyring).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Display name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Override polling interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_interval: Option<u64>,
}

impl Vehicle {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
            title: None,
            scan_interval: None,
        }
    }
}

impl Config {
    pub fn vehicle(&self, vehicle_id: &str) -> Result<&Vehicle, ConfigError> {
        self.vehicles
            .get(vehicle_id)
            .ok_or_else(|| ConfigError::UnknownVehicle {
                vehicle_id: vehicle_id.into(),
            })
    }

    /// Pick the vehicle a command operates on: the requested one, else
    /// `default_vehicle`, else the only configured vehicle.
    pub fn select_vehicle<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Result<(&'a str, &'a Vehicle), ConfigError> {
        if let Some(id) = requested.or(self.default_vehicle.as_deref()) {
            return Ok((id, self.vehicle(id)?));
        }

        let mut iter = self.vehicles.iter();
        match (iter.next(), iter.next()) {
            (None, _) => Err(ConfigError::NoVehicles),
            (Some((id, vehicle)), None) => Ok((id.as_str(), vehicle)),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousVehicle),
        }
    }

    pub fn is_configured(&self, vehicle_id: &str) -> bool {
        self.vehicles.contains_key(vehicle_id)
    }

    /// Insert or replace a vehicle. The first vehicle becomes the default.
    pub fn upsert_vehicle(&mut self, vehicle_id: impl Into<String>, vehicle: Vehicle) {
        let vehicle_id = vehicle_id.into();
        if self.default_vehicle.is_none() {
            self.default_vehicle = Some(vehicle_id.clone());
        }
        self.vehicles.insert(vehicle_id, vehicle);
    }

    /// Remove a vehicle, clearing `default_vehicle` if it pointed there.
    pub fn remove_vehicle(&mut self, vehicle_id: &str) -> Result<Vehicle, ConfigError> {
        let removed = self
            .vehicles
            .remove(vehicle_id)
            .ok_or_else(|| ConfigError::UnknownVehicle {
                vehicle_id: vehicle_id.into(),
            })?;
        if self.default_vehicle.as_deref() == Some(vehicle_id) {
            self.default_vehicle = self.vehicles.keys().next().cloned();
        }
        Ok(removed)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "niuly", "niuly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("niuly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, layered over defaults and under `NIULY_*`
/// environment overrides (`NIULY_DEFAULTS__TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NIULY_").ignore(&["password", "config"]).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(vehicle_id: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{vehicle_id}/password"))
}

/// Resolve the account password for a vehicle.
pub fn resolve_password(vehicle: &Vehicle, vehicle_id: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring_entry(vehicle_id) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = vehicle.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        vehicle_id: vehicle_id.into(),
    })
}

/// Store a vehicle's password in the system keyring.
pub fn store_password(vehicle_id: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(vehicle_id)?.set_password(password.expose_secret())?;
    Ok(())
}

/// Delete a vehicle's keyring password. A missing entry is not an error.
pub fn delete_password(vehicle_id: &str) -> Result<(), ConfigError> {
    match keyring_entry(vehicle_id)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ── Translation to core config ──────────────────────────────────────

/// Build an `EntryConfig` from a vehicle entry and an already-resolved
/// password.
pub fn build_entry_config(
    defaults: &Defaults,
    vehicle_id: &str,
    vehicle: &Vehicle,
    password: SecretString,
) -> Result<EntryConfig, ConfigError> {
    if vehicle_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "vehicle_id".into(),
            reason: "must not be empty".into(),
        });
    }

    let base_url: Url = defaults
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {}", defaults.base_url),
        })?;
    if base_url.cannot_be_a_base() {
        return Err(ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("not a base URL: {base_url}"),
        });
    }

    let scan_interval = vehicle.scan_interval.unwrap_or(defaults.scan_interval);
    let scan_interval = positive_secs("scan_interval", scan_interval)?;
    let timeout = positive_secs("timeout", defaults.timeout)?;

    let credentials = Credentials::new(vehicle.username.clone(), password, vehicle_id);
    let mut entry = EntryConfig::new(credentials, base_url);
    entry.scan_interval = scan_interval;
    entry.timeout = timeout;
    Ok(entry)
}

fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Resolve the password and build the `EntryConfig` for a configured vehicle.
pub fn vehicle_to_entry_config(cfg: &Config, vehicle_id: &str) -> Result<EntryConfig, ConfigError> {
    let vehicle = cfg.vehicle(vehicle_id)?;
    let password = resolve_password(vehicle, vehicle_id)?;
    build_entry_config(&cfg.defaults, vehicle_id, vehicle, password)
}
