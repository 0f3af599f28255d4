//! Shared helpers for command handlers.

use std::path::PathBuf;

use secrecy::SecretString;

use niuly_config::{Config, ConfigError, Vehicle};
use niuly_core::EntryConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

const PASSWORD_ENV: &str = "NIULY_PASSWORD";

/// Config file path: `--config` if given, else the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(niuly_config::config_path)
}

/// Load the config file, applying the `--timeout` override.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = niuly_config::load_config_from(&config_path(global))?;
    if let Some(timeout) = global.timeout {
        cfg.defaults.timeout = timeout;
    }
    Ok(cfg)
}

pub fn save_config(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    niuly_config::save_config_to(cfg, &config_path(global))?;
    Ok(())
}

/// Resolve `--vehicle` / `default_vehicle` / the single configured vehicle.
pub fn select_vehicle<'a>(
    cfg: &'a Config,
    global: &'a GlobalOpts,
) -> Result<(&'a str, &'a Vehicle), CliError> {
    cfg.select_vehicle(global.vehicle.as_deref())
        .map_err(|e| match e {
            ConfigError::NoVehicles => CliError::NoVehicles {
                path: config_path(global).display().to_string(),
            },
            other => other.into(),
        })
}

/// Entry config for the selected vehicle, password resolved from
/// env / keyring / config file.
pub fn selected_entry(global: &GlobalOpts) -> Result<EntryConfig, CliError> {
    let cfg = load_config(global)?;
    let (vehicle_id, _) = select_vehicle(&cfg, global)?;
    Ok(niuly_config::vehicle_to_entry_config(&cfg, vehicle_id)?)
}

/// `NIULY_PASSWORD` if set, otherwise an interactive prompt.
pub fn read_password(prompt: &str) -> Result<SecretString, CliError> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    let pw = rpassword::prompt_password(prompt).map_err(|e| CliError::Validation {
        field: "password".into(),
        reason: format!("prompt failed: {e}"),
    })?;
    if pw.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(SecretString::from(pw))
}

/// Put the password where the user asked: plaintext in the vehicle entry,
/// or the system keyring (clearing any plaintext copy).
pub fn store_password(
    vehicle_id: &str,
    vehicle: &mut Vehicle,
    password: &SecretString,
    plaintext: bool,
) -> Result<(), CliError> {
    use secrecy::ExposeSecret;

    if plaintext {
        vehicle.password = Some(password.expose_secret().to_owned());
    } else {
        niuly_config::store_password(vehicle_id, password)?;
        vehicle.password = None;
    }
    Ok(())
}

/// Status line on stderr, silenced by `--quiet`.
pub fn note(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
