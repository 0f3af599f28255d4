//! Vehicle list / remove handlers. Config-only; no network access.

use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use niuly_config::{Config, Vehicle};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct VehicleSummary {
    vehicle_id: String,
    title: String,
    username: String,
    scan_interval_secs: u64,
    default: bool,
}

impl VehicleSummary {
    fn new(cfg: &Config, vehicle_id: &str, vehicle: &Vehicle) -> Self {
        Self {
            vehicle_id: vehicle_id.to_owned(),
            title: vehicle
                .title
                .clone()
                .unwrap_or_else(|| format!("Niu Vehicle {vehicle_id}")),
            username: vehicle.username.clone(),
            scan_interval_secs: vehicle.scan_interval.unwrap_or(cfg.defaults.scan_interval),
            default: cfg.default_vehicle.as_deref() == Some(vehicle_id),
        }
    }
}

#[derive(Tabled)]
struct VehicleRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Vehicle")]
    vehicle_id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Interval")]
    interval: String,
}

impl From<&VehicleSummary> for VehicleRow {
    fn from(v: &VehicleSummary) -> Self {
        Self {
            marker: if v.default { "*" } else { "" },
            vehicle_id: v.vehicle_id.clone(),
            title: v.title.clone(),
            username: v.username.clone(),
            interval: format!("{}s", v.scan_interval_secs),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn list(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = util::load_config(global)?;
    let summaries: Vec<VehicleSummary> = cfg
        .vehicles
        .iter()
        .map(|(id, vehicle)| VehicleSummary::new(&cfg, id, vehicle))
        .collect();

    if summaries.is_empty() {
        util::note(global, "No vehicles configured. Add one with: niuly setup");
    }

    let out = output::render_list(&global.output, &summaries, |v| VehicleRow::from(v))?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn remove(vehicle_id: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = util::load_config(global)?;
    cfg.remove_vehicle(vehicle_id)?;

    if let Err(e) = niuly_config::delete_password(vehicle_id) {
        warn!(vehicle_id, error = %e, "could not remove keyring password");
    }
    util::save_config(&cfg, global)?;

    util::note(global, &format!("Removed vehicle {vehicle_id}"));
    Ok(())
}
