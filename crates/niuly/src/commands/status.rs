//! `niuly status`: one refresh, one report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use niuly_core::{ReadingSnapshot, VehicleEntry};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Report ──────────────────────────────────────────────────────────

/// Everything known about a vehicle after its latest refresh.
#[derive(Debug, Serialize)]
pub struct VehicleReport {
    pub vehicle_id: String,
    pub title: String,
    pub available: bool,
    pub last_update_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub readings: Vec<ReadingSnapshot>,
}

impl VehicleReport {
    pub fn of(entry: &VehicleEntry) -> Self {
        let state = entry.coordinator().state();
        Self {
            vehicle_id: entry.unique_id().to_owned(),
            title: entry.title(),
            available: state.last_update_success,
            last_update_time: state.last_update_time,
            last_error: state.last_error,
            readings: entry.snapshot(),
        }
    }
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Reading")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: &'static str,
}

impl From<&ReadingSnapshot> for ReadingRow {
    fn from(r: &ReadingSnapshot) -> Self {
        Self {
            name: r.name,
            value: r.value.map_or_else(|| "-".into(), |v| v.to_string()),
            unit: r.unit,
        }
    }
}

fn detail(report: &VehicleReport) -> String {
    let updated = report
        .last_update_time
        .map_or_else(|| "never".into(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());

    let mut out = format!("{} ({})\nUpdated: {updated}\n", report.title, report.vehicle_id);
    if !report.available {
        let reason = report.last_error.as_deref().unwrap_or("no data");
        out.push_str(&format!("Unavailable: {reason}\n"));
    }

    let rows: Vec<ReadingRow> = report.readings.iter().map(ReadingRow::from).collect();
    out.push_str(&output::render_table(&rows));
    out
}

/// Render and print the current state of `entry`.
pub fn print_report(entry: &VehicleEntry, global: &GlobalOpts) -> Result<(), CliError> {
    let report = VehicleReport::of(entry);
    let out = output::render_single(&global.output, &report, detail)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = util::selected_entry(global)?;
    let http = config.http_session()?;

    let entry = VehicleEntry::setup(config, http).await?;
    let printed = print_report(&entry, global);
    entry.unload().await;
    printed
}
