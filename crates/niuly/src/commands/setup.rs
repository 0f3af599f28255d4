//! `niuly setup`: validate credentials, then persist a new vehicle.

use niuly_config::Vehicle;
use niuly_core::{EntryIdentity, ensure_not_configured, validate_entry};

use crate::cli::{GlobalOpts, SetupArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: SetupArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = util::load_config(global)?;
    ensure_not_configured(cfg.vehicles.keys().map(String::as_str), &args.vehicle_id)?;

    let password = util::read_password("Niu account password: ")?;

    let mut vehicle = Vehicle::new(args.username);
    vehicle.title = args.title;
    vehicle.scan_interval = args.scan_interval;

    let entry = niuly_config::build_entry_config(
        &cfg.defaults,
        &args.vehicle_id,
        &vehicle,
        password.clone(),
    )?;
    let identity = validate_entry(&entry, entry.http_session()?).await?;

    util::store_password(&args.vehicle_id, &mut vehicle, &password, args.plaintext)?;
    cfg.upsert_vehicle(args.vehicle_id, vehicle);
    util::save_config(&cfg, global)?;

    let out = output::render_single(&global.output, &identity, detail)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(identity: &EntryIdentity) -> String {
    format!(
        "Added vehicle {} as \"{}\"",
        identity.unique_id, identity.title
    )
}
