//! `niuly reauth`: swap the account credentials of a configured vehicle.

use niuly_core::{EntryIdentity, reauthenticate_entry};

use crate::cli::{GlobalOpts, ReauthArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: ReauthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = util::load_config(global)?;
    let (vehicle_id, vehicle) = util::select_vehicle(&cfg, global)?;
    let vehicle_id = vehicle_id.to_owned();
    let mut vehicle = vehicle.clone();

    let username = args.username.unwrap_or_else(|| vehicle.username.clone());
    let password = util::read_password(&format!("New password for {username}: "))?;

    // The stored password may be the stale one; the existing entry only
    // contributes vehicle, endpoint and timing.
    let existing =
        niuly_config::build_entry_config(&cfg.defaults, &vehicle_id, &vehicle, password.clone())?;
    let updated = reauthenticate_entry(
        &existing,
        username.clone(),
        password.clone(),
        existing.http_session()?,
    )
    .await?;

    vehicle.username = username;
    util::store_password(&vehicle_id, &mut vehicle, &password, args.plaintext)?;
    cfg.upsert_vehicle(vehicle_id, vehicle);
    util::save_config(&cfg, global)?;

    let identity = EntryIdentity::of(&updated);
    let out = output::render_single(&global.output, &identity, |i| {
        format!("Re-authenticated vehicle {}", i.unique_id)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
