//! `niuly watch`: run the coordinator and print after every refresh.

use std::time::Duration;

use tracing::info;

use niuly_core::VehicleEntry;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;

use super::{status, util};

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = util::selected_entry(global)?;
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        config.scan_interval = Duration::from_secs(secs);
    }
    let http = config.http_session()?;

    let entry = VehicleEntry::setup_retrying(config, http).await?;
    let mut updates = entry.coordinator().subscribe();
    updates.borrow_and_update();

    let result = watch_loop(&entry, &mut updates, global).await;
    entry.unload().await;
    result
}

async fn watch_loop(
    entry: &VehicleEntry,
    updates: &mut tokio::sync::watch::Receiver<niuly_core::CoordinatorState>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    status::print_report(entry, global)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!(vehicle_id = entry.unique_id(), "interrupted, stopping");
                return Ok(());
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                updates.borrow_and_update();
                status::print_report(entry, global)?;
            }
        }
    }
}
