//! Polling data layer between `niuly-api` and a host (CLI, home-automation bridge).
//!
//! - **[`Coordinator`]** — owns one vehicle's cache and refresh cadence.
//!   [`refresh()`](Coordinator::refresh) is the single refresh path; concurrent
//!   callers join the fetch already in flight. [`start()`](Coordinator::start)
//!   runs the first refresh and spawns the periodic task,
//!   [`shutdown()`](Coordinator::shutdown) stops it.
//!
//! - **[`Reading`]** — pull-based typed view of one telemetry field
//!   (battery, range, speed, mileage, temperature). Values are projected from
//!   the cache on demand; availability follows the last refresh outcome.
//!
//! - **[`VehicleEntry`]** — explicit ownership of one configured vehicle:
//!   coordinator, client, HTTP session and readings.
//!
//! - **Setup flow** ([`setup`]) — credential validation for new entries and
//!   re-authentication of existing ones.

pub mod config;
pub mod coordinator;
pub mod entry;
pub mod error;
pub mod reading;
pub mod setup;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_SCAN_INTERVAL, DEFAULT_TIMEOUT, EntryConfig};
pub use coordinator::{Coordinator, CoordinatorState, RefreshPhase};
pub use entry::VehicleEntry;
pub use error::CoreError;
pub use reading::{
    DeviceClass, DeviceInfo, EntityCategory, Reading, ReadingKind, ReadingSnapshot, StateClass,
    readings_for,
};
pub use setup::{EntryIdentity, ensure_not_configured, reauthenticate_entry, validate_entry};

pub use niuly_api::{Credentials, DEFAULT_BASE_URL, Telemetry};
