//! Command handlers: config file + core entry lifecycle -> output formatting.

pub mod reauth;
pub mod setup;
pub mod status;
pub mod util;
pub mod vehicles;
pub mod watch;
