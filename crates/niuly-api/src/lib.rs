// niuly-api: Async Rust client for the Niu electric scooter cloud API

pub mod auth;
pub mod client;
pub mod error;
pub mod transport;

pub use auth::Credentials;
pub use client::{DEFAULT_BASE_URL, NiuClient, Telemetry};
pub use error::{Error, ErrorKind};
pub use transport::TransportConfig;
