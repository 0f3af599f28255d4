//! Clap derive structures for the `niuly` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// niuly -- Niu scooter telemetry from the command line
#[derive(Debug, Parser)]
#[command(
    name = "niuly",
    version,
    about = "Monitor Niu electric scooters from the command line",
    long_about = "Polls the Niu cloud for vehicle telemetry (battery, range, speed,\n\
        mileage, temperature) and renders it as tables or JSON.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Vehicle serial number (defaults to `default_vehicle`)
    #[arg(long, env = "NIULY_VEHICLE", global = true)]
    pub vehicle: Option<String>,

    /// Config file path (overrides the platform default)
    #[arg(long, env = "NIULY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NIULY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "NIULY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate credentials and add a vehicle
    Setup(SetupArgs),

    /// Replace the account credentials of a configured vehicle
    Reauth(ReauthArgs),

    /// List configured vehicles
    #[command(alias = "ls")]
    Vehicles,

    /// Remove a configured vehicle and its stored password
    #[command(alias = "rm")]
    Remove {
        /// Vehicle serial number
        vehicle_id: String,
    },

    /// Fetch telemetry once and print every reading
    Status,

    /// Keep polling and print readings after every refresh (Ctrl-C to stop)
    Watch(WatchArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Vehicle serial number
    pub vehicle_id: String,

    /// Niu account username or e-mail
    #[arg(long, short = 'u')]
    pub username: String,

    /// Display name for the vehicle
    #[arg(long)]
    pub title: Option<String>,

    /// Polling interval in seconds for this vehicle
    #[arg(long)]
    pub scan_interval: Option<u64>,

    /// Save the password in the config file instead of the system keyring
    #[arg(long)]
    pub plaintext: bool,
}

#[derive(Debug, Args)]
pub struct ReauthArgs {
    /// New account username (keeps the current one if omitted)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Save the password in the config file instead of the system keyring
    #[arg(long)]
    pub plaintext: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Polling interval in seconds (overrides config)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
