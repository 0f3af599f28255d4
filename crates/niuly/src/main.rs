mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;
    tracing::debug!(command = ?cli.command, "dispatching command");

    match cli.command {
        Command::Setup(args) => commands::setup::handle(args, &global).await,
        Command::Reauth(args) => commands::reauth::handle(args, &global).await,
        Command::Vehicles => commands::vehicles::list(&global),
        Command::Remove { vehicle_id } => commands::vehicles::remove(&vehicle_id, &global),
        Command::Status => commands::status::handle(&global).await,
        Command::Watch(args) => commands::watch::handle(args, &global).await,
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "niuly", &mut std::io::stdout());
            Ok(())
        }
    }
}
