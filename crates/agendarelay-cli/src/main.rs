//! agendarelay CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};

use agendarelay_cli::{Cli, app};
use agendarelay_core::{EnvConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so flags backed by env vars see its values
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.tracing_config()) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match dotenv {
        Ok(path) => debug!("Loaded .env from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }

    match app::run(&cli, &EnvConfig).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e.report());
            ExitCode::FAILURE
        }
    }
}
