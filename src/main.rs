// Entry point - CLI parsing and wiring

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod app;
mod backend;
mod bundle;
mod config;
mod error;

use crate::app::App;
use crate::backend::VaultBackend;
use crate::config::{Config, UploadSettings, VaultSettings};
use crate::error::Error;

#[derive(Parser)]
#[command(name = "ssl-vault", version)]
#[command(about = "Upload a domain's TLS certificate bundle to Vault")]
struct Cli {
    /// Domain to add the record for
    #[arg(short = 'd', long = "domain")]
    domain: Option<String>,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    // Checked before anything is read or sent.
    let Some(domain) = cli.domain.filter(|d| !d.trim().is_empty()) else {
        eprintln!("Provide the domain name via --domain option");
        return ExitCode::FAILURE;
    };

    match run(&domain) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(domain: &str) -> Result<(), Error> {
    let config = Config::load(config::ENV_FILE)?;
    let backend = VaultBackend::new(&VaultSettings::from_config(&config)?)?;
    let app = App::new(backend, UploadSettings::from_config(&config)?);
    app.run(domain)?;
    Ok(())
}

fn report(err: &Error) {
    match err.remediation() {
        Some(msg) => eprintln!("{}", msg.yellow()),
        None => eprintln!("{}: {}", "Error".red(), err),
    }
}

fn init_tracing() {
    // Only this crate by default; vaultrs logs every API error at ERROR level.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off,ssl_vault=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
