//! Booksync CLI - run one booking sync from the terminal
//!
//! Prints the same JSON body the HTTP endpoint returns.

mod cli;
mod error;
mod sync;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::Cli;
use crate::error::CliError;
use crate::sync::run_sync;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("booksync=info".parse().expect("valid directive"))
                .add_directive("booksync_core=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "Parsed command line");
    run_sync(&cli.request()).await
}
