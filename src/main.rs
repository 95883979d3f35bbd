mod checkpoint;
mod commands;
mod config;
mod error;
mod harvest;
mod source;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing::Level;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    commands::run(cli.command).await
}
