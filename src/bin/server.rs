use anyhow::Result;
use clap::Parser;
use fxrelay::log::init_logging;

/// Quote relay service: fetches the upstream exchange rate on demand and
/// records every observation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long)]
    config_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = fxrelay::config::AppConfig::load_or_default(cli.config_path.as_deref())?;
    let result = fxrelay::server::run(&config.server).await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "quote service failed");
    }
    result
}
