use anyhow::Result;
use clap::Parser;
use fxrelay::log::init_logging;

/// Asks the quote service for the current exchange rate and appends it to
/// the local record file.
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
    fxrelay::requester::run(&config.client).await
}
