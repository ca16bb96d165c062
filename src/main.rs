use anyhow::Result;
use clap::Parser;
use log::info;

use target_tracker::{app::TrackerApp, cli::CliArgs, config::Config, logging};

fn main() -> Result<()> {
    let args = CliArgs::parse();

    logging::setup_logging(args.verbose)?;
    logging::log_app_start(target_tracker::VERSION);

    let config = Config::load(&args)?;
    logging::log_app_config(&config);

    let app = TrackerApp::start(config)?;

    info!("--- Press enter to exit ---");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);

    app.stop();
    info!("Shutdown complete");
    Ok(())
}
