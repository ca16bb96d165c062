use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(version, about = "Vision coprocessor target tracker", long_about = None)]
pub struct CliArgs {
    /// Configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Connect to localhost instead of the configured control system
    #[arg(long)]
    pub local: bool,

    /// Override the configured control-system host
    #[arg(long)]
    pub host: Option<String>,

    /// Override the configured control-system port
    #[arg(long)]
    pub port: Option<u16>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
