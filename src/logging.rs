use log::{info, LevelFilter};

use crate::config::Config;
use crate::error::Result;

/// Initialize logging. Verbosity 0 is Info, 1 Debug, anything higher
/// Trace; `RUST_LOG` still wins when set.
pub fn setup_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp_millis();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.try_init()?;
    Ok(())
}

pub fn log_app_start(version: &str) {
    info!("Starting Target Tracker v{}", version);
}

pub fn log_app_config(config: &Config) {
    info!("Application configured with:");
    info!("  Cameras:");
    for (index, entry) in config.cameras.iter().enumerate() {
        info!(
            "    [{}] '{}' src={} {}x{} rotate={} processing {}",
            index,
            entry.camera.name,
            entry.camera.src,
            entry.camera.width,
            entry.camera.height,
            entry.camera.rotate,
            if entry.processor.enabled.unwrap_or(true) {
                "enabled"
            } else {
                "disabled"
            },
        );
    }
    info!("  Network:");
    info!("    Host: {}", config.network.host);
    info!("    Port: {}", config.network.port);
    info!("  Routes:");
    info!("    Network sink source: {}", config.routes.network);
    info!("    Streamer sink source: {}", config.routes.streamer);
    info!("  Streamer:");
    if config.streamer.stream {
        info!("    Port: {}", config.streamer.port);
        info!("    Quality: {}%", config.streamer.quality);
        info!("    Queue depth: {}", config.streamer.queue_depth);
    } else {
        info!("    Disabled");
    }
}
