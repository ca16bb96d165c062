//! Application configuration.
//!
//! Loaded from a JSON file, overridden by CLI arguments, then validated.
//! Every recognized key is an explicit field and unknown keys are rejected,
//! so a typo in a stage parameter is a reportable startup error instead of
//! a silently ignored setting.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;

use crate::cli::CliArgs;
use crate::error::TrackerError;
use crate::router::RoutingTable;
use crate::vision::PipelineConfig;

pub const DEFAULT_CONFIG_FILE: &str = "config_default.json";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub cameras: Vec<CameraEntry>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub routes: RouteConfig,
    #[serde(default)]
    pub streamer: StreamerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraEntry {
    pub camera: CameraConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CameraConfig {
    pub name: String,
    pub src: String,
    pub width: u32,
    pub height: u32,
    /// Mounting orientation: 0, 90, 180, 270 or -90 degrees.
    pub rotate: i32,
    pub exposure: i32,
    pub brightness: i32,
    pub saturation: i32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            src: "test-pattern".into(),
            width: 640,
            height: 480,
            rotate: 0,
            exposure: -8,
            brightness: 40,
            saturation: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProcessorConfig {
    pub enabled: Option<bool>,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "roborio-4818-frc.local".into(),
            port: 5801,
        }
    }
}

/// Initial sink selections. Negative means inactive.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RouteConfig {
    pub network: i64,
    pub streamer: i64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            network: -1,
            streamer: -1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StreamerConfig {
    pub stream: bool,
    pub port: u16,
    pub quality: u8,
    pub queue_depth: usize,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            stream: false,
            port: 5802,
            quality: 80,
            queue_depth: 10,
        }
    }
}

impl Config {
    pub fn load(args: &CliArgs) -> Result<Self> {
        let path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_FILE);
        info!("Loading configuration from {}", path);

        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path))?;
        let mut config: Config = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config file: {}", path))?;

        config.override_with_cli_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn override_with_cli_args(&mut self, args: &CliArgs) {
        if args.local {
            self.network.host = "localhost".into();
        }
        if let Some(host) = &args.host {
            self.network.host = host.clone();
        }
        if let Some(port) = args.port {
            self.network.port = port;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.cameras.is_empty() {
            return Err(TrackerError::config("at least one camera must be configured").into());
        }

        // Two cameras cannot share a hardware source. The synthetic
        // test-pattern backend is exempt, any number of those can coexist.
        let mut seen = HashSet::new();
        for entry in &self.cameras {
            let src = &entry.camera.src;
            if src != "test-pattern" && !seen.insert(src.clone()) {
                return Err(
                    TrackerError::config(format!("multiple cameras with source '{}'", src)).into(),
                );
            }
            if !matches!(entry.camera.rotate, 0 | 90 | 180 | 270 | -90) {
                return Err(TrackerError::config(format!(
                    "camera '{}' has unsupported rotation {}",
                    entry.camera.name, entry.camera.rotate
                ))
                .into());
            }
            entry
                .processor
                .pipeline
                .validate()
                .with_context(|| format!("camera '{}' pipeline", entry.camera.name))?;
        }

        if !(2..=99).contains(&self.streamer.quality) {
            return Err(TrackerError::config(format!(
                "streamer quality {} outside 2..=99",
                self.streamer.quality
            ))
            .into());
        }

        let count = self.cameras.len() as i64;
        for (sink, index) in [("network", self.routes.network), ("streamer", self.routes.streamer)]
        {
            if index >= count {
                warn!(
                    "Initial {} route {} is outside the camera set, sink starts inactive",
                    sink, index
                );
            }
        }

        Ok(())
    }

    /// Initial sink selections with out-of-range indices already mapped to
    /// inactive.
    pub fn initial_routes(&self) -> RoutingTable {
        let count = self.cameras.len() as i64;
        let select = |index: i64| {
            if (0..count).contains(&index) {
                Some(index as usize)
            } else {
                None
            }
        };
        RoutingTable {
            network: select(self.routes.network),
            streamer: select(self.routes.streamer),
        }
    }

    /// Initial per-camera processing-enable flags.
    pub fn initial_enables(&self) -> Vec<bool> {
        self.cameras
            .iter()
            .map(|entry| entry.processor.enabled.unwrap_or(true))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "cameras": [
            {
                "camera": {"name": "front", "src": "test-pattern",
                           "width": 640, "height": 480},
                "processor": {
                    "enabled": true,
                    "pipeline": {
                        "hsv_threshold": {"hue": [60, 100],
                                          "saturation": [100, 255],
                                          "value": [100, 255]},
                        "filter_contours": {"min_area": 120.0}
                    }
                }
            },
            {
                "camera": {"name": "rear", "src": "test-pattern", "rotate": 180},
                "processor": {"enabled": false}
            }
        ],
        "network": {"host": "localhost", "port": 5801},
        "routes": {"network": 0, "streamer": -1},
        "streamer": {"stream": true, "port": 5802, "quality": 80, "queue_depth": 10}
    }"#;

    #[test]
    fn sample_config_parses_and_validates() {
        let config = Config::from_json(SAMPLE).unwrap();
        assert_eq!(config.cameras.len(), 2);
        assert_eq!(config.cameras[0].camera.width, 640);
        assert_eq!(config.cameras[1].camera.rotate, 180);
        assert_eq!(config.network.port, 5801);
        assert_eq!(config.initial_enables(), vec![true, false]);
        assert_eq!(
            config.initial_routes(),
            RoutingTable {
                network: Some(0),
                streamer: None,
            }
        );
    }

    #[test]
    fn defaults_fill_missing_camera_fields() {
        let config =
            Config::from_json(r#"{"cameras": [{"camera": {"name": "only"}}]}"#).unwrap();
        let camera = &config.cameras[0].camera;
        assert_eq!((camera.width, camera.height), (640, 480));
        assert_eq!(camera.exposure, -8);
        assert_eq!(camera.brightness, 40);
        assert_eq!(camera.saturation, 200);
        assert!(config.initial_enables()[0]);
    }

    #[test]
    fn unknown_keys_are_reportable_errors() {
        let result = Config::from_json(
            r#"{"cameras": [{"camera": {"name": "a", "widht": 640}}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_hardware_sources_are_rejected() {
        let result = Config::from_json(
            r#"{"cameras": [
                {"camera": {"name": "a", "src": "/dev/video0"}},
                {"camera": {"name": "b", "src": "/dev/video0"}}
            ]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unsupported_rotation_is_rejected() {
        let result =
            Config::from_json(r#"{"cameras": [{"camera": {"name": "a", "rotate": 45}}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn quality_bounds_are_enforced() {
        let result = Config::from_json(
            r#"{"cameras": [{"camera": {"name": "a"}}],
                "streamer": {"quality": 1}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_initial_routes_start_inactive() {
        let config = Config::from_json(
            r#"{"cameras": [{"camera": {"name": "a"}}],
                "routes": {"network": 5, "streamer": 0}}"#,
        )
        .unwrap();
        assert_eq!(
            config.initial_routes(),
            RoutingTable {
                network: None,
                streamer: Some(0),
            }
        );
    }
}
