//! Frame and target data shapes shared across pipeline stages.

use image::{ImageBuffer, Luma};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub type GrayImage = ImageBuffer<Luma<u8>, Vec<u8>>;

/// A captured camera image plus its capture timestamp.
///
/// Owned exclusively by whichever stage currently holds it; ownership moves
/// on every hand-off.
pub struct Frame {
    pub data: GrayImage,
    pub width: u32,
    pub height: u32,
    /// Epoch seconds at capture, used for latency and telemetry.
    pub captured_at: f64,
}

impl Frame {
    pub fn new(data: GrayImage, captured_at: f64) -> Self {
        let (width, height) = data.dimensions();
        Self {
            data,
            width,
            height,
            captured_at,
        }
    }
}

/// One detected target within a frame, in image-relative pixel coordinates.
///
/// The center is top-left plus half the extent of the bounding rectangle
/// the vision pipeline reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub index: usize,
    pub center_x: f64,
    pub center_y: f64,
    pub width: u32,
    pub height: u32,
}

/// Output of one processing cycle, routed to the active sinks.
///
/// Immutable after creation. Pixels are retained only when the streamer
/// sink currently selects this source, so the network-only path never
/// clones image data.
#[derive(Clone)]
pub struct ProcessedFrame {
    pub source: usize,
    pub image: Option<Arc<GrayImage>>,
    pub width: u32,
    pub height: u32,
    pub targets: Vec<Target>,
    /// Rolling FPS average at the time this frame was produced.
    pub fps: f64,
    /// Rolling capture-to-processed latency average, milliseconds.
    pub latency_ms: f64,
    pub captured_at: f64,
}

/// Seconds since the Unix epoch as a float, matching the wire format's
/// capture-time field.
pub fn epoch_secs() -> f64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs_f64(),
        Err(_) => 0.0,
    }
}
