//! Camera capture loop.
//!
//! Hardware access is a collaborator behind [`CameraSource`]; the loop here
//! owns the poll-and-retry reconnect policy. A failed read marks the source
//! disconnected, the frame channel is drained so the worker never sees a
//! frame from before the gap, and connection attempts repeat on a fixed
//! interval until the hardware comes back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::imageops;
use log::{debug, info, warn};

use crate::channel::FrameSender;
use crate::config::CameraConfig;
use crate::error::{Result, TrackerError};
use crate::frame::{epoch_secs, Frame, GrayImage};

const RECONNECT_INTERVAL: Duration = Duration::from_millis(500);

/// Camera hardware boundary. `connect` reports failure by returning
/// `false`, never by panicking; `read` returns `None` on a lost stream.
pub trait CameraSource: Send {
    fn connect(&mut self, config: &CameraConfig) -> bool;
    fn read(&mut self) -> Option<Frame>;
}

/// Build the capture backend named by the config `src` field.
///
/// `test-pattern` is built in for bring-up and tests; real camera backends
/// implement [`CameraSource`] and register a scheme here. An unrecognized
/// scheme is a startup configuration error.
pub fn open_source(config: &CameraConfig) -> Result<Box<dyn CameraSource>> {
    match config.src.as_str() {
        "test-pattern" => Ok(Box::new(TestPatternSource::default())),
        other => Err(TrackerError::config(format!(
            "no capture backend for camera source '{}'",
            other
        ))),
    }
}

/// Per-camera capture thread main.
pub fn capture_loop(
    mut source: Box<dyn CameraSource>,
    config: CameraConfig,
    tx: FrameSender,
    shutdown: Arc<AtomicBool>,
) {
    info!("Capture starting for camera '{}'", config.name);
    let mut disconnected = true;

    while !shutdown.load(Ordering::Relaxed) {
        if disconnected {
            // Anything still in flight predates the gap.
            tx.drain();
            if source.connect(&config) {
                info!("Camera '{}' connected", config.name);
                disconnected = false;
            } else {
                thread::sleep(RECONNECT_INTERVAL);
            }
            continue;
        }

        match source.read() {
            Some(frame) => {
                let frame = apply_rotation(frame, config.rotate);
                if !tx.put(frame, &shutdown) {
                    break;
                }
            }
            None => {
                warn!("Camera '{}' disconnected", config.name);
                disconnected = true;
            }
        }
    }
    debug!("Capture exiting for camera '{}'", config.name);
}

/// Rotate a captured frame per the camera's mounting orientation.
/// Quarter turns swap the frame dimensions.
fn apply_rotation(frame: Frame, rotate: i32) -> Frame {
    let captured_at = frame.captured_at;
    match rotate {
        90 => Frame::new(imageops::rotate90(&frame.data), captured_at),
        180 => Frame::new(imageops::rotate180(&frame.data), captured_at),
        -90 | 270 => Frame::new(imageops::rotate270(&frame.data), captured_at),
        _ => frame,
    }
}

/// Synthetic capture backend producing a moving gradient at roughly 30 FPS.
#[derive(Default)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    counter: u32,
}

impl TestPatternSource {
    const FRAME_PERIOD: Duration = Duration::from_millis(33);
}

impl CameraSource for TestPatternSource {
    fn connect(&mut self, config: &CameraConfig) -> bool {
        self.width = config.width;
        self.height = config.height;
        true
    }

    fn read(&mut self) -> Option<Frame> {
        thread::sleep(Self::FRAME_PERIOD);
        let offset = self.counter;
        let data = GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([((x + offset) ^ y) as u8])
        });
        self.counter = self.counter.wrapping_add(1);
        Some(Frame::new(data, epoch_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::frame_channel;
    use crate::config::CameraConfig;

    fn camera_config(rotate: i32) -> CameraConfig {
        CameraConfig {
            name: "test".into(),
            src: "test-pattern".into(),
            width: 64,
            height: 32,
            rotate,
            ..CameraConfig::default()
        }
    }

    #[test]
    fn open_source_knows_the_test_pattern() {
        assert!(open_source(&camera_config(0)).is_ok());
        let mut unknown = camera_config(0);
        unknown.src = "/dev/video9".into();
        assert!(open_source(&unknown).is_err());
    }

    #[test]
    fn capture_loop_delivers_frames() {
        let (tx, rx) = frame_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = shutdown.clone();
        let config = camera_config(0);
        let source = open_source(&config).unwrap();
        let handle = thread::spawn(move || capture_loop(source, config, tx, stop));

        let frame = rx.take_timeout(Duration::from_secs(2)).expect("no frame captured");
        assert_eq!((frame.width, frame.height), (64, 32));

        shutdown.store(true, Ordering::SeqCst);
        handle.join().unwrap();
    }

    #[test]
    fn quarter_turn_rotation_swaps_dimensions() {
        let (tx, rx) = frame_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = shutdown.clone();
        let config = camera_config(90);
        let source = open_source(&config).unwrap();
        let handle = thread::spawn(move || capture_loop(source, config, tx, stop));

        let frame = rx.take_timeout(Duration::from_secs(2)).expect("no frame captured");
        assert_eq!((frame.width, frame.height), (32, 64));

        shutdown.store(true, Ordering::SeqCst);
        handle.join().unwrap();
    }

    #[test]
    fn reconnect_drains_stale_frames() {
        // A source that delivers one frame, drops out, then recovers.
        struct FlakySource {
            connects: u32,
            reads: u32,
        }
        impl CameraSource for FlakySource {
            fn connect(&mut self, _config: &CameraConfig) -> bool {
                self.connects += 1;
                true
            }
            fn read(&mut self) -> Option<Frame> {
                self.reads += 1;
                if self.reads == 2 {
                    return None;
                }
                thread::sleep(Duration::from_millis(5));
                Some(Frame::new(GrayImage::new(8, 8), epoch_secs()))
            }
        }

        let (tx, rx) = frame_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = shutdown.clone();
        let handle = thread::spawn(move || {
            capture_loop(
                Box::new(FlakySource {
                    connects: 0,
                    reads: 0,
                }),
                camera_config(0),
                tx,
                stop,
            )
        });

        // Frames keep arriving across the simulated disconnect.
        assert!(rx.take_timeout(Duration::from_secs(2)).is_some());
        assert!(rx.take_timeout(Duration::from_secs(2)).is_some());

        shutdown.store(true, Ordering::SeqCst);
        handle.join().unwrap();
    }
}
