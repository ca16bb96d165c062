//! Streamer sink: frames queued for MJPEG encoding.
//!
//! Unlike the frame channel, this queue sheds load by dropping the oldest
//! entry when full — a viewer wants the freshest picture, and stalling the
//! router on a slow HTTP consumer is not acceptable. The HTTP transport
//! itself lives outside this crate; the encoder stage here publishes the
//! latest JPEG into a shared slot for it to serve.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use log::{debug, trace, warn};

use crate::frame::ProcessedFrame;

/// Latest encoded frame, shared with the external HTTP layer.
pub type JpegSlot = Arc<Mutex<Option<Vec<u8>>>>;

#[derive(Clone)]
pub struct StreamSink {
    tx: Sender<ProcessedFrame>,
    rx: Receiver<ProcessedFrame>,
}

impl StreamSink {
    pub fn new(depth: usize) -> Self {
        let (tx, rx) = bounded(depth.max(1));
        Self { tx, rx }
    }

    /// Enqueue a frame, evicting the oldest queued frame when full.
    pub fn put(&self, frame: ProcessedFrame) {
        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(returned)) => {
                    let _ = self.rx.try_recv();
                    frame = returned;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    pub fn take_timeout(&self, timeout: Duration) -> Option<ProcessedFrame> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Consumer stage: encode queued frames at the configured JPEG quality and
/// publish the newest result. Runs until the stop flag is raised.
pub fn encoder_loop(sink: StreamSink, quality: u8, slot: JpegSlot, shutdown: Arc<AtomicBool>) {
    debug!("Stream encoder starting (quality {})", quality);
    while !shutdown.load(Ordering::Relaxed) {
        let frame = match sink.take_timeout(Duration::from_millis(100)) {
            Some(frame) => frame,
            None => continue,
        };
        let image = match &frame.image {
            Some(image) => image,
            None => {
                trace!("Stream frame from source {} carried no pixels", frame.source);
                continue;
            }
        };

        let mut encoded = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
        match encoder.encode(image.as_raw(), frame.width, frame.height, ColorType::L8) {
            Ok(()) => {
                *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(encoded);
            }
            Err(e) => warn!("JPEG encode failed: {}", e),
        }
    }
    debug!("Stream encoder stopping");
}
