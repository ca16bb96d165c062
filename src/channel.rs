//! Bounded frame hand-off between a capture loop and its processing worker.
//!
//! Capacity is exactly one: a single frame in flight bounds end-to-end
//! latency to roughly one frame period and keeps a slow pipeline from
//! queuing stale frames. The producer blocks while full (backpressure on
//! the capture source) rather than dropping.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::frame::Frame;

/// How often a blocked `put` wakes to check the stop flag.
const PUT_POLL: Duration = Duration::from_millis(50);

pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = bounded(1);
    (
        FrameSender {
            tx,
            drain_rx: rx.clone(),
        },
        FrameReceiver { rx },
    )
}

/// Producer side, held by the capture loop.
pub struct FrameSender {
    tx: Sender<Frame>,
    drain_rx: Receiver<Frame>,
}

impl FrameSender {
    /// Hand a frame to the worker, blocking while the channel is full.
    ///
    /// The block is cooperative: the stop flag is checked on a short
    /// interval. Returns `false` once the consumer is gone or shutdown was
    /// requested, in which case the frame is dropped.
    pub fn put(&self, frame: Frame, shutdown: &AtomicBool) -> bool {
        let mut frame = frame;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return false;
            }
            match self.tx.send_timeout(frame, PUT_POLL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(returned)) => frame = returned,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    /// Discard any in-flight frame. Called by the capture loop on
    /// reconnect so the channel resumes emptied.
    pub fn drain(&self) {
        while self.drain_rx.try_recv().is_ok() {}
    }
}

/// Consumer side, held by the processing worker.
pub struct FrameReceiver {
    rx: Receiver<Frame>,
}

impl FrameReceiver {
    /// Wait up to `timeout` for a frame. `None` on timeout or when the
    /// producer side is gone.
    pub fn take_timeout(&self, timeout: Duration) -> Option<Frame> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
