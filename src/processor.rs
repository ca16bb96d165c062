//! Per-camera processing worker.
//!
//! Each worker drains its frame channel, runs the external vision stage,
//! normalizes the resulting geometry, updates its rolling metrics, and
//! hands the processed frame to every registered listener. One cycle is
//! outstanding at a time; a disabled camera still produces (empty) frames
//! so downstream consumers keep seeing liveness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::channel::FrameReceiver;
use crate::frame::{epoch_secs, Frame, ProcessedFrame, Target};
use crate::metrics::CircularBuffer;
use crate::router::ControlState;
use crate::vision::VisionPipeline;

/// Rolling window for the FPS and latency averages.
const METRICS_WINDOW: usize = 25;
/// Bounded wait per cycle before the worker reports itself idle.
const IDLE_WAIT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Processing,
    Disabled,
}

pub type FrameListener = Box<dyn Fn(&ProcessedFrame) + Send>;

pub struct ProcessingWorker {
    source: usize,
    rx: FrameReceiver,
    pipeline: Box<dyn VisionPipeline>,
    control: Arc<ControlState>,
    listeners: Vec<FrameListener>,
    fps: CircularBuffer,
    latency: CircularBuffer,
    last_cycle: Instant,
    state: WorkerState,
    shutdown: Arc<AtomicBool>,
}

impl ProcessingWorker {
    pub fn new(
        source: usize,
        rx: FrameReceiver,
        pipeline: Box<dyn VisionPipeline>,
        control: Arc<ControlState>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            rx,
            pipeline,
            control,
            listeners: Vec::new(),
            fps: CircularBuffer::new(METRICS_WINDOW),
            latency: CircularBuffer::new(METRICS_WINDOW),
            last_cycle: Instant::now(),
            state: WorkerState::Idle,
            shutdown,
        }
    }

    /// Connect a recipient of processed frames (the router).
    pub fn register_listener(&mut self, listener: FrameListener) {
        self.listeners.push(listener);
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn run(&mut self) {
        info!("Worker {} starting", self.source);
        while !self.shutdown.load(Ordering::Relaxed) {
            let frame = match self.rx.take_timeout(IDLE_WAIT) {
                Some(frame) => frame,
                None => {
                    self.state = WorkerState::Idle;
                    continue;
                }
            };
            let processed = self.cycle(frame);
            for listener in &self.listeners {
                listener(&processed);
            }
        }
        info!("Worker {} stopping", self.source);
    }

    pub fn spawn(mut self) -> JoinHandle<()> {
        thread::Builder::new()
            .name(format!("worker-{}", self.source))
            .spawn(move || self.run())
            .expect("failed to spawn processing worker")
    }

    /// One processing cycle: vision stage (unless this camera is disabled),
    /// metrics update, processed-frame construction.
    pub fn cycle(&mut self, frame: Frame) -> ProcessedFrame {
        let targets = if self.control.enabled(self.source) {
            self.state = WorkerState::Processing;
            self.pipeline
                .process(&frame)
                .iter()
                .enumerate()
                .map(|(index, rect)| Target {
                    index,
                    center_x: rect.x as f64 + rect.width as f64 / 2.0,
                    center_y: rect.y as f64 + rect.height as f64 / 2.0,
                    width: rect.width,
                    height: rect.height,
                })
                .collect()
        } else {
            // Skip the vision stage entirely but keep emitting metrics.
            self.state = WorkerState::Disabled;
            Vec::new()
        };

        let now = Instant::now();
        let delta = now.duration_since(self.last_cycle).as_secs_f64();
        // A zero-duration cycle would divide to infinity.
        let fps_sample = if delta > 0.0 { 1.0 / delta } else { 1.0 };
        self.last_cycle = now;
        self.fps.append(fps_sample);

        let latency_sample = (epoch_secs() - frame.captured_at) * 1000.0;
        self.latency.append(latency_sample);

        debug!(
            "Worker {} cycle: {} targets, fps {}, latency {} ms",
            self.source,
            targets.len(),
            self.fps.average(1),
            self.latency.average(1)
        );

        // Pixels are only carried when the streamer currently wants this
        // source; the network path never needs them.
        let keep_pixels = self.control.routes().streamer == Some(self.source);
        let (width, height, captured_at) = (frame.width, frame.height, frame.captured_at);
        ProcessedFrame {
            source: self.source,
            image: keep_pixels.then(|| Arc::new(frame.data)),
            width,
            height,
            targets,
            fps: self.fps.average(1),
            latency_ms: self.latency.average(1),
            captured_at,
        }
    }
}
