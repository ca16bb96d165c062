//! Pipeline assembly and lifecycle.
//!
//! One thread per stage: a capture loop and a processing worker per camera,
//! the network client's connection maintenance, and the streamer's JPEG
//! encoder when streaming is on. All loops watch one shared stop flag at
//! their suspension points, so `stop` drains cleanly on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::info;

use crate::capture::{capture_loop, open_source};
use crate::channel::frame_channel;
use crate::config::Config;
use crate::error::Result;
use crate::net::NetworkClient;
use crate::processor::ProcessingWorker;
use crate::protocol::TelemetryMessage;
use crate::reconfig::Reconfigurator;
use crate::router::{ControlState, Router, SinkCallback};
use crate::stream::{encoder_loop, JpegSlot, StreamSink};
use crate::vision::build_pipeline;

pub struct TrackerApp {
    shutdown: Arc<AtomicBool>,
    client: Arc<NetworkClient>,
    control: Arc<ControlState>,
    handles: Vec<JoinHandle<()>>,
    jpeg: Option<JpegSlot>,
}

impl TrackerApp {
    /// Spawn every stage and wire the data path:
    /// capture → worker → router → {network, streamer}, with inbound
    /// control messages looping back into routing and enable state.
    pub fn start(config: Config) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let control = Arc::new(ControlState::new(
            config.cameras.len(),
            config.initial_routes(),
            &config.initial_enables(),
        ));

        let client = Arc::new(NetworkClient::new(
            &config.network.host,
            config.network.port,
        ));
        let reconfigurator = Reconfigurator::new(control.clone());
        client.register_listener(Box::new(move |message| reconfigurator.apply(message)));

        let sink = StreamSink::new(config.streamer.queue_depth);

        let telemetry_client = client.clone();
        let network_callback: SinkCallback = Box::new(move |frame| {
            telemetry_client.submit(&TelemetryMessage::from_processed(frame));
        });
        let router_sink = sink.clone();
        let streamer_callback: SinkCallback =
            Box::new(move |frame| router_sink.put(frame.clone()));
        let router = Arc::new(Router::new(
            control.clone(),
            network_callback,
            streamer_callback,
        ));

        let mut handles = Vec::new();
        let jpeg = match Self::spawn_stages(&config, &control, &client, &router, &sink, &shutdown, &mut handles) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                // A later camera failed to initialize with earlier stages
                // already running. Stop them before surfacing the error.
                shutdown.store(true, Ordering::Relaxed);
                client.shutdown();
                for handle in handles.drain(..) {
                    let _ = handle.join();
                }
                return Err(e);
            }
        };

        info!("Pipeline running with {} camera(s)", config.cameras.len());
        Ok(Self {
            shutdown,
            client,
            control,
            handles,
            jpeg,
        })
    }

    fn spawn_stages(
        config: &Config,
        control: &Arc<ControlState>,
        client: &Arc<NetworkClient>,
        router: &Arc<Router>,
        sink: &StreamSink,
        shutdown: &Arc<AtomicBool>,
        handles: &mut Vec<JoinHandle<()>>,
    ) -> Result<Option<JpegSlot>> {
        for (index, entry) in config.cameras.iter().enumerate() {
            let (tx, rx) = frame_channel();

            let source = open_source(&entry.camera)?;
            let camera_config = entry.camera.clone();
            let stop = shutdown.clone();
            handles.push(
                thread::Builder::new()
                    .name(format!("capture-{}", index))
                    .spawn(move || capture_loop(source, camera_config, tx, stop))?,
            );

            let pipeline = build_pipeline(&entry.processor.pipeline)?;
            let mut worker =
                ProcessingWorker::new(index, rx, pipeline, control.clone(), shutdown.clone());
            let worker_router = router.clone();
            worker.register_listener(Box::new(move |frame| worker_router.dispatch(frame)));
            handles.push(worker.spawn());
        }

        handles.push(client.spawn_maintenance());

        if !config.streamer.stream {
            return Ok(None);
        }
        let slot: JpegSlot = Arc::new(Mutex::new(None));
        let encoder_sink = sink.clone();
        let encoder_slot = slot.clone();
        let stop = shutdown.clone();
        let quality = config.streamer.quality;
        handles.push(
            thread::Builder::new()
                .name("stream-encoder".into())
                .spawn(move || encoder_loop(encoder_sink, quality, encoder_slot, stop))?,
        );
        Ok(Some(slot))
    }

    /// Shared routing/enable state, for callers embedding the pipeline.
    pub fn control(&self) -> Arc<ControlState> {
        self.control.clone()
    }

    /// Latest encoded stream frame, when streaming is on. The external
    /// HTTP layer serves from this slot.
    pub fn latest_jpeg(&self) -> Option<JpegSlot> {
        self.jpeg.clone()
    }

    /// Cooperative shutdown: raise the stop flag, close the network
    /// connection, join every stage.
    pub fn stop(mut self) {
        info!("Shutting down");
        self.shutdown.store(true, Ordering::Relaxed);
        self.client.shutdown();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        info!("All stages stopped");
    }
}
