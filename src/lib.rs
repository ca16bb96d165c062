//! Target Tracker — robotics vision coprocessor pipeline.
//!
//! Ingests camera frames, runs them through an external vision stage, and
//! routes the resulting target telemetry to a control-system network link
//! and/or a live video stream, while accepting runtime reconfiguration
//! commands back over the same link.
//!
//! Data flow: capture → frame channel → processing worker → router →
//! {network client, streamer sink}; inbound control messages loop back
//! through the reconfigurator into routing and per-camera enable state.

pub mod app;
pub mod capture;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod metrics;
pub mod net;
pub mod processor;
pub mod protocol;
pub mod reconfig;
pub mod router;
pub mod stream;
pub mod vision;

pub use app::TrackerApp;
pub use cli::CliArgs;
pub use config::Config;
pub use error::{Result, TrackerError};
pub use frame::{Frame, ProcessedFrame, Target};
pub use router::{ControlState, Router, RoutingTable, SinkKind};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::frame_channel;
    use crate::frame::{epoch_secs, GrayImage};
    use crate::processor::ProcessingWorker;
    use crate::protocol::{encode_telemetry, TelemetryMessage};
    use crate::vision::{BoundingBox, VisionPipeline};
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    /// Two cameras, camera 0 enabled and routed to the network sink. One
    /// detected box (100, 50, 20x10) on a 640x480 frame must come out the
    /// wire as target `(0, 110, 55, 20, 10)` with a target count of 1.
    #[test]
    fn detection_reaches_the_wire_with_centered_coordinates() {
        struct OneBox;
        impl VisionPipeline for OneBox {
            fn process(&mut self, _frame: &Frame) -> Vec<BoundingBox> {
                vec![BoundingBox {
                    x: 100,
                    y: 50,
                    width: 20,
                    height: 10,
                }]
            }
        }

        let control = Arc::new(ControlState::new(
            2,
            RoutingTable {
                network: Some(0),
                streamer: None,
            },
            &[true, false],
        ));

        let wire: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let wire_sink = wire.clone();
        let router = Router::new(
            control.clone(),
            Box::new(move |frame| {
                let encoded = encode_telemetry(&TelemetryMessage::from_processed(frame));
                wire_sink.lock().unwrap().push(encoded);
            }),
            Box::new(|_frame| panic!("streamer sink is inactive")),
        );

        let (_tx, rx) = frame_channel();
        let mut worker = ProcessingWorker::new(
            0,
            rx,
            Box::new(OneBox),
            control,
            Arc::new(AtomicBool::new(false)),
        );

        let processed = worker.cycle(Frame::new(GrayImage::new(640, 480), epoch_secs()));
        router.dispatch(&processed);

        let wire = wire.lock().unwrap();
        assert_eq!(wire.len(), 1);
        let record = wire[0].trim_end();
        let (len_field, body) = record.split_once(',').unwrap();
        assert_eq!(len_field.parse::<usize>().unwrap(), body.len());

        let fields: Vec<&str> = body.split(',').collect();
        assert_eq!(fields[0], "1"); // protocol version
        assert_eq!(fields[1], "0"); // source camera
        assert_eq!(fields[2], "640");
        assert_eq!(fields[3], "480");
        assert_eq!(fields[6], "1"); // target count
        // The single target: index, center x/y, extent.
        assert_eq!(&fields[7..12], &["0", "110", "55", "20", "10"]);
    }
}
