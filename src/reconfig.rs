//! Applies inbound control messages to the running pipeline.

use std::sync::Arc;

use log::{debug, info};

use crate::protocol::ControlMessage;
use crate::router::ControlState;

/// Listens on the network client and rewrites routing and per-camera
/// enable state. Invalid messages never reach this type (the codec already
/// discarded them); valid ones are applied and dropped, with no
/// acknowledgement back to the sender.
pub struct Reconfigurator {
    control: Arc<ControlState>,
}

impl Reconfigurator {
    pub fn new(control: Arc<ControlState>) -> Self {
        Self { control }
    }

    pub fn apply(&self, message: &ControlMessage) {
        debug!(
            "Control message: network={} streamer={} enables={:?}",
            message.network_source, message.streamer_source, message.enables
        );
        self.control.apply(message);
        info!(
            "Routes now network={:?} streamer={:?}",
            self.control.routes().network,
            self.control.routes().streamer
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_control;
    use crate::router::RoutingTable;

    #[test]
    fn wire_record_drives_routing_and_enables() {
        // The documented example record: version 1, network 0, streamer 1,
        // two cameras enabled [true, false].
        let state = Arc::new(ControlState::new(2, RoutingTable::default(), &[false, true]));
        let reconfigurator = Reconfigurator::new(state.clone());

        let message = decode_control(b"34,1,0,1,2,1,0\n").unwrap();
        reconfigurator.apply(&message);

        assert_eq!(
            state.routes(),
            RoutingTable {
                network: Some(0),
                streamer: Some(1),
            }
        );
        assert!(state.enabled(0));
        assert!(!state.enabled(1));
    }

    #[test]
    fn invalid_record_causes_no_mutation() {
        let state = Arc::new(ControlState::new(
            2,
            RoutingTable {
                network: Some(1),
                streamer: None,
            },
            &[true, true],
        ));

        // Declared camera count disagrees with the enable fields, so the
        // codec rejects it before it could ever be applied.
        assert!(decode_control(b"34,1,0,1,4,1,0\n").is_none());
        assert_eq!(state.routes().network, Some(1));
        assert!(state.enabled(0) && state.enabled(1));
    }

    #[test]
    fn out_of_range_sources_deactivate_sinks() {
        let state = Arc::new(ControlState::new(2, RoutingTable::default(), &[true, true]));
        let reconfigurator = Reconfigurator::new(state.clone());

        let message = decode_control(b"34,1,5,-1,2,1,1\n").unwrap();
        reconfigurator.apply(&message);

        assert_eq!(state.routes(), RoutingTable::default());
    }
}
