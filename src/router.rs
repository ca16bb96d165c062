//! Routing of processed frames to the active sinks.
//!
//! Two sink kinds exist, each selecting at most one camera source at a
//! time. The selection state is read on every frame and written only when a
//! control message arrives, so reads take a cheap snapshot and momentarily
//! stale combinations are tolerated by design (one extra or one missing
//! cycle of telemetry at a source switch does not matter).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::frame::ProcessedFrame;
use crate::protocol::ControlMessage;

/// Which camera feeds each sink. `None` means the sink is inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutingTable {
    pub network: Option<usize>,
    pub streamer: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Network,
    Streamer,
}

/// Shared routing and per-camera enable state.
///
/// Single-writer (the control reconfigurator), many readers (router and
/// workers). The routing pair lives behind one lock so each control message
/// applies as a unit; enable flags are independent atomics with relaxed
/// ordering since a one-cycle-stale flag is harmless.
pub struct ControlState {
    routes: RwLock<RoutingTable>,
    enables: Vec<AtomicBool>,
}

impl ControlState {
    pub fn new(camera_count: usize, routes: RoutingTable, enables: &[bool]) -> Self {
        let enables = (0..camera_count)
            .map(|i| AtomicBool::new(enables.get(i).copied().unwrap_or(true)))
            .collect();
        Self {
            routes: RwLock::new(Self::clamp(routes, camera_count)),
            enables,
        }
    }

    /// Consistent snapshot of both sink selections.
    pub fn routes(&self) -> RoutingTable {
        *self.routes.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Select the source for one sink. Out-of-range ids deactivate the
    /// sink rather than erroring, to ride out transient misconfiguration.
    pub fn set_source(&self, kind: SinkKind, camera_id: i64) {
        let selection = self.to_index(camera_id);
        let mut routes = self.routes.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        match kind {
            SinkKind::Network => routes.network = selection,
            SinkKind::Streamer => routes.streamer = selection,
        }
    }

    pub fn enabled(&self, source: usize) -> bool {
        self.enables
            .get(source)
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn set_enabled(&self, source: usize, enabled: bool) {
        if let Some(flag) = self.enables.get(source) {
            flag.store(enabled, Ordering::Relaxed);
        }
    }

    /// Apply one control message: both sink selections as a single routing
    /// write, then the enable flags positionally — but only when the
    /// message carries exactly one flag per configured camera. A count
    /// mismatch leaves every flag unchanged.
    pub fn apply(&self, message: &ControlMessage) {
        {
            let mut routes = self.routes.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            routes.network = self.to_index(message.network_source);
            routes.streamer = self.to_index(message.streamer_source);
        }
        if message.enables.len() == self.enables.len() {
            for (flag, enabled) in self.enables.iter().zip(&message.enables) {
                flag.store(*enabled, Ordering::Relaxed);
            }
        } else {
            log::warn!(
                "Control message enable count {} does not match {} cameras, flags unchanged",
                message.enables.len(),
                self.enables.len()
            );
        }
    }

    fn to_index(&self, camera_id: i64) -> Option<usize> {
        if camera_id >= 0 && (camera_id as usize) < self.enables.len() {
            Some(camera_id as usize)
        } else {
            None
        }
    }

    fn clamp(routes: RoutingTable, camera_count: usize) -> RoutingTable {
        let check = |selection: Option<usize>| selection.filter(|&id| id < camera_count);
        RoutingTable {
            network: check(routes.network),
            streamer: check(routes.streamer),
        }
    }
}

pub type SinkCallback = Box<dyn Fn(&ProcessedFrame) + Send + Sync>;

/// Stateless dispatch from processing workers to the active sinks.
///
/// Both sinks may receive the same frame (one camera can feed both), or
/// neither (the frame is dropped after its metrics were recorded).
pub struct Router {
    state: Arc<ControlState>,
    network: SinkCallback,
    streamer: SinkCallback,
}

impl Router {
    pub fn new(state: Arc<ControlState>, network: SinkCallback, streamer: SinkCallback) -> Self {
        Self {
            state,
            network,
            streamer,
        }
    }

    /// Change which camera feeds a sink. Delegates to the shared state so
    /// workers observe the same snapshot.
    pub fn set_source(&self, kind: SinkKind, camera_id: i64) {
        self.state.set_source(kind, camera_id);
    }

    pub fn dispatch(&self, frame: &ProcessedFrame) {
        let routes = self.state.routes();
        if routes.network == Some(frame.source) {
            (self.network)(frame);
        }
        if routes.streamer == Some(frame.source) {
            (self.streamer)(frame);
        }
    }
}
