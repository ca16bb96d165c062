//! Wire codec for the control-system link.
//!
//! Two bespoke ASCII formats share the socket. Outbound telemetry is
//! length-prefixed so a receiver that only trusts the prefix can discard
//! partial reads:
//!
//! ```text
//! LEN,version,source,width,height,fps,capture_time,target_count,t0,t1,...\n
//! ```
//!
//! where each target is the 5-tuple `index,center_x,center_y,width,height`
//! and `LEN` is the decimal byte length of everything after `LEN,` and
//! before the newline.
//!
//! Inbound control messages are newline-delimited records:
//!
//! ```text
//! length,version,network_source,streamer_source,camera_count,enable_0,...\n
//! ```
//!
//! A single read may coalesce several records; only the first is
//! interpreted and the rest are discarded. That matches the deployed
//! receiver behavior and is preserved as-is, known-limitation and all.

use crate::frame::{ProcessedFrame, Target};

pub const PROTOCOL_VERSION: u32 = 1;

/// Outbound per-cycle target report. Constructed fresh for each send.
#[derive(Debug, Clone)]
pub struct TelemetryMessage {
    pub version: u32,
    pub source: usize,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub captured_at: f64,
    pub targets: Vec<Target>,
}

impl TelemetryMessage {
    pub fn from_processed(frame: &ProcessedFrame) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            source: frame.source,
            width: frame.width,
            height: frame.height,
            fps: frame.fps,
            captured_at: frame.captured_at,
            targets: frame.targets.clone(),
        }
    }
}

/// Decoded inbound reconfiguration command. Validated, applied, discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub version: u32,
    pub network_source: i64,
    pub streamer_source: i64,
    pub enables: Vec<bool>,
}

/// Render a telemetry message as its framed wire form.
pub fn encode_telemetry(message: &TelemetryMessage) -> String {
    let mut body = format!(
        "{},{},{},{},{},{},{}",
        message.version,
        message.source,
        message.width,
        message.height,
        message.fps,
        message.captured_at,
        message.targets.len(),
    );
    for target in &message.targets {
        body.push_str(&format!(
            ",{},{},{},{},{}",
            target.index, target.center_x, target.center_y, target.width, target.height,
        ));
    }
    format!("{},{}\n", body.len(), body)
}

/// Parse the first record of an inbound read as a control message.
///
/// `None` means the record was malformed: a non-UTF8 read, a field that
/// fails integer parsing, or a field count that does not match the declared
/// camera count. Malformed messages cause no state change anywhere.
pub fn decode_control(raw: &[u8]) -> Option<ControlMessage> {
    let text = std::str::from_utf8(raw).ok()?;
    // First newline-delimited record only; later coalesced records dropped.
    let record = text.lines().next()?;
    let fields: Vec<&str> = record.split(',').collect();
    if fields.len() < 5 {
        return None;
    }

    let _length: u64 = fields[0].trim().parse().ok()?;
    let version: u32 = fields[1].trim().parse().ok()?;
    let network_source: i64 = fields[2].trim().parse().ok()?;
    let streamer_source: i64 = fields[3].trim().parse().ok()?;
    let camera_count: usize = fields[4].trim().parse().ok()?;

    // Compare on the field side; `5 + camera_count` could overflow on a
    // hostile count.
    if fields.len() - 5 != camera_count {
        return None;
    }
    let enables = fields[5..].iter().map(|field| field.trim() == "1").collect();

    Some(ControlMessage {
        version,
        network_source,
        streamer_source,
        enables,
    })
}
