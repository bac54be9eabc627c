//! Pipe framing: five positional fields joined by `|`.
//!
//! ```text
//! destination|source|delay|device|payload-tail
//! ```
//!
//! The single `device` slot carries the *addressed* device: the
//! `destination_device` on controller-originated frames and the
//! `source_device` on robot-originated ones. A parameterized command occupies
//! two tail segments (`name|{compact json}`); any other tail is rejoined
//! verbatim into a plain payload, so payload text containing `|` survives.
//!
//! Decoding never fails. Missing or unrecognized fields fall back to the
//! documented defaults (`destination=robot`, `source=controller`, `delay=0`,
//! `device="info"`, empty payload) — on an unreliable channel a garbled frame
//! must degrade, not crash.

use serde_json::Value;

use roverlink_types::message::{coerce_delay, CONTROLLER_DEVICE};
use roverlink_types::{Endpoint, Payload, RobotMessage, Source};

/// Fallback device identifier for frames that do not name one.
const DEFAULT_DEVICE: &str = "info";

/// Encode a message into its positional wire string.
pub fn encode(msg: &RobotMessage) -> String {
    let device = match msg.source {
        Source::Controller => msg.destination_device.as_str(),
        Source::Robot => msg.source_device.as_str(),
    };
    let tail = match &msg.payload {
        Payload::Plain(text) => text.clone(),
        Payload::Command(name, args) => {
            // Compact JSON keeps the argument object inside one segment.
            let args = serde_json::to_string(args).unwrap_or_else(|_| "{}".to_string());
            format!("{name}|{args}")
        }
    };
    format!(
        "{}|{}|{}|{}|{}",
        msg.destination.as_token(),
        msg.source.as_token(),
        msg.delay,
        device,
        tail
    )
}

/// Decode a positional wire string, stamping the arrival time.
pub fn decode(raw: &str) -> RobotMessage {
    let mut parts = raw.splitn(5, '|');
    let destination = parts
        .next()
        .and_then(Endpoint::from_token)
        .unwrap_or_default();
    let source = parts.next().and_then(Source::from_token).unwrap_or_default();
    let delay = coerce_delay(&Value::String(
        parts.next().unwrap_or_default().to_string(),
    ));
    let device = match parts.next() {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => DEFAULT_DEVICE.to_string(),
    };
    let payload = decode_tail(parts.next().unwrap_or_default());

    let (destination_device, source_device) = match source {
        Source::Controller => (device, CONTROLLER_DEVICE.to_string()),
        Source::Robot => (DEFAULT_DEVICE.to_string(), device),
    };

    let mut msg = RobotMessage::to_device(destination_device, payload);
    msg.destination = destination;
    msg.source = source;
    msg.source_device = source_device;
    msg.delay = delay;
    msg.stamp_arrival();
    msg
}

/// A tail of exactly `name|{json object}` is a parameterized command;
/// everything else is a plain payload, delimiters and all.
fn decode_tail(tail: &str) -> Payload {
    if let Some((name, args)) = tail.split_once('|') {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(args) {
            return Payload::command(name, value);
        }
    }
    Payload::plain(tail)
}
