//! JSON framing: a flat object with the message's field names as keys.
//!
//! Serde does the heavy lifting — the field defaults and the lenient delay
//! parser live on [`RobotMessage`] itself, so a frame with missing keys or a
//! mangled `delay` still decodes. Only syntactically invalid JSON is
//! rejected, and the caller is expected to log and drop it.

use roverlink_types::{RobotMessage, RoverError};

/// Encode a message as a compact JSON object.
pub fn encode(msg: &RobotMessage) -> Result<String, RoverError> {
    serde_json::to_string(msg).map_err(|e| RoverError::Encode(e.to_string()))
}

/// Decode a JSON frame, recomputing the local arrival timestamps.
pub fn decode(raw: &str) -> Result<RobotMessage, RoverError> {
    let mut msg: RobotMessage =
        serde_json::from_str(raw).map_err(|e| RoverError::Decode(e.to_string()))?;
    msg.stamp_arrival();
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roverlink_types::{Endpoint, Payload, Source};

    #[test]
    fn encode_emits_all_wire_keys() {
        let msg = RobotMessage::range_request();
        let wire = encode(&msg).unwrap();
        for key in [
            "destination",
            "destination_device",
            "source",
            "source_device",
            "delay",
            "message",
            "message_id",
            "arrival_time",
            "minimum_time",
        ] {
            assert!(wire.contains(key), "missing key {key} in {wire}");
        }
    }

    #[test]
    fn decode_recomputes_arrival_time() {
        let raw = r#"{"destination":"robot","destination_device":"drivetrain",
                      "message":"forward","arrival_time":1,"minimum_time":1}"#;
        let msg = decode(raw).unwrap();
        // Stale wire timestamps are discarded in favour of local "now".
        assert!(msg.arrival_time > 1);
        assert_eq!(msg.minimum_time, msg.arrival_time);
    }

    #[test]
    fn decode_applies_defaults_for_missing_fields() {
        let msg = decode(r#"{"message":"hello"}"#).unwrap();
        assert_eq!(msg.destination, Endpoint::Robot);
        assert_eq!(msg.source, Source::Controller);
        assert_eq!(msg.payload, Payload::plain("hello"));
        assert_eq!(msg.delay, 0.0);
    }

    #[test]
    fn decode_rejects_invalid_json() {
        assert!(decode("robot|controller|0|drivetrain|left").is_err());
        assert!(decode("{truncated").is_err());
        assert!(decode("").is_err());
    }

    #[test]
    fn mangled_delay_decodes_to_zero() {
        let msg = decode(r#"{"message":"forward","delay":"???"}"#).unwrap();
        assert_eq!(msg.delay, 0.0);
        assert_eq!(msg.minimum_time, msg.arrival_time);
    }
}
