//! `roverlink-codec` – Wire Framings
//!
//! Two incompatible encodings of a [`RobotMessage`] exist in the field and
//! both sides of a link must agree on one:
//!
//! - [`Framing::Pipe`] – positional pipe-delimited fields, the older scheme.
//! - [`Framing::Json`] – a flat JSON object, the newer scheme and the
//!   default.
//!
//! Decoding is deliberately lenient: the channel is unreliable, and a
//! mangled frame must degrade to defaults or a decode error the caller can
//! log and drop — never a panic.
//!
//! # Contract
//!
//! `decode(encode(m))` preserves destination, source, the framing's device
//! field(s), delay, and payload. Arrival timestamps are recomputed at decode
//! time, and the pipe framing regenerates `message_id` because it does not
//! carry one.

use serde::{Deserialize, Serialize};

use roverlink_types::{RobotMessage, RoverError};

pub mod json;
pub mod pipe;

/// The wire-level encoding scheme for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Positional `destination|source|delay|device|payload` fields.
    Pipe,
    /// Flat JSON object keyed by field name.
    #[default]
    Json,
}

impl Framing {
    /// Encode `msg` into its wire string.
    pub fn encode(&self, msg: &RobotMessage) -> Result<String, RoverError> {
        match self {
            Framing::Pipe => Ok(pipe::encode(msg)),
            Framing::Json => json::encode(msg),
        }
    }

    /// Decode a wire string, stamping the arrival time.
    pub fn decode(&self, raw: &str) -> Result<RobotMessage, RoverError> {
        match self {
            Framing::Pipe => Ok(pipe::decode(raw)),
            Framing::Json => json::decode(raw),
        }
    }
}

impl std::fmt::Display for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framing::Pipe => write!(f, "pipe"),
            Framing::Json => write!(f, "json"),
        }
    }
}
