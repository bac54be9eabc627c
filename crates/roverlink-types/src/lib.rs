//! `roverlink-types` – Shared Protocol & State Types
//!
//! The vocabulary every other RoverLink crate speaks. It carries no I/O and
//! no policy; it only defines what a message *is* and what the controller
//! believes about the robot.
//!
//! # Modules
//!
//! - [`message`] – [`RobotMessage`][message::RobotMessage]: the unit of
//!   protocol exchange (addressing, delay, payload, timestamps) plus
//!   constructors for every command the controller issues.
//! - [`state`] – [`MirroredState`][state::MirroredState]: the controller-side
//!   belief about robot state, updated only by inbound traffic and never
//!   authoritative.

use thiserror::Error;

pub mod message;
pub mod state;

pub use message::{Endpoint, Payload, RobotMessage, Source};
pub use state::{MirroredState, ProximityZone, SteerMode};

/// Global error type spanning connection, framing, and configuration
/// failures.
#[derive(Error, Debug)]
pub enum RoverError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Link closed")]
    LinkClosed,

    #[error("Frame encode error: {0}")]
    Encode(String),

    #[error("Frame decode error: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),
}
