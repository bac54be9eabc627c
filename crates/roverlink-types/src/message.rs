//! [`RobotMessage`] – the unit of protocol exchange.
//!
//! A message is addressed (`destination` + `destination_device`), stamped
//! (`arrival_time` / `minimum_time`), optionally delayed (`delay`, advisory
//! milliseconds), and carries either a plain string payload or a named
//! command with a JSON argument object.
//!
//! Timestamps are local: every decode recomputes `arrival_time` as "now" and
//! `minimum_time` as `arrival_time + delay`. They are never meaningfully
//! round-tripped over the wire.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::state::SteerMode;

/// Identity string of the local controller. Messages addressed to this
/// device never touch the wire; they loop straight back to the router.
pub const CONTROLLER_DEVICE: &str = "controller";

/// Device identifier used by warning traffic.
pub const WARN_DEVICE: &str = "warn";

/// Logical endpoint a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    #[default]
    Robot,
    Controller,
    Warn,
}

impl Endpoint {
    pub fn as_token(&self) -> &'static str {
        match self {
            Endpoint::Robot => "robot",
            Endpoint::Controller => "controller",
            Endpoint::Warn => "warn",
        }
    }

    /// Parse a wire token. Unknown tokens yield `None`; callers fall back to
    /// the default rather than failing the frame.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "robot" => Some(Endpoint::Robot),
            "controller" => Some(Endpoint::Controller),
            "warn" => Some(Endpoint::Warn),
            _ => None,
        }
    }
}

/// Which side of the link originated a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Robot,
    #[default]
    Controller,
}

impl Source {
    pub fn as_token(&self) -> &'static str {
        match self {
            Source::Robot => "robot",
            Source::Controller => "controller",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "robot" => Some(Source::Robot),
            "controller" => Some(Source::Controller),
            _ => None,
        }
    }
}

/// Message payload: either a bare token (`"forward"`, `"off"`, `"get"`) or a
/// parameterized command serialized as a two-element array
/// `[name, {args…}]` (only `setspeed` is observed in practice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Plain(String),
    Command(String, Value),
}

impl Payload {
    pub fn plain(text: impl Into<String>) -> Self {
        Payload::Plain(text.into())
    }

    pub fn command(name: impl Into<String>, args: Value) -> Self {
        Payload::Command(name.into(), args)
    }

    /// The payload as a plain token, if it is one.
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Payload::Plain(s) => Some(s.as_str()),
            Payload::Command(..) => None,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Plain(String::new())
    }
}

/// A single protocol message, mirroring the robot-side message object
/// field for field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotMessage {
    #[serde(default)]
    pub destination: Endpoint,
    #[serde(default = "default_device")]
    pub destination_device: String,
    #[serde(default)]
    pub source: Source,
    #[serde(default = "default_source_device")]
    pub source_device: String,
    /// Advisory delay in milliseconds. Lenient on decode: non-numeric or
    /// negative values clamp to `0.0` instead of failing the frame.
    #[serde(default, deserialize_with = "lenient_delay")]
    pub delay: f64,
    #[serde(rename = "message", default)]
    pub payload: Payload,
    /// Random identifier, informational only. Not used for correlation.
    #[serde(default = "random_message_id")]
    pub message_id: u64,
    /// Local receipt time, epoch milliseconds. Recomputed at decode.
    #[serde(default)]
    pub arrival_time: i64,
    /// `arrival_time + delay`; the earliest moment a consumer should act.
    #[serde(default)]
    pub minimum_time: i64,
}

fn default_device() -> String {
    "info".to_string()
}

fn default_source_device() -> String {
    CONTROLLER_DEVICE.to_string()
}

fn random_message_id() -> u64 {
    rand::thread_rng().gen_range(0..1_000_000_000)
}

/// Epoch milliseconds, the timestamp convention of the wire protocol.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn lenient_delay<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(coerce_delay(&raw))
}

/// Coerce an arbitrary JSON value into a usable delay. Anything that is not
/// a finite, non-negative number becomes `0.0`; a mangled delay must not
/// kill the frame.
pub fn coerce_delay(raw: &Value) -> f64 {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(d) if d.is_finite() && d > 0.0 => d,
        _ => 0.0,
    }
}

impl RobotMessage {
    /// A controller-originated message addressed to a robot device.
    pub fn to_device(device: impl Into<String>, payload: Payload) -> Self {
        let arrival = now_ms();
        RobotMessage {
            destination: Endpoint::Robot,
            destination_device: device.into(),
            source: Source::Controller,
            source_device: CONTROLLER_DEVICE.to_string(),
            delay: 0.0,
            payload,
            message_id: random_message_id(),
            arrival_time: arrival,
            minimum_time: arrival,
        }
    }

    /// Local informational note, addressed to the controller itself
    /// (loops back without touching the wire).
    pub fn info(text: impl Into<String>) -> Self {
        let mut msg = Self::to_device(CONTROLLER_DEVICE, Payload::plain(text));
        msg.destination = Endpoint::Controller;
        msg
    }

    /// Local warning, addressed to the controller's warning channel.
    pub fn warning(text: impl Into<String>) -> Self {
        let mut msg = Self::to_device(WARN_DEVICE, Payload::plain(text));
        msg.destination = Endpoint::Controller;
        msg
    }

    // ── Command constructors ───────────────────────────────────────────────

    /// Steering command for the drivetrain.
    pub fn steer(mode: SteerMode) -> Self {
        Self::to_device("drivetrain", Payload::plain(mode.as_token()))
    }

    /// Speed command for the drivetrain. Speeds are clamped to the 0–4
    /// range the drivetrain understands.
    pub fn set_speed(speed: u8) -> Self {
        let speed = speed.min(4);
        Self::to_device(
            "drivetrain",
            Payload::command("setspeed", json!({ "speed": speed })),
        )
    }

    /// Ask the forward rangefinder for a reading. The robot echoes the
    /// `"get"` back before replying with the measurement.
    pub fn range_request() -> Self {
        Self::to_device("forward_range", Payload::plain("get"))
    }

    /// Attention-light control: `flash` to activate, `off` to deactivate.
    pub fn attention_light(active: bool) -> Self {
        let token = if active { "flash" } else { "off" };
        Self::to_device("attention_light", Payload::plain(token))
    }

    /// Light the robot-side indicator that a client is attached.
    pub fn client_connected() -> Self {
        Self::to_device("client_connected_light", Payload::plain("on"))
    }

    // ── Timestamps ─────────────────────────────────────────────────────────

    /// Stamp the message as "arrived now" and recompute `minimum_time`.
    /// Called by the codec on every decode.
    pub fn stamp_arrival(&mut self) {
        self.arrival_time = now_ms();
        self.minimum_time = self.arrival_time + self.delay as i64;
    }

    /// Whether the advisory delay has elapsed and the message may be acted
    /// upon.
    pub fn check_delay(&self) -> bool {
        now_ms() > self.minimum_time
    }

    /// Whether this message is addressed to the local controller itself.
    pub fn is_self_addressed(&self) -> bool {
        self.destination_device == CONTROLLER_DEVICE
    }
}
