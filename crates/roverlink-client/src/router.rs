//! [`Router`] – inbound message dispatch.
//!
//! Every inbound message is routed by its `source_device` to one of a fixed
//! set of handlers. Each handler mutates the [`MirroredState`] the UI
//! renders; the forward-range handler additionally consults the
//! [`Interlock`] and may demand corrective outbound traffic.
//!
//! Unrecognized device names fall into [`DeviceKind::Unknown`] and are
//! dropped without error — a newer robot may carry devices this controller
//! has never heard of.

use serde_json::Value;
use tracing::debug;

use roverlink_types::message::WARN_DEVICE;
use roverlink_types::{MirroredState, Payload, RobotMessage, SteerMode};

use crate::interlock::{Interlock, InterlockAction};

/// Closed set of devices the controller knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    ForwardRange,
    Drivetrain,
    AttentionLight,
    /// Anything else. Ignored by design, not an error.
    Unknown,
}

impl DeviceKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "forward_range" => DeviceKind::ForwardRange,
            "drivetrain" => DeviceKind::Drivetrain,
            "attention_light" => DeviceKind::AttentionLight,
            _ => DeviceKind::Unknown,
        }
    }
}

/// Routes inbound messages and owns the mirrored robot state.
pub struct Router {
    state: MirroredState,
    interlock: Interlock,
}

impl Router {
    pub fn new(interlock: Interlock) -> Self {
        Router {
            state: MirroredState::default(),
            interlock,
        }
    }

    /// The controller's current belief about the robot.
    pub fn state(&self) -> &MirroredState {
        &self.state
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.state.connected = connected;
    }

    /// Check a requested steer against the interlock. Returns the mode to
    /// actually issue and, when the veto fired, the warning to surface.
    pub fn vet_steer(&self, requested: SteerMode) -> (SteerMode, Option<RobotMessage>) {
        let (mode, vetoed) = self.interlock.vet_steer(requested);
        let warning = vetoed.then(|| RobotMessage::warning(self.interlock.warning_text()));
        (mode, warning)
    }

    /// Dispatch an inbound message to its device handler. Returns any
    /// corrective messages the handlers want transmitted.
    pub fn dispatch(&mut self, msg: &RobotMessage) -> Vec<RobotMessage> {
        match DeviceKind::from_name(&msg.source_device) {
            DeviceKind::ForwardRange => self.on_forward_range(msg),
            DeviceKind::Drivetrain => {
                self.on_drivetrain(msg);
                Vec::new()
            }
            DeviceKind::AttentionLight => {
                self.on_attention_light(msg);
                Vec::new()
            }
            DeviceKind::Unknown => {
                debug!(device = %msg.source_device, "no handler for device");
                Vec::new()
            }
        }
    }

    /// Drivetrain echoes confirm what the robot is actually doing: a
    /// `setspeed` command updates the mirrored speed, a plain token the
    /// mirrored steer.
    fn on_drivetrain(&mut self, msg: &RobotMessage) {
        if msg.destination_device == WARN_DEVICE {
            return;
        }
        match &msg.payload {
            Payload::Command(name, args) if name == "setspeed" => {
                if let Some(speed) = args.get("speed").and_then(Value::as_f64) {
                    self.state.speed = speed.round().clamp(0.0, 4.0) as u8;
                }
            }
            Payload::Plain(token) => {
                if let Some(mode) = SteerMode::from_token(token) {
                    self.state.steer = mode;
                }
            }
            Payload::Command(..) => {}
        }
    }

    fn on_attention_light(&mut self, msg: &RobotMessage) {
        match msg.payload.as_plain() {
            Some("on") | Some("flash") => self.state.attention_light = true,
            Some("off") => self.state.attention_light = false,
            _ => {}
        }
    }

    /// Forward-range telemetry feeds the interlock. The echoed `"get"` of a
    /// request is a ping-back, not a measurement, and is dropped entirely.
    fn on_forward_range(&mut self, msg: &RobotMessage) -> Vec<RobotMessage> {
        let Some(text) = msg.payload.as_plain() else {
            return Vec::new();
        };
        if text == "get" {
            return Vec::new();
        }

        // Readings arrive in meters; the cutoff is in centimeters.
        // Unparseable readings count as zero distance (fail-safe).
        let meters = text.trim().parse::<f64>().unwrap_or(0.0);
        let cm = 100.0 * meters;
        self.state.forward_range_cm = Some(cm);

        let action = self.interlock.observe(cm, self.state.steer);
        self.state.zone = self.interlock.zone();

        match action {
            Some(InterlockAction::ForceCoast) => vec![
                RobotMessage::warning(self.interlock.warning_text()),
                RobotMessage::steer(SteerMode::Coast),
            ],
            None => Vec::new(),
        }
    }
}
