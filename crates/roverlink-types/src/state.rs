//! Controller-side belief about robot state.
//!
//! [`MirroredState`] is not authoritative: it is updated only by inbound
//! telemetry and command echoes, never by the act of sending a command. The
//! robot confirms what it actually did by echoing traffic back.

use serde::{Deserialize, Serialize};

/// Drivetrain steering modes the robot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SteerMode {
    Left,
    Right,
    Forward,
    Reverse,
    #[default]
    Coast,
    Center,
    Stop,
}

impl SteerMode {
    pub fn as_token(&self) -> &'static str {
        match self {
            SteerMode::Left => "left",
            SteerMode::Right => "right",
            SteerMode::Forward => "forward",
            SteerMode::Reverse => "reverse",
            SteerMode::Coast => "coast",
            SteerMode::Center => "center",
            SteerMode::Stop => "stop",
        }
    }

    /// Parse a steering token. Unknown tokens yield `None` and leave the
    /// mirrored state untouched.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "left" => Some(SteerMode::Left),
            "right" => Some(SteerMode::Right),
            "forward" => Some(SteerMode::Forward),
            "reverse" => Some(SteerMode::Reverse),
            "coast" => Some(SteerMode::Coast),
            "center" => Some(SteerMode::Center),
            "stop" => Some(SteerMode::Stop),
            _ => None,
        }
    }
}

impl std::fmt::Display for SteerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_token())
    }
}

/// Proximity classification of the latest forward-range reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProximityZone {
    /// At least twice the cutoff away; forward motion is unrestricted.
    #[default]
    Clear,
    /// Inside twice the cutoff; display-only, no vetoing.
    Warning,
    /// Inside the cutoff; forward motion is vetoed.
    TooClose,
}

/// Snapshot of everything the controller believes about the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirroredState {
    /// Last steering mode the robot confirmed.
    pub steer: SteerMode,
    /// Last confirmed speed, 0–4.
    pub speed: u8,
    /// Whether the attention light is on or flashing.
    pub attention_light: bool,
    /// Last forward-range reading in centimeters, if any arrived yet.
    pub forward_range_cm: Option<f64>,
    /// Proximity zone derived from the last reading.
    pub zone: ProximityZone,
    /// Whether the link to the robot is currently open.
    pub connected: bool,
}

impl Default for MirroredState {
    /// Safe startup belief: stopped, coasting, light off, nothing known
    /// about range.
    fn default() -> Self {
        MirroredState {
            steer: SteerMode::Coast,
            speed: 0,
            attention_light: false,
            forward_range_cm: None,
            zone: ProximityZone::Clear,
            connected: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steer_tokens_roundtrip() {
        for mode in [
            SteerMode::Left,
            SteerMode::Right,
            SteerMode::Forward,
            SteerMode::Reverse,
            SteerMode::Coast,
            SteerMode::Center,
            SteerMode::Stop,
        ] {
            assert_eq!(SteerMode::from_token(mode.as_token()), Some(mode));
        }
    }

    #[test]
    fn unknown_steer_token_is_none() {
        assert_eq!(SteerMode::from_token("sideways"), None);
        assert_eq!(SteerMode::from_token(""), None);
    }

    #[test]
    fn default_state_is_safe() {
        let state = MirroredState::default();
        assert_eq!(state.steer, SteerMode::Coast);
        assert_eq!(state.speed, 0);
        assert!(!state.attention_light);
        assert!(state.forward_range_cm.is_none());
        assert_eq!(state.zone, ProximityZone::Clear);
        assert!(!state.connected);
    }

    #[test]
    fn state_snapshot_is_json_serialisable() {
        let state = MirroredState::default();
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("coast"));
        let back: MirroredState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
