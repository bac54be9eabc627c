//! Terminal rendering for session events.
//!
//! Pure: [`render`] turns a [`SessionEvent`] into a channel plus a line of
//! text, or `None` when the event should stay off the screen. Colors are
//! applied by the caller so the logic here stays testable.

use roverlink_client::SessionEvent;
use roverlink_types::message::WARN_DEVICE;
use roverlink_types::{Payload, RobotMessage, Source};

/// Which stream a rendered line belongs to. The caller picks the color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Something we sent to the robot.
    ToRobot,
    /// Something the robot said.
    FromRobot,
    /// A safety or connection warning.
    Warn,
    /// Link lifecycle notices.
    Status,
}

/// Render a session event as a terminal line.
///
/// Returns `None` for events that are suppressed at the given verbosity.
/// Below log level 2, drivetrain and forward-range traffic is hidden so
/// the terminal shows only conversation-level messages.
pub fn render(event: &SessionEvent, log_level: u8) -> Option<(Channel, String)> {
    match event {
        SessionEvent::Opened { url } => {
            Some((Channel::Status, format!("Connected to {}", url)))
        }
        SessionEvent::Closed => Some((Channel::Status, "Link closed.".to_string())),
        SessionEvent::Sent(msg) => {
            if suppressed(msg, log_level) {
                return None;
            }
            Some((Channel::ToRobot, format!("You: {}", payload_text(msg))))
        }
        SessionEvent::Received(msg) => {
            if msg.destination_device == WARN_DEVICE {
                return Some((Channel::Warn, format!("Warning: {}", payload_text(msg))));
            }
            if suppressed(msg, log_level) {
                return None;
            }
            Some((Channel::FromRobot, format!("Robot: {}", payload_text(msg))))
        }
    }
}

/// Machine chatter stays hidden below log level 2.
fn suppressed(msg: &RobotMessage, log_level: u8) -> bool {
    if log_level >= 2 {
        return false;
    }
    let device = match msg.source {
        Source::Controller => &msg.destination_device,
        Source::Robot => &msg.source_device,
    };
    matches!(device.as_str(), "drivetrain" | "forward_range")
}

fn payload_text(msg: &RobotMessage) -> String {
    match &msg.payload {
        Payload::Plain(text) => text.clone(),
        Payload::Command(name, args) => format!("{} {}", name, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roverlink_types::SteerMode;

    #[test]
    fn info_messages_render_on_robot_channel() {
        let msg = RobotMessage::info("hello there");
        let (channel, line) = render(&SessionEvent::Received(msg), 4).expect("rendered");
        assert_eq!(channel, Channel::FromRobot);
        assert_eq!(line, "Robot: hello there");
    }

    #[test]
    fn sent_messages_get_you_prefix() {
        let msg = RobotMessage::info("ping");
        let (channel, line) = render(&SessionEvent::Sent(msg), 4).expect("rendered");
        assert_eq!(channel, Channel::ToRobot);
        assert_eq!(line, "You: ping");
    }

    #[test]
    fn warn_device_overrides_channel() {
        let msg = RobotMessage::warning("Cannot move forward.");
        let (channel, line) = render(&SessionEvent::Received(msg), 0).expect("rendered");
        assert_eq!(channel, Channel::Warn);
        assert!(line.starts_with("Warning: "));
    }

    #[test]
    fn drivetrain_chatter_hidden_at_low_verbosity() {
        let msg = RobotMessage::steer(SteerMode::Forward);
        assert!(render(&SessionEvent::Sent(msg.clone()), 1).is_none());
        assert!(render(&SessionEvent::Sent(msg), 2).is_some());
    }

    #[test]
    fn range_replies_hidden_at_low_verbosity() {
        let mut msg = RobotMessage::info("0.42");
        msg.source = Source::Robot;
        msg.source_device = "forward_range".to_string();
        assert!(render(&SessionEvent::Received(msg.clone()), 1).is_none());
        assert!(render(&SessionEvent::Received(msg), 3).is_some());
    }

    #[test]
    fn command_payloads_render_name_and_args() {
        let msg = RobotMessage::set_speed(3);
        let (_, line) = render(&SessionEvent::Sent(msg), 4).expect("rendered");
        assert!(line.contains("setspeed"));
        assert!(line.contains("\"speed\":3"));
    }

    #[test]
    fn lifecycle_events_render_as_status() {
        let opened = SessionEvent::Opened {
            url: "ws://rover.local/ws".to_string(),
        };
        let (channel, line) = render(&opened, 0).expect("rendered");
        assert_eq!(channel, Channel::Status);
        assert!(line.contains("ws://rover.local/ws"));

        let (channel, _) = render(&SessionEvent::Closed, 0).expect("rendered");
        assert_eq!(channel, Channel::Status);
    }
}
