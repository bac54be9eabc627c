//! [`Transport`] – the single outbound path to the robot.
//!
//! The controller owns one logical channel for the life of a session. Sends
//! pass three checks, in order:
//!
//! 1. **Loopback** – a message addressed to the controller's own device
//!    identity never touches the wire; it is handed back for local routing.
//! 2. **Duplicate suppression** – when `allow_repeat` is false and the
//!    encoded frame equals the last frame sent, the send is a no-op.
//! 3. **Wait-for-open** – a send issued before the link is open suspends on
//!    a [`watch`] channel until it opens. Each caller waits independently;
//!    delivery order across concurrent waiters is not guaranteed.
//!
//! The actual socket hides behind the [`Wire`] trait so the transport logic
//! is testable without a robot on the other end.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use roverlink_codec::Framing;
use roverlink_types::{RobotMessage, RoverError};

/// Lifecycle of the single logical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Created but the open transition has not happened yet.
    Connecting,
    /// Open; the send path is unlocked.
    Open,
    /// Closed; the session is over. No automatic reconnect.
    Closed,
}

/// What happened to a message handed to [`Transport::send`].
#[derive(Debug)]
pub enum SendOutcome {
    /// The frame went out on the wire.
    Transmitted,
    /// Identical to the last frame and repeats were not allowed.
    Suppressed,
    /// Self-addressed; route it locally instead.
    Loopback(RobotMessage),
}

/// The raw text channel underneath the transport.
#[async_trait]
pub trait Wire: Send {
    async fn send_text(&mut self, frame: String) -> Result<(), RoverError>;
}

/// Inbound half of the robot socket.
pub type WsInbound = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Production [`Wire`] over a tungstenite sink.
pub struct WsWire {
    sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>,
}

#[async_trait]
impl Wire for WsWire {
    async fn send_text(&mut self, frame: String) -> Result<(), RoverError> {
        self.sink
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(|_| RoverError::LinkClosed)
    }
}

/// Open the WebSocket to the robot, returning the outbound wire and the
/// inbound frame stream.
pub async fn connect(url: &str) -> Result<(WsWire, WsInbound), RoverError> {
    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| RoverError::Connect(format!("{url}: {e}")))?;
    let (sink, inbound) = stream.split();
    Ok((WsWire { sink }, inbound))
}

/// Derive the robot's socket URL from the page URL the controller was
/// served from: strip the scheme, a trailing `index.html`, and trailing
/// slashes, then point at the `/ws` endpoint (`wss` when the page was
/// served over TLS).
pub fn ws_url_from_page(page: &str) -> String {
    // Already a socket URL: take it as given.
    if page.starts_with("ws://") || page.starts_with("wss://") {
        return page.trim_end_matches('/').to_string();
    }
    let (scheme, rest) = if let Some(rest) = page.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = page.strip_prefix("http://") {
        ("ws", rest)
    } else {
        ("ws", page)
    };
    let rest = rest.strip_suffix("index.html").unwrap_or(rest);
    let rest = rest.trim_end_matches('/');
    format!("{scheme}://{rest}/ws")
}

/// Owns the outbound path: framing, last-sent cache, and the link-state
/// watch used to suspend early senders.
pub struct Transport {
    wire: Box<dyn Wire>,
    framing: Framing,
    link_state: watch::Receiver<LinkState>,
    last_sent: Option<String>,
}

impl Transport {
    pub fn new(
        wire: Box<dyn Wire>,
        framing: Framing,
        link_state: watch::Receiver<LinkState>,
    ) -> Self {
        Transport {
            wire,
            framing,
            link_state,
            last_sent: None,
        }
    }

    /// Send a message, subject to loopback, duplicate suppression, and
    /// wait-for-open.
    ///
    /// # Errors
    ///
    /// [`RoverError::LinkClosed`] once the link has closed — there is no
    /// reconnect, so a failed send ends the session.
    pub async fn send(
        &mut self,
        msg: &RobotMessage,
        allow_repeat: bool,
    ) -> Result<SendOutcome, RoverError> {
        if msg.is_self_addressed() {
            return Ok(SendOutcome::Loopback(msg.clone()));
        }

        let frame = self.framing.encode(msg)?;
        if !allow_repeat && self.last_sent.as_deref() == Some(frame.as_str()) {
            debug!(frame, "suppressed repeat frame");
            return Ok(SendOutcome::Suppressed);
        }

        self.wait_for_open().await?;
        self.wire.send_text(frame.clone()).await?;
        self.last_sent = Some(frame);
        Ok(SendOutcome::Transmitted)
    }

    /// Decode an inbound frame with this link's framing.
    pub fn decode(&self, raw: &str) -> Result<RobotMessage, RoverError> {
        self.framing.decode(raw)
    }

    /// Suspend until the link leaves `Connecting`. Callers wait
    /// independently; each one polls the same watch channel.
    async fn wait_for_open(&mut self) -> Result<(), RoverError> {
        let state = self
            .link_state
            .wait_for(|s| *s != LinkState::Connecting)
            .await
            .map_err(|_| RoverError::LinkClosed)?;
        match *state {
            LinkState::Open => Ok(()),
            _ => Err(RoverError::LinkClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roverlink_types::{Payload, SteerMode};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Test wire that records every transmitted frame.
    struct RecordingWire {
        frames: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Wire for RecordingWire {
        async fn send_text(&mut self, frame: String) -> Result<(), RoverError> {
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    fn open_transport() -> (Transport, Arc<Mutex<Vec<String>>>, watch::Sender<LinkState>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let wire = RecordingWire {
            frames: Arc::clone(&frames),
        };
        let (tx, rx) = watch::channel(LinkState::Open);
        let transport = Transport::new(Box::new(wire), Framing::Json, rx);
        (transport, frames, tx)
    }

    #[tokio::test]
    async fn repeat_suppressed_unless_allowed() {
        let (mut transport, frames, _tx) = open_transport();
        let msg = RobotMessage::steer(SteerMode::Left);

        assert!(matches!(
            transport.send(&msg, false).await.unwrap(),
            SendOutcome::Transmitted
        ));
        assert!(matches!(
            transport.send(&msg, false).await.unwrap(),
            SendOutcome::Suppressed
        ));
        assert_eq!(frames.lock().unwrap().len(), 1);

        assert!(matches!(
            transport.send(&msg, true).await.unwrap(),
            SendOutcome::Transmitted
        ));
        assert_eq!(frames.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn different_frames_are_not_suppressed() {
        let (mut transport, frames, _tx) = open_transport();
        transport
            .send(&RobotMessage::steer(SteerMode::Left), false)
            .await
            .unwrap();
        transport
            .send(&RobotMessage::steer(SteerMode::Right), false)
            .await
            .unwrap();
        assert_eq!(frames.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn self_addressed_message_loops_back() {
        let (mut transport, frames, _tx) = open_transport();
        let msg = RobotMessage::info("connected");

        match transport.send(&msg, true).await.unwrap() {
            SendOutcome::Loopback(looped) => {
                assert_eq!(looped.payload, Payload::plain("connected"))
            }
            other => panic!("expected Loopback, got {other:?}"),
        }
        assert!(frames.lock().unwrap().is_empty(), "must not touch the wire");
    }

    #[tokio::test]
    async fn send_waits_until_link_opens() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let wire = RecordingWire {
            frames: Arc::clone(&frames),
        };
        let (tx, rx) = watch::channel(LinkState::Connecting);
        let mut transport = Transport::new(Box::new(wire), Framing::Json, rx);

        let opener = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(LinkState::Open).unwrap();
            tx
        });

        let msg = RobotMessage::range_request();
        let outcome = transport.send(&msg, true).await.unwrap();
        assert!(matches!(outcome, SendOutcome::Transmitted));
        assert_eq!(frames.lock().unwrap().len(), 1);
        opener.await.unwrap();
    }

    #[tokio::test]
    async fn send_on_closed_link_errors() {
        let (mut transport, _frames, tx) = open_transport();
        tx.send(LinkState::Closed).unwrap();

        let result = transport.send(&RobotMessage::range_request(), true).await;
        assert!(matches!(result, Err(RoverError::LinkClosed)));
    }

    // ── URL derivation ─────────────────────────────────────────────────────

    #[test]
    fn ws_url_strips_scheme_and_index_html() {
        assert_eq!(
            ws_url_from_page("http://rover.local:8000/index.html"),
            "ws://rover.local:8000/ws"
        );
    }

    #[test]
    fn ws_url_strips_trailing_slashes() {
        assert_eq!(
            ws_url_from_page("http://rover.local:8000///"),
            "ws://rover.local:8000/ws"
        );
    }

    #[test]
    fn ws_url_uses_wss_for_https_pages() {
        assert_eq!(
            ws_url_from_page("https://rover.example.com/"),
            "wss://rover.example.com/ws"
        );
    }

    #[test]
    fn ws_url_accepts_bare_host() {
        assert_eq!(ws_url_from_page("rover.local"), "ws://rover.local/ws");
    }

    #[test]
    fn ws_url_passes_socket_urls_through() {
        assert_eq!(
            ws_url_from_page("ws://rover.local:8000/ws"),
            "ws://rover.local:8000/ws"
        );
    }
}
