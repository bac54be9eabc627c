//! The controller session: one task, one link, run-to-completion.
//!
//! [`SessionDriver::run`] owns every piece of mutable state (transport,
//! router, interlock) inside a single `tokio::select!` loop, so handlers
//! always run to completion before the next event is processed, and no
//! locks are needed.
//!
//! The UI side holds a [`SessionHandle`]: a command sender, a [`watch`]
//! snapshot of the mirrored state for rendering, and a [`broadcast`] stream
//! of [`SessionEvent`]s for terminal-style logging.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{info, warn};

use roverlink_codec::Framing;
use roverlink_types::{MirroredState, RobotMessage, RoverError, SteerMode};

use crate::interlock::{Interlock, DEFAULT_PROXIMITY_CUTOFF_CM};
use crate::link::{self, LinkState, SendOutcome, Transport};
use crate::router::Router;

/// How often the controller polls the forward rangefinder.
pub const RANGE_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Buffered session events before slow subscribers start losing them.
const EVENT_CAPACITY: usize = 256;

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the robot (see [`link::ws_url_from_page`]).
    pub url: String,
    pub framing: Framing,
    pub cutoff_cm: f64,
    pub range_poll: Duration,
}

impl SessionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        SessionConfig {
            url: url.into(),
            framing: Framing::default(),
            cutoff_cm: DEFAULT_PROXIMITY_CUTOFF_CM,
            range_poll: RANGE_POLL_INTERVAL,
        }
    }
}

/// UI-side requests into the session loop.
#[derive(Debug)]
pub enum ControlRequest {
    /// Steer the drivetrain; passes through the interlock first.
    Steer(SteerMode),
    /// Set drivetrain speed (clamped 0–4).
    SetSpeed(u8),
    /// Flash the attention light if it is off, turn it off if it is on.
    ToggleAttentionLight,
    /// Ask the rangefinder for a reading now.
    RequestRange,
    /// Escape hatch for arbitrary traffic with an explicit repeat policy.
    Send {
        message: RobotMessage,
        allow_repeat: bool,
    },
    /// End the session.
    Shutdown,
}

/// What happened on the session, for terminal-style rendering.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The link opened and the startup sequence was sent.
    Opened { url: String },
    /// A message went out on the wire.
    Sent(RobotMessage),
    /// A message arrived (from the wire or looped back locally).
    Received(RobotMessage),
    /// The link closed; the session is over.
    Closed,
}

/// The UI's grip on a running session. Clone freely.
#[derive(Clone)]
pub struct SessionHandle {
    requests: mpsc::UnboundedSender<ControlRequest>,
    state: watch::Receiver<MirroredState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn steer(&self, mode: SteerMode) -> Result<(), RoverError> {
        self.request(ControlRequest::Steer(mode))
    }

    pub fn set_speed(&self, speed: u8) -> Result<(), RoverError> {
        self.request(ControlRequest::SetSpeed(speed))
    }

    pub fn toggle_attention_light(&self) -> Result<(), RoverError> {
        self.request(ControlRequest::ToggleAttentionLight)
    }

    pub fn request_range(&self) -> Result<(), RoverError> {
        self.request(ControlRequest::RequestRange)
    }

    /// Send an arbitrary message with an explicit repeat policy.
    pub fn send(&self, message: RobotMessage, allow_repeat: bool) -> Result<(), RoverError> {
        self.request(ControlRequest::Send {
            message,
            allow_repeat,
        })
    }

    pub fn shutdown(&self) -> Result<(), RoverError> {
        self.request(ControlRequest::Shutdown)
    }

    fn request(&self, req: ControlRequest) -> Result<(), RoverError> {
        self.requests.send(req).map_err(|_| RoverError::LinkClosed)
    }

    /// A snapshot of the controller's current belief about the robot.
    pub fn state(&self) -> MirroredState {
        self.state.borrow().clone()
    }

    /// Watch the mirrored state for changes.
    pub fn watch_state(&self) -> watch::Receiver<MirroredState> {
        self.state.clone()
    }

    /// Subscribe to the session event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Build a not-yet-connected session. Requests queued on the handle before
/// [`SessionDriver::run`] opens the link are processed once it does.
pub fn session(config: SessionConfig) -> (SessionDriver, SessionHandle) {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(MirroredState::default());
    let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

    let handle = SessionHandle {
        requests: req_tx,
        state: state_rx,
        events: event_tx.clone(),
    };
    let driver = SessionDriver {
        config,
        requests: req_rx,
        state_tx,
        events: event_tx,
    };
    (driver, handle)
}

/// Owns the session loop. Consumed by [`run`][SessionDriver::run].
pub struct SessionDriver {
    config: SessionConfig,
    requests: mpsc::UnboundedReceiver<ControlRequest>,
    state_tx: watch::Sender<MirroredState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionDriver {
    /// Connect and run the session until the link closes, the handle asks
    /// for shutdown, or every handle is dropped.
    ///
    /// A connect failure surfaces as a warning [`SessionEvent::Received`]
    /// followed by [`SessionEvent::Closed`] plus the returned error — the
    /// session never retries (no reconnect policy exists).
    pub async fn run(mut self) -> Result<(), RoverError> {
        let url = self.config.url.clone();

        let (wire, mut inbound) = match link::connect(&url).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(url = %url, error = %e, "connect failed");
                let complaint =
                    RobotMessage::warning(format!("Could not connect to {url} socket"));
                let _ = self.events.send(SessionEvent::Received(complaint));
                let _ = self.events.send(SessionEvent::Closed);
                return Err(e);
            }
        };

        // The handshake is already done, so the link opens immediately; the
        // watch channel still gates any send that races the close below.
        let (link_tx, link_rx) = watch::channel(LinkState::Open);
        let mut active = Active {
            transport: Transport::new(Box::new(wire), self.config.framing, link_rx),
            router: Router::new(Interlock::new(self.config.cutoff_cm)),
            state_tx: self.state_tx,
            events: self.events,
        };

        info!(url = %url, "link open");
        active.router.set_connected(true);
        active.publish_state();
        let _ = active.events.send(SessionEvent::Opened { url: url.clone() });

        for msg in startup_sequence(&url) {
            if active.issue(&msg, true).await.is_err() {
                break;
            }
        }

        // First poll fires a full period after startup, not immediately.
        let start = tokio::time::Instant::now() + self.config.range_poll;
        let mut poll = tokio::time::interval_at(start, self.config.range_poll);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if active.issue(&RobotMessage::range_request(), true).await.is_err() {
                        break;
                    }
                }
                req = self.requests.recv() => {
                    match req {
                        None | Some(ControlRequest::Shutdown) => break,
                        Some(req) => {
                            if active.handle_request(req).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                frame = inbound.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            active.on_frame(text.as_str()).await;
                        }
                        Some(Ok(WsMessage::Close(_))) | None => break,
                        Some(Err(e)) => {
                            warn!(error = %e, "socket read error");
                            break;
                        }
                        // Ping/pong and binary frames carry no protocol traffic.
                        Some(Ok(_)) => {}
                    }
                }
            }
        }

        let _ = link_tx.send(LinkState::Closed);
        active.router.set_connected(false);
        active.publish_state();
        let closed = RobotMessage::info("connection closed.");
        let _ = active.events.send(SessionEvent::Received(closed));
        let _ = active.events.send(SessionEvent::Closed);
        info!(url = %url, "session over");
        Ok(())
    }
}

/// The connected session's mutable core, owned by the loop task.
struct Active {
    transport: Transport,
    router: Router,
    state_tx: watch::Sender<MirroredState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Active {
    async fn handle_request(&mut self, req: ControlRequest) -> Result<(), RoverError> {
        match req {
            ControlRequest::Steer(requested) => {
                let (mode, warning) = self.router.vet_steer(requested);
                if let Some(warning) = warning {
                    self.issue(&warning, true).await?;
                }
                self.issue(&RobotMessage::steer(mode), true).await?;
            }
            ControlRequest::SetSpeed(speed) => {
                self.issue(&RobotMessage::set_speed(speed), true).await?;
            }
            ControlRequest::ToggleAttentionLight => {
                let activate = !self.router.state().attention_light;
                self.issue(&RobotMessage::attention_light(activate), true)
                    .await?;
            }
            ControlRequest::RequestRange => {
                self.issue(&RobotMessage::range_request(), true).await?;
            }
            ControlRequest::Send {
                message,
                allow_repeat,
            } => {
                self.issue(&message, allow_repeat).await?;
            }
            // Handled by the loop before we get here.
            ControlRequest::Shutdown => {}
        }
        Ok(())
    }

    /// Push one message down the transport and surface what happened.
    async fn issue(&mut self, msg: &RobotMessage, allow_repeat: bool) -> Result<(), RoverError> {
        match self.transport.send(msg, allow_repeat).await? {
            SendOutcome::Transmitted => {
                let _ = self.events.send(SessionEvent::Sent(msg.clone()));
            }
            SendOutcome::Suppressed => {}
            SendOutcome::Loopback(looped) => {
                // Self-addressed traffic surfaces like any arrival. It is
                // addressed at the controller, so the router has no handler
                // for it and never generates corrective commands.
                let _ = self.events.send(SessionEvent::Received(looped.clone()));
                let _ = self.router.dispatch(&looped);
            }
        }
        Ok(())
    }

    /// Decode and dispatch one inbound frame. A frame that fails to decode
    /// is logged and dropped; the channel is unreliable and garbage must
    /// never end the session.
    async fn on_frame(&mut self, raw: &str) {
        let msg = match self.transport.decode(raw) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, raw, "dropping mangled frame");
                return;
            }
        };

        let _ = self.events.send(SessionEvent::Received(msg.clone()));
        let corrective = self.router.dispatch(&msg);
        self.publish_state();

        for msg in corrective {
            if self.issue(&msg, true).await.is_err() {
                warn!("corrective send failed; link closing");
                break;
            }
        }
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.router.state().clone());
    }
}

/// The command burst fired on open: announce the client, zero the speed,
/// and leave the drivetrain coasting.
fn startup_sequence(url: &str) -> Vec<RobotMessage> {
    vec![
        RobotMessage::client_connected(),
        RobotMessage::set_speed(0),
        RobotMessage::steer(SteerMode::Forward),
        RobotMessage::steer(SteerMode::Coast),
        RobotMessage::info(format!("connected to {url}")),
    ]
}
