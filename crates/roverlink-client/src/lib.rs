//! `roverlink-client` – The Controller Core
//!
//! Owns the single WebSocket link to the robot and everything that sits
//! between a UI action and the wire. The UI itself (terminal, browser,
//! whatever) is a collaborator: it pushes [`ControlRequest`]s in and renders
//! the [`MirroredState`][roverlink_types::MirroredState] snapshots and
//! [`SessionEvent`]s that come out.
//!
//! # Modules
//!
//! - [`link`] – [`Transport`][link::Transport]: wait-for-open send path,
//!   duplicate suppression, self-addressed loopback, and the [`Wire`][link::Wire]
//!   seam over the actual socket.
//! - [`router`] – [`Router`][router::Router]: dispatches inbound messages to
//!   a fixed set of device handlers; unknown devices are ignored by design.
//! - [`interlock`] – [`Interlock`][interlock::Interlock]: the proximity
//!   state machine that vetoes forward motion near an obstacle.
//! - [`session`] – the single-task event loop tying the above together,
//!   plus the [`SessionHandle`] the UI holds.

pub mod interlock;
pub mod link;
pub mod router;
pub mod session;

pub use interlock::{Interlock, InterlockAction, DEFAULT_PROXIMITY_CUTOFF_CM};
pub use link::{ws_url_from_page, LinkState, SendOutcome, Transport, Wire};
pub use router::{DeviceKind, Router};
pub use session::{
    session, ControlRequest, SessionConfig, SessionDriver, SessionEvent, SessionHandle,
};
