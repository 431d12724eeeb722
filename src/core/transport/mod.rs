//! Boundary to the peer-connection collaborator.
//!
//! The rest of the application never touches sockets: it issues commands
//! through [`Transport`] and receives everything the collaborator has to say
//! as [`TransportEvent`]s on a single channel, in arrival order.

mod frame;
mod iroh_transport;

pub use iroh_transport::{IrohTransport, NetworkOptions};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Local handle for one connection attempt. Never sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.simple().to_string();
        f.write_str(&s[..8])
    }
}

/// Why a connection ended. `Hangup` and `Busy` travel to the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseReason {
    /// Ordinary end of call.
    Hangup,
    /// The callee already has a chat open.
    Busy,
    /// The stream ended without a goodbye.
    Lost,
}

/// Failure kinds the collaborator reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The requested name is already registered elsewhere.
    UnavailableId,
    /// The dialed peer could not be reached.
    PeerUnavailable,
    /// Anything else: binding, relays, streams.
    Network(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnavailableId => f.write_str("unavailable-id"),
            Self::PeerUnavailable => f.write_str("peer-unavailable"),
            Self::Network(detail) => write!(f, "network ({detail})"),
        }
    }
}

/// Per-connection signals, mirroring the open/data/close/error callbacks
/// of a data channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkSignal {
    Opened,
    Data(Value),
    Closed(CloseReason),
    Error(TransportError),
}

/// Everything the collaborator reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Registration confirmed under `name`.
    Registered { name: String },
    /// Registration failed; the session is not established.
    RegistrationFailed(TransportError),
    /// A remote peer wants to talk. Answer with `accept` or `close`.
    Offer { id: ConnectionId, from: String },
    /// Something happened on an existing connection.
    Link { id: ConnectionId, signal: LinkSignal },
    /// Session-level failure after registration.
    Error(TransportError),
}

/// Commands understood by a peer-connection collaborator.
///
/// All methods return immediately; outcomes arrive later as
/// [`TransportEvent`]s.
pub trait Transport: Send + Sync {
    /// Register `name` and start listening for offers.
    fn register(&self, name: String);

    /// Open a connection to `remote`. `id` tags every later event.
    fn dial(&self, id: ConnectionId, remote: String);

    /// Accept a pending inbound offer.
    fn accept(&self, id: ConnectionId);

    /// Send a payload over an open connection.
    fn send(&self, id: ConnectionId, payload: Value);

    /// Close a connection (or refuse an offer) with `reason`.
    fn close(&self, id: ConnectionId, reason: CloseReason);
}
