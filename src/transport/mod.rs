//! Transport abstraction.
//!
//! A [`TransportSocket`] is the persistent channel opened once negotiation
//! succeeds. Lifecycle events are pushed into the [`TransportEventSink`] handed
//! to [`TransportSocket::connect`], so whoever calls `connect` has its listener
//! in place before the first event can fire.
//!
//! Only WebSockets with the text transfer format is implemented, see
//! [`WebSocketTransport`].

mod websocket;

pub use websocket::{WebSocketTransport, WebSocketTransportFactory};

use std::fmt;

use futures_channel::mpsc;
use http::HeaderMap;

use crate::error::SignalRError;

/// Transports this client can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    WebSockets,
}

impl TransportKind {
    /// Name used in the `availableTransports` negotiate field.
    pub fn name(self) -> &'static str {
        match self {
            Self::WebSockets => "WebSockets",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload encodings listed under `transferFormats` that this client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferFormat {
    Text,
}

impl TransferFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "Text",
        }
    }
}

/// Lifecycle notifications emitted by a transport socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    ConnectionError(String),
    Closed {
        code: u16,
        reason: String,
        was_clean: bool,
    },
    Message(String),
}

/// Receiving end is owned by the connection's relay task.
pub type TransportEventSink = mpsc::UnboundedSender<TransportEvent>;

/// A persistent bidirectional text channel.
pub trait TransportSocket: Send + Sync {
    /// Starts connecting. Returns immediately; progress is reported on `events`.
    fn connect(&mut self, events: TransportEventSink);

    /// Queues a text payload.
    ///
    /// # Errors
    ///
    /// [`SignalRError::NotConnected`] if the socket is not open.
    fn send(&self, data: String) -> Result<(), SignalRError>;

    /// Starts the close handshake. The `Closed` event follows.
    fn close(&self, code: u16, reason: String) -> Result<(), SignalRError>;

    fn is_connected(&self) -> bool;
}

/// Builds transport sockets for a resolved endpoint.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<Box<dyn TransportSocket>, SignalRError>;
}
