//! SignalR client connection management.
//!
//! This module handles the connection lifecycle:
//! - Negotiating with the server (following redirects),
//! - Starting the WebSocket transport,
//! - Relaying transport events to the owner.
//!
//! ```text
//! idle --connect--> negotiating --> starting-transport --connected--> open --closed--> closed
//!                        |                  |
//!                        +------------------+--> failed
//! ```

mod endpoint;
mod events;
mod handshake;

pub use endpoint::Endpoint;
pub use events::{CloseInfo, EventChannel};

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use crate::{
    config::ConnectionConfig,
    error::SignalRError,
    negotiate::{HttpRequester, ReqwestRequester},
    transport::{TransportFactory, TransportSocket, WebSocketTransportFactory},
};
use events::ConnectionEvents;

/// How many negotiate redirects are followed before giving up.
pub const MAX_REDIRECTS: usize = 100;

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Negotiating,
    StartingTransport,
    Open,
    /// The last handshake was rejected or the transport never opened.
    Failed,
    Closed,
}

impl ConnectionState {
    /// A handshake is in flight or the transport is open.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Negotiating | Self::StartingTransport | Self::Open
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::StartingTransport => "starting-transport",
            Self::Open => "open",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A SignalR client connection.
///
/// Owns the configuration, at most one transport socket, and the event
/// channels the owner subscribes to. `connect` only starts the handshake;
/// its outcome arrives through [`on_connected`](Self::on_connected) or
/// [`on_failed`](Self::on_failed).
///
/// # Example
///
/// ```no_run
/// use signalrr_connect::{Connection, ConnectionConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConnectionConfig::new("localhost:5000/chathub");
/// let conn = Connection::new(config);
///
/// conn.on_message(|payload| println!("received: {payload}")).await;
/// conn.on_failed(|e| eprintln!("handshake failed: {e}")).await;
/// conn.connect().await?;
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConnectionConfig,
    requester: Arc<dyn HttpRequester>,
    transports: Arc<dyn TransportFactory>,
    state: RwLock<ConnectionState>,
    transport: RwLock<Option<Box<dyn TransportSocket>>>,
    connection_id: RwLock<Option<String>>,
    events: ConnectionEvents,
}

impl Connection {
    /// Creates a connection using `reqwest` for negotiate and
    /// `tokio-tungstenite` for the transport.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(ReqwestRequester::default()),
            Arc::new(WebSocketTransportFactory),
        )
    }

    pub fn with_collaborators(
        config: ConnectionConfig,
        requester: Arc<dyn HttpRequester>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                requester,
                transports,
                state: RwLock::new(ConnectionState::Idle),
                transport: RwLock::new(None),
                connection_id: RwLock::new(None),
                events: ConnectionEvents::default(),
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    pub async fn state(&self) -> ConnectionState {
        *self.inner.state.read().await
    }

    /// Session identifier from the last successful negotiate.
    pub async fn connection_id(&self) -> Option<String> {
        self.inner.connection_id.read().await.clone()
    }

    /// Starts negotiating in the background and returns immediately.
    ///
    /// From a failed or closed state this drops the previous transport and
    /// runs a fresh handshake.
    ///
    /// # Errors
    ///
    /// [`SignalRError::AlreadyStarted`] while negotiating, starting the
    /// transport, or open.
    pub async fn connect(&self) -> Result<(), SignalRError> {
        {
            let mut state = self.inner.state.write().await;
            if state.is_active() {
                return Err(SignalRError::AlreadyStarted(*state));
            }
            *state = ConnectionState::Negotiating;
        }

        // Новый handshake: старый транспорт больше не нужен
        self.inner.transport.write().await.take();
        self.inner.connection_id.write().await.take();

        info!(host = self.inner.config.host(), "Starting SignalR connection");
        tokio::spawn(Arc::clone(&self.inner).run_handshake());
        Ok(())
    }

    /// `true` if a transport exists and reports itself connected.
    pub async fn is_connected(&self) -> bool {
        self.inner
            .transport
            .read()
            .await
            .as_ref()
            .is_some_and(|transport| transport.is_connected())
    }

    /// Sends a text payload over the transport.
    ///
    /// # Errors
    ///
    /// [`SignalRError::SendWithoutConnection`] if no transport was started,
    /// [`SignalRError::NotConnected`] if it is not open.
    pub async fn send(&self, data: impl Into<String>) -> Result<(), SignalRError> {
        let result = match self.inner.transport.read().await.as_ref() {
            Some(transport) => transport.send(data.into()),
            None => Err(SignalRError::SendWithoutConnection),
        };
        if let Err(e) = &result {
            error!("Cannot send data to non connected websocket: {}", e);
        }
        result
    }

    /// Asks the transport to close with `code` and `reason`.
    pub async fn close(&self, code: u16, reason: impl Into<String>) -> Result<(), SignalRError> {
        let result = match self.inner.transport.read().await.as_ref() {
            Some(transport) => transport.close(code, reason.into()),
            None => Err(SignalRError::CloseWithoutConnection),
        };
        if let Err(e) = &result {
            error!("Cannot close non connected websocket: {}", e);
        }
        result
    }

    pub async fn on_connected<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .events
            .connected
            .subscribe(move |_: &()| handler())
            .await;
    }

    pub async fn on_connection_error<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner
            .events
            .connection_error
            .subscribe(move |message: &String| handler(message))
            .await;
    }

    /// `handler(code, reason, was_clean)`.
    pub async fn on_closed<F>(&self, handler: F)
    where
        F: Fn(u16, &str, bool) + Send + Sync + 'static,
    {
        self.inner
            .events
            .closed
            .subscribe(move |info: &CloseInfo| handler(info.code, &info.reason, info.was_clean))
            .await;
    }

    pub async fn on_message<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner
            .events
            .message
            .subscribe(move |payload: &String| handler(payload))
            .await;
    }

    /// Fires once per handshake that ends without an open transport.
    pub async fn on_failed<F>(&self, handler: F)
    where
        F: Fn(&SignalRError) + Send + Sync + 'static,
    {
        self.inner.events.failed.subscribe(handler).await;
    }
}
