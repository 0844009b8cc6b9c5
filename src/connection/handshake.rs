//! Negotiate → transport startup sequence and the transport event relay.

use std::sync::{Arc, Weak};

use futures_channel::mpsc;
use futures_util::StreamExt;
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, error, info, warn};

use super::{CloseInfo, ConnectionState, Endpoint, Inner, MAX_REDIRECTS};
use crate::error::SignalRError;
use crate::negotiate::{self, NegotiateDecision};
use crate::transport::{TransportEvent, TransportKind};

/// Result of a successful negotiate.
struct Handshake {
    endpoint: Endpoint,
    headers: HeaderMap,
    transport: TransportKind,
}

impl Inner {
    pub(super) async fn run_handshake(self: Arc<Self>) {
        let result = match self.negotiate().await {
            Ok(handshake) => self.start_transport(handshake).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            self.fail(e).await;
        }
    }

    async fn negotiate(&self) -> Result<Handshake, SignalRError> {
        let mut endpoint = Endpoint::from_host(self.config.host())?;
        let mut headers = self.config.header_map()?;
        let mut redirects = 0;

        loop {
            let url = endpoint.negotiate_url();
            let response = self.requester.post(url.as_str(), &headers).await?;

            match negotiate::evaluate(response.status, &response.body) {
                NegotiateDecision::Proceed {
                    connection_id,
                    transport,
                } => {
                    *self.connection_id.write().await = connection_id;
                    return Ok(Handshake {
                        endpoint,
                        headers,
                        transport,
                    });
                }
                NegotiateDecision::Redirect { url, access_token } => {
                    if redirects == MAX_REDIRECTS {
                        return Err(SignalRError::TooManyRedirects(MAX_REDIRECTS));
                    }
                    redirects += 1;

                    info!(%url, redirects, "Negotiate redirected");
                    endpoint = Endpoint::from_redirect(&url)?;
                    if let Some(token) = access_token {
                        let bearer =
                            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                                SignalRError::InvalidHeader(format!("accessToken: {e}"))
                            })?;
                        headers.insert(AUTHORIZATION, bearer);
                    }
                }
                NegotiateDecision::Reject(e) => return Err(e),
            }
        }
    }

    async fn start_transport(self: &Arc<Self>, handshake: Handshake) -> Result<(), SignalRError> {
        *self.state.write().await = ConnectionState::StartingTransport;

        let url = handshake
            .endpoint
            .transport_url()
            .map_err(|e| SignalRError::TransportConstruction(e.to_string()))?;
        info!(%url, transport = %handshake.transport, "Starting transport");

        let mut socket = self
            .transports
            .create(&url, &handshake.headers)
            .map_err(|e| SignalRError::TransportConstruction(e.to_string()))?;

        // Relay must be listening before the socket can emit anything.
        let (events_tx, events_rx) = mpsc::unbounded();
        tokio::spawn(relay(Arc::downgrade(self), events_rx));

        let mut slot = self.transport.write().await;
        socket.connect(events_tx);
        *slot = Some(socket);
        Ok(())
    }

    async fn fail(&self, e: SignalRError) {
        error!("SignalR handshake failed: {}", e);
        *self.state.write().await = ConnectionState::Failed;
        self.events.failed.broadcast(&e).await;
    }

    async fn dispatch(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                *self.state.write().await = ConnectionState::Open;
                info!("Transport connected");
                self.events.connected.broadcast(&()).await;
            }
            TransportEvent::ConnectionError(message) => {
                warn!("Websocket err: {}", message);
                self.events.connection_error.broadcast(&message).await;

                let never_opened = {
                    let mut state = self.state.write().await;
                    if *state == ConnectionState::StartingTransport {
                        *state = ConnectionState::Failed;
                        true
                    } else {
                        false
                    }
                };
                if never_opened {
                    self.events
                        .failed
                        .broadcast(&SignalRError::TransportConnect(message))
                        .await;
                }
            }
            TransportEvent::Closed {
                code,
                reason,
                was_clean,
            } => {
                *self.state.write().await = ConnectionState::Closed;
                info!(code, %reason, was_clean, "Transport closed");
                self.events
                    .closed
                    .broadcast(&CloseInfo {
                        code,
                        reason,
                        was_clean,
                    })
                    .await;
            }
            TransportEvent::Message(payload) => {
                self.events.message.broadcast(&payload).await;
            }
        }
    }
}

/// Forwards transport events until the transport or the connection goes away.
async fn relay(connection: Weak<Inner>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
    while let Some(event) = events.next().await {
        let Some(inner) = connection.upgrade() else {
            debug!("Connection dropped, stopping transport relay");
            break;
        };
        inner.dispatch(event).await;
    }
}
