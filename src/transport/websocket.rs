//! WebSocket transport built on `tokio-tungstenite`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use http::HeaderMap;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        handshake::client::Request,
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
};
use tracing::{debug, warn};

use super::{TransportEvent, TransportEventSink, TransportFactory, TransportSocket};
use crate::error::SignalRError;

enum Command {
    Send(String),
    Close { code: u16, reason: String },
}

/// A WebSocket without sub-protocol, carrying text frames.
///
/// The stream is owned by a background task spawned in [`connect`]; `send` and
/// `close` only enqueue commands for it. Dropping the transport makes the task
/// send a close frame and exit.
///
/// [`connect`]: TransportSocket::connect
pub struct WebSocketTransport {
    request: Option<Request>,
    commands: mpsc::UnboundedSender<Command>,
    pending: Option<mpsc::UnboundedReceiver<Command>>,
    connected: Arc<AtomicBool>,
}

impl WebSocketTransport {
    /// Prepares the upgrade request for `url` with `headers` attached.
    pub fn new(url: &str, headers: &HeaderMap) -> Result<Self, SignalRError> {
        let mut request = url.into_client_request()?;
        request.headers_mut().extend(headers.clone());

        let (commands, pending) = mpsc::unbounded_channel();
        Ok(Self {
            request: Some(request),
            commands,
            pending: Some(pending),
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    fn enqueue(&self, command: Command) -> Result<(), SignalRError> {
        if !self.is_connected() {
            return Err(SignalRError::NotConnected);
        }
        self.commands
            .send(command)
            .map_err(|_| SignalRError::NotConnected)
    }
}

impl TransportSocket for WebSocketTransport {
    fn connect(&mut self, events: TransportEventSink) {
        let (Some(request), Some(commands)) = (self.request.take(), self.pending.take()) else {
            warn!("WebSocket transport connect called twice");
            let _ = events.unbounded_send(TransportEvent::ConnectionError(
                "transport already started".to_string(),
            ));
            return;
        };

        tokio::spawn(run(request, commands, events, Arc::clone(&self.connected)));
    }

    fn send(&self, data: String) -> Result<(), SignalRError> {
        self.enqueue(Command::Send(data))
    }

    fn close(&self, code: u16, reason: String) -> Result<(), SignalRError> {
        self.enqueue(Command::Close { code, reason })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn run(
    request: Request,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: TransportEventSink,
    connected: Arc<AtomicBool>,
) {
    debug!("Connecting WebSocket to {}", request.uri());
    let ws_stream = match connect_async(request).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            let _ = events.unbounded_send(TransportEvent::ConnectionError(e.to_string()));
            return;
        }
    };

    connected.store(true, Ordering::SeqCst);
    let _ = events.unbounded_send(TransportEvent::Connected);

    let (mut sink, mut stream) = ws_stream.split();
    let abnormal = u16::from(CloseCode::Abnormal);

    let closed = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(text)) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        let _ = events
                            .unbounded_send(TransportEvent::ConnectionError(e.to_string()));
                    }
                }
                Some(Command::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    // Keep reading until the server echoes the close frame.
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        break Some((abnormal, e.to_string(), false));
                    }
                }
                None => {
                    // The owning transport was dropped.
                    let _ = sink.send(Message::Close(None)).await;
                    break None;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.unbounded_send(TransportEvent::Message(text));
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => {
                        let _ = events.unbounded_send(TransportEvent::Message(text));
                    }
                    Err(_) => warn!("Dropping binary WebSocket frame that is not UTF-8"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.into_owned()))
                        .unwrap_or((u16::from(CloseCode::Status), String::new()));
                    break Some((code, reason, true));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let reason = e.to_string();
                    let _ = events.unbounded_send(TransportEvent::ConnectionError(reason.clone()));
                    break Some((abnormal, reason, false));
                }
                None => break Some((abnormal, String::new(), false)),
            },
        }
    };

    connected.store(false, Ordering::SeqCst);
    let _ = sink.close().await;

    if let Some((code, reason, was_clean)) = closed {
        debug!(code, was_clean, "WebSocket closed");
        let _ = events.unbounded_send(TransportEvent::Closed {
            code,
            reason,
            was_clean,
        });
    }
}

/// Creates a [`WebSocketTransport`] per connection attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransportFactory;

impl TransportFactory for WebSocketTransportFactory {
    fn create(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<Box<dyn TransportSocket>, SignalRError> {
        Ok(Box::new(WebSocketTransport::new(url, headers)?))
    }
}
