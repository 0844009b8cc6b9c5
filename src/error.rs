use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors that can occur while establishing or using a SignalR connection.
#[derive(Error, Debug)]
pub enum SignalRError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The negotiate endpoint answered with something other than `200 OK`.
    #[error("Negotiate failed with status code {0}")]
    NegotiateHttp(u16),

    #[error("Cannot parse negotiate response: {0}")]
    NegotiateParse(String),

    /// The negotiate response carried an `error` field.
    #[error("Negotiate rejected by server: {0}")]
    NegotiateRejected(String),

    #[error(
        "Detected a connection attempt to an ASP.NET SignalR server; \
         only ASP.NET Core SignalR servers are supported"
    )]
    LegacyServer,

    /// The server redirected to a target this client cannot follow.
    #[error("Redirection unsupported: {0}")]
    RedirectionUnsupported(String),

    #[error("Negotiate redirect limit of {0} exceeded")]
    TooManyRedirects(usize),

    #[error("The server does not support WebSockets with the Text transfer format")]
    TransportIncompatible,

    #[error("Cannot start transport: {0}")]
    TransportConstruction(String),

    #[error("Transport failed to connect: {0}")]
    TransportConnect(String),

    #[error("Cannot send data without an open transport")]
    SendWithoutConnection,

    #[error("Cannot close a connection without a transport")]
    CloseWithoutConnection,

    #[error("Not connected")]
    NotConnected,

    #[error("Connection already started (state: {0})")]
    AlreadyStarted(ConnectionState),
}
