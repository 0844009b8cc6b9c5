//! Connection establishment for ASP.NET Core SignalR clients.
//!
//! This crate takes a host and a set of headers and turns them into a live
//! text channel: it performs the `/negotiate` handshake, checks that the server
//! offers WebSockets with the text transfer format, opens the WebSocket and
//! relays its events to the owner.
//!
//! Hub protocol framing, invocations and reconnect policy are left to the
//! layer above.
//!
//! # Quick start
//!
//! ```no_run
//! use signalrr_connect::{Connection, ConnectionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectionConfig::new("localhost:5000/chathub")
//!     .with_header("X-Client", "demo");
//! let conn = Connection::new(config);
//!
//! conn.on_connected(|| println!("connected")).await;
//! conn.on_message(|payload| println!("<- {payload}")).await;
//! conn.on_closed(|code, reason, clean| println!("closed {code} {reason} {clean}")).await;
//!
//! conn.connect().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod negotiate;
pub mod transport;

pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionState};
pub use error::SignalRError;
