//! Event channels exposed by a [`Connection`](super::Connection).
//!
//! Each event kind has its own [`EventChannel`]: listeners are kept in
//! registration order and every broadcast reaches all of them.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::SignalRError;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A multi-listener notification point for one event kind.
pub struct EventChannel<T> {
    handlers: RwLock<Vec<Handler<T>>>,
}

impl<T: 'static> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Registers a listener; it runs after every listener registered before it.
    pub async fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.handlers.write().await.push(Arc::new(handler));
    }

    /// Calls every listener with `payload`.
    ///
    /// The lock is released before the listeners run, so a listener may
    /// subscribe further listeners; those only see later broadcasts.
    pub async fn broadcast(&self, payload: &T) {
        let handlers = self.handlers.read().await.clone();
        for handler in &handlers {
            handler(payload);
        }
    }

    pub async fn listener_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl<T: 'static> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Close code, reason and cleanliness reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
    pub was_clean: bool,
}

#[derive(Default)]
pub(crate) struct ConnectionEvents {
    pub(crate) connected: EventChannel<()>,
    pub(crate) connection_error: EventChannel<String>,
    pub(crate) closed: EventChannel<CloseInfo>,
    pub(crate) message: EventChannel<String>,
    pub(crate) failed: EventChannel<SignalRError>,
}
