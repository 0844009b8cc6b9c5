//! Connection configuration.

use std::collections::HashMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::SignalRError;

/// Host and headers used for both the negotiate request and the transport.
///
/// `host` is given without a scheme, e.g. `localhost:5000` or
/// `example.com/chathub`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    host: String,
    #[serde(default)]
    headers: HashMap<String, String>,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Converts the configured headers into an [`HeaderMap`].
    ///
    /// # Errors
    ///
    /// Returns [`SignalRError::InvalidHeader`] if a name or value is not a
    /// legal HTTP header.
    pub fn header_map(&self) -> Result<HeaderMap, SignalRError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SignalRError::InvalidHeader(format!("{name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| SignalRError::InvalidHeader(format!("{name}: {e}")))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}
