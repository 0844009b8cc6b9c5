//! Negotiate response body.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::SignalRError;

/// Raw shape of the `/negotiate` body.
///
/// Every field is kept as a [`Value`] so that a field with an unexpected type
/// is treated as absent instead of failing the whole parse. A field that is
/// present with a `null` value deserializes to `Some(Value::Null)`.
#[derive(Deserialize, Debug, Default)]
struct RawNegotiateResponse {
    #[serde(default, deserialize_with = "present")]
    error: Option<Value>,
    #[serde(rename = "ProtocolVersion", default, deserialize_with = "present")]
    protocol_version: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    url: Option<Value>,
    #[serde(rename = "accessToken", default, deserialize_with = "present")]
    access_token: Option<Value>,
    #[serde(rename = "availableTransports", default, deserialize_with = "present")]
    available_transports: Option<Value>,
    #[serde(rename = "connectionId", default, deserialize_with = "present")]
    connection_id: Option<Value>,
    #[serde(rename = "connectionToken", default, deserialize_with = "present")]
    connection_token: Option<Value>,
}

/// Only called for keys that exist in the body, so `null` stays `Some`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A transport advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableTransport {
    pub transport: String,
    pub transfer_formats: HashSet<String>,
}

impl AvailableTransport {
    /// Reads one `availableTransports` entry. Entries without a string
    /// `transport` or an array `transferFormats` are skipped.
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let transport = object.get("transport")?.as_str()?.to_string();
        let transfer_formats = object
            .get("transferFormats")?
            .as_array()?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        Some(Self {
            transport,
            transfer_formats,
        })
    }

    /// Exact, case-sensitive match on both names.
    pub fn supports(&self, transport: &str, format: &str) -> bool {
        self.transport == transport && self.transfer_formats.contains(format)
    }
}

/// Decoded `/negotiate` response.
///
/// `error` and `ProtocolVersion` count as soon as the key exists, even with a
/// `null` value. String fields set to `null` are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiateResponse {
    /// `connectionToken` if present, otherwise `connectionId`.
    pub connection_id: Option<String>,
    /// `None` when the server did not send the field at all.
    pub available_transports: Option<Vec<AvailableTransport>>,
    pub redirect_url: Option<String>,
    pub access_token: Option<String>,
    /// The server answered with the ASP.NET SignalR (non-Core) dialect.
    pub legacy_protocol_detected: bool,
    pub error_message: Option<String>,
}

impl NegotiateResponse {
    /// Parses a negotiate body, which must be a JSON object.
    pub fn parse(body: &str) -> Result<Self, SignalRError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| SignalRError::NegotiateParse(e.to_string()))?;
        if !value.is_object() {
            return Err(SignalRError::NegotiateParse(format!(
                "expected a JSON object, got: {body}"
            )));
        }
        let raw: RawNegotiateResponse = serde_json::from_value(value)
            .map_err(|e| SignalRError::NegotiateParse(e.to_string()))?;
        Ok(raw.into())
    }
}

fn into_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

impl From<RawNegotiateResponse> for NegotiateResponse {
    fn from(raw: RawNegotiateResponse) -> Self {
        let error_message = raw.error.map(|value| match value {
            Value::String(message) => message,
            other => other.to_string(),
        });

        let available_transports = match raw.available_transports {
            Some(Value::Array(entries)) => Some(
                entries
                    .iter()
                    .filter_map(AvailableTransport::from_value)
                    .collect(),
            ),
            _ => None,
        };

        let connection_id =
            into_string(raw.connection_token).or_else(|| into_string(raw.connection_id));

        Self {
            connection_id,
            available_transports,
            redirect_url: into_string(raw.url),
            access_token: into_string(raw.access_token),
            legacy_protocol_detected: raw.protocol_version.is_some(),
            error_message,
        }
    }
}
