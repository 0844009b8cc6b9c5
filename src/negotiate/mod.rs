//! Negotiation with the SignalR server.
//!
//! Before establishing a WebSocket connection, the client must perform an HTTP POST
//! request to the `/negotiate` endpoint. The response tells the client which
//! transports the server offers, which connection id to use, or where to
//! redirect.
//!
//! [`evaluate`] turns one response into a [`NegotiateDecision`]. It does no I/O;
//! the request itself goes through an [`HttpRequester`].

mod requester;
mod response;

pub use requester::{HttpRequester, HttpResponse, ReqwestRequester};
pub use response::{AvailableTransport, NegotiateResponse};

use tracing::debug;

use crate::error::SignalRError;
use crate::transport::{TransferFormat, TransportKind};

/// Value of the `negotiateVersion` query parameter.
pub const NEGOTIATE_VERSION: u32 = 1;

/// What to do after a negotiate response.
#[derive(Debug)]
pub enum NegotiateDecision {
    /// Start the transport.
    Proceed {
        connection_id: Option<String>,
        transport: TransportKind,
    },
    /// Negotiate again against `url`, authenticating with `access_token`.
    Redirect {
        url: String,
        access_token: Option<String>,
    },
    Reject(SignalRError),
}

/// Evaluates a raw negotiate response.
///
/// Checks run in order and stop at the first rejection: status code, body
/// shape, `error`, `ProtocolVersion`, `url`, then transport compatibility.
///
/// # Example
///
/// ```
/// use signalrr_connect::negotiate::{evaluate, NegotiateDecision};
///
/// let body = r#"{"connectionId":"abc","availableTransports":[{"transport":"WebSockets","transferFormats":["Text"]}]}"#;
/// match evaluate(200, body) {
///     NegotiateDecision::Proceed { connection_id, .. } => {
///         assert_eq!(connection_id.as_deref(), Some("abc"));
///     }
///     other => panic!("unexpected decision: {:?}", other),
/// }
/// ```
pub fn evaluate(status: u16, body: &str) -> NegotiateDecision {
    if status != 200 {
        return NegotiateDecision::Reject(SignalRError::NegotiateHttp(status));
    }

    match NegotiateResponse::parse(body) {
        Ok(response) => decide(response),
        Err(e) => NegotiateDecision::Reject(e),
    }
}

/// Applies the negotiate rules to an already parsed response.
pub fn decide(response: NegotiateResponse) -> NegotiateDecision {
    if let Some(message) = response.error_message {
        return NegotiateDecision::Reject(SignalRError::NegotiateRejected(message));
    }

    if response.legacy_protocol_detected {
        return NegotiateDecision::Reject(SignalRError::LegacyServer);
    }

    if let Some(url) = response.redirect_url {
        debug!(%url, "Negotiate redirect");
        return NegotiateDecision::Redirect {
            url,
            access_token: response.access_token,
        };
    }

    let transport = TransportKind::WebSockets;

    // Servers that omit the list predate it and always offer WebSockets.
    if let Some(transports) = &response.available_transports {
        let compatible = transports
            .iter()
            .any(|t| t.supports(transport.name(), TransferFormat::Text.name()));
        if !compatible {
            return NegotiateDecision::Reject(SignalRError::TransportIncompatible);
        }
    }

    debug!(connection_id = ?response.connection_id, "Negotiate succeeded");
    NegotiateDecision::Proceed {
        connection_id: response.connection_id,
        transport,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proceed_id(decision: NegotiateDecision) -> Option<String> {
        match decision {
            NegotiateDecision::Proceed { connection_id, .. } => connection_id,
            other => panic!("expected Proceed, got {:?}", other),
        }
    }

    #[test]
    fn test_compatible_websockets_text() {
        let body = r#"{"connectionId":"abc","availableTransports":[{"transport":"WebSockets","transferFormats":["Text"]}]}"#;
        assert_eq!(proceed_id(evaluate(200, body)).as_deref(), Some("abc"));
    }

    #[test]
    fn test_non_200_status_rejects() {
        for status in [201, 301, 404, 500, 503] {
            match evaluate(status, r#"{"connectionId":"abc"}"#) {
                NegotiateDecision::Reject(SignalRError::NegotiateHttp(code)) => {
                    assert_eq!(code, status)
                }
                other => panic!("expected NegotiateHttp, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unparsable_body_rejects() {
        assert!(matches!(
            evaluate(200, "not json"),
            NegotiateDecision::Reject(SignalRError::NegotiateParse(_))
        ));
    }

    #[test]
    fn test_error_field_short_circuits() {
        let body = r#"{"error":"Hub not found","ProtocolVersion":"1.2","url":"http://x"}"#;
        match evaluate(200, body) {
            NegotiateDecision::Reject(SignalRError::NegotiateRejected(message)) => {
                assert_eq!(message, "Hub not found")
            }
            other => panic!("expected NegotiateRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_protocol_rejects_regardless_of_other_fields() {
        let bodies = [
            r#"{"ProtocolVersion":"1.2"}"#,
            r#"{"ProtocolVersion":"1.5","connectionId":"abc","availableTransports":[{"transport":"WebSockets","transferFormats":["Text"]}]}"#,
            r#"{"ProtocolVersion":2,"url":"http://elsewhere"}"#,
        ];
        for body in bodies {
            assert!(
                matches!(
                    evaluate(200, body),
                    NegotiateDecision::Reject(SignalRError::LegacyServer)
                ),
                "body: {body}"
            );
        }
    }

    #[test]
    fn test_null_protocol_version_rejects() {
        assert!(matches!(
            evaluate(200, r#"{"ProtocolVersion":null,"connectionId":"abc"}"#),
            NegotiateDecision::Reject(SignalRError::LegacyServer)
        ));
    }

    #[test]
    fn test_null_error_field_rejects() {
        match evaluate(200, r#"{"error":null,"connectionId":"abc"}"#) {
            NegotiateDecision::Reject(SignalRError::NegotiateRejected(message)) => {
                assert_eq!(message, "null")
            }
            other => panic!("expected NegotiateRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_redirect_carries_access_token() {
        match evaluate(200, r#"{"url":"https://azure/client/?hub=chat","accessToken":"jwt"}"#) {
            NegotiateDecision::Redirect { url, access_token } => {
                assert_eq!(url, "https://azure/client/?hub=chat");
                assert_eq!(access_token.as_deref(), Some("jwt"));
            }
            other => panic!("expected Redirect, got {:?}", other),
        }
    }

    #[test]
    fn test_incompatible_transports_reject() {
        let bodies = [
            r#"{"availableTransports":[{"transport":"ServerSentEvents","transferFormats":["Text"]}]}"#,
            r#"{"availableTransports":[{"transport":"WebSockets","transferFormats":["Binary"]}]}"#,
            r#"{"availableTransports":[{"transport":"websockets","transferFormats":["Text"]}]}"#,
            r#"{"availableTransports":[{"transport":"WebSockets","transferFormats":["text"]}]}"#,
            r#"{"availableTransports":[]}"#,
        ];
        for body in bodies {
            assert!(
                matches!(
                    evaluate(200, body),
                    NegotiateDecision::Reject(SignalRError::TransportIncompatible)
                ),
                "body: {body}"
            );
        }
    }

    #[test]
    fn test_any_matching_entry_suffices() {
        let body = r#"{"connectionId":"x","availableTransports":[
            {"transport":"LongPolling","transferFormats":["Text","Binary"]},
            {"transport":"WebSockets","transferFormats":["Binary","Text"]}
        ]}"#;
        assert_eq!(proceed_id(evaluate(200, body)).as_deref(), Some("x"));
    }

    #[test]
    fn test_missing_transports_assumed_compatible() {
        assert_eq!(
            proceed_id(evaluate(200, r#"{"connectionId":"legacy"}"#)).as_deref(),
            Some("legacy")
        );
    }

    #[test]
    fn test_connection_token_wins_over_id() {
        let body = r#"{"connectionId":"id","connectionToken":"token"}"#;
        assert_eq!(proceed_id(evaluate(200, body)).as_deref(), Some("token"));
    }

    #[test]
    fn test_no_session_identifier() {
        assert_eq!(proceed_id(evaluate(200, "{}")), None);
    }
}
