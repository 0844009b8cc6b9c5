//! Negotiate and transport URLs for a server endpoint.

use url::Url;

use crate::error::SignalRError;
use crate::negotiate::NEGOTIATE_VERSION;

/// Base URL the client is currently negotiating against.
///
/// Starts as `http://{host}` and is replaced when the server redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    /// Endpoint for a configured host such as `localhost:5000/chathub`.
    pub fn from_host(host: &str) -> Result<Self, SignalRError> {
        let base = Url::parse(&format!("http://{host}"))?;
        Ok(Self { base })
    }

    /// Endpoint for the `url` field of a redirecting negotiate response.
    pub fn from_redirect(url: &str) -> Result<Self, SignalRError> {
        let base = Url::parse(url)
            .map_err(|e| SignalRError::RedirectionUnsupported(format!("{url}: {e}")))?;
        match base.scheme() {
            "http" | "https" => Ok(Self { base }),
            other => Err(SignalRError::RedirectionUnsupported(format!(
                "unsupported scheme `{other}` in {url}"
            ))),
        }
    }

    /// `{base}/negotiate?negotiateVersion=1`, keeping any query the base had.
    pub fn negotiate_url(&self) -> Url {
        let mut url = self.base.clone();

        let path = format!("{}/negotiate", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_fragment(None);
        url.query_pairs_mut()
            .append_pair("negotiateVersion", &NEGOTIATE_VERSION.to_string());

        url
    }

    /// WebSocket URL for the endpoint: `http` maps to `ws`, `https` to `wss`.
    ///
    /// A bare host yields `ws://{host}` without a trailing slash.
    pub fn transport_url(&self) -> Result<String, SignalRError> {
        let mut url = self.base.clone();
        let ws_scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(ws_scheme).map_err(|()| {
            SignalRError::TransportConstruction(format!("cannot use {ws_scheme} for {url}"))
        })?;
        url.set_fragment(None);

        let bare = url.path() == "/" && url.query().is_none();
        let mut ws_url = String::from(url);
        if bare {
            ws_url.pop();
        }
        Ok(ws_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_urls() {
        let endpoint = Endpoint::from_host("localhost:5000").unwrap();
        assert_eq!(
            endpoint.negotiate_url().as_str(),
            "http://localhost:5000/negotiate?negotiateVersion=1"
        );
        assert_eq!(endpoint.transport_url().unwrap(), "ws://localhost:5000");
    }

    #[test]
    fn test_host_with_hub_path() {
        let endpoint = Endpoint::from_host("example.com/chathub/").unwrap();
        assert_eq!(
            endpoint.negotiate_url().as_str(),
            "http://example.com/chathub/negotiate?negotiateVersion=1"
        );
        assert_eq!(
            endpoint.transport_url().unwrap(),
            "ws://example.com/chathub/"
        );
    }

    #[test]
    fn test_redirect_keeps_query_and_tls() {
        let endpoint =
            Endpoint::from_redirect("https://hub.service.signalr.net/client/?hub=chat").unwrap();
        assert_eq!(
            endpoint.negotiate_url().as_str(),
            "https://hub.service.signalr.net/client/negotiate?hub=chat&negotiateVersion=1"
        );
        assert_eq!(
            endpoint.transport_url().unwrap(),
            "wss://hub.service.signalr.net/client/?hub=chat"
        );
    }

    #[test]
    fn test_unfollowable_redirects() {
        for url in ["/relative/path", "ftp://files.example.com", "ws://direct.example.com"] {
            assert!(
                matches!(
                    Endpoint::from_redirect(url),
                    Err(SignalRError::RedirectionUnsupported(_))
                ),
                "url: {url}"
            );
        }
    }

    #[test]
    fn test_invalid_host() {
        assert!(matches!(
            Endpoint::from_host("bad host:port"),
            Err(SignalRError::UrlParse(_))
        ));
    }
}
