//! HTTP requester used for the negotiate exchange.

use async_trait::async_trait;
use http::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::debug;

use crate::error::SignalRError;

/// Status and body of a completed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Issues the negotiate `POST`.
///
/// `Ok` means a response arrived, whatever its status code; `Err` means no
/// response was received at all.
#[async_trait]
pub trait HttpRequester: Send + Sync {
    async fn post(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, SignalRError>;
}

/// [`HttpRequester`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestRequester {
    client: reqwest::Client,
}

impl ReqwestRequester {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpRequester for ReqwestRequester {
    async fn post(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, SignalRError> {
        debug!("Negotiate URL: {}", url);

        let response = self
            .client
            .post(url)
            .headers(headers.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, "Negotiate response received");

        Ok(HttpResponse { status, body })
    }
}
