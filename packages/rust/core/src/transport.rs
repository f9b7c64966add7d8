//! HTTP transport seam.
//!
//! The orchestrator only needs `fetch(url) -> (status, body, content type)`.
//! Error statuses are returned as responses, not errors: the service reports
//! rejections as acknowledgement documents in the body.

use std::time::Duration;

use async_trait::async_trait;
use entsoe_shared::{EntsoeError, Result};
use reqwest::Client;
use tracing::debug;

/// User-Agent header sent with every request.
const USER_AGENT: &str = concat!("entsoe/", env!("CARGO_PKG_VERSION"));

/// Maximum redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// A raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches one URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| EntsoeError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(network_error)?
            .to_vec();

        debug!(status, bytes = body.len(), ?content_type, "response received");
        Ok(FetchResponse {
            status,
            body,
            content_type,
        })
    }
}

/// Request URLs carry the security token; errors drop the URL.
fn network_error(e: reqwest::Error) -> EntsoeError {
    EntsoeError::Network(e.without_url().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_status_body_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("securityToken", "k"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<doc/>", "text/xml"),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let response = transport
            .fetch(&format!("{}/api?securityToken=k", server.uri()))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body, b"<doc/>");
        assert_eq!(response.content_type.as_deref(), Some("text/xml"));
    }

    #[tokio::test]
    async fn error_status_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("<reason/>"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let response = transport.fetch(&server.uri()).await.unwrap();
        assert_eq!(response.status, 400);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn network_error_omits_token() {
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .fetch("http://127.0.0.1:1/api?securityToken=abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, EntsoeError::Network(_)));
        assert!(!err.to_string().contains("abc123"));
    }
}
