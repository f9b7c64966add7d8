//! Catalog scraping from the published API guide.
//!
//! The guide is the only machine-readable source of dataset request shapes
//! and parameter code tables. It is fetched once and parsed into a
//! [`Catalog`]; callers usually snapshot the result to JSON.

mod parser;

use entsoe_shared::{Catalog, EntsoeError, Result};
use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

pub use parser::parse_guide;

/// Maximum number of redirects to follow when fetching the guide.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for fetching the guide.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum response size we consider valid (20 MB).
const MAX_RESPONSE_SIZE: u64 = 20 * 1024 * 1024;

/// User-Agent string for guide requests.
const USER_AGENT: &str = concat!("entsoe/", env!("CARGO_PKG_VERSION"));

/// Options for [`fetch_catalog`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for the HTTP request in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Fetch the guide at `url` and parse it into a catalog.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_catalog(url: &Url, opts: &FetchOptions) -> Result<Catalog> {
    let client = build_client(opts)?;
    let html = fetch_page(&client, url.as_str()).await?;
    let catalog = parse_guide(&html)?;

    info!(
        datasets = catalog.datasets.len(),
        parameter_types = catalog.parameters.types().len(),
        "guide parsed"
    );
    Ok(catalog)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_client(opts: &FetchOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| EntsoeError::Network(format!("failed to build HTTP client: {e}")))
}

async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| EntsoeError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(EntsoeError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(EntsoeError::validation(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    response
        .text()
        .await
        .map_err(|e| EntsoeError::Network(format!("{url}: failed to read body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_catalog_with_mock_server() {
        let server = wiremock::MockServer::start().await;
        let html = std::fs::read_to_string("../../../fixtures/html/guide.fixture.html")
            .expect("read guide fixture");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/Guide.html"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(&html),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/Guide.html", server.uri())).unwrap();
        let catalog = fetch_catalog(&url, &FetchOptions::default()).await.unwrap();

        assert_eq!(catalog.datasets.len(), 4);
        assert!(catalog.parameters.get("Areas").is_some());
        assert!(catalog.dataset("Cross-Border Physical Flow").is_some());
    }

    #[tokio::test]
    async fn test_fetch_catalog_http_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/Guide.html", server.uri())).unwrap();
        let err = fetch_catalog(&url, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EntsoeError::Network(_)));
    }

    #[tokio::test]
    async fn test_fetch_catalog_empty_page() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("<html><body></body></html>"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = fetch_catalog(&url, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EntsoeError::Parse { .. }));
    }
}
