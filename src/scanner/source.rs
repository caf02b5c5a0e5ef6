// src/scanner/source.rs
// =============================================================================
// Where page bodies come from.
//
// `PageSource` is the seam between crawl policy and the network. The real
// implementation wraps a reqwest client; tests swap in a static map of pages
// so no test needs an internet connection.
//
// A source only reports what happened (status + body, or a transport
// failure). Deciding whether a status counts as a successful scan is the
// scanner's job, not the source's.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::ScanError;

/// Raw outcome of one GET request that reached the server
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Performs a GET request for `url`
    async fn fetch(&self, url: &str) -> Result<Fetched, ScanError>;
}

/// reqwest-backed page source
///
/// One client is reused for every request (connection pooling).
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10)) // 10 second timeout per request
            .redirect(reqwest::redirect::Policy::limited(5)) // Follow up to 5 redirects
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<Fetched, ScanError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| categorize_error(url, e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| categorize_error(url, e))?;

        Ok(Fetched { status, body })
    }
}

// Maps reqwest errors onto the scan failure kinds
fn categorize_error(url: &str, error: reqwest::Error) -> ScanError {
    let url = url.to_string();
    if error.is_timeout() {
        ScanError::Timeout { url }
    } else if error.is_connect() {
        ScanError::Connect {
            url,
            message: error.to_string(),
        }
    } else {
        ScanError::Request {
            url,
            message: error.to_string(),
        }
    }
}
