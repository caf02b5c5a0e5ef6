// src/scanner/scan.rs
// =============================================================================
// Scans one URL: wait, fetch, classify, parse.
//
// Outcomes:
// - 2xx          -> Ok(ScanResult) with title and links
// - 4xx          -> Ok(ScanResult) with an empty title and no links
//                   (a dead link is data, not a failure)
// - anything else (network error, 5xx, ...) -> Err(ScanError)
//
// The error is returned as a value so a failing URL never aborts the
// sibling scans running next to it in the same cycle.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::links::extract_page;
use super::source::PageSource;
use crate::error::ScanError;

/// What one successful scan found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Page identity: the target with its query string removed
    pub url: String,
    /// Page title, empty for dead links
    pub title: String,
    /// Absolute outbound links
    pub targets: Vec<String>,
}

impl ScanResult {
    fn dead(url: String) -> Self {
        Self {
            url,
            title: String::new(),
            targets: Vec::new(),
        }
    }
}

/// Removes everything from the first '?' on
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Scans `target` as part of a crawl rooted at `root_url`
///
/// `delay` is the politeness pause taken before the request.
pub async fn scan_page(
    source: &dyn PageSource,
    target: &str,
    root_url: &str,
    delay: Duration,
) -> Result<ScanResult, ScanError> {
    let page_url = strip_query(target).to_string();

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let fetched = source.fetch(&page_url).await?;

    if fetched.is_client_error() {
        debug!(url = %page_url, status = fetched.status, "dead link");
        return Ok(ScanResult::dead(page_url));
    }

    if !fetched.is_success() {
        return Err(ScanError::ServerStatus {
            url: page_url,
            status: fetched.status,
        });
    }

    let (title, targets) = extract_page(&fetched.body, &page_url, root_url);
    debug!(url = %page_url, links = targets.len(), "page scanned");

    Ok(ScanResult {
        url: page_url,
        title,
        targets,
    })
}
