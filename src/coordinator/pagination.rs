// src/coordinator/pagination.rs
// =============================================================================
// The Cursor Pagination Codec.
//
// The store hands out structured references for paging, e.g.
//   { "collection": "pages", "id": "260112347782185481" }
// Clients only ever see a token made of the digits of that reference
// ("260112347782185481"). The store resolves such a token on its own, so the
// codec never needs to keep anything: tokens are derived, not stored.
//
// Results are reshaped for the client:
//   { "exid": ..., "data": [page, ...], "after": token|null, "before": token|null }
// or `[]` when the store returned no data at all.
// =============================================================================

use serde::Serialize;

use crate::error::TransportError;
use crate::store::{PageRecord, PageStore, RawResults, StoreRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsPage {
    pub exid: String,
    pub data: Vec<PageRecord>,
    pub after: Option<String>,
    pub before: Option<String>,
}

/// What a results request answers with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageResponse {
    Page(ResultsPage),
    // Always empty; serializes as []
    Empty(Vec<PageRecord>),
}

/// Keeps only the digits of the serialized reference
pub fn extract_token(reference: &StoreRef) -> String {
    serde_json::to_string(reference)
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Strips the storage envelope and swaps references for tokens
pub fn build_page(raw: RawResults, exid: &str) -> PageResponse {
    let Some(documents) = raw.data else {
        return PageResponse::Empty(Vec::new());
    };

    PageResponse::Page(ResultsPage {
        exid: exid.to_string(),
        data: documents.into_iter().map(|doc| doc.data).collect(),
        after: raw.after.as_ref().map(extract_token),
        before: raw.before.as_ref().map(extract_token),
    })
}

/// First page of a crawl's results
pub async fn first(store: &dyn PageStore, exid: &str) -> Result<PageResponse, TransportError> {
    let raw = store.pages_by_exid(exid).await?;
    Ok(build_page(raw, exid))
}

/// The page starting at the `after` token
pub async fn next(
    store: &dyn PageStore,
    exid: &str,
    after: &str,
) -> Result<PageResponse, TransportError> {
    let raw = store.pages_with_after(exid, after).await?;
    Ok(build_page(raw, exid))
}

/// The page ending right before the `before` token
pub async fn prev(
    store: &dyn PageStore,
    exid: &str,
    before: &str,
) -> Result<PageResponse, TransportError> {
    let raw = store.pages_with_before(exid, before).await?;
    Ok(build_page(raw, exid))
}
