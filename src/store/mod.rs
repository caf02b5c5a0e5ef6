// src/store/mod.rs
// =============================================================================
// The persisted page store, seen only through the calls the crawl needs.
//
//   pending(exid, limit)               -> is the crawl still short of `limit`?
//   authorize(exid, limit)             -> may this crawl keep writing/fanning out?
//   save(exid, limit, page)            -> gated write; None when the limit is reached
//   pages_by_exid(exid)                -> first page of results
//   pages_with_after(exid, token)      -> results from the `after` cursor on
//   pages_with_before(exid, token)     -> results before the `before` cursor
//
// Each call is atomic on its own. Nothing here spans several calls, so two
// workers can both be authorized and both write: the page limit is soft.
// =============================================================================

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// The document written for every page a crawl discovers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Number of outbound links found on the page
    pub children: usize,
    pub exid: String,
    /// Worker that produced the record
    pub log_id: String,
    /// Invocation that produced the record
    pub request_id: String,
    pub title: String,
    pub url: String,
}

/// Structured reference to one stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRef {
    pub collection: String,
    pub id: String,
}

/// A stored page inside its storage envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(rename = "ref")]
    pub reference: StoreRef,
    /// Write time, microseconds since the Unix epoch
    pub ts: u64,
    pub data: PageRecord,
}

/// One page of query results, as the store returns it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResults {
    #[serde(default)]
    pub data: Option<Vec<StoredDocument>>,
    #[serde(default)]
    pub after: Option<StoreRef>,
    #[serde(default)]
    pub before: Option<StoreRef>,
}

#[async_trait]
pub trait PageStore: Send + Sync {
    async fn pending(&self, exid: &str, limit: u64) -> Result<bool, TransportError>;

    async fn authorize(&self, exid: &str, limit: u64) -> Result<bool, TransportError>;

    async fn save(
        &self,
        exid: &str,
        limit: u64,
        page: PageRecord,
    ) -> Result<Option<StoreRef>, TransportError>;

    async fn pages_by_exid(&self, exid: &str) -> Result<RawResults, TransportError>;

    async fn pages_with_after(&self, exid: &str, after: &str) -> Result<RawResults, TransportError>;

    async fn pages_with_before(&self, exid: &str, before: &str)
        -> Result<RawResults, TransportError>;
}
