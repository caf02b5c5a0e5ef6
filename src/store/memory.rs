// src/store/memory.rs
// =============================================================================
// In-memory page store shared by the coordinator and the local workers.
//
// Every call takes one lock, so each call is atomic the way a single
// datastore function call is. Documents get increasing numeric ids and are
// kept in write order; results pages are windows over that order.
//
// Data is lost on restart.
// =============================================================================

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{PageRecord, PageStore, RawResults, StoreRef, StoredDocument};
use crate::error::TransportError;

const COLLECTION: &str = "pages";

#[derive(Default)]
struct Inner {
    next_id: u64,
    // Kept in write order, which is also ascending id order
    documents: Vec<(u64, StoredDocument)>,
}

impl Inner {
    fn count(&self, exid: &str) -> u64 {
        self.documents
            .iter()
            .filter(|(_, doc)| doc.data.exid == exid)
            .count() as u64
    }

    fn for_execution(&self, exid: &str) -> Vec<&(u64, StoredDocument)> {
        self.documents
            .iter()
            .filter(|(_, doc)| doc.data.exid == exid)
            .collect()
    }
}

pub struct MemoryStore {
    page_size: usize,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store returning `page_size` documents per results page
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            inner: Mutex::new(Inner {
                next_id: 1,
                documents: Vec::new(),
            }),
        }
    }

    /// Number of pages stored for one crawl
    #[cfg(test)]
    pub fn page_count(&self, exid: &str) -> Result<u64, TransportError> {
        Ok(self.lock()?.count(exid))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, TransportError> {
        self.inner
            .lock()
            .map_err(|_| TransportError::Store("memory store lock poisoned".to_string()))
    }

    // Slices docs[start..end] into a results page with cursors around it
    fn window(docs: &[&(u64, StoredDocument)], start: usize, end: usize) -> RawResults {
        let page: Vec<StoredDocument> = docs[start..end]
            .iter()
            .map(|(_, doc)| doc.clone())
            .collect();

        let before = if start > 0 && !page.is_empty() {
            Some(docs[start].1.reference.clone())
        } else {
            None
        };
        let after = docs.get(end).map(|(_, doc)| doc.reference.clone());

        RawResults {
            data: Some(page),
            after,
            before,
        }
    }
}

fn parse_cursor(token: &str) -> Result<u64, TransportError> {
    token
        .trim()
        .parse()
        .map_err(|_| TransportError::Store(format!("invalid cursor '{}'", token)))
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn pending(&self, exid: &str, limit: u64) -> Result<bool, TransportError> {
        Ok(self.lock()?.count(exid) < limit)
    }

    async fn authorize(&self, exid: &str, limit: u64) -> Result<bool, TransportError> {
        Ok(self.lock()?.count(exid) < limit)
    }

    async fn save(
        &self,
        exid: &str,
        limit: u64,
        page: PageRecord,
    ) -> Result<Option<StoreRef>, TransportError> {
        let mut inner = self.lock()?;
        if inner.count(exid) >= limit {
            return Ok(None);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let reference = StoreRef {
            collection: COLLECTION.to_string(),
            id: id.to_string(),
        };
        inner.documents.push((
            id,
            StoredDocument {
                reference: reference.clone(),
                ts: now_micros(),
                data: page,
            },
        ));
        Ok(Some(reference))
    }

    async fn pages_by_exid(&self, exid: &str) -> Result<RawResults, TransportError> {
        let inner = self.lock()?;
        let docs = inner.for_execution(exid);
        let end = docs.len().min(self.page_size);
        Ok(Self::window(&docs, 0, end))
    }

    async fn pages_with_after(&self, exid: &str, after: &str) -> Result<RawResults, TransportError> {
        let cursor = parse_cursor(after)?;
        let inner = self.lock()?;
        let docs = inner.for_execution(exid);

        // `after` is inclusive: the page starts at the referenced document
        let start = docs
            .iter()
            .position(|(id, _)| *id >= cursor)
            .unwrap_or(docs.len());
        let end = (start + self.page_size).min(docs.len());
        Ok(Self::window(&docs, start, end))
    }

    async fn pages_with_before(
        &self,
        exid: &str,
        before: &str,
    ) -> Result<RawResults, TransportError> {
        let cursor = parse_cursor(before)?;
        let inner = self.lock()?;
        let docs = inner.for_execution(exid);

        // `before` is exclusive: the page ends right before the referenced document
        let end = docs
            .iter()
            .position(|(id, _)| *id >= cursor)
            .unwrap_or(docs.len());
        let start = end.saturating_sub(self.page_size);
        Ok(Self::window(&docs, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(exid: &str, n: usize) -> PageRecord {
        PageRecord {
            children: n,
            exid: exid.to_string(),
            log_id: "local".to_string(),
            request_id: "req".to_string(),
            title: format!("Page {}", n),
            url: format!("http://example.com/{}", n),
        }
    }

    fn titles(results: &RawResults) -> Vec<String> {
        results
            .data
            .as_ref()
            .unwrap()
            .iter()
            .map(|doc| doc.data.title.clone())
            .collect()
    }

    async fn filled(exid: &str, pages: usize, page_size: usize) -> MemoryStore {
        let store = MemoryStore::new(page_size);
        for n in 0..pages {
            store.save(exid, 100, record(exid, n)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_save_is_gated_by_limit() {
        let store = MemoryStore::new(10);
        assert!(store.save("e1", 2, record("e1", 0)).await.unwrap().is_some());
        assert!(store.save("e1", 2, record("e1", 1)).await.unwrap().is_some());
        assert!(store.save("e1", 2, record("e1", 2)).await.unwrap().is_none());
        assert_eq!(store.page_count("e1").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_limits_are_per_execution() {
        let store = MemoryStore::new(10);
        store.save("e1", 1, record("e1", 0)).await.unwrap();
        assert!(!store.authorize("e1", 1).await.unwrap());
        assert!(store.authorize("e2", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_pending_until_limit_reached() {
        let store = MemoryStore::new(10);
        assert!(store.pending("e1", 2).await.unwrap());
        store.save("e1", 2, record("e1", 0)).await.unwrap();
        assert!(store.pending("e1", 2).await.unwrap());
        store.save("e1", 2, record("e1", 1)).await.unwrap();
        assert!(!store.pending("e1", 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_first_page_and_forward_cursor() {
        let store = filled("e1", 5, 2).await;

        let first = store.pages_by_exid("e1").await.unwrap();
        assert_eq!(titles(&first), vec!["Page 0", "Page 1"]);
        assert!(first.before.is_none());

        let after = first.after.unwrap();
        let second = store.pages_with_after("e1", &after.id).await.unwrap();
        assert_eq!(titles(&second), vec!["Page 2", "Page 3"]);
        assert!(second.before.is_some());

        let third = store
            .pages_with_after("e1", &second.after.unwrap().id)
            .await
            .unwrap();
        assert_eq!(titles(&third), vec!["Page 4"]);
        assert!(third.after.is_none());
    }

    #[tokio::test]
    async fn test_backward_cursor() {
        let store = filled("e1", 5, 2).await;
        let first = store.pages_by_exid("e1").await.unwrap();
        let second = store
            .pages_with_after("e1", &first.after.unwrap().id)
            .await
            .unwrap();

        let back = store
            .pages_with_before("e1", &second.before.unwrap().id)
            .await
            .unwrap();
        assert_eq!(titles(&back), vec!["Page 0", "Page 1"]);
        assert!(back.before.is_none());
    }

    #[tokio::test]
    async fn test_unknown_execution_has_empty_data() {
        let store = MemoryStore::new(10);
        let results = store.pages_by_exid("nobody").await.unwrap();
        assert_eq!(results.data, Some(Vec::new()));
        assert!(results.after.is_none());
    }

    #[tokio::test]
    async fn test_garbled_cursor_is_store_error() {
        let store = MemoryStore::new(10);
        let result = store.pages_with_after("e1", "abc").await;
        assert!(matches!(result, Err(TransportError::Store(_))));
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why std::sync::Mutex and not tokio's?
//    - The lock is never held across an .await
//    - A plain Mutex is cheaper and fine for short critical sections
//
// 2. What does "poisoned" mean?
//    - A Mutex is poisoned when a thread panicked while holding it
//    - lock() then returns Err; we turn that into a TransportError
//
// 3. Why clone documents out of the store?
//    - The guard must be dropped before the data leaves the function
//    - Returning owned copies keeps the lock short
// -----------------------------------------------------------------------------
