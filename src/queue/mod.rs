// src/queue/mod.rs
// =============================================================================
// Messages that carry a crawl from one stateless worker invocation to the next.
//
// A crawl has no process that owns it. Everything a worker needs to know
// (which crawl, where it started, how big it may get, how deep the lineage
// already is) travels inside each message as an `ExecutionContext` value.
//
// Submodules:
// - codec: QueueMessage <-> wire format (string attributes + JSON body)
// - memory: in-process queue backed by a tokio channel
// =============================================================================

mod codec;
mod memory;

pub use codec::{decode, encode, WireMessage};
pub use memory::MemoryQueue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransportError;

/// Identity and budget of one crawl, copied into every message of its tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Stable id shared by every message and page of the crawl
    pub execution_id: String,
    /// URL the crawl started from
    pub root_url: String,
    /// Maximum number of pages to store
    pub limit: u64,
    /// Depth of this message's lineage; the root message is 1
    pub invocations: u64,
    /// Links per successor message
    pub block_size: usize,
}

impl ExecutionContext {
    /// Mints the context of a brand new crawl
    pub fn start(root_url: &str, limit: u64, block_size: usize) -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            root_url: root_url.to_string(),
            limit,
            invocations: 1,
            block_size: block_size.max(1),
        }
    }

    /// The context carried by every message this invocation emits
    pub fn successor(&self) -> Self {
        Self {
            invocations: self.invocations + 1,
            ..self.clone()
        }
    }
}

/// A batch of URLs to scan, plus the crawl they belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub targets: Vec<String>,
    pub context: ExecutionContext,
}

impl QueueMessage {
    /// The first message of a crawl: scan the root URL itself
    pub fn root(context: ExecutionContext) -> Self {
        Self {
            targets: vec![context.root_url.clone()],
            context,
        }
    }
}

#[async_trait]
pub trait QueueSender: Send + Sync {
    /// Enqueues one message and returns the queue's id for it
    async fn send(&self, message: WireMessage) -> Result<String, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_mints_unique_ids() {
        let a = ExecutionContext::start("http://example.com", 3, 10);
        let b = ExecutionContext::start("http://example.com", 3, 10);
        assert_ne!(a.execution_id, b.execution_id);
        assert_eq!(a.invocations, 1);
    }

    #[test]
    fn test_successor_only_bumps_invocations() {
        let ctx = ExecutionContext::start("http://example.com", 5, 2);
        let next = ctx.successor();
        assert_eq!(next.invocations, 2);
        assert_eq!(next.execution_id, ctx.execution_id);
        assert_eq!(next.root_url, ctx.root_url);
        assert_eq!(next.limit, ctx.limit);
        assert_eq!(next.block_size, ctx.block_size);
    }

    #[test]
    fn test_root_message_targets_root_url() {
        let ctx = ExecutionContext::start("http://example.com", 5, 2);
        let message = QueueMessage::root(ctx.clone());
        assert_eq!(message.targets, vec!["http://example.com"]);
        assert_eq!(message.context, ctx);
    }
}
