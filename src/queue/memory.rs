// src/queue/memory.rs
// =============================================================================
// In-process queue: a tokio channel whose receiving half feeds the local
// worker pump (see crawl::worker).
//
// Sending never blocks. It only fails once the pump has stopped and dropped
// the receiver.
// =============================================================================

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use super::{QueueSender, WireMessage};
use crate::error::TransportError;

#[derive(Clone)]
pub struct MemoryQueue {
    sender: UnboundedSender<WireMessage>,
}

impl MemoryQueue {
    /// Creates the queue and hands back its consuming end
    pub fn new() -> (Self, UnboundedReceiver<WireMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl QueueSender for MemoryQueue {
    async fn send(&self, message: WireMessage) -> Result<String, TransportError> {
        self.sender
            .send(message)
            .map_err(|_| TransportError::Queue("local queue consumer has stopped".to_string()))?;
        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{encode, ExecutionContext};

    #[tokio::test]
    async fn test_sent_message_is_received() {
        let (queue, mut receiver) = MemoryQueue::new();
        let ctx = ExecutionContext::start("http://example.com", 2, 5);
        let wire = encode(&["http://example.com".to_string()], &ctx).unwrap();

        let id = queue.send(wire.clone()).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(receiver.recv().await, Some(wire));
    }

    #[tokio::test]
    async fn test_send_fails_once_consumer_dropped() {
        let (queue, receiver) = MemoryQueue::new();
        drop(receiver);
        let ctx = ExecutionContext::start("http://example.com", 2, 5);
        let wire = encode(&[], &ctx).unwrap();
        assert!(matches!(queue.send(wire).await, Err(TransportError::Queue(_))));
    }
}
