// src/crawl/worker.rs
// =============================================================================
// The local worker pump.
//
// In a deployment every queue message triggers its own short-lived worker.
// Locally we get the same shape from one loop: each message taken off the
// in-memory queue is handed to a freshly spawned task that runs exactly one
// cycle and then ends. No task shares crawl state with another; the only
// thing they share is the (stateless) worker and the store behind it.
// =============================================================================

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use super::cycle::CrawlWorker;
use crate::queue::WireMessage;

/// Consumes the queue until every sender is gone
pub async fn pump(worker: Arc<CrawlWorker>, mut receiver: UnboundedReceiver<WireMessage>) {
    info!("worker pump started");

    // Process messages until the queue closes
    while let Some(wire) = receiver.recv().await {
        debug!(body = %wire.body, "queue message received");

        let worker = Arc::clone(&worker);
        tokio::spawn(async move {
            // Outcomes are logged by the cycle itself; there is no redelivery
            if worker.handle(&wire).await.is_error() {
                warn!(body = %wire.body, "message dropped after a failed cycle");
            }
        });
    }

    info!("queue closed, worker pump stopped");
}
