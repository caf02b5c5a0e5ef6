// src/crawl/mod.rs
// =============================================================================
// The Crawl Cycle Orchestrator and its helpers.
//
// Submodules:
// - admission: the soft page-limit gate
// - plan: pure functions turning scans into records and successor messages
// - cycle: one worker invocation, start to finish
// - worker: the local pump running one cycle per queued message
// =============================================================================

mod admission;
mod cycle;
mod plan;
mod worker;

pub use cycle::{CrawlWorker, WorkerSettings};
pub use worker::pump;
