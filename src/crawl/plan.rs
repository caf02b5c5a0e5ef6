// src/crawl/plan.rs
// =============================================================================
// The pure half of a crawl cycle.
//
// Nothing in this file touches the network, the store or the queue:
// - `harvest` turns scan results into page records plus the invocation's
//   link batch
// - `plan_successors` filters, deduplicates and chunks the link batch into
//   the messages the next generation of workers will receive
//
// The cycle shell (cycle.rs) performs the side effects around these.
// =============================================================================

use std::collections::HashSet;

use crate::error::ScanError;
use crate::queue::{ExecutionContext, QueueMessage};
use crate::scanner::ScanResult;
use crate::store::PageRecord;

/// Substrings that mark a link as not worth crawling: media, documents and
/// feeds, leftover markup, non-HTTP schemes, fragments and video players.
const SKIPPED_PATTERNS: &[&str] = &[
    ".atom", ".gif", ".jpeg", ".jpg", ".mp3", ".mp4", ".ogg", ".pdf", ".png", ".rss", ".txt",
    ".wmv", ".xml", "</a", "<a", "#", "javascript:", "mailto:", "tel:", "watch?",
];

/// Diagnostic identity of the worker invocation writing pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationMeta {
    pub worker_id: String,
    pub request_id: String,
}

/// Everything one invocation's scans produced
#[derive(Debug, Default)]
pub struct Harvest {
    /// Pages eligible for saving
    pub records: Vec<PageRecord>,
    /// Discovered links, in discovery order, without duplicates
    pub links: Vec<String>,
    pub scanned: usize,
    pub failed: usize,
}

/// A title that belongs to an error page rather than real content
pub fn is_placeholder(title: &str) -> bool {
    title.contains("404")
}

/// Collects records and links from the scans of one invocation
///
/// Failed scans are counted and otherwise ignored.
pub fn harvest(
    ctx: &ExecutionContext,
    meta: &InvocationMeta,
    results: Vec<Result<ScanResult, ScanError>>,
) -> Harvest {
    let mut harvest = Harvest::default();
    let mut seen = HashSet::new();

    for result in results {
        let scan = match result {
            Ok(scan) => scan,
            Err(_) => {
                harvest.failed += 1;
                continue;
            }
        };
        harvest.scanned += 1;

        for link in &scan.targets {
            if seen.insert(link.clone()) {
                harvest.links.push(link.clone());
            }
        }

        if !scan.title.is_empty() && !is_placeholder(&scan.title) {
            harvest.records.push(PageRecord {
                children: scan.targets.len(),
                exid: ctx.execution_id.clone(),
                log_id: meta.worker_id.clone(),
                request_id: meta.request_id.clone(),
                title: scan.title,
                url: scan.url,
            });
        }
    }

    harvest
}

/// Whether a discovered link should be handed to another worker
pub fn is_followable(link: &str) -> bool {
    let lower = link.to_lowercase();
    !SKIPPED_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Followable links, first occurrence kept, in original order
pub fn follow_list(links: &[String]) -> Vec<String> {
    let mut seen: HashSet<&String> = HashSet::new();
    links
        .iter()
        .filter(|link| is_followable(link))
        .filter(|link| seen.insert(*link))
        .cloned()
        .collect()
}

/// Builds the successor messages for a link batch
///
/// Every block of `ctx.block_size` links becomes one message whose context
/// is one invocation deeper than `ctx`.
pub fn plan_successors(ctx: &ExecutionContext, links: &[String]) -> Vec<QueueMessage> {
    let next = ctx.successor();
    follow_list(links)
        .chunks(ctx.block_size.max(1))
        .map(|block| QueueMessage {
            targets: block.to_vec(),
            context: next.clone(),
        })
        .collect()
}
