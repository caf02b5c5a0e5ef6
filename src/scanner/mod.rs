// src/scanner/mod.rs
// =============================================================================
// The Link Extractor: fetches one page and reports its title and links.
//
// Submodules:
// - source: the PageSource seam and its reqwest implementation
// - links: title extraction plus link filtering and normalization policy
// - scan: the per-URL scan operation the crawl cycle fans out over
// =============================================================================

mod links;
mod scan;
mod source;

pub use scan::{scan_page, ScanResult};
pub use source::{HttpSource, PageSource};

#[cfg(test)]
pub(crate) use source::fake;
