// src/scanner/links.rs
// =============================================================================
// Pulls the title and outbound links out of an HTML page.
//
// We use the `scraper` crate to parse the document and CSS selectors to find
// the <title> and every <a> element.
//
// Link policy, applied in this order:
// 1. discard hrefs that are missing or blank, exactly "/", contain a '#'
//    fragment marker, or contain "script:void("
// 2. sort and deduplicate
// 3. make every link absolute (see `decorate_links`)
//
// Normalization is plain string work rather than `Url::join`: a link starting
// with '/' is anchored at the crawl root whenever the current page already
// lives under that root, which keeps the whole crawl on one origin prefix.
// =============================================================================

use scraper::{Html, Selector};

/// Longest title kept for a page, in characters
pub const MAX_TITLE_CHARS: usize = 127;

const SCRIPT_VOID: &str = "script:void(";

/// Parses `html` and returns `(title, absolute links)`
///
/// `page_url` is the page's identity (query already stripped) and
/// `root_url` is the URL the whole crawl started from.
pub fn extract_page(html: &str, page_url: &str, root_url: &str) -> (String, Vec<String>) {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let links = filter_links(anchor_hrefs(&document));
    let targets = decorate_links(links, page_url, root_url);

    (title, targets)
}

/// Returns the text of <title>, truncated to `MAX_TITLE_CHARS` characters
pub fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    let title: String = document
        .select(&selector)
        .next()
        .map(|element| element.text().collect())
        .unwrap_or_default();

    truncate_title(title.trim())
}

pub fn truncate_title(title: &str) -> String {
    // Count characters, not bytes, so multi-byte titles are never split
    title.chars().take(MAX_TITLE_CHARS).collect()
}

// Every href of every <a>, sorted and without duplicates
fn anchor_hrefs(document: &Html) -> Vec<Option<String>> {
    let Ok(selector) = Selector::parse("a") else {
        return Vec::new();
    };

    let mut hrefs: Vec<Option<String>> = document
        .select(&selector)
        .map(|element| element.value().attr("href").map(str::to_string))
        .collect();

    hrefs.sort();
    hrefs.dedup();
    hrefs
}

/// Drops links that never lead to another page
///
/// `None` stands for an anchor without an href; an empty href is dropped
/// the same way, otherwise it would come back as the page itself plus "/".
pub fn filter_links(links: Vec<Option<String>>) -> Vec<String> {
    links
        .into_iter()
        .flatten()
        .filter(|link| !link.trim().is_empty())
        .filter(|link| link != "/")
        .filter(|link| !link.contains('#'))
        .filter(|link| !link.contains(SCRIPT_VOID))
        .collect()
}

/// Turns every link into an absolute URL
///
/// - links starting with "http" pass through untouched
/// - links starting with '/' are appended to `root_url` when `page_url`
///   is under the root, otherwise to `page_url`
/// - anything else is appended to `page_url` as a path segment
///
/// The result is sorted and free of duplicates.
pub fn decorate_links(links: Vec<String>, page_url: &str, root_url: &str) -> Vec<String> {
    let page = page_url.strip_suffix('/').unwrap_or(page_url);
    let root = root_url.strip_suffix('/').unwrap_or(root_url);
    let under_root = page.contains(root);

    let mut decorated: Vec<String> = links
        .into_iter()
        .map(|link| {
            if link.starts_with("http") {
                link
            } else if link.starts_with('/') {
                if under_root {
                    format!("{}{}", root, link)
                } else {
                    format!("{}{}", page, link)
                }
            } else {
                format!("{}/{}", page, link)
            }
        })
        .collect();

    decorated.sort();
    decorated.dedup();
    decorated
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Vec<Option<String>> for hrefs?
//    - attr("href") returns Option<&str>: an <a> may have no href at all
//    - .flatten() on an iterator of Options keeps only the Some values
//
// 2. Why strip_suffix instead of trim_end_matches?
//    - strip_suffix removes exactly one trailing '/', or nothing
//    - trim_end_matches would remove all of them
//
// 3. Counting characters, not bytes
//    - String::len() is in bytes; titles may hold multi-byte characters
//    - chars().take(n) never cuts a character in half
// -----------------------------------------------------------------------------
