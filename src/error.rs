// src/error.rs
// =============================================================================
// Typed errors shared by the worker and the coordinator.
//
// Failures fall into a few families:
// - ScanError: one URL could not be fetched. Isolated to that URL.
// - TransportError: a queue send or store call failed.
// - ValidationError: bad client input, always answered with 422.
// - PollError: the crawl did not finish inside the retry budget.
//
// Admission denial is deliberately absent: it is an ordinary answer
// (`Admission::Denied`), not an error.
// =============================================================================

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Why fetching a single page failed.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The request did not complete in time
    #[error("request timed out: {url}")]
    Timeout { url: String },

    /// DNS or TCP level failure
    #[error("connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    /// Any other transport failure (TLS, redirects, body read)
    #[error("request failed for {url}: {message}")]
    Request { url: String, message: String },

    /// The server answered with a status that is neither 2xx nor 4xx
    #[error("HTTP {status} from {url}")]
    ServerStatus { url: String, status: u16 },
}

/// A queue or store call failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("queue error: {0}")]
    Queue(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("message codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// The completion poller ran out of attempts.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("crawl still pending after {attempts} attempts")]
    Timeout { attempts: u32 },
}

/// Client input problems, keyed by field name.
///
/// Rendered as `{"errors": {"<field>": "<message>"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn field(name: &str, message: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.to_string(), message.to_string());
        Self { fields }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, message)| format!("{} {}", field, message))
            .collect();
        write!(f, "invalid request: {}", parts.join(", "))
    }
}

impl std::error::Error for ValidationError {}
