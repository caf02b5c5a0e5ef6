// src/coordinator/mod.rs
// =============================================================================
// The Execution Coordinator: the HTTP front door of a crawl.
//
// Submodules:
// - handlers: the API endpoints and their input checks
// - routes: route table, middleware and server lifecycle
// - poller: waiting for a crawl to reach its page limit
// - pagination: turning store cursors into client tokens
// =============================================================================

mod handlers;
mod pagination;
mod poller;
mod routes;

pub use handlers::AppState;
pub use poller::PollPolicy;
pub use routes::serve;
