// src/coordinator/handlers.rs
// =============================================================================
// Request handlers of the coordinator API.
//
//   GET  /              service identity
//   POST /exec          start a crawl, wait for it, answer with the first page
//   GET  /page          page through a crawl's results (after / before)
//   GET  /down, /exit   acknowledge, then shut the server down
//
// Bad input is answered with 422 and `{"errors": {...}}`; it never reaches
// the queue or the store.
// =============================================================================

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};
use url::Url;

use super::pagination;
use super::poller::{await_completion, PollPolicy};
use crate::error::{TransportError, ValidationError};
use crate::queue::{encode, ExecutionContext, QueueMessage, QueueSender};
use crate::scanner::PageSource;
use crate::store::PageStore;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PageStore>,
    pub queue: Arc<dyn QueueSender>,
    pub source: Arc<dyn PageSource>,
    pub block_size: usize,
    pub poll: PollPolicy,
    pub shutdown: Arc<Notify>,
}

#[derive(Debug, Serialize)]
pub struct Identity {
    pub service: &'static str,
    pub version: &'static str,
    pub message: &'static str,
}

/// Body of POST /exec; both fields are checked by hand for precise errors
#[derive(Debug, Default, Deserialize)]
pub struct ExecRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub limit: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub exid: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": self.fields })),
        )
            .into_response()
    }
}

fn error_response(status: StatusCode, errors: Value) -> Response {
    (status, Json(json!({ "errors": errors }))).into_response()
}

/// Checks the /exec body, returning the submitted url and the page limit
pub fn validate_exec(request: &ExecRequest) -> Result<(String, u64), ValidationError> {
    let url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ValidationError::field("url", "cannot be empty"))?;

    let limit = match &request.limit {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n.as_u64().ok_or(())),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().parse::<u64>().map_err(|_| ())),
        Some(_) => Some(Err(())),
    };

    match limit {
        None | Some(Ok(0)) => Err(ValidationError::field("limit", "cannot be empty")),
        Some(Err(())) => Err(ValidationError::field("limit", "must be an integer")),
        Some(Ok(limit)) => Ok((url.to_string(), limit)),
    }
}

/// Submitted urls may omit the scheme; plain http is assumed then
pub fn crawl_root(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

// Proves the root is reachable before anything gets queued
async fn check_reachable(source: &dyn PageSource, url: &str) -> Result<(), Response> {
    let unreachable = || error_response(StatusCode::BAD_REQUEST, json!({ "url": url }));

    if Url::parse(url).is_err() {
        return Err(unreachable());
    }

    match source.fetch(url).await {
        Ok(fetched) => {
            info!(%url, status = fetched.status, "[PROOF GET]");
            if fetched.status == 404 {
                return Err(error_response(StatusCode::NOT_FOUND, json!({ "url": url })));
            }
            Ok(())
        }
        Err(err) => {
            error!(%url, error = %err, "[PROOF GET] failed");
            Err(unreachable())
        }
    }
}

// Seeds the queue with the crawl's root message
async fn trigger(queue: &dyn QueueSender, ctx: &ExecutionContext) -> Result<String, TransportError> {
    let root = QueueMessage::root(ctx.clone());
    let wire = encode(&root.targets, &root.context)?;
    queue.send(wire).await
}

pub async fn identity() -> Json<Identity> {
    info!("[GET] identity");
    Json(Identity {
        service: "Woogle API",
        version: env!("CARGO_PKG_VERSION"),
        message: "Always better to woogle than google",
    })
}

pub async fn exec(State(state): State<AppState>, Json(request): Json<ExecRequest>) -> Response {
    info!(url = ?request.url, limit = ?request.limit, "[POST] execution requested");

    let (url, limit) = match validate_exec(&request) {
        Ok(valid) => valid,
        Err(err) => return err.into_response(),
    };

    let root_url = crawl_root(&url);
    if let Err(response) = check_reachable(state.source.as_ref(), &root_url).await {
        return response;
    }

    let ctx = ExecutionContext::start(&root_url, limit, state.block_size);

    // A lost root message is reported to the caller; the server keeps running
    if let Err(err) = trigger(state.queue.as_ref(), &ctx).await {
        error!(execution_id = %ctx.execution_id, error = %err, "root message not sent");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, json!(err.to_string()));
    }

    info!(
        execution_id = %ctx.execution_id,
        root_url = %ctx.root_url,
        limit,
        "[CRAWL] started"
    );

    if let Err(err) =
        await_completion(state.store.as_ref(), &ctx.execution_id, ctx.limit, state.poll).await
    {
        error!(execution_id = %ctx.execution_id, error = %err, "[MASTER POLLER] gave up");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, json!(err.to_string()));
    }

    match pagination::first(state.store.as_ref(), &ctx.execution_id).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => {
            error!(execution_id = %ctx.execution_id, error = %err, "first results page failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, json!(err.to_string()))
        }
    }
}

pub async fn page(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    // Empty parameters count as absent
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    let Some(exid) = present(query.exid) else {
        return ValidationError::field("exid", "cannot be empty").into_response();
    };
    info!(%exid, "[GET] results page requested");

    let result = match (present(query.after), present(query.before)) {
        (Some(after), _) => {
            info!(%exid, %after, "pagination request is AFTER");
            pagination::next(state.store.as_ref(), &exid, &after).await
        }
        (None, Some(before)) => {
            info!(%exid, %before, "pagination request is BEFORE");
            pagination::prev(state.store.as_ref(), &exid, &before).await
        }
        (None, None) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!("Either After and Before must be declared"),
            )
        }
    };

    match result {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => {
            error!(%exid, error = %err, "results page failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, json!(err.to_string()))
        }
    }
}

pub async fn shutdown(State(state): State<AppState>) -> StatusCode {
    info!("[GET] remote management route; shutting down");
    state.shutdown.notify_one();
    StatusCode::OK
}
