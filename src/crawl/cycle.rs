// src/crawl/cycle.rs
// =============================================================================
// One worker invocation: consume a message, scan, persist, fan out.
//
// Phases run strictly in order; the work inside a phase runs concurrently
// and is always awaited as a whole (fan-out, then fan-in):
//
//   start ──> invocations > ceiling ─────────────────> Halted
//     │
//     ├──> authorize ── denied ──────────────────────> Denied
//     ├──> no targets ───────────────────────────────> NoScans
//     ├──> scan every target (failures isolated)
//     ├──> save each eligible page (each save is gated)
//     ├──> authorize ── denied ──> Concluded (no fan-out)
//     └──> emit one successor message per block ────> Concluded
//
// A store or queue failure in any phase ends the cycle as Failed. That is a
// normal return value: the worker process keeps running.
// =============================================================================

use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::admission::{Admission, AdmissionController};
use super::plan::{harvest, plan_successors, Harvest, InvocationMeta};
use crate::error::TransportError;
use crate::queue::{decode, encode, QueueMessage, QueueSender, WireMessage};
use crate::scanner::{scan_page, PageSource};
use crate::store::PageStore;

/// Worker-side configuration
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Links per successor message
    pub block_size: usize,
    /// Deepest invocation a lineage may reach
    pub invoke_limit: u64,
    /// Politeness delay before each fetch
    pub scan_delay: Duration,
    /// Stamped on every saved page
    pub worker_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Decode,
    Authorize,
    Persist,
    Emit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Decode => "decoding the message",
            Phase::Authorize => "requesting authority to operate",
            Phase::Persist => "saving pages",
            Phase::Emit => "emitting successor messages",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("crawl cycle failed while {phase}: {source}")]
pub struct CycleError {
    pub phase: Phase,
    #[source]
    pub source: TransportError,
}

impl CycleError {
    fn new(phase: Phase, source: TransportError) -> Self {
        Self { phase, source }
    }
}

/// Counters of a cycle that ran to the end
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub scanned: usize,
    pub failed_scans: usize,
    pub saved: usize,
    pub skipped: usize,
    pub emitted: usize,
    /// The limit was reached before fan-out, so nothing was emitted
    pub fan_out_denied: bool,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// The lineage is deeper than the invocation ceiling
    Halted { invocations: u64, ceiling: u64 },
    /// The crawl had already reached its limit when the cycle started
    Denied,
    /// The message carried nothing to scan
    NoScans,
    Concluded(CycleReport),
    Failed(CycleError),
}

impl CycleOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, CycleOutcome::Failed(_))
    }

    pub fn summary(&self) -> String {
        match self {
            CycleOutcome::Halted { invocations, ceiling } => format!(
                "Halted: {} invocations exceeds limit of {}",
                invocations, ceiling
            ),
            CycleOutcome::Denied => "OK: Authority to operate denied.".to_string(),
            CycleOutcome::NoScans => "OK: No scans.".to_string(),
            CycleOutcome::Concluded(report) => format!(
                "OK: Normal end of job. scanned={} failed={} saved={} skipped={} emitted={}",
                report.scanned, report.failed_scans, report.saved, report.skipped, report.emitted
            ),
            CycleOutcome::Failed(err) => format!("Error: {}", err),
        }
    }
}

/// Runs crawl cycles; holds no state about any particular crawl
pub struct CrawlWorker {
    source: Arc<dyn PageSource>,
    queue: Arc<dyn QueueSender>,
    admission: AdmissionController,
    settings: WorkerSettings,
}

impl CrawlWorker {
    pub fn new(
        source: Arc<dyn PageSource>,
        store: Arc<dyn PageStore>,
        queue: Arc<dyn QueueSender>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            source,
            queue,
            admission: AdmissionController::new(store),
            settings,
        }
    }

    /// Decodes a wire message and runs one cycle for it
    pub async fn handle(&self, wire: &WireMessage) -> CycleOutcome {
        match decode(wire, self.settings.block_size) {
            Ok(message) => self.run_cycle(message).await,
            Err(err) => {
                let err = CycleError::new(Phase::Decode, err);
                error!(error = %err, "unreadable queue message");
                CycleOutcome::Failed(err)
            }
        }
    }

    pub async fn run_cycle(&self, message: QueueMessage) -> CycleOutcome {
        let execution_id = message.context.execution_id.clone();
        let invocations = message.context.invocations;

        let outcome = self.cycle(message).await;

        match &outcome {
            CycleOutcome::Failed(err) => {
                error!(%execution_id, invocations, error = %err, "cycle concluded with error")
            }
            other => info!(%execution_id, invocations, outcome = %other.summary(), "cycle concluded"),
        }
        outcome
    }

    async fn cycle(&self, message: QueueMessage) -> CycleOutcome {
        let QueueMessage { targets, context: ctx } = message;

        // Runaway fuse, independent of the page limit
        if ctx.invocations > self.settings.invoke_limit {
            warn!(
                execution_id = %ctx.execution_id,
                invocations = ctx.invocations,
                ceiling = self.settings.invoke_limit,
                "safety stop"
            );
            return CycleOutcome::Halted {
                invocations: ctx.invocations,
                ceiling: self.settings.invoke_limit,
            };
        }

        info!(
            execution_id = %ctx.execution_id,
            limit = ctx.limit,
            root_url = %ctx.root_url,
            targets = targets.len(),
            "cycle started"
        );

        match self.admission.authorize(&ctx).await {
            Ok(Admission::Granted) => {}
            Ok(Admission::Denied) => return CycleOutcome::Denied,
            Err(err) => return CycleOutcome::Failed(CycleError::new(Phase::Authorize, err)),
        }

        if targets.is_empty() {
            return CycleOutcome::NoScans;
        }

        // Scan: one task per target, failures stay with their own target
        let scans = join_all(targets.iter().map(|target| {
            scan_page(
                self.source.as_ref(),
                target,
                &ctx.root_url,
                self.settings.scan_delay,
            )
        }))
        .await;

        for err in scans.iter().filter_map(|scan| scan.as_ref().err()) {
            warn!(execution_id = %ctx.execution_id, error = %err, "scan failed");
        }

        let meta = InvocationMeta {
            worker_id: self.settings.worker_id.clone(),
            request_id: Uuid::new_v4().to_string(),
        };
        let Harvest {
            records,
            links,
            scanned,
            failed,
        } = harvest(&ctx, &meta, scans);

        let mut report = CycleReport {
            scanned,
            failed_scans: failed,
            ..CycleReport::default()
        };

        // Persist: every save is gated on its own
        let saves = join_all(
            records
                .into_iter()
                .map(|record| self.admission.admit_page(&ctx, record)),
        )
        .await;

        let mut persist_error = None;
        for save in saves {
            match save {
                Ok(Admission::Granted) => report.saved += 1,
                Ok(Admission::Denied) => report.skipped += 1,
                Err(err) => {
                    warn!(execution_id = %ctx.execution_id, error = %err, "page save failed");
                    persist_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = persist_error {
            return CycleOutcome::Failed(CycleError::new(Phase::Persist, err));
        }

        // The limit may have been reached meanwhile; don't wake workers for nothing
        match self.admission.authorize(&ctx).await {
            Ok(Admission::Granted) => {}
            Ok(Admission::Denied) => {
                report.fan_out_denied = true;
                return CycleOutcome::Concluded(report);
            }
            Err(err) => return CycleOutcome::Failed(CycleError::new(Phase::Authorize, err)),
        }

        let successors = plan_successors(&ctx, &links);
        let wires = match successors
            .iter()
            .map(|message| encode(&message.targets, &message.context))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(wires) => wires,
            Err(err) => return CycleOutcome::Failed(CycleError::new(Phase::Emit, err)),
        };

        let sends = join_all(wires.into_iter().map(|wire| self.queue.send(wire))).await;

        let mut emit_error = None;
        for send in sends {
            match send {
                Ok(_) => report.emitted += 1,
                Err(err) => {
                    warn!(execution_id = %ctx.execution_id, error = %err, "queue send failed");
                    emit_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = emit_error {
            return CycleOutcome::Failed(CycleError::new(Phase::Emit, err));
        }

        CycleOutcome::Concluded(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{ExecutionContext, MemoryQueue};
    use crate::scanner::fake::StaticSource;
    use crate::store::{MemoryStore, PageRecord, RawResults, StoreRef};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc::UnboundedReceiver;

    const ROOT: &str = "http://example.com";

    /// Store with fixed answers, recording what was written
    struct ScriptedStore {
        authorize: bool,
        fail_saves: bool,
        saved: Mutex<Vec<PageRecord>>,
    }

    impl ScriptedStore {
        fn new(authorize: bool, fail_saves: bool) -> Self {
            Self {
                authorize,
                fail_saves,
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageStore for ScriptedStore {
        async fn pending(&self, _exid: &str, _limit: u64) -> Result<bool, TransportError> {
            Ok(false)
        }

        async fn authorize(&self, _exid: &str, _limit: u64) -> Result<bool, TransportError> {
            Ok(self.authorize)
        }

        async fn save(
            &self,
            _exid: &str,
            _limit: u64,
            page: PageRecord,
        ) -> Result<Option<StoreRef>, TransportError> {
            if self.fail_saves {
                return Err(TransportError::Store("datastore unavailable".to_string()));
            }
            if !self.authorize {
                return Ok(None);
            }
            self.saved.lock().unwrap().push(page);
            Ok(Some(StoreRef {
                collection: "pages".to_string(),
                id: "1".to_string(),
            }))
        }

        async fn pages_by_exid(&self, _exid: &str) -> Result<RawResults, TransportError> {
            Ok(RawResults::default())
        }

        async fn pages_with_after(&self, _exid: &str, _after: &str) -> Result<RawResults, TransportError> {
            Ok(RawResults::default())
        }

        async fn pages_with_before(
            &self,
            _exid: &str,
            _before: &str,
        ) -> Result<RawResults, TransportError> {
            Ok(RawResults::default())
        }
    }

    fn settings() -> WorkerSettings {
        WorkerSettings {
            block_size: 2,
            invoke_limit: 5,
            scan_delay: Duration::ZERO,
            worker_id: "worker-test".to_string(),
        }
    }

    fn site() -> StaticSource {
        StaticSource::new()
            .page(
                "http://example.com",
                r#"<title>Home</title>
                   <a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>
                   <a href="/logo.png">logo</a>"#,
            )
            .page("http://example.com/a", "<title>A</title>")
            .broken("http://example.com/down")
    }

    fn worker(
        store: Arc<dyn PageStore>,
        source: StaticSource,
    ) -> (CrawlWorker, UnboundedReceiver<WireMessage>) {
        let (queue, receiver) = MemoryQueue::new();
        let worker = CrawlWorker::new(Arc::new(source), store, Arc::new(queue), settings());
        (worker, receiver)
    }

    fn message(targets: &[&str], limit: u64, invocations: u64) -> QueueMessage {
        let mut context = ExecutionContext::start(ROOT, limit, 2);
        context.invocations = invocations;
        QueueMessage {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            context,
        }
    }

    fn concluded(outcome: CycleOutcome) -> CycleReport {
        match outcome {
            CycleOutcome::Concluded(report) => report,
            other => panic!("expected a concluded cycle, got {:?}", other),
        }
    }

    fn drain(receiver: &mut UnboundedReceiver<WireMessage>) -> Vec<QueueMessage> {
        let mut messages = Vec::new();
        while let Ok(wire) = receiver.try_recv() {
            messages.push(decode(&wire, 2).unwrap());
        }
        messages
    }

    #[tokio::test]
    async fn test_halts_past_invocation_ceiling() {
        let store = Arc::new(MemoryStore::new(10));
        let (worker, mut receiver) = worker(store.clone(), site());
        let msg = message(&[ROOT], 10, 6);
        let exid = msg.context.execution_id.clone();

        let outcome = worker.run_cycle(msg).await;

        assert!(matches!(outcome, CycleOutcome::Halted { invocations: 6, ceiling: 5 }));
        assert_eq!(store.page_count(&exid).unwrap(), 0);
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_at_ceiling_still_runs() {
        let store = Arc::new(MemoryStore::new(10));
        let (worker, _receiver) = worker(store, site());
        let outcome = worker.run_cycle(message(&[ROOT], 10, 5)).await;
        assert!(matches!(outcome, CycleOutcome::Concluded(_)));
    }

    #[tokio::test]
    async fn test_denied_writes_and_emits_nothing() {
        let store = Arc::new(ScriptedStore::new(false, false));
        let (worker, mut receiver) = worker(store.clone(), site());

        let outcome = worker.run_cycle(message(&[ROOT], 10, 1)).await;

        assert!(!outcome.is_error());
        assert!(store.saved.lock().unwrap().is_empty());
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_full_cycle_saves_and_fans_out() {
        let store = Arc::new(MemoryStore::new(10));
        let (worker, mut receiver) = worker(store.clone(), site());
        let msg = message(&[ROOT], 10, 1);
        let exid = msg.context.execution_id.clone();

        let outcome = worker.run_cycle(msg).await;

        let report = concluded(outcome);
        assert_eq!(report.saved, 1);
        assert_eq!(report.emitted, 2);
        assert_eq!(store.page_count(&exid).unwrap(), 1);

        let successors = drain(&mut receiver);
        let targets: Vec<String> = successors.iter().flat_map(|m| m.targets.clone()).collect();
        assert_eq!(
            targets,
            vec!["http://example.com/a", "http://example.com/b", "http://example.com/c"]
        );
        for successor in &successors {
            assert_eq!(successor.context.invocations, 2);
            assert_eq!(successor.context.execution_id, exid);
            assert!(successor.targets.len() <= 2);
        }

        let saved = store.pages_by_exid(&exid).await.unwrap().data.unwrap();
        assert_eq!(saved[0].data.title, "Home");
        assert_eq!(saved[0].data.children, 4);
        assert_eq!(saved[0].data.log_id, "worker-test");
    }

    #[tokio::test]
    async fn test_limit_reached_skips_fan_out_without_error() {
        let store = Arc::new(MemoryStore::new(10));
        let (worker, mut receiver) = worker(store, site());

        let outcome = worker.run_cycle(message(&[ROOT], 1, 1)).await;

        let report = concluded(outcome);
        assert_eq!(report.saved, 1);
        assert!(report.fan_out_denied);
        assert_eq!(report.emitted, 0);
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_repeated_cycles_share_the_page_limit() {
        let store = Arc::new(MemoryStore::new(10));
        let (worker, mut receiver) = worker(store.clone(), site());
        let msg = message(&[ROOT], 1, 1);
        let exid = msg.context.execution_id.clone();

        let first = worker.run_cycle(msg.clone()).await;
        assert_eq!(concluded(first).saved, 1);

        // Later cycles of the same crawl see the stored page and stop at the gate
        for _ in 0..2 {
            let outcome = worker.run_cycle(msg.clone()).await;
            assert!(matches!(outcome, CycleOutcome::Denied));
        }

        assert_eq!(store.page_count(&exid).unwrap(), 1);
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_failed_scan_does_not_stop_siblings() {
        let store = Arc::new(MemoryStore::new(10));
        let (worker, _receiver) = worker(store, site());

        let outcome = worker
            .run_cycle(message(&["http://example.com/down", "http://example.com/a"], 10, 2))
            .await;

        let report = concluded(outcome);
        assert_eq!(report.failed_scans, 1);
        assert_eq!(report.scanned, 1);
        assert_eq!(report.saved, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_is_no_scans() {
        let store = Arc::new(MemoryStore::new(10));
        let (worker, _receiver) = worker(store, site());
        let outcome = worker.run_cycle(message(&[], 10, 1)).await;
        assert!(matches!(outcome, CycleOutcome::NoScans));
    }

    #[tokio::test]
    async fn test_queue_failure_concludes_with_error() {
        let store = Arc::new(MemoryStore::new(10));
        let (worker, receiver) = worker(store, site());
        drop(receiver);

        let outcome = worker.run_cycle(message(&[ROOT], 10, 1)).await;

        assert!(matches!(
            outcome,
            CycleOutcome::Failed(CycleError { phase: Phase::Emit, .. })
        ));
    }

    #[tokio::test]
    async fn test_store_failure_concludes_with_error() {
        let store = Arc::new(ScriptedStore::new(true, true));
        let (worker, mut receiver) = worker(store, site());

        let outcome = worker.run_cycle(message(&[ROOT], 10, 1)).await;

        assert!(matches!(
            outcome,
            CycleOutcome::Failed(CycleError { phase: Phase::Persist, .. })
        ));
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_message_is_decode_failure() {
        let store = Arc::new(MemoryStore::new(10));
        let (worker, _receiver) = worker(store, site());
        let wire: WireMessage = serde_json::from_str(r#"{"MessageBody": "{oops"}"#).unwrap();

        let outcome = worker.handle(&wire).await;

        assert!(matches!(
            outcome,
            CycleOutcome::Failed(CycleError { phase: Phase::Decode, .. })
        ));
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is join_all?
//    - It takes many futures and waits for all of them
//    - The futures make progress concurrently on the same task
//    - Results come back in the same order as the inputs
//
// 2. Why return CycleOutcome instead of Result?
//    - Most endings (halted, denied, nothing to scan) are normal
//    - Only Failed carries an error, and even that does not stop the worker
//
// 3. Why Arc<dyn PageStore> and not a concrete type?
//    - Tests swap in a scripted store without touching the cycle code
// -----------------------------------------------------------------------------
