//! In-memory registry of batch runs.
//!
//! Every accepted batch gets one [`BatchHandle`]: the live run snapshot,
//! the cancellation token for its worker, and a broadcast channel feeding
//! SSE subscribers. [`ServerProgress`] is the bridge between the batch
//! driver's progress callbacks and the handle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use phonescout_batch::ProgressReporter;
use phonescout_shared::{BatchId, BatchRun, PhoneLookupResult};

/// Broadcast capacity per run. Subscribers that fall further behind than
/// this receive a `lagged` event instead of the missed payloads.
const EVENT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// BatchHandle
// ---------------------------------------------------------------------------

/// One registered run.
pub struct BatchHandle {
    /// Identifier handed out at registration; snapshots always carry it.
    pub id: BatchId,
    /// Trips the run's worker at its next suspension point.
    pub cancel: CancellationToken,
    run: RwLock<BatchRun>,
    events: broadcast::Sender<serde_json::Value>,
}

impl BatchHandle {
    fn new(run: BatchRun, cancel: CancellationToken) -> Self {
        Self {
            id: run.id,
            cancel,
            run: RwLock::new(run),
            events: broadcast::channel(EVENT_CAPACITY).0,
        }
    }

    /// Current state of the run.
    pub fn snapshot(&self) -> BatchRun {
        self.run.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Subscribe to the run's event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<serde_json::Value> {
        self.events.subscribe()
    }

    fn update<T>(&self, apply: impl FnOnce(&mut BatchRun) -> T) -> T {
        let mut run = self.run.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut run)
    }

    fn publish(&self, event: serde_json::Value) {
        // No subscribers is fine; the feed is best-effort.
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// BatchRegistry
// ---------------------------------------------------------------------------

/// Registry of every run started since the server came up.
#[derive(Default)]
pub struct BatchRegistry {
    runs: RwLock<HashMap<BatchId, Arc<BatchHandle>>>,
}

impl BatchRegistry {
    /// Register a run and hand back its handle.
    pub fn insert(&self, run: BatchRun, cancel: CancellationToken) -> Arc<BatchHandle> {
        let handle = Arc::new(BatchHandle::new(run, cancel));
        self.runs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle.id, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, id: &BatchId) -> Option<Arc<BatchHandle>> {
        self.runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

fn progress_event(run: &BatchRun) -> serde_json::Value {
    serde_json::json!({
        "type": "progress",
        "id": run.id,
        "completed": run.completed_count,
        "total": run.total,
        "percent": run.percent(),
    })
}

fn result_event(id: BatchId, result: &PhoneLookupResult) -> serde_json::Value {
    serde_json::json!({
        "type": "result",
        "id": id,
        "result": result,
    })
}

pub(crate) fn done_event(run: &BatchRun) -> serde_json::Value {
    serde_json::json!({
        "type": "done",
        "id": run.id,
        "status": run.status,
        "percent": run.percent(),
        "error": run.error,
        "report_path": run.report_path,
    })
}

// ---------------------------------------------------------------------------
// ServerProgress
// ---------------------------------------------------------------------------

/// Mirrors a worker's progress into its registry handle and fans events
/// out to SSE subscribers.
///
/// The worker builds a run of its own; the registered snapshot keeps the
/// id and source column handed out at registration, and only the fields
/// the worker owns are copied over.
pub struct ServerProgress {
    handle: Arc<BatchHandle>,
}

impl ServerProgress {
    pub fn new(handle: Arc<BatchHandle>) -> Self {
        Self { handle }
    }
}

impl ProgressReporter for ServerProgress {
    fn batch_started(&self, _run: &BatchRun) {
        let event = self.handle.update(|run| progress_event(run));
        self.handle.publish(event);
    }

    fn item_completed(&self, result: &PhoneLookupResult, _completed: usize, _total: usize) {
        let (progress, id) = self.handle.update(|run| {
            run.push_result(result.clone());
            (progress_event(run), run.id)
        });
        self.handle.publish(progress);
        self.handle.publish(result_event(id, result));
    }

    fn batch_finished(&self, run: &BatchRun) {
        let done = self.handle.update(|mirror| {
            mirror.status = run.status;
            mirror.completed_count = run.completed_count;
            mirror.error = run.error.clone();
            mirror.finished_at = run.finished_at;
            mirror.report_path = run.report_path.clone();
            done_event(mirror)
        });
        self.handle.publish(done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use phonescout_shared::BatchStatus;

    fn registered_run(total: usize) -> BatchRun {
        let mut run = BatchRun::new(total);
        run.source_column = Some("Phone Number".to_string());
        run
    }

    fn ok_result(phone: &str) -> PhoneLookupResult {
        PhoneLookupResult {
            phone: phone.to_string(),
            line_type: "CELL PHONE".to_string(),
            ..PhoneLookupResult::default()
        }
    }

    #[test]
    fn insert_then_get_returns_the_same_handle() {
        let registry = BatchRegistry::default();
        let handle = registry.insert(registered_run(3), CancellationToken::new());

        let found = registry.get(&handle.id).expect("registered run");
        assert_eq!(found.snapshot().total, 3);
        assert!(registry.get(&BatchId::new()).is_none());
    }

    #[test]
    fn progress_mirrors_items_and_publishes_events() {
        let registry = BatchRegistry::default();
        let handle = registry.insert(registered_run(2), CancellationToken::new());
        let mut rx = handle.subscribe();
        let progress = ServerProgress::new(Arc::clone(&handle));

        progress.batch_started(&BatchRun::new(2));
        progress.item_completed(&ok_result("5551234567"), 1, 2);

        let started = rx.try_recv().expect("started event");
        assert_eq!(started["type"], "progress");
        assert_eq!(started["completed"], 0);

        let ticked = rx.try_recv().expect("progress event");
        assert_eq!(ticked["completed"], 1);
        assert_eq!(ticked["percent"], 50);
        assert_eq!(ticked["id"], serde_json::json!(handle.id));

        let result = rx.try_recv().expect("result event");
        assert_eq!(result["type"], "result");
        assert_eq!(result["result"]["phone"], "5551234567");

        assert_eq!(handle.snapshot().completed_count, 1);
    }

    #[test]
    fn finish_keeps_the_registered_id_and_column() {
        let registry = BatchRegistry::default();
        let handle = registry.insert(registered_run(1), CancellationToken::new());
        let mut rx = handle.subscribe();
        let progress = ServerProgress::new(Arc::clone(&handle));

        // The worker's own run carries a different id.
        let mut worker_run = BatchRun::new(1);
        worker_run.push_result(ok_result("5551234567"));
        worker_run.complete(Some("/tmp/validated_numbers_20260825_120000.csv".into()));
        progress.item_completed(&ok_result("5551234567"), 1, 1);
        progress.batch_finished(&worker_run);

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.id, handle.id);
        assert_ne!(snapshot.id, worker_run.id);
        assert_eq!(snapshot.status, BatchStatus::Completed);
        assert_eq!(snapshot.source_column.as_deref(), Some("Phone Number"));
        assert!(snapshot.report_path.is_some());

        rx.try_recv().expect("progress event");
        rx.try_recv().expect("result event");
        let done = rx.try_recv().expect("done event");
        assert_eq!(done["type"], "done");
        assert_eq!(done["status"], "completed");
        assert_eq!(done["id"], serde_json::json!(handle.id));
    }

    #[test]
    fn done_event_carries_the_failure_cause() {
        let mut run = registered_run(4);
        run.push_result(ok_result("5551234567"));
        run.fail("batch cancelled after 1 of 4 items");

        let event = done_event(&run);
        assert_eq!(event["status"], "failed");
        assert_eq!(event["percent"], 25);
        assert_eq!(event["error"], "batch cancelled after 1 of 4 items");
    }
}
