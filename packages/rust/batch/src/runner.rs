//! Sequential batch driver over the single-lookup engine.
//!
//! One item at a time, a fixed delay between items, no parallel fan-out:
//! the target page is a shared external resource and concurrent sessions
//! trip its anti-automation defenses. Item failures never stop the run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use phonescout_lookup::PhoneLookup;
use phonescout_shared::{BatchOptions, BatchRun, PhoneLookupResult};

/// Progress callbacks for batch consumers (CLI bar, server event stream).
pub trait ProgressReporter: Send + Sync {
    /// Called once before the first item.
    fn batch_started(&self, run: &BatchRun);
    /// Called after each item with the fresh result and updated counts.
    fn item_completed(&self, result: &PhoneLookupResult, completed: usize, total: usize);
    /// Called once when the run reaches a terminal status.
    fn batch_finished(&self, run: &BatchRun);
}

/// No-op reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn batch_started(&self, _run: &BatchRun) {}
    fn item_completed(&self, _result: &PhoneLookupResult, _completed: usize, _total: usize) {}
    fn batch_finished(&self, _run: &BatchRun) {}
}

// ---------------------------------------------------------------------------
// run_batch
// ---------------------------------------------------------------------------

/// Process `phones` in order, one lookup per item, and persist the results
/// as a timestamped CSV report.
///
/// Always returns a run holding exactly one result per input, in input
/// order, unless cancelled partway; a cancelled run keeps the results
/// gathered so far and reports `failed`.
#[instrument(skip_all, fields(total = phones.len()))]
pub async fn run_batch(
    lookup: Arc<dyn PhoneLookup>,
    phones: Vec<String>,
    options: &BatchOptions,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> BatchRun {
    let total = phones.len();
    let mut run = BatchRun::new(total);
    progress.batch_started(&run);
    info!(total, "starting batch");

    for (index, phone) in phones.into_iter().enumerate() {
        if cancel.is_cancelled() {
            run.fail(format!(
                "batch cancelled after {} of {} items",
                run.completed_count, total
            ));
            warn!(completed = run.completed_count, total, "batch cancelled");
            progress.batch_finished(&run);
            return run;
        }

        let result = process_item(&lookup, phone, cancel).await;
        let completed = run.completed_count + 1;
        progress.item_completed(&result, completed, total);
        run.push_result(result);

        // Fixed pacing between items. A rate limit against the target page,
        // not a throughput knob.
        if index + 1 < total && !options.rate_limit.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(options.rate_limit) => {}
            }
        }
    }

    match phonescout_report::write_report(&options.output_dir, &run.results) {
        Ok(path) => {
            info!(completed = run.completed_count, path = %path.display(), "batch completed");
            run.complete(Some(path));
        }
        Err(e) => {
            warn!(error = %e, "batch finished but the report could not be written");
            run.fail(format!("failed to write report: {e}"));
        }
    }

    progress.batch_finished(&run);
    run
}

/// Run one item inside its own task so a panicking lookup cannot take the
/// whole batch down. Blank values short-circuit without touching the engine.
async fn process_item(
    lookup: &Arc<dyn PhoneLookup>,
    phone: String,
    cancel: &CancellationToken,
) -> PhoneLookupResult {
    if phone.trim().is_empty() {
        return PhoneLookupResult::empty_input(&phone);
    }

    let task_lookup = Arc::clone(lookup);
    let task_cancel = cancel.clone();
    let task_phone = phone.clone();
    let handle = tokio::spawn(async move { task_lookup.lookup(&task_phone, &task_cancel).await });

    match handle.await {
        Ok(result) => result,
        Err(join_error) => {
            warn!(error = %join_error, phone = %phone, "lookup task panicked");
            PhoneLookupResult::failure(&phone, format!("lookup panicked: {join_error}"))
        }
    }
}
