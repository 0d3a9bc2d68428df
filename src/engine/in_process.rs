//! # In-Process Batch Engine
//!
//! Runs registered work items inside the current process, either
//! progressively (a bounded number of items per [`process_cycle`] call, the
//! way a progress-polling front end drives a long batch) or concurrently on
//! tokio's blocking pool.
//!
//! ## Failure Semantics
//!
//! - Every failing item produces exactly one [`WorkItemFailure`] on the
//!   failure channel returned by [`failures`].
//! - `continue_on_failure`: the remaining items still run.
//! - `abort_batch`: the remaining pending items of that batch are marked
//!   skipped as soon as the failure is recorded. Items already running in
//!   concurrent mode finish normally.
//!
//! Batch state is kept until [`take_finished_batches`] drains it.
//!
//! [`process_cycle`]: InProcessBatchEngine::process_cycle
//! [`failures`]: InProcessBatchEngine::failures
//! [`take_finished_batches`]: InProcessBatchEngine::take_finished_batches

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{BatchDefinition, ExecutionEngine};
use crate::config::{EngineConfig, ExecutionOrder, FailurePolicy};
use crate::constants::WorkItemStatus;
use crate::dispatch::work_item::{BatchId, WorkItem};
use crate::error::{EngineError, InvocationError};
use crate::logging::log_error;

/// A work item failure as reported on the engine's failure channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemFailure {
    pub batch_id: BatchId,
    pub chunk_index: usize,
    pub service: String,
    pub method: String,
    /// Classification of the error (`invocation`, `method_not_found`, ...)
    pub error_kind: String,
    pub message: String,
    /// The service's own error when the method itself failed
    pub invocation: Option<InvocationError>,
    pub failed_at: DateTime<Utc>,
}

/// Progress of one batch, suitable for an operator-facing display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub batch_id: BatchId,
    pub title: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
    pub message: String,
    pub finished: bool,
}

impl BatchProgress {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Outcome of one progressive cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub remaining: usize,
}

/// Totals for a full run of the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub cycles: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.succeeded += report.succeeded;
        self.failed += report.failed;
        self.skipped += report.skipped;
    }
}

#[derive(Debug)]
struct BatchState {
    title: String,
    init_message: String,
    progress_message: String,
    error_message: String,
    chunk_sizes: Vec<usize>,
    statuses: Vec<WorkItemStatus>,
    aborted: bool,
}

impl BatchState {
    fn set_status(&mut self, chunk_index: usize, status: WorkItemStatus) {
        if let Some(slot) = self.statuses.get_mut(chunk_index) {
            *slot = status;
        }
    }

    fn is_finished(&self) -> bool {
        self.statuses.iter().all(|status| status.is_terminal())
    }

    fn skip_pending(&mut self) {
        for status in &mut self.statuses {
            if *status == WorkItemStatus::Pending {
                *status = WorkItemStatus::Skipped;
            }
        }
    }

    fn count(&self, status: WorkItemStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }

    fn progress(&self, batch_id: BatchId) -> BatchProgress {
        let total = self.statuses.len();
        let succeeded = self.count(WorkItemStatus::Succeeded);
        let failed = self.count(WorkItemStatus::Failed);
        let skipped = self.count(WorkItemStatus::Skipped);
        let processed = succeeded + failed + skipped;
        let finished = self.is_finished();

        let message = if failed > 0 && finished {
            self.error_message.clone()
        } else if processed == 0 && total > 0 {
            self.init_message.clone()
        } else {
            format!("{} ({processed} of {total})", self.progress_message)
        };

        BatchProgress {
            batch_id,
            title: self.title.clone(),
            total,
            succeeded,
            failed,
            skipped,
            pending: total - processed,
            message,
            finished,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Succeeded,
    Failed,
}

/// Work-item engine that lives in the dispatching process
pub struct InProcessBatchEngine {
    config: EngineConfig,
    queue: Mutex<VecDeque<WorkItem>>,
    batches: Mutex<HashMap<BatchId, BatchState>>,
    failure_tx: Sender<WorkItemFailure>,
    failure_rx: Receiver<WorkItemFailure>,
}

impl InProcessBatchEngine {
    pub fn new(config: EngineConfig) -> Self {
        let (failure_tx, failure_rx) = channel::unbounded();
        Self {
            config,
            queue: Mutex::new(VecDeque::new()),
            batches: Mutex::new(HashMap::new()),
            failure_tx,
            failure_rx,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receiving end of the per-item failure channel
    pub fn failures(&self) -> Receiver<WorkItemFailure> {
        self.failure_rx.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Chunk sizes of a batch in registration order
    pub fn registered_chunk_sizes(&self, batch_id: BatchId) -> Option<Vec<usize>> {
        self.batches
            .lock()
            .get(&batch_id)
            .map(|state| state.chunk_sizes.clone())
    }

    pub fn progress(&self, batch_id: BatchId) -> Option<BatchProgress> {
        self.batches
            .lock()
            .get(&batch_id)
            .map(|state| state.progress(batch_id))
    }

    pub fn batch_ids(&self) -> Vec<BatchId> {
        self.batches.lock().keys().copied().collect()
    }

    /// Progress summaries of every batch with no pending items left.
    pub fn finished_batches(&self) -> Vec<BatchProgress> {
        self.batches
            .lock()
            .iter()
            .map(|(batch_id, state)| state.progress(*batch_id))
            .filter(|progress| progress.finished)
            .collect()
    }

    /// Remove every finished batch and return its final progress.
    ///
    /// Queued items that still belong to a drained batch (the skipped tail of
    /// an aborted batch) are dropped with it.
    pub fn take_finished_batches(&self) -> Vec<BatchProgress> {
        let drained: HashMap<BatchId, BatchProgress> = {
            let mut batches = self.batches.lock();
            let finished: Vec<BatchId> = batches
                .iter()
                .filter(|(_, state)| state.is_finished())
                .map(|(batch_id, _)| *batch_id)
                .collect();
            finished
                .into_iter()
                .filter_map(|batch_id| {
                    batches
                        .remove(&batch_id)
                        .map(|state| (batch_id, state.progress(batch_id)))
                })
                .collect()
        };

        if !drained.is_empty() {
            self.queue
                .lock()
                .retain(|item| !drained.contains_key(&item.batch_id()));
            debug!(batches = drained.len(), "Drained finished batches");
        }

        drained.into_values().collect()
    }

    /// Run up to `items_per_cycle` pending items.
    pub fn process_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        while report.executed < self.config.items_per_cycle {
            let (item, skipped) = self.next_item();
            report.skipped += skipped;
            let Some(item) = item else {
                break;
            };

            report.executed += 1;
            match self.execute_item(item) {
                ItemOutcome::Succeeded => report.succeeded += 1,
                ItemOutcome::Failed => report.failed += 1,
            }
        }

        report.remaining = self.pending_count();
        debug!(
            executed = report.executed,
            failed = report.failed,
            remaining = report.remaining,
            "Processed engine cycle"
        );
        report
    }

    /// Drive progressive cycles until nothing is pending.
    pub fn run_to_completion(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        loop {
            let report = self.process_cycle();
            if report.executed == 0 && report.skipped == 0 {
                break;
            }
            summary.absorb(&report);
        }

        info!(
            cycles = summary.cycles,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Engine run completed"
        );
        summary
    }

    /// Run every pending item on the blocking pool, at most
    /// `max_concurrent_items` at a time.
    pub async fn run_concurrently(self: &Arc<Self>) -> Result<RunSummary, EngineError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_items));
        let mut join_set = JoinSet::new();
        let mut summary = RunSummary {
            cycles: 1,
            ..RunSummary::default()
        };

        loop {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| EngineError::WorkerFailed(e.to_string()))?;

            let (item, skipped) = self.next_item();
            summary.skipped += skipped;
            let Some(item) = item else {
                break;
            };

            let engine = Arc::clone(self);
            join_set.spawn_blocking(move || {
                let outcome = engine.execute_item(item);
                drop(permit);
                outcome
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined.map_err(|e| EngineError::WorkerFailed(e.to_string()))? {
                ItemOutcome::Succeeded => summary.succeeded += 1,
                ItemOutcome::Failed => summary.failed += 1,
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Concurrent engine run completed"
        );
        Ok(summary)
    }

    /// Pop the next runnable item, skipping items of aborted or drained batches.
    /// Returns the item (if any) and how many items were skipped on the way.
    fn next_item(&self) -> (Option<WorkItem>, usize) {
        let mut skipped = 0;
        loop {
            let item = {
                let mut queue = self.queue.lock();
                match self.config.execution_order {
                    ExecutionOrder::Registration => queue.pop_front(),
                    ExecutionOrder::Reverse => queue.pop_back(),
                }
            };
            let Some(item) = item else {
                return (None, skipped);
            };

            let mut batches = self.batches.lock();
            match batches.get_mut(&item.batch_id()) {
                Some(state) if state.aborted => {
                    state.set_status(item.chunk_index(), WorkItemStatus::Skipped);
                    skipped += 1;
                }
                Some(state) => {
                    state.set_status(item.chunk_index(), WorkItemStatus::Running);
                    return (Some(item), skipped);
                }
                None => skipped += 1,
            }
        }
    }

    fn execute_item(&self, item: WorkItem) -> ItemOutcome {
        let batch_id = item.batch_id();
        let chunk_index = item.chunk_index();

        let (status, outcome) = match item.execute() {
            Ok(()) => (WorkItemStatus::Succeeded, ItemOutcome::Succeeded),
            Err(error) => {
                let failure = WorkItemFailure {
                    batch_id,
                    chunk_index,
                    service: item.service_name().to_string(),
                    method: item.method().to_string(),
                    error_kind: error.kind().to_string(),
                    message: error.to_string(),
                    invocation: error.as_invocation().cloned(),
                    failed_at: Utc::now(),
                };
                log_error(
                    "InProcessBatchEngine",
                    "execute_work_item",
                    &failure.message,
                    Some(&format!("batch {batch_id} chunk {chunk_index}")),
                );
                if self.failure_tx.send(failure).is_err() {
                    warn!(%batch_id, chunk_index, "Failure channel closed; failure not delivered");
                }
                (WorkItemStatus::Failed, ItemOutcome::Failed)
            }
        };

        if let Some(state) = self.batches.lock().get_mut(&batch_id) {
            state.set_status(chunk_index, status);
            if status == WorkItemStatus::Failed
                && self.config.failure_policy == FailurePolicy::AbortBatch
            {
                state.aborted = true;
                state.skip_pending();
            }
        }

        outcome
    }
}

impl ExecutionEngine for InProcessBatchEngine {
    fn register_batch(&self, batch: BatchDefinition) -> Result<BatchId, EngineError> {
        let batch_id = batch.batch_id;
        let mut batches = self.batches.lock();
        if batches.contains_key(&batch_id) {
            return Err(EngineError::RegistrationRejected(format!(
                "batch {batch_id} is already registered"
            )));
        }

        let chunk_sizes: Vec<usize> = batch.operations.iter().map(|op| op.chunk().len()).collect();
        batches.insert(
            batch_id,
            BatchState {
                title: batch.title,
                init_message: batch.init_message,
                progress_message: batch.progress_message,
                error_message: batch.error_message,
                statuses: vec![WorkItemStatus::Pending; chunk_sizes.len()],
                chunk_sizes,
                aborted: false,
            },
        );
        drop(batches);

        let operation_count = batch.operations.len();
        self.queue.lock().extend(batch.operations);

        info!(
            %batch_id,
            operations = operation_count,
            "Registered batch"
        );
        Ok(batch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{split, ExecutionContext, WorkItemRunner};
    use crate::engine::BatchBuilder;
    use crate::logging::TracingDispatchLogger;
    use crate::registry::{DispatchTarget, MetadataRegistry, ReflectionAdapter};
    use serde_json::{json, Value};

    /// Sums each chunk; refuses any chunk containing a negative number.
    struct SumService;

    impl DispatchTarget for SumService {
        fn service_name(&self) -> &str {
            "SumService"
        }

        fn supported_methods(&self) -> Vec<&str> {
            vec!["sum"]
        }

        fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, InvocationError> {
            let items = args[0].as_array().cloned().unwrap_or_default();
            let numbers: Vec<i64> = items.iter().filter_map(Value::as_i64).collect();
            if numbers.iter().any(|n| *n < 0) {
                return Err(InvocationError::new("SumService", method, "negative input"));
            }
            Ok(json!(numbers.iter().sum::<i64>()))
        }
    }

    fn register(
        engine: &InProcessBatchEngine,
        items: Vec<Value>,
        chunk_size: i64,
    ) -> (BatchId, Arc<ExecutionContext>) {
        let adapter = Arc::new(ReflectionAdapter::new(Arc::new(MetadataRegistry::new())));
        let runner = Arc::new(WorkItemRunner::new(adapter, Arc::new(TracingDispatchLogger)));
        let service: Arc<dyn DispatchTarget> = Arc::new(SumService);
        let chunks = split(items, chunk_size).unwrap();

        let batch_id = BatchId::new();
        let context = Arc::new(ExecutionContext::new(batch_id, "sum", chunks.len()));
        let mut builder = BatchBuilder::new(batch_id).title("Sums");
        for chunk in chunks {
            builder.add_operation(WorkItem::new(
                batch_id,
                Arc::clone(&service),
                "sum",
                chunk,
                Arc::new(Vec::new()),
                Arc::clone(&runner),
                Arc::clone(&context),
            ));
        }
        engine.register_batch(builder.build()).unwrap();
        (batch_id, context)
    }

    fn numbers(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| json!(v)).collect()
    }

    #[test]
    fn test_progressive_cycles_report_progress() {
        let engine = InProcessBatchEngine::new(EngineConfig::default());
        let (batch_id, context) = register(&engine, numbers(&[1, 2, 3, 4, 5]), 2);

        let progress = engine.progress(batch_id).unwrap();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.message, "Initializing batch process...");
        assert_eq!(progress.title, "Sums");

        let report = engine.process_cycle();
        assert_eq!(report.executed, 1);
        assert_eq!(report.remaining, 2);
        assert_eq!(
            engine.progress(batch_id).unwrap().message,
            "Processing batch... (1 of 3)"
        );

        let summary = engine.run_to_completion();
        assert_eq!(summary.succeeded, 2);
        assert!(engine.is_idle());
        assert!(context.is_complete());

        let sums: Vec<Value> = context
            .results_in_chunk_order()
            .into_iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(sums, vec![json!(3), json!(7), json!(5)]);
        assert_eq!(engine.finished_batches().len(), 1);
    }

    #[test]
    fn test_registration_order_is_kept() {
        let engine = InProcessBatchEngine::new(EngineConfig::default());
        let (batch_id, _) = register(&engine, numbers(&[1; 25]), 10);
        assert_eq!(engine.registered_chunk_sizes(batch_id), Some(vec![10, 10, 5]));
        assert_eq!(engine.pending_count(), 3);
    }

    #[test]
    fn test_continue_on_failure_runs_remaining_items() {
        let engine = InProcessBatchEngine::new(EngineConfig::default());
        let failures = engine.failures();
        let (batch_id, context) = register(&engine, numbers(&[1, 2, -3, 4, 5, 6]), 2);

        let summary = engine.run_to_completion();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(context.completed_count(), 2);

        let received: Vec<WorkItemFailure> = failures.try_iter().collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].chunk_index, 1);
        assert_eq!(received[0].error_kind, "invocation");
        assert_eq!(
            received[0].invocation.as_ref().map(|e| e.message.as_str()),
            Some("negative input")
        );

        let progress = engine.progress(batch_id).unwrap();
        assert!(progress.finished);
        assert_eq!(progress.message, "Batch processing encountered an error.");
    }

    #[test]
    fn test_abort_batch_skips_remaining_items() {
        let config = EngineConfig {
            failure_policy: FailurePolicy::AbortBatch,
            ..EngineConfig::default()
        };
        let engine = InProcessBatchEngine::new(config);
        let (batch_id, context) = register(&engine, numbers(&[-1, 2, 3, 4]), 1);

        let summary = engine.run_to_completion();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(context.completed_count(), 0);

        let progress = engine.progress(batch_id).unwrap();
        assert_eq!(progress.skipped, 3);
        assert!(progress.finished);
    }

    #[test]
    fn test_abort_marks_pending_items_skipped_immediately() {
        let config = EngineConfig {
            failure_policy: FailurePolicy::AbortBatch,
            items_per_cycle: 1,
            ..EngineConfig::default()
        };
        let engine = InProcessBatchEngine::new(config);
        let (batch_id, _) = register(&engine, numbers(&[-1, 2, 3, 4]), 1);

        let report = engine.process_cycle();
        assert_eq!(report.failed, 1);

        let progress = engine.progress(batch_id).unwrap();
        assert_eq!(progress.pending, 0);
        assert_eq!(progress.skipped, 3);
        assert!(progress.finished);
        assert_eq!(progress.message, "Batch processing encountered an error.");
    }

    #[test]
    fn test_take_finished_batches_drains_only_finished_state() {
        let config = EngineConfig {
            items_per_cycle: 2,
            ..EngineConfig::default()
        };
        let engine = InProcessBatchEngine::new(config);
        let (done, _) = register(&engine, numbers(&[1, 2]), 1);
        let (open, _) = register(&engine, numbers(&[3, 4, 5]), 1);

        engine.process_cycle();
        let drained = engine.take_finished_batches();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].batch_id, done);
        assert_eq!(drained[0].succeeded, 2);
        assert_eq!(engine.batch_ids(), vec![open]);

        engine.run_to_completion();
        assert_eq!(engine.take_finished_batches().len(), 1);
        assert!(engine.batch_ids().is_empty());
        assert!(engine.take_finished_batches().is_empty());
    }

    #[test]
    fn test_draining_aborted_batch_drops_its_queued_items() {
        let config = EngineConfig {
            failure_policy: FailurePolicy::AbortBatch,
            items_per_cycle: 1,
            ..EngineConfig::default()
        };
        let engine = InProcessBatchEngine::new(config);
        register(&engine, numbers(&[-1, 2, 3]), 1);

        engine.process_cycle();
        assert_eq!(engine.pending_count(), 2);

        let drained = engine.take_finished_batches();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].failed, 1);
        assert!(engine.is_idle());
        assert!(engine.batch_ids().is_empty());
    }

    #[test]
    fn test_reverse_order_runs_last_chunk_first() {
        let config = EngineConfig {
            execution_order: ExecutionOrder::Reverse,
            ..EngineConfig::default()
        };
        let engine = InProcessBatchEngine::new(config);
        let (_, context) = register(&engine, numbers(&[1, 2, 3]), 1);

        engine.run_to_completion();
        let completion: Vec<usize> = context.results().iter().map(|r| r.chunk_index).collect();
        assert_eq!(completion, vec![2, 1, 0]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let engine = InProcessBatchEngine::new(EngineConfig::default());
        let batch_id = BatchId::new();
        engine.register_batch(BatchBuilder::new(batch_id).build()).unwrap();

        let error = engine
            .register_batch(BatchBuilder::new(batch_id).build())
            .unwrap_err();
        assert!(matches!(error, EngineError::RegistrationRejected(_)));
    }

    #[tokio::test]
    async fn test_run_concurrently_executes_everything() {
        let config = EngineConfig {
            max_concurrent_items: 3,
            ..EngineConfig::default()
        };
        let engine = Arc::new(InProcessBatchEngine::new(config));
        let (_, context) = register(&engine, numbers(&[1; 40]), 3);

        let summary = engine.run_concurrently().await.unwrap();
        assert_eq!(summary.succeeded, 14);
        assert_eq!(summary.failed, 0);
        assert!(context.is_complete());
        assert_eq!(context.flattened_values().len(), 14);
    }
}
