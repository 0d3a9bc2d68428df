use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use batch_dispatch::config::{DispatcherConfig, EngineConfig};
use batch_dispatch::engine::{BatchDefinition, ExecutionEngine, InProcessBatchEngine};
use batch_dispatch::registry::{DispatchTarget, MetadataRegistry};
use batch_dispatch::{BatchDispatcher, BatchId, EngineError};
use serde_json::{json, Value};

use super::RecordingLogger;

/// A dispatcher wired to an in-process engine and a recording logger.
pub struct DispatchHarness<S: DispatchTarget> {
    pub service: Arc<S>,
    pub engine: Arc<InProcessBatchEngine>,
    pub logger: Arc<RecordingLogger>,
    pub dispatcher: BatchDispatcher,
}

impl<S: DispatchTarget> DispatchHarness<S> {
    pub fn new(service: S) -> Self {
        Self::with_config(service, DispatcherConfig::default())
    }

    pub fn with_engine_config(service: S, engine: EngineConfig) -> Self {
        Self::with_config(
            service,
            DispatcherConfig {
                engine,
                ..DispatcherConfig::default()
            },
        )
    }

    pub fn with_config(service: S, config: DispatcherConfig) -> Self {
        let registry = Arc::new(MetadataRegistry::new());
        registry.register_target::<S>();

        let service = Arc::new(service);
        let engine = Arc::new(InProcessBatchEngine::new(config.engine.clone()));
        let logger = Arc::new(RecordingLogger::new());
        let dispatcher = BatchDispatcher::new(
            service.clone(),
            registry,
            engine.clone(),
            logger.clone(),
            &config,
        );

        Self {
            service,
            engine,
            logger,
            dispatcher,
        }
    }
}

/// `[0, 1, ..., n - 1]` as JSON values
pub fn numbers(n: usize) -> Vec<Value> {
    (0..n).map(|i| json!(i)).collect()
}

/// Engine that refuses every batch it is offered.
#[derive(Debug, Default)]
pub struct RejectingEngine {
    offered: AtomicUsize,
}

impl RejectingEngine {
    pub fn offered(&self) -> usize {
        self.offered.load(Ordering::SeqCst)
    }
}

impl ExecutionEngine for RejectingEngine {
    fn register_batch(&self, _batch: BatchDefinition) -> Result<BatchId, EngineError> {
        self.offered.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::RegistrationRejected("engine is full".to_string()))
    }
}

/// A dispatcher whose engine rejects every registration.
pub fn rejecting_dispatcher<S: DispatchTarget>(
    service: S,
    engine: Arc<RejectingEngine>,
    logger: Arc<RecordingLogger>,
) -> BatchDispatcher {
    let registry = Arc::new(MetadataRegistry::new());
    registry.register_target::<S>();
    BatchDispatcher::new(
        Arc::new(service),
        registry,
        engine,
        logger,
        &DispatcherConfig::default(),
    )
}
