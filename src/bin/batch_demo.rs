//! # Batch Demo
//!
//! Generates random arithmetic expressions, dispatches `calculate_results`
//! through the batch dispatcher and drives the in-process engine until every
//! chunk has run.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tracing::{error, info};

use batch_dispatch::config::ConfigManager;
use batch_dispatch::engine::{InProcessBatchEngine, RunSummary};
use batch_dispatch::logging::{init_structured_logging, TracingDispatchLogger};
use batch_dispatch::registry::MetadataRegistry;
use batch_dispatch::services::{generate_expressions, ExpressionService};
use batch_dispatch::BatchDispatcher;

#[derive(Parser, Debug)]
#[command(name = "batch-demo")]
#[command(about = "Evaluate random expressions through the batch dispatcher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Number of expressions to generate
    #[arg(short = 'n', long, default_value_t = 25)]
    count: usize,

    /// Configuration directory (default: config)
    #[arg(short, long, env = "BATCH_DISPATCH_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Environment name used to pick dispatcher.<environment>.toml
    #[arg(short, long)]
    environment: Option<String>,

    /// Run work items on the blocking pool instead of progressive cycles
    #[arg(long)]
    concurrent: bool,

    /// Digits after the decimal point in rendered results
    #[arg(short, long)]
    precision: Option<u32>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Batch demo failed: {e:#}");
        eprintln!("batch-demo: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager =
        ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
            .context("failed to load dispatcher configuration")?;
    let config = manager.config();
    init_structured_logging(&config.logging, manager.environment());

    let registry = Arc::new(MetadataRegistry::new());
    registry.register_target::<ExpressionService>();
    let stats = registry.stats();
    info!(
        methods = stats.total_methods,
        batched = stats.batched_methods,
        logged = stats.logged_methods,
        "Registered ExpressionService metadata"
    );

    let engine = Arc::new(InProcessBatchEngine::new(config.engine.clone()));
    let failures = engine.failures();
    let dispatcher = BatchDispatcher::new(
        Arc::new(ExpressionService::new()),
        registry,
        engine.clone(),
        Arc::new(TracingDispatchLogger),
        config,
    );

    let expressions = generate_expressions(cli.count, &mut rand::rng());
    let mut args = vec![json!(expressions)];
    if let Some(precision) = cli.precision {
        args.push(json!(precision));
    }

    let outcome = dispatcher
        .dispatch(ExpressionService::CALCULATE_RESULTS, args)
        .context("dispatch of calculate_results failed")?;
    let batch = outcome
        .batch()
        .context("calculate_results was not scheduled as a batch")?
        .clone();

    info!(
        batch_id = %batch.batch_id,
        items = batch.item_count,
        chunks = batch.chunk_count,
        chunk_size = batch.chunk_size,
        "Batch scheduled"
    );

    let summary: RunSummary = if cli.concurrent {
        engine
            .run_concurrently()
            .await
            .context("concurrent engine run failed")?
    } else {
        engine.run_to_completion()
    };

    if let Some(progress) = engine.progress(batch.batch_id) {
        println!("{}: {}", progress.title, progress.message);
    }

    for result in batch.context().results_in_chunk_order() {
        println!("-- chunk {} (offset {})", result.chunk_index, result.offset);
        match result.value {
            Value::Array(lines) => {
                for line in lines {
                    println!("   {}", line.as_str().unwrap_or_default());
                }
            }
            other => println!("   {other}"),
        }
    }

    for failure in failures.try_iter() {
        println!(
            "!! chunk {} failed ({}): {}",
            failure.chunk_index, failure.error_kind, failure.message
        );
    }

    let error_count = dispatcher
        .dispatch(
            ExpressionService::COUNT_ERRORS,
            vec![Value::Array(batch.context().flattened_values())],
        )
        .context("count_errors failed")?
        .into_value()
        .and_then(|value| value.as_u64())
        .unwrap_or_default();

    println!(
        "{} succeeded, {} failed, {} skipped; {} expressions rendered ERROR",
        summary.succeeded, summary.failed, summary.skipped, error_count
    );
    Ok(())
}
