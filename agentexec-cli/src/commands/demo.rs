//! `agentexec demo` - exercises the executor end to end.
//!
//! Three phases against one executor:
//!
//! 1. `listeners` requests for the same identifier, coalesced into one run
//! 2. a repeat request answered from the cache
//! 3. a request that is cancelled through its tether before completing
//!
//! The executor's counters are printed at the end.

use agentexec::config::ConfigFile;
use agentexec::{
    from_fn, Agent, AgentContext, AgentExecutor, AgentPolicy, ExecutorConfig, FnAgent, JobPriority,
};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::info;

use crate::error::CliError;

/// Arguments for the demo command.
#[derive(Debug, Clone)]
pub struct DemoArgs {
    pub listeners: usize,
    pub work: Duration,
    pub priority: JobPriority,
}

/// Runs the demo on a fresh multi-threaded runtime.
pub fn run(args: DemoArgs, config: &ConfigFile) -> Result<(), CliError> {
    if args.listeners == 0 {
        return Err(CliError::InvalidArgument(
            "--listeners must be at least 1".to_string(),
        ));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(run_async(args, ExecutorConfig::from(config)))
}

async fn run_async(args: DemoArgs, config: ExecutorConfig) -> Result<(), CliError> {
    let executor = AgentExecutor::builder("demo").with_config(config).build()?;
    let runs = Arc::new(AtomicU32::new(0));

    let policy = AgentPolicy::builder()
        .priority(args.priority)
        .max_cache_age(Duration::from_secs(60))
        .build()
        .map_err(|e| CliError::Executor(e.into()))?;

    // Phase 1: coalescing
    println!(
        "Submitting {} requests for 'demo:report' ({} ms of work)...",
        args.listeners,
        args.work.as_millis()
    );
    let started = Instant::now();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut tethers = Vec::with_capacity(args.listeners);
    for i in 0..args.listeners {
        let tx = tx.clone();
        let tether = executor.run_agent(
            report_agent(Arc::clone(&runs), args.work),
            policy.clone(),
            from_fn::<String, u8, _>(move |_, result| {
                let _ = tx.send((i, result));
            }),
        )?;
        tethers.push(tether);
    }
    drop(tx);
    for _ in 0..args.listeners {
        let Some((i, result)) = rx.recv().await else {
            break;
        };
        println!("  listener {:>3}: {}", i, describe(result.as_deref()));
    }
    println!(
        "  {} listeners served by {} run(s) in {:?}",
        args.listeners,
        runs.load(Ordering::SeqCst),
        started.elapsed()
    );

    // Phase 2: cache hit
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _cached = executor.run_agent(
        report_agent(Arc::clone(&runs), args.work),
        policy.clone(),
        from_fn::<String, u8, _>(move |_, result| {
            let _ = tx.send(result);
        }),
    )?;
    if let Some(result) = rx.recv().await {
        println!(
            "Repeat request: {} (runs: {})",
            describe(result.as_deref()),
            runs.load(Ordering::SeqCst)
        );
    }

    // Phase 3: cancellation
    let (tx, mut rx) = mpsc::unbounded_channel();
    let slow = FnAgent::new("demo:slow", |ctx: AgentContext<String, ()>| async move {
        ctx.cancelled().await;
        info!("Slow agent observed cancellation");
        ctx.complete_empty();
    });
    let tether = executor.run_agent(
        slow,
        AgentPolicy::builder()
            .deliver_in_parallel()
            .disable_cache()
            .priority(args.priority)
            .timeout(Duration::from_millis(200))
            .build()
            .map_err(|e| CliError::Executor(e.into()))?,
        from_fn::<String, (), _>(move |_, result| {
            let _ = tx.send(result);
        }),
    )?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    tether.cancel();
    println!("Cancelled 'demo:slow'; listener released without a result");
    // A released listener receives nothing; its channel closes once the
    // request is dropped.
    if let Ok(Some(result)) = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
        println!("  unexpected delivery: {}", describe(result.as_deref()));
    }

    drop(tethers);
    let stats = executor.stats();
    executor.log_stats();
    println!();
    println!("Executor statistics:");
    println!("  submissions:          {}", stats.submissions);
    println!("  coalesced:            {}", stats.coalesced);
    println!("  cache hits / misses:  {} / {}", stats.cache_hits, stats.cache_misses);
    println!("  executions started:   {}", stats.executions_started);
    println!("  executions completed: {}", stats.executions_completed);
    println!("  coalescing ratio:     {:.2}", stats.coalescing_ratio());
    Ok(())
}

/// Produces a report after `work`, counting how often it actually runs.
struct ReportAgent {
    runs: Arc<AtomicU32>,
    work: Duration,
}

impl Agent for ReportAgent {
    type Output = String;
    type Progress = u8;

    fn identifier(&self) -> &str {
        "demo:report"
    }

    fn run(self: Arc<Self>, ctx: AgentContext<String, u8>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            for percent in [25u8, 50, 75] {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        ctx.complete_empty();
                        return;
                    }
                    _ = tokio::time::sleep(self.work / 4) => ctx.progress(percent),
                }
            }
            tokio::time::sleep(self.work / 4).await;
            ctx.complete(format!("report #{run}"));
        })
    }
}

fn report_agent(runs: Arc<AtomicU32>, work: Duration) -> ReportAgent {
    ReportAgent { runs, work }
}

fn describe(result: Option<&String>) -> String {
    match result {
        Some(value) => value.clone(),
        None => "(no result)".to_string(),
    }
}
