//! Concurrent batch of invocations with aggregated results

use crate::client::ChannelClient;
use crate::context::InvokeContext;
use crate::error::{ErrorKind, InvokeError};
use crate::executor::Executor;
use crate::invoke::{InvokeTask, RetryPolicy};
use crate::types::CallArgs;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Aggregated outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvokeSummary {
    /// Invocations started
    pub iterations: usize,
    /// Committed successfully
    pub succeeded: usize,
    /// Gave up after exhausting attempts on transient errors
    pub transient_failures: usize,
    /// Rejected persistently
    pub persistent_failures: usize,
    /// Timed out waiting for commit
    pub commit_timeouts: usize,
    /// Attempts across all invocations
    pub total_attempts: u64,
    /// Most attempts any single invocation needed
    pub max_attempts_used: u32,
    /// Wall-clock time of the batch (milliseconds)
    pub elapsed_ms: u64,
}

impl InvokeSummary {
    /// Fold in one completed invocation
    pub fn record(&mut self, attempts: u32, result: &Result<(), InvokeError>) {
        self.total_attempts += u64::from(attempts);
        self.max_attempts_used = self.max_attempts_used.max(attempts);

        match result {
            Ok(()) => self.succeeded += 1,
            Err(err) => match err.kind() {
                ErrorKind::Transient => self.transient_failures += 1,
                ErrorKind::Persistent => self.persistent_failures += 1,
                ErrorKind::TimeoutOnCommit => self.commit_timeouts += 1,
            },
        }
    }

    /// Invocations that did not succeed
    pub fn failed(&self) -> usize {
        self.transient_failures + self.persistent_failures + self.commit_timeouts
    }

    /// Invocations that reported back
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed()
    }
}

/// Run `iterations` invocations of `args` on `executor` and wait for all of them
pub async fn run_invocations(
    client: Arc<dyn ChannelClient>,
    ctx: &InvokeContext,
    executor: &Executor,
    args: &CallArgs,
    policy: RetryPolicy,
    iterations: usize,
) -> InvokeSummary {
    let started = Instant::now();
    let (tx, mut rx) = mpsc::unbounded_channel();

    info!(
        iterations,
        max_attempts = policy.max_attempts,
        function = %args.func,
        "Starting invocation batch"
    );

    for i in 0..iterations {
        let tx = tx.clone();
        let task = InvokeTask::new(
            format!("invoke_{}", i),
            Arc::clone(&client),
            ctx.clone(),
            args.clone(),
            executor.clone(),
            policy,
            Box::new(move |task, result| {
                let _ = tx.send((task.attempts(), result));
            }),
        );

        // A rejected task reports through its callback when dropped.
        if let Err(rejected) = executor.submit(Box::new(task)).await {
            warn!("Error submitting task {}: {}", rejected.task.id(), rejected.reason);
        }
    }
    drop(tx);

    let mut summary = InvokeSummary {
        iterations,
        ..Default::default()
    };
    while let Some((attempts, result)) = rx.recv().await {
        summary.record(attempts, &result);
    }
    summary.elapsed_ms = started.elapsed().as_millis() as u64;

    if summary.completed() != iterations {
        warn!(
            completed = summary.completed(),
            iterations, "Some invocations never reported back"
        );
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed(),
        total_attempts = summary.total_attempts,
        elapsed_ms = summary.elapsed_ms,
        "Invocation batch complete"
    );

    summary
}
