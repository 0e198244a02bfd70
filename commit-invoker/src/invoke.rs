//! Commit-awaiting invoke task
//!
//! One logical state-changing operation. Each attempt:
//!
//! 1. Submits the request with a fresh commit notifier
//! 2. Waits for the commit status or the timeout, whichever comes first
//! 3. Classifies the outcome
//!
//! Transient failures resubmit the task through the executor until
//! `max_attempts` is reached. The completion callback fires exactly once.

use crate::classify::classify_commit;
use crate::client::{ChannelClient, ExecuteTxOptions};
use crate::config::RetryConfig;
use crate::context::InvokeContext;
use crate::error::{ErrorKind, InvokeError};
use crate::executor::{Executor, Task};
use crate::types::{CallArgs, InvokeRequest, TxId};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

const TASK_LABEL: &str = "invoke";

/// Completion callback; receives the finished task and its outcome
pub type InvokeCallback = Box<dyn FnOnce(&InvokeTask, Result<(), InvokeError>) + Send>;

/// Retry policy for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, at least 1
    pub max_attempts: u32,
    /// Delay before each resubmission
    pub resubmit_delay: Duration,
}

impl RetryPolicy {
    /// Create new retry policy; `max_attempts` is raised to 1 if zero
    pub fn new(max_attempts: u32, resubmit_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            resubmit_delay,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.resubmit_delay())
    }
}

/// Task that invokes a chaincode and waits for the transaction to commit
pub struct InvokeTask {
    id: String,
    client: Arc<dyn ChannelClient>,
    ctx: InvokeContext,
    args: CallArgs,
    executor: Executor,
    policy: RetryPolicy,
    attempt: u32,
    resubmit_pending: bool,
    last_error: Option<InvokeError>,
    tx_id: Option<TxId>,
    callback: Option<InvokeCallback>,
}

impl fmt::Debug for InvokeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeTask")
            .field("id", &self.id)
            .field("args", &self.args)
            .field("policy", &self.policy)
            .field("attempt", &self.attempt)
            .field("tx_id", &self.tx_id)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl InvokeTask {
    /// Create new invoke task
    pub fn new(
        id: impl Into<String>,
        client: Arc<dyn ChannelClient>,
        ctx: InvokeContext,
        args: CallArgs,
        executor: Executor,
        policy: RetryPolicy,
        callback: InvokeCallback,
    ) -> Self {
        Self {
            id: id.into(),
            client,
            ctx,
            args,
            executor,
            policy,
            attempt: 1,
            resubmit_pending: false,
            last_error: None,
            tx_id: None,
            callback: Some(callback),
        }
    }

    /// Task ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Last recorded error
    pub fn last_error(&self) -> Option<&InvokeError> {
        self.last_error.as_ref()
    }

    /// Transaction ID of the most recent successful submission
    pub fn tx_id(&self) -> Option<&TxId> {
        self.tx_id.as_ref()
    }

    /// Retry policy
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run a single attempt
    async fn do_invoke(&mut self) -> Result<(), InvokeError> {
        self.resubmit_pending = false;

        debug!(
            task_id = %self.id,
            chaincode = %self.ctx.chaincode_id(),
            function = %self.args.func,
            args = ?self.args.args,
            attempt = self.attempt,
            "Invoking chaincode"
        );

        if let Some(metrics) = self.ctx.metrics() {
            metrics.record_attempt(TASK_LABEL);
        }

        let (notifier, status_rx) = oneshot::channel();
        let request = InvokeRequest::new(self.ctx.chaincode_id(), &self.args);
        let opts = ExecuteTxOptions {
            filter: self.ctx.response_filter(),
            notifier,
            timeout: self.ctx.timeout(),
        };

        let tx_id = self.client.execute_tx(request, opts).await?;
        self.tx_id = Some(tx_id.clone());

        debug!(task_id = %self.id, tx_id = %tx_id, "Committing transaction");

        let started = Instant::now();
        let status = tokio::time::timeout(self.ctx.timeout(), status_rx).await;
        if let Some(metrics) = self.ctx.metrics() {
            metrics.commit_wait.observe(started.elapsed().as_secs_f64());
        }

        match status {
            Ok(Ok(event)) => {
                let result = classify_commit(&event);
                match &result {
                    Ok(()) => debug!(
                        task_id = %self.id,
                        tx_id = %tx_id,
                        "Successfully committed transaction"
                    ),
                    Err(err) if err.is_transient() => debug!(
                        task_id = %self.id,
                        tx_id = %tx_id,
                        code = %event.validation_code,
                        "Transaction commit failed, most likely a transient error"
                    ),
                    Err(_) => debug!(
                        task_id = %self.id,
                        tx_id = %tx_id,
                        code = %event.validation_code,
                        "Transaction commit failed"
                    ),
                }
                result
            }
            Ok(Err(_)) => Err(InvokeError::timeout_on_commit(format!(
                "commit notifier for TxID [{}] closed before a status was received",
                tx_id
            ))),
            Err(_) => Err(InvokeError::timeout_on_commit(format!(
                "timed out waiting to receive block event for TxID [{}]",
                tx_id
            ))),
        }
    }

    /// Fire the callback; later calls are no-ops
    fn complete(&mut self, result: Result<(), InvokeError>) {
        let Some(callback) = self.callback.take() else {
            return;
        };

        // A scheduled attempt that never ran is not counted.
        if self.resubmit_pending {
            self.resubmit_pending = false;
            self.attempt -= 1;
        }

        if let Some(metrics) = self.ctx.metrics() {
            let label = match &result {
                Ok(()) => "success",
                Err(err) => err.kind().as_str(),
            };
            metrics.record_outcome(TASK_LABEL, label);
        }

        callback(&*self, result);
    }
}

#[async_trait]
impl Task for InvokeTask {
    async fn invoke(self: Box<Self>) {
        let mut task = self;

        let err = match task.do_invoke().await {
            Ok(()) => {
                debug!(task_id = %task.id, attempts = task.attempt, "Successfully invoked chaincode");
                task.complete(Ok(()));
                return;
            }
            Err(err) => err,
        };

        task.last_error = Some(err.clone());

        match err.kind() {
            ErrorKind::Transient if task.attempt < task.policy.max_attempts => {
                debug!(
                    task_id = %task.id,
                    attempt = task.attempt,
                    "Error invoking chaincode: {}. Resubmitting ...",
                    err
                );
                task.attempt += 1;
                task.resubmit_pending = true;
                if let Some(metrics) = task.ctx.metrics() {
                    metrics.resubmissions_total.inc();
                }

                let executor = task.executor.clone();
                let delay = task.policy.resubmit_delay;
                if let Err(rejected) = executor.submit_delayed(task, delay) {
                    let mut task = rejected.task;
                    error!(task_id = %task.id, "Error submitting task: {}", rejected.reason);

                    let err = InvokeError::Persistent {
                        message: format!("failed to resubmit task {}", task.id),
                        cause: Some(rejected.reason.to_string()),
                    };
                    task.last_error = Some(err.clone());
                    task.complete(Err(err));
                }
                return;
            }
            ErrorKind::Transient => debug!(
                task_id = %task.id,
                "Error invoking chaincode: {}. Giving up after {} attempts.",
                err,
                task.attempt
            ),
            ErrorKind::TimeoutOnCommit => debug!(
                task_id = %task.id,
                tx_id = ?task.tx_id,
                "Timeout committing transaction"
            ),
            ErrorKind::Persistent => debug!(
                task_id = %task.id,
                "Error invoking chaincode: {}",
                err
            ),
        }

        task.complete(Err(err));
    }
}

impl Drop for InvokeTask {
    fn drop(&mut self) {
        if self.callback.is_some() {
            warn!(task_id = %self.id, attempt = self.attempt, "Task dropped before completion");
            let err = InvokeError::persistent(format!(
                "task {} abandoned before completion",
                self.id
            ));
            self.last_error = Some(err.clone());
            self.complete(Err(err));
        }
    }
}
