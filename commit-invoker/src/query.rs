//! Read-only query task

use crate::client::{ChannelClient, QueryOptions};
use crate::context::InvokeContext;
use crate::error::SubmitError;
use crate::executor::Task;
use crate::types::{CallArgs, QueryRequest};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const TASK_LABEL: &str = "query";

/// Completion callback for a query
pub type QueryCallback = Box<dyn FnOnce(Result<Bytes, SubmitError>) + Send>;

/// Task that evaluates a read-only chaincode function
pub struct QueryTask {
    id: String,
    client: Arc<dyn ChannelClient>,
    ctx: InvokeContext,
    args: CallArgs,
    callback: Option<QueryCallback>,
}

impl fmt::Debug for QueryTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryTask")
            .field("id", &self.id)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl QueryTask {
    /// Create new query task
    pub fn new(
        id: impl Into<String>,
        client: Arc<dyn ChannelClient>,
        ctx: InvokeContext,
        args: CallArgs,
        callback: QueryCallback,
    ) -> Self {
        Self {
            id: id.into(),
            client,
            ctx,
            args,
            callback: Some(callback),
        }
    }

    /// Task ID
    pub fn id(&self) -> &str {
        &self.id
    }

    fn complete(&mut self, result: Result<Bytes, SubmitError>) {
        let Some(callback) = self.callback.take() else {
            return;
        };

        if let Some(metrics) = self.ctx.metrics() {
            let label = if result.is_ok() { "success" } else { "error" };
            metrics.record_outcome(TASK_LABEL, label);
        }

        callback(result);
    }
}

#[async_trait]
impl Task for QueryTask {
    async fn invoke(self: Box<Self>) {
        let mut task = self;

        if let Some(metrics) = task.ctx.metrics() {
            metrics.record_attempt(TASK_LABEL);
        }

        let request = QueryRequest::new(task.ctx.chaincode_id(), &task.args);
        let opts = QueryOptions {
            filter: task.ctx.response_filter(),
            timeout: task.ctx.timeout(),
        };

        let result = task.client.query(request, opts).await;
        match &result {
            Ok(_) => debug!(task_id = %task.id, "Chaincode query was successful"),
            Err(err) => debug!(task_id = %task.id, "Error querying chaincode: {}", err),
        }

        task.complete(result);
    }
}

impl Drop for QueryTask {
    fn drop(&mut self) {
        if self.callback.is_some() {
            warn!(task_id = %self.id, "Query dropped before completion");
            self.complete(Err(SubmitError::Proposal(format!(
                "query {} abandoned before completion",
                self.id
            ))));
        }
    }
}
