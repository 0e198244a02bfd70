//! In-process channel client replaying scripted outcomes
//!
//! Used by tests and the runner binary in place of a real ledger
//! connection. Each `execute_tx` consumes the next [`SimOutcome`]; once the
//! script is exhausted, transactions commit as `VALID`, or as
//! `MVCC_READ_CONFLICT` with the configured conflict rate.

use crate::client::{ChannelClient, ExecuteTxOptions, QueryOptions};
use crate::error::SubmitError;
use crate::filter::ResponseFilter;
use crate::types::{
    InvokeRequest, ProposalResponse, QueryRequest, TxId, TxStatusEvent, ValidationCode,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Outcome of one simulated submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimOutcome {
    /// Submission fails before a transaction ID is assigned
    SubmitError(SubmitError),
    /// Transaction commits with the given code
    Commit(ValidationCode),
    /// Transaction commits with the given code and an attached error
    CommitWithError(ValidationCode, String),
    /// Commit status is never delivered; the notifier is held open
    NoCommit,
    /// Notifier is dropped without delivering a status
    DropNotifier,
}

/// Scripted [`ChannelClient`]
#[derive(Debug)]
pub struct SimulatedChannel {
    script: Mutex<VecDeque<SimOutcome>>,
    query_results: Mutex<VecDeque<Result<Bytes, SubmitError>>>,
    endorsers: Vec<String>,
    commit_delay: Duration,
    conflict_rate: f64,
    submissions: AtomicUsize,
    invoke_requests: Mutex<Vec<InvokeRequest>>,
    query_requests: Mutex<Vec<QueryRequest>>,
    held: Mutex<Vec<oneshot::Sender<TxStatusEvent>>>,
}

impl Default for SimulatedChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChannel {
    /// Channel that commits everything as `VALID`
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            query_results: Mutex::new(VecDeque::new()),
            endorsers: vec!["peer0.org1".to_string(), "peer0.org2".to_string()],
            commit_delay: Duration::ZERO,
            conflict_rate: 0.0,
            submissions: AtomicUsize::new(0),
            invoke_requests: Mutex::new(Vec::new()),
            query_requests: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes for the next submissions, in order
    pub fn with_script(self, outcomes: impl IntoIterator<Item = SimOutcome>) -> Self {
        self.script.lock().extend(outcomes);
        self
    }

    /// Results for the next queries, in order
    pub fn with_query_results(
        self,
        results: impl IntoIterator<Item = Result<Bytes, SubmitError>>,
    ) -> Self {
        self.query_results.lock().extend(results);
        self
    }

    /// Delay between submission and commit status
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Probability that an unscripted transaction hits an MVCC conflict
    pub fn with_conflict_rate(mut self, rate: f64) -> Self {
        self.conflict_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Endorsing peers
    pub fn with_endorsers<I, S>(mut self, endorsers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endorsers = endorsers.into_iter().map(Into::into).collect();
        self
    }

    /// Number of `execute_tx` calls so far
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Invoke requests received so far
    pub fn invoke_requests(&self) -> Vec<InvokeRequest> {
        self.invoke_requests.lock().clone()
    }

    /// Query requests received so far
    pub fn query_requests(&self) -> Vec<QueryRequest> {
        self.query_requests.lock().clone()
    }

    fn next_outcome(&self) -> SimOutcome {
        if let Some(outcome) = self.script.lock().pop_front() {
            return outcome;
        }
        if self.conflict_rate > 0.0 && rand::thread_rng().gen_bool(self.conflict_rate) {
            SimOutcome::Commit(ValidationCode::MvccReadConflict)
        } else {
            SimOutcome::Commit(ValidationCode::Valid)
        }
    }

    fn endorse(
        &self,
        filter: &ResponseFilter,
        function: &str,
        payload: &Bytes,
    ) -> Result<(), SubmitError> {
        let responses = self
            .endorsers
            .iter()
            .map(|peer| ProposalResponse {
                endorser: peer.clone(),
                status: ProposalResponse::STATUS_OK,
                message: function.to_string(),
                payload: payload.clone(),
            })
            .collect();
        filter.process(responses).map(|_| ())
    }

    fn deliver(&self, notifier: oneshot::Sender<TxStatusEvent>, event: TxStatusEvent) {
        if self.commit_delay.is_zero() {
            let _ = notifier.send(event);
            return;
        }

        let delay = self.commit_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = notifier.send(event);
        });
    }
}

#[async_trait]
impl ChannelClient for SimulatedChannel {
    async fn execute_tx(
        &self,
        request: InvokeRequest,
        opts: ExecuteTxOptions,
    ) -> Result<TxId, SubmitError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.invoke_requests.lock().push(request.clone());

        let outcome = match self.next_outcome() {
            SimOutcome::SubmitError(err) => return Err(err),
            other => other,
        };

        self.endorse(&opts.filter, &request.function, &Bytes::new())?;

        let tx_id = TxId::new(Uuid::new_v4().simple().to_string());
        let event = |code: ValidationCode, error: Option<String>| TxStatusEvent {
            tx_id: tx_id.clone(),
            validation_code: code,
            error,
        };

        match outcome {
            SimOutcome::Commit(code) => self.deliver(opts.notifier, event(code, None)),
            SimOutcome::CommitWithError(code, error) => {
                self.deliver(opts.notifier, event(code, Some(error)))
            }
            SimOutcome::NoCommit => {
                let mut held = self.held.lock();
                held.retain(|notifier| !notifier.is_closed());
                held.push(opts.notifier);
            }
            SimOutcome::DropNotifier | SimOutcome::SubmitError(_) => drop(opts.notifier),
        }

        Ok(tx_id)
    }

    async fn query(&self, request: QueryRequest, opts: QueryOptions) -> Result<Bytes, SubmitError> {
        self.query_requests.lock().push(request.clone());

        let result = self
            .query_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Bytes::from_static(b"ok")));
        let payload = result?;

        self.endorse(&opts.filter, &request.function, &payload)?;
        Ok(payload)
    }
}
