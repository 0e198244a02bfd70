//! Channel client boundary
//!
//! The client owns proposal signing, endorsement collection, and broadcast.
//! Tasks only see this trait.

use crate::error::SubmitError;
use crate::filter::ResponseFilter;
use crate::types::{InvokeRequest, QueryRequest, TxId, TxStatusEvent};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::oneshot;

/// Options for a state-changing submission
#[derive(Debug)]
pub struct ExecuteTxOptions {
    /// Filter applied to endorsement responses
    pub filter: ResponseFilter,
    /// Receives the commit status of this submission only
    pub notifier: oneshot::Sender<TxStatusEvent>,
    /// Request timeout
    pub timeout: Duration,
}

/// Options for a read-only submission
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Filter applied to endorsement responses
    pub filter: ResponseFilter,
    /// Request timeout
    pub timeout: Duration,
}

/// Client submitting requests to a ledger channel
#[async_trait]
pub trait ChannelClient: Send + Sync {
    /// Endorse and broadcast a transaction
    ///
    /// Returns once the transaction has been handed to ordering; the commit
    /// status is delivered later on `opts.notifier`.
    async fn execute_tx(
        &self,
        request: InvokeRequest,
        opts: ExecuteTxOptions,
    ) -> Result<TxId, SubmitError>;

    /// Evaluate a read-only request and return its payload
    async fn query(&self, request: QueryRequest, opts: QueryOptions) -> Result<Bytes, SubmitError>;
}
