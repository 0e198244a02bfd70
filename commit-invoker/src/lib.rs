//! Commit Invoker
//!
//! Submits chaincode transactions to a ledger channel and confirms whether
//! they committed, resubmitting when the failure is transient.
//!
//! # Architecture
//!
//! - **InvokeTask**: submit, wait for commit status or timeout, classify, retry
//! - **QueryTask**: submit a read-only request, report the result
//! - **Executor**: bounded queue drained by tokio workers; supports delayed resubmission
//! - **ChannelClient**: boundary to the ledger SDK (proposal, endorsement, broadcast)
//!
//! # Invariants
//!
//! - A task's completion callback fires exactly once, across all of its attempts
//! - Attempts of one task never overlap
//! - `DUPLICATE_TXID`, `MVCC_READ_CONFLICT`, `PHANTOM_READ_CONFLICT` are the only retried commit codes
//! - Commit timeouts are never retried: the transaction may already have committed
//!
//! # Example
//!
//! ```no_run
//! use commit_invoker::{
//!     CallArgs, Config, Executor, InvokeContext, InvokeTask, RetryPolicy, SimulatedChannel,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> commit_invoker::Result<()> {
//!     let config = Config::default();
//!     let executor = Executor::spawn(&config.executor);
//!     let ctx = InvokeContext::from_config(&config);
//!
//!     let task = InvokeTask::new(
//!         "invoke_0",
//!         Arc::new(SimulatedChannel::new()),
//!         ctx,
//!         CallArgs::new("move", ["a", "b", "10"]),
//!         executor.clone(),
//!         RetryPolicy::from(&config.retry),
//!         Box::new(|task, result| {
//!             println!("{} finished after {} attempts: {:?}", task.id(), task.attempts(), result);
//!         }),
//!     );
//!     if let Err(rejected) = executor.submit(Box::new(task)).await {
//!         return Err(rejected.reason);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod batch;
pub mod classify;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod filter;
pub mod invoke;
pub mod metrics;
pub mod printer;
pub mod query;
pub mod sim;
pub mod types;

// Re-exports
pub use batch::{run_invocations, InvokeSummary};
pub use client::{ChannelClient, ExecuteTxOptions, QueryOptions};
pub use config::Config;
pub use context::InvokeContext;
pub use error::{Error, ErrorKind, InvokeError, Result, SubmitError};
pub use executor::{Executor, Rejected, Task};
pub use filter::ResponseFilter;
pub use invoke::{InvokeCallback, InvokeTask, RetryPolicy};
pub use metrics::InvokeMetrics;
pub use printer::{LogPrinter, PrintFormat, Printer};
pub use query::{QueryCallback, QueryTask};
pub use sim::{SimOutcome, SimulatedChannel};
pub use types::{CallArgs, InvokeRequest, QueryRequest, TxId, TxStatusEvent, ValidationCode};
