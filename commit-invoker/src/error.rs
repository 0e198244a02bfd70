//! Error types for the invoker
//!
//! Three layers:
//! - [`Error`]: infrastructure failures (configuration, executor, IO)
//! - [`SubmitError`]: failures reported by a [`crate::client::ChannelClient`]
//! - [`InvokeError`]: the classified outcome of a failed invocation attempt

use std::fmt;
use thiserror::Error;

/// Result type for invoker infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Invoker infrastructure errors
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Executor is stopped or its queue is gone
    #[error("Executor error: {0}")]
    Executor(String),

    /// Invalid call arguments
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

/// Errors raised by the channel client while submitting a proposal or query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Proposal could not be sent or was not endorsed
    #[error("Proposal error: {0}")]
    Proposal(String),

    /// Endorsement responses were rejected by the response filter
    #[error("Response filter rejected proposal: {0}")]
    Filtered(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The client did not answer within the request timeout
    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

/// Classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A retry may succeed
    Transient,
    /// A retry will not change the outcome
    Persistent,
    /// No commit confirmation arrived in time; the transaction may or may not have committed
    TimeoutOnCommit,
}

impl ErrorKind {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Persistent => "persistent",
            ErrorKind::TimeoutOnCommit => "timeout_on_commit",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified invocation error
///
/// Exactly one variant describes each failed attempt. `cause` carries the
/// error embedded in the commit event or returned by the client, if any.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// Retry-eligible failure
    #[error("Transient error: {message}{}", fmt_cause(.cause))]
    Transient {
        /// What failed
        message: String,
        /// Underlying error reported by the ledger or client
        cause: Option<String>,
    },

    /// Terminal rejection
    #[error("Persistent error: {message}{}", fmt_cause(.cause))]
    Persistent {
        /// What failed
        message: String,
        /// Underlying error reported by the ledger or client
        cause: Option<String>,
    },

    /// Commit status never arrived
    #[error("Timeout on commit: {message}")]
    TimeoutOnCommit {
        /// What timed out
        message: String,
    },
}

fn fmt_cause(cause: &Option<String>) -> String {
    match cause {
        Some(cause) => format!(": {}", cause),
        None => String::new(),
    }
}

impl InvokeError {
    /// Transient error without an underlying cause
    pub fn transient(message: impl Into<String>) -> Self {
        InvokeError::Transient {
            message: message.into(),
            cause: None,
        }
    }

    /// Persistent error without an underlying cause
    pub fn persistent(message: impl Into<String>) -> Self {
        InvokeError::Persistent {
            message: message.into(),
            cause: None,
        }
    }

    /// Commit timeout
    pub fn timeout_on_commit(message: impl Into<String>) -> Self {
        InvokeError::TimeoutOnCommit {
            message: message.into(),
        }
    }

    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvokeError::Transient { .. } => ErrorKind::Transient,
            InvokeError::Persistent { .. } => ErrorKind::Persistent,
            InvokeError::TimeoutOnCommit { .. } => ErrorKind::TimeoutOnCommit,
        }
    }

    /// Whether a resubmission may succeed
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<SubmitError> for InvokeError {
    fn from(err: SubmitError) -> Self {
        InvokeError::Transient {
            message: "SendTransactionProposal returned error".to_string(),
            cause: Some(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_error_is_transient() {
        let err: InvokeError = SubmitError::Network("connection refused".into()).into();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_display_without_cause() {
        let err = InvokeError::persistent("endorsement policy failure");
        assert_eq!(err.to_string(), "Persistent error: endorsement policy failure");
    }
}
