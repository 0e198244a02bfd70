//! Core types for invocations
//!
//! Requests are immutable per attempt; a fresh request is built from
//! [`CallArgs`] every time a task submits.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction identifier assigned by the channel client on submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(String);

impl TxId {
    /// Create new transaction ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Function name and string arguments of a chaincode call
///
/// Parsed from the JSON form `{"Func":"move","Args":["a","b","10"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallArgs {
    /// Chaincode function
    #[serde(rename = "Func")]
    pub func: String,

    /// Positional arguments
    #[serde(rename = "Args", default)]
    pub args: Vec<String>,
}

impl CallArgs {
    /// Create call arguments
    pub fn new<I, S>(func: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            func: func.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let args: CallArgs = serde_json::from_str(json)?;
        if args.func.is_empty() {
            return Err(crate::Error::InvalidArgs("function name is empty".to_string()));
        }
        Ok(args)
    }

    /// Arguments as wire bytes, in order
    pub fn as_bytes(&self) -> Vec<Bytes> {
        self.args
            .iter()
            .map(|arg| Bytes::copy_from_slice(arg.as_bytes()))
            .collect()
    }
}

/// State-changing chaincode request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    /// Target chaincode
    pub chaincode_id: String,
    /// Function name
    pub function: String,
    /// Ordered wire arguments
    pub args: Vec<Bytes>,
}

impl InvokeRequest {
    /// Build a request for `chaincode_id` from call arguments
    pub fn new(chaincode_id: impl Into<String>, call: &CallArgs) -> Self {
        Self {
            chaincode_id: chaincode_id.into(),
            function: call.func.clone(),
            args: call.as_bytes(),
        }
    }
}

/// Read-only chaincode request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Target chaincode
    pub chaincode_id: String,
    /// Function name
    pub function: String,
    /// Ordered wire arguments
    pub args: Vec<Bytes>,
}

impl QueryRequest {
    /// Build a request for `chaincode_id` from call arguments
    pub fn new(chaincode_id: impl Into<String>, call: &CallArgs) -> Self {
        Self {
            chaincode_id: chaincode_id.into(),
            function: call.func.clone(),
            args: call.as_bytes(),
        }
    }
}

/// Endorsement response returned by a peer for a proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalResponse {
    /// Endorsing peer
    pub endorser: String,
    /// Chaincode response status (200 is success)
    pub status: i32,
    /// Status message
    pub message: String,
    /// Response payload
    pub payload: Bytes,
}

impl ProposalResponse {
    /// Chaincode status for a successful endorsement
    pub const STATUS_OK: i32 = 200;

    /// Successful response carrying `payload`
    pub fn ok(endorser: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            endorser: endorser.into(),
            status: Self::STATUS_OK,
            message: String::new(),
            payload: payload.into(),
        }
    }
}

/// Commit status notification for a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxStatusEvent {
    /// Transaction the status refers to
    pub tx_id: TxId,
    /// Validation outcome
    pub validation_code: ValidationCode,
    /// Error reported alongside the status, if any
    pub error: Option<String>,
}

/// Transaction validation code reported by the committing peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    /// Committed
    Valid,
    /// Envelope missing
    NilEnvelope,
    /// Payload malformed
    BadPayload,
    /// Common header malformed
    BadCommonHeader,
    /// Creator signature invalid
    BadCreatorSignature,
    /// Endorser transaction invalid
    InvalidEndorserTransaction,
    /// Config transaction invalid
    InvalidConfigTransaction,
    /// Payload type unsupported
    UnsupportedTxPayload,
    /// Proposal tx id mismatch
    BadProposalTxid,
    /// Tx id already committed
    DuplicateTxid,
    /// Endorsement policy not satisfied
    EndorsementPolicyFailure,
    /// Read set stale at commit time
    MvccReadConflict,
    /// Range query result changed at commit time
    PhantomReadConflict,
    /// Transaction type unknown
    UnknownTxType,
    /// Target channel not found
    TargetChainNotFound,
    /// Marshalling failed
    MarshalTxError,
    /// Transaction action missing
    NilTxaction,
    /// Chaincode expired
    ExpiredChaincode,
    /// Chaincode version changed
    ChaincodeVersionConflict,
    /// Header extension malformed
    BadHeaderExtension,
    /// Channel header malformed
    BadChannelHeader,
    /// Response payload malformed
    BadResponsePayload,
    /// Read-write set malformed
    BadRwset,
    /// Write set illegal
    IllegalWriteset,
    /// Write set invalid
    InvalidWriteset,
    /// Transaction was not validated
    NotValidated,
    /// Rejected for a reason without a dedicated code
    InvalidOtherReason,
    /// Code outside the known table
    Unknown(i32),
}

const CODE_TABLE: &[(ValidationCode, i32, &str)] = &[
    (ValidationCode::Valid, 0, "VALID"),
    (ValidationCode::NilEnvelope, 1, "NIL_ENVELOPE"),
    (ValidationCode::BadPayload, 2, "BAD_PAYLOAD"),
    (ValidationCode::BadCommonHeader, 3, "BAD_COMMON_HEADER"),
    (ValidationCode::BadCreatorSignature, 4, "BAD_CREATOR_SIGNATURE"),
    (ValidationCode::InvalidEndorserTransaction, 5, "INVALID_ENDORSER_TRANSACTION"),
    (ValidationCode::InvalidConfigTransaction, 6, "INVALID_CONFIG_TRANSACTION"),
    (ValidationCode::UnsupportedTxPayload, 7, "UNSUPPORTED_TX_PAYLOAD"),
    (ValidationCode::BadProposalTxid, 8, "BAD_PROPOSAL_TXID"),
    (ValidationCode::DuplicateTxid, 9, "DUPLICATE_TXID"),
    (ValidationCode::EndorsementPolicyFailure, 10, "ENDORSEMENT_POLICY_FAILURE"),
    (ValidationCode::MvccReadConflict, 11, "MVCC_READ_CONFLICT"),
    (ValidationCode::PhantomReadConflict, 12, "PHANTOM_READ_CONFLICT"),
    (ValidationCode::UnknownTxType, 13, "UNKNOWN_TX_TYPE"),
    (ValidationCode::TargetChainNotFound, 14, "TARGET_CHAIN_NOT_FOUND"),
    (ValidationCode::MarshalTxError, 15, "MARSHAL_TX_ERROR"),
    (ValidationCode::NilTxaction, 16, "NIL_TXACTION"),
    (ValidationCode::ExpiredChaincode, 17, "EXPIRED_CHAINCODE"),
    (ValidationCode::ChaincodeVersionConflict, 18, "CHAINCODE_VERSION_CONFLICT"),
    (ValidationCode::BadHeaderExtension, 19, "BAD_HEADER_EXTENSION"),
    (ValidationCode::BadChannelHeader, 20, "BAD_CHANNEL_HEADER"),
    (ValidationCode::BadResponsePayload, 21, "BAD_RESPONSE_PAYLOAD"),
    (ValidationCode::BadRwset, 22, "BAD_RWSET"),
    (ValidationCode::IllegalWriteset, 23, "ILLEGAL_WRITESET"),
    (ValidationCode::InvalidWriteset, 24, "INVALID_WRITESET"),
    (ValidationCode::NotValidated, 254, "NOT_VALIDATED"),
    (ValidationCode::InvalidOtherReason, 255, "INVALID_OTHER_REASON"),
];

impl ValidationCode {
    /// Every code with a defined number, in numeric order
    pub fn all_defined() -> impl Iterator<Item = ValidationCode> {
        CODE_TABLE.iter().map(|(code, _, _)| *code)
    }

    /// Decode a numeric validation code
    pub fn from_code(value: i32) -> Self {
        CODE_TABLE
            .iter()
            .find(|(_, num, _)| *num == value)
            .map(|(code, _, _)| *code)
            .unwrap_or(ValidationCode::Unknown(value))
    }

    /// Numeric validation code
    pub fn code(&self) -> i32 {
        match self {
            ValidationCode::Unknown(value) => *value,
            known => CODE_TABLE
                .iter()
                .find(|(code, _, _)| code == known)
                .map(|(_, num, _)| *num)
                .unwrap_or_default(),
        }
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        CODE_TABLE
            .iter()
            .find(|(code, _, _)| code == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("UNKNOWN")
    }

    /// Ordering conflicts that are expected to clear on resubmission
    pub fn is_transient_conflict(&self) -> bool {
        matches!(
            self,
            ValidationCode::DuplicateTxid
                | ValidationCode::MvccReadConflict
                | ValidationCode::PhantomReadConflict
        )
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationCode::Unknown(value) => write!(f, "UNKNOWN({})", value),
            known => f.write_str(known.name()),
        }
    }
}
