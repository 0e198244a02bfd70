//! Classification of commit outcomes
//!
//! | Validation code | Classification |
//! |---|---|
//! | `VALID` | success |
//! | `DUPLICATE_TXID`, `MVCC_READ_CONFLICT`, `PHANTOM_READ_CONFLICT` | [`InvokeError::Transient`] |
//! | anything else | [`InvokeError::Persistent`] |

use crate::error::InvokeError;
use crate::types::{TxStatusEvent, ValidationCode};

/// Classify a commit status event
pub fn classify_commit(event: &TxStatusEvent) -> Result<(), InvokeError> {
    classify_code(event.validation_code, &event.tx_id.to_string(), event.error.clone())
}

/// Classify a validation code reported for `tx_id`
pub fn classify_code(
    code: ValidationCode,
    tx_id: &str,
    cause: Option<String>,
) -> Result<(), InvokeError> {
    if code == ValidationCode::Valid {
        return Ok(());
    }

    let message = format!(
        "invoke error received from event hub for TxID [{}], code: {}",
        tx_id, code
    );

    if code.is_transient_conflict() {
        Err(InvokeError::Transient { message, cause })
    } else {
        Err(InvokeError::Persistent { message, cause })
    }
}
