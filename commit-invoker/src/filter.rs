//! Response filter applied to endorsement responses before a transaction is sent for ordering

use crate::error::SubmitError;
use crate::printer::Printer;
use crate::types::ProposalResponse;
use std::sync::Arc;

/// Filter over the endorsement responses of one proposal
///
/// Built fresh for each submission and handed to the channel client, which
/// calls [`ResponseFilter::process`] before broadcasting.
#[derive(Debug, Clone)]
pub struct ResponseFilter {
    verbose: bool,
    printer: Arc<dyn Printer>,
}

impl ResponseFilter {
    /// Create new response filter
    pub fn new(verbose: bool, printer: Arc<dyn Printer>) -> Self {
        Self { verbose, printer }
    }

    /// Whether responses are printed
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Inspect responses, printing them when verbose
    ///
    /// Rejects an empty set, any non-success status, and payloads that
    /// differ between endorsers.
    pub fn process(
        &self,
        responses: Vec<ProposalResponse>,
    ) -> Result<Vec<ProposalResponse>, SubmitError> {
        if self.verbose {
            self.printer.print_responses(&responses);
        }

        let first = responses
            .first()
            .ok_or_else(|| SubmitError::Filtered("no endorsement responses".to_string()))?;

        if let Some(bad) = responses
            .iter()
            .find(|r| r.status != ProposalResponse::STATUS_OK)
        {
            return Err(SubmitError::Filtered(format!(
                "endorser {} returned status {}: {}",
                bad.endorser, bad.status, bad.message
            )));
        }

        if let Some(diverging) = responses.iter().find(|r| r.payload != first.payload) {
            return Err(SubmitError::Filtered(format!(
                "payload from {} does not match payload from {}",
                diverging.endorser, first.endorser
            )));
        }

        Ok(responses)
    }
}
