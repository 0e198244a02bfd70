//! Output sinks for endorsement responses

use crate::types::ProposalResponse;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rendering of a proposal response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintFormat {
    /// Human-readable line
    Display,
    /// JSON object
    Json,
    /// Payload bytes as-is
    Raw,
}

impl PrintFormat {
    /// Render a response in this format
    pub fn render(&self, response: &ProposalResponse) -> String {
        match self {
            PrintFormat::Display => format!(
                "endorser={} status={} message={:?} payload={}",
                response.endorser,
                response.status,
                response.message,
                String::from_utf8_lossy(&response.payload)
            ),
            PrintFormat::Json => serde_json::json!({
                "endorser": response.endorser,
                "status": response.status,
                "message": response.message,
                "payload": String::from_utf8_lossy(&response.payload),
            })
            .to_string(),
            PrintFormat::Raw => format!("{:?}", &response.payload[..]),
        }
    }
}

impl FromStr for PrintFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "display" => Ok(PrintFormat::Display),
            "json" => Ok(PrintFormat::Json),
            "raw" => Ok(PrintFormat::Raw),
            other => Err(format!("unknown print format: {}", other)),
        }
    }
}

/// Sink for endorsement responses printed by the response filter
pub trait Printer: Send + Sync + fmt::Debug {
    /// Print the responses of one proposal
    fn print_responses(&self, responses: &[ProposalResponse]);
}

/// Printer writing through `tracing`
#[derive(Debug, Clone)]
pub struct LogPrinter {
    format: PrintFormat,
}

impl LogPrinter {
    /// Create new log printer
    pub fn new(format: PrintFormat) -> Self {
        Self { format }
    }
}

impl Printer for LogPrinter {
    fn print_responses(&self, responses: &[ProposalResponse]) {
        for (i, response) in responses.iter().enumerate() {
            tracing::info!("Response #{}: {}", i, self.format.render(response));
        }
    }
}

/// Printer keeping rendered lines in memory
#[derive(Debug)]
pub struct RecordingPrinter {
    format: PrintFormat,
    lines: Mutex<Vec<String>>,
}

impl RecordingPrinter {
    /// Create new recording printer
    pub fn new(format: PrintFormat) -> Self {
        Self {
            format,
            lines: Mutex::new(Vec::new()),
        }
    }

    /// Lines printed so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl Printer for RecordingPrinter {
    fn print_responses(&self, responses: &[ProposalResponse]) {
        let mut lines = self.lines.lock();
        lines.extend(responses.iter().map(|r| self.format.render(r)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_formats() {
        let response = ProposalResponse::ok("peer0", "100");

        assert!(PrintFormat::Display.render(&response).contains("payload=100"));

        let json: serde_json::Value =
            serde_json::from_str(&PrintFormat::Json.render(&response)).unwrap();
        assert_eq!(json["endorser"], "peer0");
        assert_eq!(json["status"], 200);

        assert_eq!(PrintFormat::Raw.render(&response), "[49, 48, 48]");
    }

    #[test]
    fn test_recording_printer() {
        let printer = RecordingPrinter::new(PrintFormat::Display);
        printer.print_responses(&[
            ProposalResponse::ok("peer0", "a"),
            ProposalResponse::ok("peer1", "a"),
        ]);
        assert_eq!(printer.lines().len(), 2);
    }
}
