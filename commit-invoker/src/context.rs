//! Read-only settings shared by every task

use crate::config::Config;
use crate::filter::ResponseFilter;
use crate::metrics::InvokeMetrics;
use crate::printer::{LogPrinter, Printer};
use std::sync::Arc;
use std::time::Duration;

/// Settings handed to each task at construction
///
/// Cheap to clone; tasks never mutate it.
#[derive(Debug, Clone)]
pub struct InvokeContext {
    chaincode_id: String,
    timeout: Duration,
    verbose: bool,
    printer: Arc<dyn Printer>,
    metrics: Option<InvokeMetrics>,
}

impl InvokeContext {
    /// Create new context
    pub fn new(chaincode_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            chaincode_id: chaincode_id.into(),
            timeout,
            verbose: false,
            printer: Arc::new(LogPrinter::new(crate::printer::PrintFormat::Display)),
            metrics: None,
        }
    }

    /// Build from configuration, printing through `tracing`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.chaincode_id.clone(), config.timeout())
            .with_verbose(config.verbose)
            .with_printer(Arc::new(LogPrinter::new(config.output.format)))
    }

    /// Print endorsement responses
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Replace the printer
    pub fn with_printer(mut self, printer: Arc<dyn Printer>) -> Self {
        self.printer = printer;
        self
    }

    /// Record metrics
    pub fn with_metrics(mut self, metrics: InvokeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Target chaincode
    pub fn chaincode_id(&self) -> &str {
        &self.chaincode_id
    }

    /// Request and commit-wait timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Metrics collector, if enabled
    pub fn metrics(&self) -> Option<&InvokeMetrics> {
        self.metrics.as_ref()
    }

    /// Fresh response filter for one submission
    pub fn response_filter(&self) -> ResponseFilter {
        ResponseFilter::new(self.verbose, self.printer.clone())
    }
}
