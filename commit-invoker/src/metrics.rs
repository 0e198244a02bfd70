//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `invoker_attempts_total` - Submission attempts, by task type
//! - `invoker_outcomes_total` - Terminal outcomes, by task type and result
//! - `invoker_resubmissions_total` - Resubmissions scheduled after transient errors
//! - `invoker_commit_wait_seconds` - Time spent waiting for commit status

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct InvokeMetrics {
    /// Submission attempts
    pub attempts_total: IntCounterVec,

    /// Terminal outcomes
    pub outcomes_total: IntCounterVec,

    /// Resubmissions scheduled
    pub resubmissions_total: IntCounter,

    /// Commit wait duration histogram
    pub commit_wait: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl fmt::Debug for InvokeMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeMetrics")
            .field("resubmissions_total", &self.resubmissions_total.get())
            .field("commit_wait_samples", &self.commit_wait.get_sample_count())
            .finish_non_exhaustive()
    }
}

impl InvokeMetrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let attempts_total = IntCounterVec::new(
            Opts::new("invoker_attempts_total", "Submission attempts"),
            &["task"],
        )?;
        registry.register(Box::new(attempts_total.clone()))?;

        let outcomes_total = IntCounterVec::new(
            Opts::new("invoker_outcomes_total", "Terminal outcomes"),
            &["task", "result"],
        )?;
        registry.register(Box::new(outcomes_total.clone()))?;

        let resubmissions_total = IntCounter::new(
            "invoker_resubmissions_total",
            "Resubmissions scheduled after transient errors",
        )?;
        registry.register(Box::new(resubmissions_total.clone()))?;

        let commit_wait = Histogram::with_opts(
            HistogramOpts::new(
                "invoker_commit_wait_seconds",
                "Time spent waiting for commit status",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(commit_wait.clone()))?;

        Ok(Self {
            attempts_total,
            outcomes_total,
            resubmissions_total,
            commit_wait,
            registry,
        })
    }

    /// Record a submission attempt
    pub fn record_attempt(&self, task: &str) {
        self.attempts_total.with_label_values(&[task]).inc();
    }

    /// Record a terminal outcome; `result` is `success` or an error kind label
    pub fn record_outcome(&self, task: &str, result: &str) {
        self.outcomes_total.with_label_values(&[task, result]).inc();
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> crate::Result<String> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::Error::Other(e.to_string()))
    }
}
