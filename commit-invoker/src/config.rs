//! Configuration for the invoker

use crate::printer::PrintFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Invoker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Channel the chaincode is installed on
    pub channel_id: String,

    /// Target chaincode
    pub chaincode_id: String,

    /// Request and commit-wait timeout (milliseconds)
    pub timeout_ms: u64,

    /// Print endorsement responses
    pub verbose: bool,

    /// Retry configuration
    pub retry: RetryConfig,

    /// Executor configuration
    pub executor: ExecutorConfig,

    /// Output configuration
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "commit-invoker".to_string(),
            channel_id: "mychannel".to_string(),
            chaincode_id: "example_cc".to_string(),
            timeout_ms: 10_000,
            verbose: false,
            retry: RetryConfig::default(),
            executor: ExecutorConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per invocation (>= 1)
    pub max_attempts: u32,

    /// Delay before a resubmission (milliseconds)
    pub resubmit_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            resubmit_delay_ms: 1_000,
        }
    }
}

impl RetryConfig {
    /// Resubmission delay
    pub fn resubmit_delay(&self) -> Duration {
        Duration::from_millis(self.resubmit_delay_ms)
    }
}

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Worker tasks draining the queue
    pub concurrency: usize,

    /// Bounded queue capacity
    pub queue_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            queue_size: 1000,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Format used when printing responses
    pub format: PrintFormat,

    /// Number of invocations the runner performs
    pub iterations: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: PrintFormat::Display,
            iterations: 1,
        }
    }
}

impl Config {
    /// Request and commit-wait timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `INVOKER_*` environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load from variables resolved by `lookup`, starting from the defaults
    pub fn from_vars<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(channel) = lookup("INVOKER_CHANNEL_ID") {
            config.channel_id = channel;
        }

        if let Some(cc) = lookup("INVOKER_CHAINCODE_ID") {
            config.chaincode_id = cc;
        }

        if let Some(timeout) = lookup("INVOKER_TIMEOUT_MS") {
            config.timeout_ms = parse_env("INVOKER_TIMEOUT_MS", &timeout)?;
        }

        if let Some(attempts) = lookup("INVOKER_MAX_ATTEMPTS") {
            config.retry.max_attempts = parse_env("INVOKER_MAX_ATTEMPTS", &attempts)?;
        }

        if let Some(delay) = lookup("INVOKER_RESUBMIT_DELAY_MS") {
            config.retry.resubmit_delay_ms = parse_env("INVOKER_RESUBMIT_DELAY_MS", &delay)?;
        }

        if let Some(concurrency) = lookup("INVOKER_CONCURRENCY") {
            config.executor.concurrency = parse_env("INVOKER_CONCURRENCY", &concurrency)?;
        }

        if let Some(queue_size) = lookup("INVOKER_QUEUE_SIZE") {
            config.executor.queue_size = parse_env("INVOKER_QUEUE_SIZE", &queue_size)?;
        }

        if let Some(verbose) = lookup("INVOKER_VERBOSE") {
            config.verbose = parse_env("INVOKER_VERBOSE", &verbose)?;
        }

        if let Some(format) = lookup("INVOKER_OUTPUT_FORMAT") {
            config.output.format = parse_env("INVOKER_OUTPUT_FORMAT", &format)?;
        }

        if let Some(iterations) = lookup("INVOKER_ITERATIONS") {
            config.output.iterations = parse_env("INVOKER_ITERATIONS", &iterations)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the tasks rely on
    pub fn validate(&self) -> crate::Result<()> {
        if self.chaincode_id.is_empty() {
            return Err(crate::Error::Config("chaincode_id must not be empty".to_string()));
        }
        if self.retry.max_attempts < 1 {
            return Err(crate::Error::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.executor.concurrency < 1 {
            return Err(crate::Error::Config("executor.concurrency must be at least 1".to_string()));
        }
        if self.executor.queue_size < 1 {
            return Err(crate::Error::Config("executor.queue_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> crate::Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {}='{}': {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "commit-invoker");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_with_partial_tables() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
chaincode_id = "marbles"
timeout_ms = 500

[retry]
max_attempts = 5
resubmit_delay_ms = 20
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.chaincode_id, "marbles");
        assert_eq!(config.timeout(), Duration::from_millis(500));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.resubmit_delay(), Duration::from_millis(20));
        assert_eq!(config.executor.concurrency, 4);
    }

    #[test]
    fn test_from_vars_covers_executor_and_output() {
        let vars: HashMap<&str, &str> = [
            ("INVOKER_CHAINCODE_ID", "marbles"),
            ("INVOKER_QUEUE_SIZE", "64"),
            ("INVOKER_OUTPUT_FORMAT", "json"),
            ("INVOKER_ITERATIONS", "25"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.chaincode_id, "marbles");
        assert_eq!(config.executor.queue_size, 64);
        assert_eq!(config.output.format, PrintFormat::Json);
        assert_eq!(config.output.iterations, 25);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_from_vars_rejects_bad_value() {
        let err = Config::from_vars(|name| {
            (name == "INVOKER_OUTPUT_FORMAT").then(|| "yaml".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("INVOKER_OUTPUT_FORMAT"));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
