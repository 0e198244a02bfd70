//! Invocation runner binary
//!
//! Runs a batch of invocations against a simulated channel and prints the
//! summary. Configuration comes from the TOML file named by `INVOKER_CONFIG`,
//! or from `INVOKER_*` environment variables (for example `INVOKER_ITERATIONS`,
//! `INVOKER_MAX_ATTEMPTS`, `INVOKER_QUEUE_SIZE`; see [`Config::from_vars`]).

use anyhow::Context;
use commit_invoker::{
    run_invocations, CallArgs, Config, Executor, InvokeContext, InvokeMetrics, RetryPolicy,
    SimulatedChannel,
};
use std::sync::Arc;

const DEFAULT_ARGS: &str = r#"{"Func":"move","Args":["a","b","1"]}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting commit invoker");

    // Load configuration
    let config = match std::env::var("INVOKER_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env().context("loading configuration from environment")?,
    };

    let args_json = std::env::var("INVOKER_ARGS").unwrap_or_else(|_| DEFAULT_ARGS.to_string());
    let args = CallArgs::from_json(&args_json).context("parsing INVOKER_ARGS")?;

    let conflict_rate = match std::env::var("INVOKER_SIM_CONFLICT_RATE") {
        Ok(rate) => rate.parse().context("parsing INVOKER_SIM_CONFLICT_RATE")?,
        Err(_) => 0.2,
    };

    let metrics = InvokeMetrics::new()?;
    let ctx = InvokeContext::from_config(&config).with_metrics(metrics.clone());
    let client = Arc::new(SimulatedChannel::new().with_conflict_rate(conflict_rate));
    let executor = Executor::spawn(&config.executor);

    let summary = run_invocations(
        client,
        &ctx,
        &executor,
        &args,
        RetryPolicy::from(&config.retry),
        config.output.iterations,
    )
    .await;

    executor.shutdown().await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    tracing::debug!("Metrics:\n{}", metrics.gather_text()?);

    tracing::info!("Shutting down commit invoker");
    Ok(())
}
