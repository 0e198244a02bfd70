//! End-to-end tests for invoke retry behaviour
//!
//! Tasks run on a real executor against a scripted channel:
//! - Transient failures resubmit until success or exhaustion
//! - Persistent failures and commit timeouts terminate immediately
//! - The callback fires exactly once per task

use commit_invoker::{
    config::ExecutorConfig, run_invocations, CallArgs, ErrorKind, Executor, InvokeContext,
    InvokeError, InvokeMetrics, InvokeTask, RetryPolicy, SimOutcome, SimulatedChannel, SubmitError,
    ValidationCode,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct Completion {
    attempts: u32,
    result: Result<(), InvokeError>,
    tx_id_assigned: bool,
}

struct Harness {
    executor: Executor,
    client: Arc<SimulatedChannel>,
    ctx: InvokeContext,
}

impl Harness {
    fn new(client: SimulatedChannel, commit_timeout: Duration) -> Self {
        Self {
            executor: Executor::spawn(&ExecutorConfig {
                concurrency: 2,
                queue_size: 16,
            }),
            client: Arc::new(client),
            ctx: InvokeContext::new("example_cc", commit_timeout),
        }
    }

    /// Submit one task and wait for its completion; asserts no second completion arrives
    async fn run(&self, policy: RetryPolicy) -> Completion {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = InvokeTask::new(
            "task-1",
            self.client.clone(),
            self.ctx.clone(),
            CallArgs::new("move", ["a", "b", "10"]),
            self.executor.clone(),
            policy,
            Box::new(move |task, result| {
                let _ = tx.send(Completion {
                    attempts: task.attempts(),
                    result,
                    tx_id_assigned: task.tx_id().is_some(),
                });
            }),
        );

        self.executor.submit(Box::new(task)).await.unwrap();

        let completion = tokio::time::timeout(TEST_TIMEOUT, rx.recv())
            .await
            .expect("task did not complete")
            .expect("callback dropped without firing");

        // The only sender lived in the callback; a closed channel proves a single firing.
        assert!(rx.recv().await.is_none());
        completion
    }
}

fn transients(n: usize) -> Vec<SimOutcome> {
    (0..n)
        .map(|_| SimOutcome::Commit(ValidationCode::MvccReadConflict))
        .collect()
}

#[tokio::test]
async fn test_transients_then_success() {
    for max_attempts in 1..=4u32 {
        let mut script = transients(max_attempts as usize - 1);
        script.push(SimOutcome::Commit(ValidationCode::Valid));

        let harness = Harness::new(
            SimulatedChannel::new().with_script(script),
            Duration::from_secs(1),
        );
        let done = harness
            .run(RetryPolicy::new(max_attempts, Duration::from_millis(1)))
            .await;

        assert!(done.result.is_ok(), "max_attempts={}", max_attempts);
        assert_eq!(done.attempts, max_attempts);
        assert_eq!(harness.client.submissions(), max_attempts as usize);
    }
}

#[tokio::test]
async fn test_exhausted_transients_report_last_error() {
    for max_attempts in 1..=4u32 {
        let mut script = transients(max_attempts as usize - 1);
        script.push(SimOutcome::Commit(ValidationCode::PhantomReadConflict));

        let harness = Harness::new(
            SimulatedChannel::new().with_script(script),
            Duration::from_secs(1),
        );
        let done = harness
            .run(RetryPolicy::new(max_attempts, Duration::from_millis(1)))
            .await;

        let err = done.result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.to_string().contains("PHANTOM_READ_CONFLICT"));
        assert_eq!(done.attempts, max_attempts);
        assert_eq!(harness.client.submissions(), max_attempts as usize);
    }
}

#[tokio::test]
async fn test_persistent_error_terminates_immediately() {
    let harness = Harness::new(
        SimulatedChannel::new().with_script([SimOutcome::CommitWithError(
            ValidationCode::BadRwset,
            "read-write set malformed".to_string(),
        )]),
        Duration::from_secs(1),
    );
    let done = harness
        .run(RetryPolicy::new(5, Duration::from_millis(1)))
        .await;

    let err = done.result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistent);
    assert!(err.to_string().contains("read-write set malformed"));
    assert_eq!(done.attempts, 1);
    assert_eq!(harness.client.submissions(), 1);
}

#[tokio::test]
async fn test_commit_timeout_is_not_retried() {
    for max_attempts in [1u32, 3] {
        let harness = Harness::new(
            SimulatedChannel::new().with_script([SimOutcome::NoCommit]),
            Duration::from_millis(50),
        );
        let done = harness
            .run(RetryPolicy::new(max_attempts, Duration::from_millis(1)))
            .await;

        assert_eq!(done.result.unwrap_err().kind(), ErrorKind::TimeoutOnCommit);
        assert_eq!(done.attempts, 1);
        assert!(done.tx_id_assigned);
        assert_eq!(harness.client.submissions(), 1);
    }
}

#[tokio::test]
async fn test_valid_succeeds_on_any_attempt() {
    let harness = Harness::new(
        SimulatedChannel::new().with_script([
            SimOutcome::SubmitError(SubmitError::Proposal("endorser unavailable".into())),
            SimOutcome::Commit(ValidationCode::DuplicateTxid),
            SimOutcome::Commit(ValidationCode::Valid),
        ]),
        Duration::from_secs(1),
    );
    let done = harness
        .run(RetryPolicy::new(10, Duration::from_millis(1)))
        .await;

    assert!(done.result.is_ok());
    assert_eq!(done.attempts, 3);
}

#[tokio::test]
async fn test_each_code_classifies_end_to_end() {
    for code in ValidationCode::all_defined() {
        let harness = Harness::new(
            SimulatedChannel::new().with_script([SimOutcome::Commit(code)]),
            Duration::from_secs(1),
        );
        let done = harness
            .run(RetryPolicy::new(1, Duration::ZERO))
            .await;

        match code {
            ValidationCode::Valid => assert!(done.result.is_ok()),
            ValidationCode::DuplicateTxid
            | ValidationCode::MvccReadConflict
            | ValidationCode::PhantomReadConflict => {
                assert_eq!(done.result.unwrap_err().kind(), ErrorKind::Transient, "{}", code)
            }
            _ => assert_eq!(done.result.unwrap_err().kind(), ErrorKind::Persistent, "{}", code),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_two_conflicts_then_valid_respects_delay() {
    let harness = Harness::new(
        SimulatedChannel::new().with_script([
            SimOutcome::Commit(ValidationCode::MvccReadConflict),
            SimOutcome::Commit(ValidationCode::MvccReadConflict),
            SimOutcome::Commit(ValidationCode::Valid),
        ]),
        Duration::from_secs(1),
    );

    let started = Instant::now();
    let done = harness
        .run(RetryPolicy::new(3, Duration::from_millis(10)))
        .await;

    assert!(done.result.is_ok());
    assert_eq!(done.attempts, 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_millis(30));
}

#[tokio::test]
async fn test_single_attempt_timeout() {
    let harness = Harness::new(
        SimulatedChannel::new()
            .with_script([SimOutcome::NoCommit])
            .with_commit_delay(Duration::from_millis(5)),
        Duration::from_millis(30),
    );
    let done = harness
        .run(RetryPolicy::new(1, Duration::from_millis(10)))
        .await;

    assert!(matches!(
        done.result,
        Err(InvokeError::TimeoutOnCommit { .. })
    ));
    assert_eq!(done.attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_commit_counts_as_timeout() {
    let harness = Harness::new(
        SimulatedChannel::new().with_commit_delay(Duration::from_millis(200)),
        Duration::from_millis(20),
    );
    let done = harness
        .run(RetryPolicy::new(3, Duration::from_millis(1)))
        .await;

    assert_eq!(done.result.unwrap_err().kind(), ErrorKind::TimeoutOnCommit);
    assert_eq!(done.attempts, 1);
    assert_eq!(harness.client.submissions(), 1);
}

#[tokio::test]
async fn test_each_attempt_submits_fresh_request() {
    let harness = Harness::new(
        SimulatedChannel::new().with_script(transients(2)),
        Duration::from_secs(1),
    );
    let done = harness
        .run(RetryPolicy::new(3, Duration::from_millis(1)))
        .await;
    assert!(done.result.is_ok());

    let requests = harness.client.invoke_requests();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(request.chaincode_id, "example_cc");
        assert_eq!(request.function, "move");
        assert_eq!(request.args.len(), 3);
    }
}

#[tokio::test]
async fn test_batch_summary_and_metrics() {
    let metrics = InvokeMetrics::new().unwrap();
    let client = Arc::new(SimulatedChannel::new().with_script([
        SimOutcome::Commit(ValidationCode::MvccReadConflict),
        SimOutcome::Commit(ValidationCode::EndorsementPolicyFailure),
    ]));
    let ctx = InvokeContext::new("example_cc", Duration::from_secs(1)).with_metrics(metrics.clone());
    let executor = Executor::spawn(&ExecutorConfig {
        concurrency: 1,
        queue_size: 16,
    });

    let summary = tokio::time::timeout(
        TEST_TIMEOUT,
        run_invocations(
            client.clone(),
            &ctx,
            &executor,
            &CallArgs::new("move", ["a", "b", "1"]),
            RetryPolicy::new(3, Duration::from_millis(1)),
            5,
        ),
    )
    .await
    .unwrap();

    assert_eq!(summary.iterations, 5);
    assert_eq!(summary.completed(), 5);
    assert_eq!(summary.persistent_failures, 1);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.total_attempts, 6);
    assert_eq!(client.submissions(), 6);

    assert_eq!(metrics.resubmissions_total.get(), 1);
    assert_eq!(
        metrics.attempts_total.with_label_values(&["invoke"]).get(),
        6
    );
    assert_eq!(
        metrics
            .outcomes_total
            .with_label_values(&["invoke", "success"])
            .get(),
        4
    );

    executor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_batch_on_stopped_executor_reports_every_task() {
    let executor = Executor::spawn(&ExecutorConfig::default());
    executor.shutdown().await.unwrap();

    let summary = run_invocations(
        Arc::new(SimulatedChannel::new()),
        &InvokeContext::new("example_cc", Duration::from_secs(1)),
        &executor,
        &CallArgs::new("move", ["a"]),
        RetryPolicy::new(1, Duration::ZERO),
        3,
    )
    .await;

    assert_eq!(summary.persistent_failures, 3);
    assert_eq!(summary.total_attempts, 3);
}
