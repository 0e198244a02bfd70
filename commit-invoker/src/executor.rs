//! Task executor
//!
//! A bounded queue drained by a fixed pool of tokio workers. Tasks own
//! themselves: a task that wants to run again hands its own box back via
//! [`Executor::submit_delayed`].
//!
//! ```text
//!   submit / submit_delayed
//!            │
//!            ▼
//!   mpsc::channel (bounded) ──► worker 0..N ──► Task::invoke(self: Box<Self>)
//!                                                    │
//!                                                    └─► submit_delayed(self, delay)
//! ```

use crate::config::ExecutorConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Unit of scheduled work
#[async_trait]
pub trait Task: Send + 'static {
    /// Run the task, consuming it
    async fn invoke(self: Box<Self>);
}

type BoxedTask = Box<dyn Task>;

/// A task the executor refused, handed back to the caller
pub struct Rejected<T> {
    /// The refused task
    pub task: Box<T>,
    /// Why it was refused
    pub reason: Error,
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Handle to a running worker pool
#[derive(Clone)]
pub struct Executor {
    sender: mpsc::Sender<BoxedTask>,
    stopped: Arc<AtomicBool>,
    shutdown: Arc<watch::Sender<bool>>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("stopped", &self.is_stopped())
            .field("queue_capacity", &self.sender.capacity())
            .finish()
    }
}

impl Executor {
    /// Spawn the worker pool; must be called inside a tokio runtime
    pub fn spawn(config: &ExecutorConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<BoxedTask>(config.queue_size.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let (shutdown, _) = watch::channel(false);

        let workers = (0..config.concurrency.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let mut shutdown_rx = shutdown.subscribe();

                tokio::spawn(async move {
                    debug!(worker_id, "Executor worker started");

                    loop {
                        let next = tokio::select! {
                            task = async { receiver.lock().await.recv().await } => task,
                            _ = shutdown_rx.changed() => None,
                        };

                        match next {
                            Some(task) => task.invoke().await,
                            None => break,
                        }
                    }

                    debug!(worker_id, "Executor worker stopped");
                })
            })
            .collect();

        info!(
            concurrency = config.concurrency,
            queue_size = config.queue_size,
            "Executor started"
        );

        Self {
            sender,
            stopped: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(shutdown),
            workers: Arc::new(Mutex::new(workers)),
        }
    }

    /// Whether [`Executor::shutdown`] has been called
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Queue a task for immediate execution, waiting for queue capacity
    pub async fn submit<T: Task>(&self, task: Box<T>) -> std::result::Result<(), Rejected<T>> {
        if self.is_stopped() {
            return Err(Rejected {
                task,
                reason: Error::Executor("executor is stopped".to_string()),
            });
        }

        match self.sender.reserve().await {
            Ok(permit) => {
                permit.send(task);
                Ok(())
            }
            Err(_) => Err(Rejected {
                task,
                reason: Error::Executor("executor queue is closed".to_string()),
            }),
        }
    }

    /// Queue a task after `delay`
    ///
    /// Fails only if the executor is already stopped. If it stops while the
    /// delay is pending, the task is dropped when the delay elapses.
    pub fn submit_delayed<T: Task>(
        &self,
        task: Box<T>,
        delay: Duration,
    ) -> std::result::Result<(), Rejected<T>> {
        if self.is_stopped() {
            return Err(Rejected {
                task,
                reason: Error::Executor("executor is stopped".to_string()),
            });
        }

        let executor = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(rejected) = executor.submit(task).await {
                warn!("Dropping delayed task: {}", rejected.reason);
            }
        });

        Ok(())
    }

    /// Stop accepting tasks and wait for workers to finish their current task
    ///
    /// Tasks still queued are dropped.
    pub async fn shutdown(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        info!("Shutting down executor");
        let _ = self.shutdown.send(true);

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            worker
                .await
                .map_err(|e| Error::Executor(format!("worker panicked: {}", e)))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    struct CountTask {
        counter: Arc<AtomicUsize>,
        done: Option<oneshot::Sender<()>>,
    }

    #[async_trait]
    impl Task for CountTask {
        async fn invoke(self: Box<Self>) {
            let mut task = self;
            task.counter.fetch_add(1, Ordering::SeqCst);
            if let Some(done) = task.done.take() {
                let _ = done.send(());
            }
        }
    }

    fn count_task(counter: &Arc<AtomicUsize>) -> (Box<CountTask>, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let task = Box::new(CountTask {
            counter: Arc::clone(counter),
            done: Some(tx),
        });
        (task, rx)
    }

    #[tokio::test]
    async fn test_submit_runs_task() {
        let executor = Executor::spawn(&ExecutorConfig::default());
        let counter = Arc::new(AtomicUsize::new(0));

        let (task, done) = count_task(&counter);
        executor.submit(task).await.unwrap();
        done.await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        executor.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_delayed_waits() {
        let executor = Executor::spawn(&ExecutorConfig::default());
        let counter = Arc::new(AtomicUsize::new(0));

        let start = tokio::time::Instant::now();
        let (task, done) = count_task(&counter);
        executor
            .submit_delayed(task, Duration::from_millis(30))
            .unwrap();
        done.await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(30));
        executor.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stopped_executor_hands_task_back() {
        let executor = Executor::spawn(&ExecutorConfig::default());
        executor.shutdown().await.unwrap();
        assert!(executor.is_stopped());

        let counter = Arc::new(AtomicUsize::new(0));
        let (task, _done) = count_task(&counter);
        let rejected = executor
            .submit_delayed(task, Duration::from_millis(1))
            .unwrap_err();
        assert!(matches!(rejected.reason, Error::Executor(_)));

        let (task, _done) = count_task(&counter);
        assert!(executor.submit(task).await.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
