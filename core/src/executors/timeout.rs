//! Per-task deadline

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::interpreter::{TaskExecutor, TaskFailure, Val};

/// Fails any task of `inner` that runs longer than `timeout` with
/// [`TaskFailure::TimedOut`].
pub struct TimeoutExecutor<E> {
    inner: E,
    timeout: Duration,
}

impl<E: TaskExecutor> TimeoutExecutor<E> {
    pub fn new(inner: E, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: TaskExecutor> TaskExecutor for TimeoutExecutor<E> {
    async fn run(
        &self,
        task: &str,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<Val, TaskFailure> {
        match tokio::time::timeout(self.timeout, self.inner.run(task, input, cancel)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(task, timeout = ?self.timeout, "task timed out");
                Err(TaskFailure::TimedOut(self.timeout))
            }
        }
    }
}
