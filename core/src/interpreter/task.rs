//! Boundary to leaf task execution
//!
//! The interpreter never performs work itself. Every leaf task is handed to a
//! [`TaskExecutor`], which may finish synchronously or await arbitrarily long
//! I/O; the interpreter only decides ordering and concurrency.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::typed::TypeViolation;
use super::values::Val;

/// Why a single leaf task failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskFailure {
    #[error("{0}")]
    Failed(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    /// The executor observed cancellation and stopped early
    #[error("cancelled")]
    Cancelled,
}

impl TaskFailure {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskFailure::Failed(message.into())
    }
}

/// Failure of an `execute` call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// A leaf task failed; carries the task and the input it was given
    #[error("task '{task}' failed on input {input}: {source}")]
    Task {
        task: String,
        input: Val,
        source: TaskFailure,
    },
    #[error("execution cancelled")]
    Cancelled,
    /// Strict runtime type check failed
    #[error(transparent)]
    TypeViolation(#[from] TypeViolation),
}

impl ExecutionError {
    /// Name of the task that failed, when a task is to blame
    pub fn task(&self) -> Option<&str> {
        match self {
            ExecutionError::Task { task, .. } => Some(task),
            ExecutionError::TypeViolation(violation) => Some(&violation.task),
            ExecutionError::Cancelled => None,
        }
    }
}

/// Runs leaf tasks by name.
///
/// `cancel` is triggered when the surrounding run no longer needs the
/// result (caller cancellation, or a failed sibling under a fail-fast
/// product). Implementations that hold resources should watch it; the
/// interpreter also stops awaiting the call as soon as it fires.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn run(
        &self,
        task: &str,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<Val, TaskFailure>;
}

#[async_trait]
impl<E: TaskExecutor + ?Sized> TaskExecutor for Arc<E> {
    async fn run(
        &self,
        task: &str,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<Val, TaskFailure> {
        (**self).run(task, input, cancel).await
    }
}

#[async_trait]
impl<E: TaskExecutor + ?Sized> TaskExecutor for Box<E> {
    async fn run(
        &self,
        task: &str,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<Val, TaskFailure> {
        (**self).run(task, input, cancel).await
    }
}
