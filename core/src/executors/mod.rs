//! Built-in task executors
//!
//! - [`SimulatedExecutor`]: dry-run executor driven by type signatures
//! - [`TimeoutExecutor`]: per-task deadline around any other executor
//! - [`FnExecutor`]: adapts a synchronous closure

mod simulated;
mod timeout;


use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::interpreter::{TaskExecutor, TaskFailure, Val};

pub use simulated::SimulatedExecutor;
pub use timeout::TimeoutExecutor;

/// Executor backed by a plain function of `(task, input)`.
///
/// The function runs inline on the polling task, so it should not block.
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&str, Val) -> Result<Val, TaskFailure> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> TaskExecutor for FnExecutor<F>
where
    F: Fn(&str, Val) -> Result<Val, TaskFailure> + Send + Sync,
{
    async fn run(
        &self,
        task: &str,
        input: Val,
        _cancel: &CancellationToken,
    ) -> Result<Val, TaskFailure> {
        (self.f)(task, input)
    }
}
