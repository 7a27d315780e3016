//! Dry-run executor
//!
//! Produces a placeholder value for every task, shaped after the task's
//! declared codomain, so a program can be exercised end to end before any
//! real task exists.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::interpreter::{TaskExecutor, TaskFailure, Val};
use crate::types::{Type, TypeEnvironment};

pub struct SimulatedExecutor {
    env: TypeEnvironment,
    latency: Duration,
}

impl SimulatedExecutor {
    /// `env` must hold a signature for every task the program dispatches;
    /// functors are expanded by the interpreter and never reach the executor.
    pub fn new(env: TypeEnvironment) -> Self {
        Self {
            env,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

/// Placeholder value of type `ty`
fn shape(ty: &Type, task: &str, input: &Val) -> Val {
    match ty {
        Type::Unit => Val::Unit,
        Type::Monomorphic { name } => Val::data(
            name.clone(),
            json!({ "task": task, "input": input.to_json() }),
        ),
        Type::Product { left, right } => {
            Val::pair(shape(left, task, input), shape(right, task, input))
        }
        // `a -> a` and friends: the only honest answer is the input itself.
        Type::Variable { .. } => input.clone(),
        Type::Function { .. } => Val::untyped(json!({ "task": task })),
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    async fn run(
        &self,
        task: &str,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<Val, TaskFailure> {
        let Some(signature) = self.env.get(task) else {
            return Err(TaskFailure::failed(format!(
                "no signature for task '{}'",
                task
            )));
        };

        if !self.latency.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.latency) => {}
                _ = cancel.cancelled() => return Err(TaskFailure::Cancelled),
            }
        }

        let (_, codomain) = signature.arrow();
        let output = shape(&codomain, task, &input);
        tracing::debug!(task, output = %output, "simulated task");
        Ok(output)
    }
}
