//! # Interpreter
//!
//! Executes a parsed program against a [`TaskExecutor`].
//!
//! ## Semantics
//!
//! - **Literal**: a functor name evaluates its bound body; anything else is
//!   handed to the executor. This is the only place execution suspends.
//! - **Composition** `outer ∘ inner`: `inner` runs to completion first and its
//!   result is the input of `outer`. The data dependency makes overlap
//!   impossible.
//! - **Product** `left × right`: both branches are started before either is
//!   awaited and receive the same input; the result is the pair of outputs.
//!   On failure the [`ProductPolicy`] decides whether the sibling is
//!   cancelled or allowed to finish.
//!
//! The interpreter owns no threads. Branch concurrency comes from polling
//! both branch futures together; parallelism beyond that is up to the
//! executor.

mod task;
pub mod typed;
mod values;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::ast::{Node, Program};

pub use task::{ExecutionError, TaskExecutor, TaskFailure};
pub use typed::{TypeViolation, TypedInterpreter, TypedOutcome};
pub use values::Val;

/* ===================== Product Policy ===================== */

/// What a product does when one branch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductPolicy {
    /// Cancel the sibling and report the first failure
    #[default]
    FailFast,
    /// Let the sibling finish, then report the left failure if any,
    /// otherwise the right one
    WaitAll,
}

impl fmt::Display for ProductPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductPolicy::FailFast => write!(f, "fail_fast"),
            ProductPolicy::WaitAll => write!(f, "wait_all"),
        }
    }
}

/* ===================== Hooks ===================== */

/// Observer invoked after every literal produces a value.
///
/// Returning an error aborts the run with that error.
pub trait ExecutionHook: Send + Sync {
    fn after_literal(&self, node: &Node, name: &str, output: &Val) -> Result<(), ExecutionError>;
}

/* ===================== Interpreter ===================== */

pub struct Interpreter<E> {
    program: Arc<Program>,
    executor: Arc<E>,
    policy: ProductPolicy,
    hook: Option<Arc<dyn ExecutionHook>>,
    /// Fixed id for the `execute` span; a fresh one per run when unset
    run_id: Option<Uuid>,
}

impl<E> Clone for Interpreter<E> {
    fn clone(&self) -> Self {
        Self {
            program: Arc::clone(&self.program),
            executor: Arc::clone(&self.executor),
            policy: self.policy,
            hook: self.hook.clone(),
            run_id: self.run_id,
        }
    }
}

impl<E: TaskExecutor> Interpreter<E> {
    pub fn new(program: Arc<Program>, executor: E) -> Self {
        Self::with_shared_executor(program, Arc::new(executor))
    }

    pub fn with_shared_executor(program: Arc<Program>, executor: Arc<E>) -> Self {
        Self {
            program,
            executor,
            policy: ProductPolicy::default(),
            hook: None,
            run_id: None,
        }
    }

    pub fn with_policy(mut self, policy: ProductPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ExecutionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Log runs under `run_id` instead of generating one per run.
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn policy(&self) -> ProductPolicy {
        self.policy
    }

    /// Run the program's root expression.
    pub async fn execute(&self, input: Val) -> Result<Val, ExecutionError> {
        self.execute_with_cancel(input, &CancellationToken::new())
            .await
    }

    /// Run the root expression; cancelling `cancel` stops every in-flight
    /// leaf and fails the run with [`ExecutionError::Cancelled`].
    pub async fn execute_with_cancel(
        &self,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<Val, ExecutionError> {
        let run_id = self.run_id.unwrap_or_else(Uuid::new_v4);
        let span = tracing::info_span!("execute", %run_id);

        async move {
            tracing::info!(policy = %self.policy, "run started");
            let result = self.eval(&self.program.root, input, cancel).await;
            match &result {
                Ok(_) => tracing::info!("run finished"),
                Err(err) => tracing::info!(error = %err, "run failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Evaluate any node of this interpreter's program.
    pub fn execute_node<'a>(
        &'a self,
        node: &'a Node,
        input: Val,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Val, ExecutionError>> {
        self.eval(node, input, cancel)
    }

    fn eval<'a>(
        &'a self,
        node: &'a Node,
        input: Val,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Val, ExecutionError>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(ExecutionError::Cancelled);
            }

            match node {
                Node::Literal { name, .. } => {
                    let output = match self.program.functor_body(name) {
                        Some(body) => self.eval(body, input, cancel).await?,
                        None => self.run_leaf(name, input, cancel).await?,
                    };
                    if let Some(hook) = &self.hook {
                        hook.after_literal(node, name, &output)?;
                    }
                    Ok(output)
                }
                Node::Composition { outer, inner, .. } => {
                    let intermediate = self.eval(inner, input, cancel).await?;
                    self.eval(outer, intermediate, cancel).await
                }
                Node::Product { left, right, .. } => {
                    self.eval_product(left, right, input, cancel).await
                }
                Node::Functor { body, .. } => self.eval(body, input, cancel).await,
            }
        })
    }

    async fn eval_product(
        &self,
        left: &Node,
        right: &Node,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<Val, ExecutionError> {
        let branches = cancel.child_token();
        let left_run = self.eval(left, input.clone(), &branches);
        let right_run = self.eval(right, input, &branches);

        let (left_val, right_val) = match self.policy {
            ProductPolicy::FailFast => match tokio::try_join!(left_run, right_run) {
                Ok(pair) => pair,
                Err(err) => {
                    branches.cancel();
                    return Err(err);
                }
            },
            ProductPolicy::WaitAll => {
                let (left_res, right_res) = tokio::join!(left_run, right_run);
                (left_res?, right_res?)
            }
        };

        Ok(Val::pair(left_val, right_val))
    }

    async fn run_leaf(
        &self,
        task: &str,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<Val, ExecutionError> {
        tracing::debug!(task, "dispatching task");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecutionError::Cancelled),
            result = self.executor.run(task, input.clone(), cancel) => result,
        };

        match result {
            Ok(output) => {
                tracing::debug!(task, "task completed");
                Ok(output)
            }
            // Only a cancellation the run asked for loses the task identity.
            Err(TaskFailure::Cancelled) if cancel.is_cancelled() => {
                Err(ExecutionError::Cancelled)
            }
            Err(source) => {
                tracing::debug!(task, error = %source, "task failed");
                Err(ExecutionError::Task {
                    task: task.to_string(),
                    input,
                    source,
                })
            }
        }
    }
}
