//! Parse → validate → execute in one call

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::ast::Program;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executors::TimeoutExecutor;
use crate::interpreter::{
    Interpreter, ProductPolicy, TaskExecutor, TypeViolation, TypedInterpreter, Val,
};
use crate::parser::parse;
use crate::types::TypeEnvironment;
use crate::validator::{validate, ValidationReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Check every literal's output against its static type
    pub typed: bool,
    /// Fail on the first runtime type violation instead of recording it
    pub strict: bool,
    pub policy: ProductPolicy,
    pub task_timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RunOptions {
    fn from(config: &Config) -> Self {
        Self {
            typed: config.typed,
            strict: config.strict,
            policy: config.product_policy,
            task_timeout: config.task_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub value: Val,
    pub report: ValidationReport,
    /// Tolerated runtime type violations (non-strict typed runs only)
    pub violations: Vec<TypeViolation>,
}

/// Parse and validate without executing.
///
/// Type errors are not an `Err` here; they are in the returned report.
pub fn check_source(
    source: &str,
    base_env: &TypeEnvironment,
) -> Result<(Program, ValidationReport)> {
    let program = parse(source)?;
    let report = validate(&program, base_env);
    Ok((program, report))
}

pub async fn run_source<E>(
    source: &str,
    base_env: &TypeEnvironment,
    executor: E,
    input: Val,
    options: &RunOptions,
) -> Result<RunOutcome>
where
    E: TaskExecutor + 'static,
{
    run_source_with_cancel(
        source,
        base_env,
        executor,
        input,
        options,
        &CancellationToken::new(),
    )
    .await
}

/// Like [`run_source`], stopping early when `cancel` fires.
///
/// Nothing executes unless validation succeeds.
pub async fn run_source_with_cancel<E>(
    source: &str,
    base_env: &TypeEnvironment,
    executor: E,
    input: Val,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> Result<RunOutcome>
where
    E: TaskExecutor + 'static,
{
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("pipeline", %run_id);

    async move {
        let (program, report) = check_source(source, base_env)?;
        if !report.success {
            tracing::info!(errors = report.errors.len(), "validation failed; not executing");
            return Err(Error::Type(Box::new(report)));
        }

        let executor: Box<dyn TaskExecutor> = match options.task_timeout {
            Some(timeout) => Box::new(TimeoutExecutor::new(executor, timeout)),
            None => Box::new(executor),
        };
        let interpreter = Interpreter::new(Arc::new(program), executor)
            .with_policy(options.policy)
            .with_run_id(run_id);

        let (value, violations) = if options.typed {
            let typed = TypedInterpreter::new(interpreter, &report, options.strict);
            let outcome = typed.execute_with_cancel(input, cancel).await?;
            (outcome.value, outcome.violations)
        } else {
            let value = interpreter.execute_with_cancel(input, cancel).await?;
            (value, Vec::new())
        };

        Ok(RunOutcome {
            run_id,
            value,
            report,
            violations,
        })
    }
    .instrument(span)
    .await
}
