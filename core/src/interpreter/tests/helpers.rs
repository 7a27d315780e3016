//! Test helpers for interpreter tests
//!
//! Executors that record what ran and when, fail on demand, or sleep

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::ast::Program;
use crate::interpreter::{Interpreter, TaskExecutor, TaskFailure, Val};
use crate::parser::parse;

/// Parse a program that is known to be well-formed
pub fn program(source: &str) -> Arc<Program> {
    Arc::new(parse(source).expect("Parse program failed"))
}

/// Timing of one task invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub task: String,
    pub input: Val,
    pub started: Instant,
    pub finished: Option<Instant>,
    pub cancelled: bool,
}

/// Executor that appends the task name to its input and logs every call.
///
/// Each task returns `input ++ [task]` as a JSON array, so the output of a
/// pipeline spells out the order its stages ran in.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<Call>>,
    delay: Duration,
    failing: HashSet<String>,
    slow: HashSet<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `task` fails immediately
    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }

    /// `task` sleeps ten times the configured delay
    pub fn slow(mut self, task: &str) -> Self {
        self.slow.insert(task.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Task names in the order they started
    pub fn started_order(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.task).collect()
    }

    pub fn call(&self, task: &str) -> Call {
        self.calls()
            .into_iter()
            .find(|c| c.task == task)
            .unwrap_or_else(|| panic!("task '{}' was never called", task))
    }

    fn finish(&self, index: usize, cancelled: bool) {
        let mut calls = self.calls.lock().unwrap();
        calls[index].finished = Some(Instant::now());
        calls[index].cancelled = cancelled;
    }
}

#[async_trait]
impl TaskExecutor for RecordingExecutor {
    async fn run(
        &self,
        task: &str,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<Val, TaskFailure> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                task: task.to_string(),
                input: input.clone(),
                started: Instant::now(),
                finished: None,
                cancelled: false,
            });
            calls.len() - 1
        };

        if self.failing.contains(task) {
            self.finish(index, false);
            return Err(TaskFailure::failed(format!("{} exploded", task)));
        }

        let delay = if self.slow.contains(task) {
            self.delay * 10
        } else {
            self.delay
        };
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    self.finish(index, true);
                    return Err(TaskFailure::Cancelled);
                }
            }
        }

        self.finish(index, false);
        let mut trail = match input.to_json() {
            serde_json::Value::Array(items) if !matches!(input, Val::Pair(..)) => items,
            serde_json::Value::Null => Vec::new(),
            other => vec![other],
        };
        trail.push(json!(task));
        Ok(Val::untyped(json!(trail)))
    }
}

/// Build an interpreter that shares `executor` with the test
pub fn interpreter(
    source: &str,
    executor: &Arc<RecordingExecutor>,
) -> Interpreter<RecordingExecutor> {
    Interpreter::with_shared_executor(program(source), Arc::clone(executor))
}

/// Names in a trail produced by [`RecordingExecutor`]
pub fn trail(value: &Val) -> Vec<String> {
    match value.to_json() {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        other => panic!("expected a trail, got {}", other),
    }
}
