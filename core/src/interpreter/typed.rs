//! Runtime type validation layered over the interpreter
//!
//! [`TypedInterpreter`] wraps an [`Interpreter`] and installs a hook that
//! compares every literal's output against the type the validator inferred
//! for that literal. It never changes what runs; it only decides whether a
//! mismatch is fatal (`strict`) or merely recorded.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{ExecutionError, ExecutionHook, Interpreter, TaskExecutor, Val};
use crate::ast::{Node, NodeId, Span};
use crate::types::Type;
use crate::validator::ValidationReport;

/// A value whose runtime type contradicts the static type of its node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("runtime type violation at {span}: '{task}' produced {actual}, expected {expected}")]
pub struct TypeViolation {
    pub node: NodeId,
    pub task: String,
    pub span: Span,
    pub expected: Type,
    pub actual: Type,
}

/// Result of a typed run
#[derive(Debug, Clone, PartialEq)]
pub struct TypedOutcome {
    pub value: Val,
    /// Violations tolerated in non-strict mode, in the order observed
    pub violations: Vec<TypeViolation>,
}

/* ===================== Guard ===================== */

struct RuntimeTypeGuard {
    node_types: Arc<BTreeMap<NodeId, Type>>,
    strict: bool,
    violations: Mutex<Vec<TypeViolation>>,
}

impl RuntimeTypeGuard {
    fn take_violations(&self) -> Vec<TypeViolation> {
        match self.violations.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn record(&self, violation: TypeViolation) {
        match self.violations.lock() {
            Ok(mut guard) => guard.push(violation),
            Err(poisoned) => poisoned.into_inner().push(violation),
        }
    }
}

impl ExecutionHook for RuntimeTypeGuard {
    fn after_literal(&self, node: &Node, name: &str, output: &Val) -> Result<(), ExecutionError> {
        // Nodes without a static type and untagged values have nothing to compare.
        let Some(static_ty) = self.node_types.get(&node.id()) else {
            return Ok(());
        };
        let Some(actual) = output.runtime_type() else {
            return Ok(());
        };

        let (_, expected) = static_ty.arrow();
        if expected.compatible(&actual) {
            return Ok(());
        }

        let violation = TypeViolation {
            node: node.id(),
            task: name.to_string(),
            span: node.span(),
            expected,
            actual,
        };

        if self.strict {
            self.record(violation.clone());
            Err(ExecutionError::TypeViolation(violation))
        } else {
            tracing::warn!(%violation, "runtime type violation");
            self.record(violation);
            Ok(())
        }
    }
}

/* ===================== Typed Interpreter ===================== */

pub struct TypedInterpreter<E> {
    inner: Interpreter<E>,
    node_types: Arc<BTreeMap<NodeId, Type>>,
    strict: bool,
}

impl<E: TaskExecutor> TypedInterpreter<E> {
    /// Wrap `inner`, checking against the types inferred in `report`.
    ///
    /// `report` must come from validating the same program the interpreter
    /// runs; node ids are only meaningful within one parse.
    pub fn new(inner: Interpreter<E>, report: &ValidationReport, strict: bool) -> Self {
        Self {
            inner,
            node_types: Arc::new(report.node_types.clone()),
            strict,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn interpreter(&self) -> &Interpreter<E> {
        &self.inner
    }

    pub async fn execute(&self, input: Val) -> Result<TypedOutcome, ExecutionError> {
        self.execute_with_cancel(input, &CancellationToken::new())
            .await
    }

    pub async fn execute_with_cancel(
        &self,
        input: Val,
        cancel: &CancellationToken,
    ) -> Result<TypedOutcome, ExecutionError> {
        // A fresh guard per run keeps violations of concurrent runs apart.
        let guard = Arc::new(RuntimeTypeGuard {
            node_types: Arc::clone(&self.node_types),
            strict: self.strict,
            violations: Mutex::new(Vec::new()),
        });
        let run = self.inner.clone().with_hook(guard.clone());

        let value = run.execute_with_cancel(input, cancel).await?;
        Ok(TypedOutcome {
            value,
            violations: guard.take_violations(),
        })
    }
}
