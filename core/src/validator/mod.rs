//! Static type checking for catflow programs
//!
//! Validation runs after parsing and before execution. It infers the type of
//! every subexpression bottom-up, collects every mismatch instead of stopping
//! at the first one, and records the inferred types in a side table keyed by
//! [`NodeId`] so the typed interpreter can cross-check values at runtime.
//!
//! # Usage
//!
//! ```ignore
//! use catflow_core::{parser, validator};
//!
//! let program = parser::parse(source)?;
//! let report = validator::validate(&program, &TypeEnvironment::new());
//! if !report.success {
//!     for error in &report.errors {
//!         eprintln!("{}", error);
//!     }
//! }
//! ```
//!
//! Besides the type rules, a small set of lint rules (see [`rules`]) produce
//! warnings. Warnings never make a report unsuccessful.

mod infer;
pub mod rules;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::{NodeId, Program, Span};
use crate::types::{Type, TypeEnvironment};

#[cfg(test)]
mod tests;

// ============================================================================
// Type Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeErrorKind {
    /// A literal names neither a functor nor a declared task
    UnboundTask,
    /// `outer ∘ inner` where inner's output does not fit outer's input
    CompositionMismatch,
    /// `left × right` where the branches accept different inputs
    ProductMismatch,
}

impl TypeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeErrorKind::UnboundTask => "unbound-task",
            TypeErrorKind::CompositionMismatch => "composition-mismatch",
            TypeErrorKind::ProductMismatch => "product-mismatch",
        }
    }
}

/// A static type error tied to the node that caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("type error at {span}: {message} [{}]", kind.as_str())]
pub struct TypeError {
    pub kind: TypeErrorKind,
    /// Offending node
    pub node: NodeId,
    /// Canonical rendering of the offending node
    pub subject: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Type>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Type>,
    pub message: String,
}

// ============================================================================
// Lints
// ============================================================================

/// Severity levels for lint findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Should probably be fixed - potential bug
    Warning,
}

/// A non-fatal finding produced by a [`LintRule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lint {
    pub span: Span,
    pub message: String,
    pub severity: Severity,
    /// Which rule produced this finding
    pub rule_id: String,
}

impl Lint {
    pub fn warning(span: Span, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            span,
            message: message.into(),
            severity: Severity::Warning,
            rule_id: rule_id.to_string(),
        }
    }
}

impl fmt::Display for Lint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{} at {}: {} [{}]",
            severity, self.span, self.message, self.rule_id
        )
    }
}

/// A lint check over a parsed program.
///
/// Rules are independent of one another and of the type rules; they only
/// ever produce warnings.
pub trait LintRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "unused-functor")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// `env` is the effective environment: base entries merged with the
    /// program's own signatures.
    fn check(&self, program: &Program, env: &TypeEnvironment) -> Vec<Lint>;
}

// ============================================================================
// Report
// ============================================================================

/// Outcome of one validation pass.
///
/// Every collection is ordered deterministically, so validating the same
/// program twice yields equal (and identically serialized) reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub success: bool,
    /// Sorted by source position
    pub errors: Vec<TypeError>,
    pub warnings: Vec<Lint>,
    /// Type of the whole program; present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_type: Option<Type>,
    /// Environment the program was checked against, including functor
    /// types; present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<TypeEnvironment>,
    /// Inferred type of every node that could be typed
    pub node_types: BTreeMap<NodeId, Type>,
}

impl ValidationReport {
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.node_types.get(&node)
    }

    /// One line per error, then one per warning.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        lines.extend(self.warnings.iter().map(|w| w.to_string()));
        lines.join("\n")
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Runs type inference and all registered lint rules.
pub struct Validator {
    rules: Vec<Box<dyn LintRule>>,
}

impl Validator {
    /// Create a new validator with all built-in lint rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::UnusedFunctorRule),
                Box::new(rules::ShadowedTaskRule),
            ],
        }
    }

    /// Validator with no lint rules; only the type rules run.
    pub fn without_lints() -> Self {
        Self { rules: Vec::new() }
    }

    /// Check `program` against `base_env`. Signatures declared in the
    /// program override base entries of the same name.
    pub fn validate(&self, program: &Program, base_env: &TypeEnvironment) -> ValidationReport {
        let declared: TypeEnvironment = program
            .signatures
            .values()
            .map(|sig| (sig.name.clone(), sig.ty.clone()))
            .collect();
        let env = base_env.merged(&declared);

        let outcome = infer::Inference::new(program, &env).run();

        let warnings: Vec<Lint> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(program, &env))
            .collect();

        let success = outcome.errors.is_empty() && outcome.program_type.is_some();
        tracing::debug!(
            errors = outcome.errors.len(),
            warnings = warnings.len(),
            success,
            "validation finished"
        );

        let environment = if success {
            let mut snapshot = env;
            for (name, ty) in outcome.functor_types {
                snapshot.insert(name, ty);
            }
            Some(snapshot)
        } else {
            None
        };

        ValidationReport {
            success,
            errors: outcome.errors,
            warnings,
            program_type: if success { outcome.program_type } else { None },
            environment,
            node_types: outcome.node_types,
        }
    }

    /// Get a list of all registered lint rules
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Validate a program with the built-in lint rules.
pub fn validate(program: &Program, base_env: &TypeEnvironment) -> ValidationReport {
    Validator::new().validate(program, base_env)
}

/// Whether a program has type errors, ignoring lint warnings.
pub fn has_errors(program: &Program, base_env: &TypeEnvironment) -> bool {
    !Validator::without_lints()
        .validate(program, base_env)
        .success
}
