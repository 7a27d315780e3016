//! Rule: Shadowed Task
//!
//! Reports a warning when a functor has the same name as a task with a
//! type signature. Lookup always prefers the functor, so the signature is
//! dead for that name.
//!
//! ```text
//! build :: () -> Artifact
//! # Warning: functor 'build' shadows the task signature
//! build = compile ∘ fetch
//! ```

use crate::ast::Program;
use crate::types::TypeEnvironment;

use super::super::{Lint, LintRule};

pub struct ShadowedTaskRule;

impl LintRule for ShadowedTaskRule {
    fn id(&self) -> &'static str {
        "shadowed-task"
    }

    fn description(&self) -> &'static str {
        "Functor names should not collide with task signatures"
    }

    fn check(&self, program: &Program, env: &TypeEnvironment) -> Vec<Lint> {
        program
            .functors
            .iter()
            .filter_map(|(name, functor)| {
                env.get(name).map(|ty| {
                    Lint::warning(
                        functor.span(),
                        format!(
                            "Functor '{}' shadows the task signature '{} :: {}'",
                            name, name, ty
                        ),
                        self.id(),
                    )
                })
            })
            .collect()
    }
}
