//! Rule: Unused Functor
//!
//! Reports a warning when a functor is declared but neither the program
//! expression nor any later functor refers to it.
//!
//! ```text
//! # Warning: 'lint_only' is never used
//! lint_only = lint ∘ fetch
//! deploy ∘ build
//! ```

use std::collections::HashSet;

use crate::ast::{Node, Program};
use crate::types::TypeEnvironment;

use super::super::{Lint, LintRule};

pub struct UnusedFunctorRule;

impl LintRule for UnusedFunctorRule {
    fn id(&self) -> &'static str {
        "unused-functor"
    }

    fn description(&self) -> &'static str {
        "Declared functors should be referenced"
    }

    fn check(&self, program: &Program, _env: &TypeEnvironment) -> Vec<Lint> {
        let mut referenced: HashSet<&str> = program.root.references().into_iter().collect();
        for functor in program.functors.values() {
            if let Node::Functor { body, .. } = functor {
                referenced.extend(body.references());
            }
        }

        program
            .functors
            .iter()
            .filter(|(name, _)| !referenced.contains(name.as_str()))
            .map(|(name, functor)| {
                Lint::warning(
                    functor.span(),
                    format!("Functor '{}' is declared but never used", name),
                    self.id(),
                )
            })
            .collect()
    }
}
