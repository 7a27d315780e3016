//! Bottom-up type inference over the AST

use std::collections::BTreeMap;

use crate::ast::{Node, NodeId, Program};
use crate::types::{Substitution, Type, TypeEnvironment};

use super::{TypeError, TypeErrorKind};

pub(super) struct Outcome {
    pub errors: Vec<TypeError>,
    pub program_type: Option<Type>,
    pub functor_types: BTreeMap<String, Type>,
    pub node_types: BTreeMap<NodeId, Type>,
}

pub(super) struct Inference<'a> {
    program: &'a Program,
    env: &'a TypeEnvironment,
    /// Functors typed so far, in declaration order
    functor_types: BTreeMap<String, Type>,
    node_types: BTreeMap<NodeId, Type>,
    errors: Vec<TypeError>,
}

impl<'a> Inference<'a> {
    pub fn new(program: &'a Program, env: &'a TypeEnvironment) -> Self {
        Self {
            program,
            env,
            functor_types: BTreeMap::new(),
            node_types: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn run(mut self) -> Outcome {
        let program = self.program;
        for functor in program.functors.values() {
            self.infer(functor);
        }
        let program_type = self.infer(&program.root);

        let mut errors = self.errors;
        errors.sort_by_key(|e| (e.span.start, e.span.end));

        Outcome {
            errors,
            program_type,
            functor_types: self.functor_types,
            node_types: self.node_types,
        }
    }

    /// Infer the (function) type of `node`. `None` means the node could not
    /// be typed; the cause has already been recorded, so callers just
    /// propagate it without reporting again.
    fn infer(&mut self, node: &Node) -> Option<Type> {
        let ty = match node {
            Node::Literal { name, .. } => self.infer_literal(node, name),
            Node::Composition { outer, inner, .. } => {
                let inner_ty = self.infer(inner);
                let outer_ty = self.infer(outer);
                self.compose(node, outer_ty?, inner_ty?)
            }
            Node::Product { left, right, .. } => {
                let left_ty = self.infer(left);
                let right_ty = self.infer(right);
                self.product(node, left_ty?, right_ty?)
            }
            Node::Functor { name, body, .. } => {
                let body_ty = self.infer(body)?;
                self.functor_types.insert(name.clone(), body_ty.clone());
                Some(body_ty)
            }
        }?;

        self.node_types.insert(node.id(), ty.clone());
        Some(ty)
    }

    fn infer_literal(&mut self, node: &Node, name: &str) -> Option<Type> {
        if self.program.is_functor(name) {
            // A functor whose body failed to type has already been reported.
            return self.functor_types.get(name).cloned();
        }

        let env = self.env;
        match env.get(name) {
            Some(declared) => {
                let (domain, codomain) = declared.arrow();
                Some(Type::function(domain, codomain))
            }
            None => {
                self.report(
                    node,
                    TypeErrorKind::UnboundTask,
                    None,
                    None,
                    format!("unbound task '{}': no type signature declared", name),
                );
                None
            }
        }
    }

    /// `outer ∘ inner`: inner is `A -> B`, outer is `B' -> C`, B must fit B'.
    fn compose(&mut self, node: &Node, outer: Type, inner: Type) -> Option<Type> {
        let (a, b) = inner.arrow();
        let (b2, c) = outer.arrow();

        if !b.compatible(&b2) {
            let (outer_node, inner_node) = match node {
                Node::Composition { outer, inner, .. } => (outer.to_string(), inner.to_string()),
                _ => (String::new(), String::new()),
            };
            self.report(
                node,
                TypeErrorKind::CompositionMismatch,
                Some(b2.clone()),
                Some(b.clone()),
                format!(
                    "cannot compose {} ∘ {}: '{}' produces {} but '{}' expects {}",
                    outer_node, inner_node, inner_node, b, outer_node, b2
                ),
            );
            return None;
        }

        let mut outer_subst = Substitution::new();
        b2.bind(&b, &mut outer_subst);
        let mut inner_subst = Substitution::new();
        b.bind(&b2, &mut inner_subst);

        Some(Type::function(a.apply(&inner_subst), c.apply(&outer_subst)))
    }

    /// `left × right`: both branches must accept the same input.
    fn product(&mut self, node: &Node, left: Type, right: Type) -> Option<Type> {
        let (a, b) = left.arrow();
        let (a2, c) = right.arrow();

        if !a.compatible(&a2) {
            let (left_node, right_node) = match node {
                Node::Product { left, right, .. } => (left.to_string(), right.to_string()),
                _ => (String::new(), String::new()),
            };
            self.report(
                node,
                TypeErrorKind::ProductMismatch,
                Some(a.clone()),
                Some(a2.clone()),
                format!(
                    "cannot form product {} × {}: '{}' accepts {} but '{}' accepts {}",
                    left_node, right_node, left_node, a, right_node, a2
                ),
            );
            return None;
        }

        let mut left_subst = Substitution::new();
        a.bind(&a2, &mut left_subst);
        let mut right_subst = Substitution::new();
        a2.bind(&a, &mut right_subst);

        let domain = if a.is_variable() { a2 } else { a };
        Some(Type::function(
            domain,
            Type::product(b.apply(&left_subst), c.apply(&right_subst)),
        ))
    }

    fn report(
        &mut self,
        node: &Node,
        kind: TypeErrorKind,
        expected: Option<Type>,
        actual: Option<Type>,
        message: String,
    ) {
        self.errors.push(TypeError {
            kind,
            node: node.id(),
            subject: node.to_string(),
            span: node.span(),
            expected,
            actual,
            message,
        });
    }
}
