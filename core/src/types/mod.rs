//! Type representations for the workflow language
//!
//! Types are plain values compared structurally. Type variables act as
//! wildcards during checking: a variable is compatible with every type, and
//! the only solving performed is direct substitution of variables bound while
//! matching an outer stage's domain against an inner stage's codomain.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

mod env;

pub use env::TypeEnvironment;


/// Variable name -> bound type
pub type Substitution = BTreeMap<String, Type>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Type {
    /// Concrete named type such as `Data` or `List[T]` (parameters are opaque)
    Monomorphic { name: String },
    /// Single-letter lowercase placeholder
    Variable { name: String },
    Function {
        domain: Box<Type>,
        codomain: Box<Type>,
    },
    Product { left: Box<Type>, right: Box<Type> },
    Unit,
}

impl Type {
    pub fn mono(name: impl Into<String>) -> Self {
        Type::Monomorphic { name: name.into() }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Type::Variable { name: name.into() }
    }

    pub fn function(domain: Type, codomain: Type) -> Self {
        Type::Function {
            domain: Box::new(domain),
            codomain: Box::new(codomain),
        }
    }

    pub fn product(left: Type, right: Type) -> Self {
        Type::Product {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Type::Variable { .. })
    }

    /// Split into `(domain, codomain)`.
    ///
    /// A non-function type `T` is read as the constant `() -> T`.
    pub fn arrow(&self) -> (Type, Type) {
        match self {
            Type::Function { domain, codomain } => ((**domain).clone(), (**codomain).clone()),
            other => (Type::Unit, other.clone()),
        }
    }

    /// Wildcard compatibility: variables match anything, everything else must
    /// agree structurally.
    pub fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Variable { .. }, _) | (_, Type::Variable { .. }) => true,
            (Type::Unit, Type::Unit) => true,
            (Type::Monomorphic { name: a }, Type::Monomorphic { name: b }) => a == b,
            (
                Type::Function {
                    domain: d1,
                    codomain: c1,
                },
                Type::Function {
                    domain: d2,
                    codomain: c2,
                },
            ) => d1.compatible(d2) && c1.compatible(c2),
            (
                Type::Product {
                    left: l1,
                    right: r1,
                },
                Type::Product {
                    left: l2,
                    right: r2,
                },
            ) => l1.compatible(l2) && r1.compatible(r2),
            _ => false,
        }
    }

    /// Record bindings for the variables of `self` (the pattern) taken from
    /// the matching positions of `actual`. The first binding of a variable
    /// wins; later occurrences are not checked against it.
    pub fn bind(&self, actual: &Type, subst: &mut Substitution) {
        match (self, actual) {
            (Type::Variable { name }, actual) => {
                if actual == self {
                    return;
                }
                subst
                    .entry(name.clone())
                    .or_insert_with(|| actual.clone());
            }
            (
                Type::Function {
                    domain: d1,
                    codomain: c1,
                },
                Type::Function {
                    domain: d2,
                    codomain: c2,
                },
            ) => {
                d1.bind(d2, subst);
                c1.bind(c2, subst);
            }
            (
                Type::Product {
                    left: l1,
                    right: r1,
                },
                Type::Product {
                    left: l2,
                    right: r2,
                },
            ) => {
                l1.bind(l2, subst);
                r1.bind(r2, subst);
            }
            _ => {}
        }
    }

    /// Replace every bound variable with its binding.
    pub fn apply(&self, subst: &Substitution) -> Type {
        if subst.is_empty() {
            return self.clone();
        }
        match self {
            Type::Variable { name } => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Function { domain, codomain } => {
                Type::function(domain.apply(subst), codomain.apply(subst))
            }
            Type::Product { left, right } => Type::product(left.apply(subst), right.apply(subst)),
            Type::Monomorphic { .. } | Type::Unit => self.clone(),
        }
    }

    /// Replace a single variable.
    pub fn substitute(&self, var: &str, replacement: &Type) -> Type {
        let mut subst = Substitution::new();
        subst.insert(var.to_string(), replacement.clone());
        self.apply(&subst)
    }

    /// Free type variables in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Type::Variable { name } => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Type::Function { domain, codomain } => {
                domain.collect_variables(out);
                codomain.collect_variables(out);
            }
            Type::Product { left, right } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Type::Monomorphic { .. } | Type::Unit => {}
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Monomorphic { name } | Type::Variable { name } => write!(f, "{}", name),
            Type::Unit => write!(f, "()"),
            Type::Function { domain, codomain } => {
                match **domain {
                    Type::Function { .. } | Type::Product { .. } => write!(f, "({})", domain)?,
                    _ => write!(f, "{}", domain)?,
                }
                write!(f, " -> ")?;
                match **codomain {
                    Type::Product { .. } => write!(f, "({})", codomain),
                    _ => write!(f, "{}", codomain),
                }
            }
            Type::Product { left, right } => {
                match **left {
                    Type::Function { .. } => write!(f, "({})", left)?,
                    _ => write!(f, "{}", left)?,
                }
                write!(f, " × ")?;
                match **right {
                    Type::Function { .. } | Type::Product { .. } => write!(f, "({})", right),
                    _ => write!(f, "{}", right),
                }
            }
        }
    }
}
