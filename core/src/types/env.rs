//! Task name -> declared type mapping

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Type;
use crate::parser::{self, ParseResult};

/// Declared signatures of leaf tasks, keyed by task name.
///
/// Built once before validation and only read afterwards. Iteration order is
/// sorted by name so snapshots serialize identically across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeEnvironment {
    entries: BTreeMap<String, Type>,
}

impl TypeEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an environment from a source file containing only signature
    /// lines (`name :: Type`) and comments.
    pub fn from_source(source: &str) -> ParseResult<Self> {
        let signatures = parser::parse_signatures(source)?;
        Ok(signatures
            .into_iter()
            .map(|sig| (sig.name, sig.ty))
            .collect())
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.insert(name, ty);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: Type) -> Option<Type> {
        self.entries.insert(name.into(), ty)
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.entries.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    /// Entries of `other` replace entries of `self` with the same name.
    pub fn merged(&self, other: &TypeEnvironment) -> TypeEnvironment {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        TypeEnvironment { entries }
    }
}

impl FromIterator<(String, Type)> for TypeEnvironment {
    fn from_iter<I: IntoIterator<Item = (String, Type)>>(iter: I) -> Self {
        TypeEnvironment {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TypeEnvironment {
    type Item = (&'a String, &'a Type);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Type>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
