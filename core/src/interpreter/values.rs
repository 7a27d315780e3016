//! Runtime value types

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::types::Type;

/// Value flowing between stages of a running program.
///
/// Leaf payloads are opaque JSON. A payload may carry the name of the type
/// the producing task claims for it; that tag is what the typed interpreter
/// checks against the statically inferred type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    Unit,
    Data {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ty: Option<String>,
        payload: JsonValue,
    },
    /// Result of a product: (left, right)
    Pair(Box<Val>, Box<Val>),
}

impl Val {
    /// Payload tagged with a monomorphic type name
    pub fn data(ty: impl Into<String>, payload: JsonValue) -> Self {
        Val::Data {
            ty: Some(ty.into()),
            payload,
        }
    }

    /// Payload with no type claim
    pub fn untyped(payload: JsonValue) -> Self {
        Val::Data { ty: None, payload }
    }

    pub fn pair(left: Val, right: Val) -> Self {
        Val::Pair(Box::new(left), Box::new(right))
    }

    /// Read a plain JSON document as an input value: `null` is Unit,
    /// anything else is an untyped payload.
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Val::Unit,
            other => Val::untyped(other),
        }
    }

    /// Plain JSON view: Unit is `null`, pairs are two-element arrays.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Val::Unit => JsonValue::Null,
            Val::Data { payload, .. } => payload.clone(),
            Val::Pair(left, right) => JsonValue::Array(vec![left.to_json(), right.to_json()]),
        }
    }

    /// Type observed at runtime, if the value says anything about it.
    ///
    /// Untagged payloads are unknown (`None`). Inside a pair an unknown side
    /// becomes a type variable, so it matches whatever was expected.
    pub fn runtime_type(&self) -> Option<Type> {
        match self {
            Val::Unit => Some(Type::Unit),
            Val::Data { ty: Some(name), .. } => Some(Type::mono(name.clone())),
            Val::Data { ty: None, .. } => None,
            Val::Pair(left, right) => match (left.runtime_type(), right.runtime_type()) {
                (None, None) => None,
                (l, r) => Some(Type::product(
                    l.unwrap_or_else(|| Type::var("_")),
                    r.unwrap_or_else(|| Type::var("_")),
                )),
            },
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Unit => write!(f, "()"),
            Val::Data { ty: Some(ty), payload } => write!(f, "{}: {}", payload, ty),
            Val::Data { ty: None, payload } => write!(f, "{}", payload),
            Val::Pair(left, right) => write!(f, "({}, {})", left, right),
        }
    }
}
