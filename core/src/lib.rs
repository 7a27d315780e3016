//! Typed workflow language built on composition (`∘`) and product (`×`).
//!
//! A program declares task signatures and named functors, then one
//! expression. It is parsed ([`parser`]), type checked ([`validator`]) and
//! executed against a [`TaskExecutor`] ([`interpreter`]); [`pipeline`]
//! strings the three together.

pub mod ast;
pub mod cli;
pub mod config;
pub mod error;
pub mod executors;
pub mod interpreter;
pub mod parser;
pub mod pipeline;
pub mod types;
pub mod validator;

// Re-export main types
pub use ast::{Node, NodeId, Program, Signature, Span};
pub use config::Config;
pub use error::{Error, Result};
pub use interpreter::{
    ExecutionError, Interpreter, ProductPolicy, TaskExecutor, TaskFailure, TypedInterpreter, Val,
};
pub use parser::{parse, ParseError};
pub use pipeline::{check_source, run_source, RunOptions, RunOutcome};
pub use types::{Type, TypeEnvironment};
pub use validator::{validate, ValidationReport};
