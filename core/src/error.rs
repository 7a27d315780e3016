//! Crate-level error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::interpreter::{ExecutionError, TypeViolation};
use crate::parser::ParseError;
use crate::validator::ValidationReport;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Static validation failed; the report holds every error found
    #[error("type check failed with {} error(s)", .0.errors.len())]
    Type(Box<ValidationReport>),

    #[error("execution failed: {0}")]
    Execution(ExecutionError),

    #[error(transparent)]
    TypeViolation(TypeViolation),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::TypeViolation(violation) => Error::TypeViolation(violation),
            other => Error::Execution(other),
        }
    }
}

impl Error {
    /// Process exit code for this category of failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Parse(_) => 2,
            Error::Type(_) => 3,
            Error::Execution(_) => 4,
            Error::TypeViolation(_) => 5,
            Error::Config(_) | Error::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeId, Span};
    use crate::types::Type;

    #[test]
    fn test_execution_error_type_violation_is_lifted() {
        let violation = TypeViolation {
            node: NodeId(3),
            task: "process".to_string(),
            span: Span::default(),
            expected: Type::mono("Result"),
            actual: Type::mono("Garbage"),
        };

        let err: Error = ExecutionError::TypeViolation(violation).into();
        assert!(matches!(err, Error::TypeViolation(_)));
        assert_eq!(err.exit_code(), 5);

        let err: Error = ExecutionError::Cancelled.into();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_exit_codes_distinct_per_category() {
        let parse: Error = crate::parser::parse("a ∘").unwrap_err().into();
        assert_eq!(parse.exit_code(), 2);

        let config: Error = ConfigError::Invalid("bad".to_string()).into();
        assert_eq!(config.exit_code(), 1);
    }
}
