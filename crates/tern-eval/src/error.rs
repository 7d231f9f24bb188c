//! Runtime error types for the Tern evaluator.

use serde::Serialize;
use std::fmt;
use tern_types::Position;

/// What went wrong at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Condition {
    /// An operator or builtin applied to operands it has no rule for.
    TypeMismatch,
    /// Read of a name no frame defines.
    UndefinedIdentifier,
    /// Call of something that is neither a function nor a native.
    NotCallable,
    /// Array or string index outside `0..len`.
    IndexOutOfRange,
    /// Assignment to an expression that is not a variable, index or member.
    InvalidAssignmentTarget,
    /// Integer or float division / remainder by zero.
    DivideByZero,
    /// The configured gas limit ran out.
    GasExhausted,
    /// The configured call depth was exceeded.
    CallDepthExceeded,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeMismatch => "type mismatch",
            Self::UndefinedIdentifier => "undefined identifier",
            Self::NotCallable => "not callable",
            Self::IndexOutOfRange => "index out of range",
            Self::InvalidAssignmentTarget => "invalid assignment target",
            Self::DivideByZero => "divide by zero",
            Self::GasExhausted => "gas exhausted",
            Self::CallDepthExceeded => "call depth exceeded",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A runtime failure that does not know where it happened yet.
///
/// Coercion rules and native functions return these; the evaluator turns
/// them into an [`EvalError`] with the position of the failing node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{condition}: {message}")]
pub struct Fault {
    pub condition: Condition,
    pub message: String,
}

impl Fault {
    pub fn new(condition: Condition, message: impl Into<String>) -> Self {
        Self {
            condition,
            message: message.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(Condition::TypeMismatch, message)
    }

    /// Attach the position of the node that failed.
    pub fn at(self, position: Position) -> EvalError {
        EvalError {
            condition: self.condition,
            message: self.message,
            position,
        }
    }
}

/// Evaluation error: aborts the enclosing `evaluate` call.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{position}: {condition}: {message}")]
pub struct EvalError {
    pub condition: Condition,
    pub message: String,
    pub position: Position,
}

impl EvalError {
    pub fn new(condition: Condition, message: impl Into<String>, position: Position) -> Self {
        Fault::new(condition, message).at(position)
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
