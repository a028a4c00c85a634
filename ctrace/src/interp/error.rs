//! Runtime errors for the interpreter

use thiserror::Error;

/// Runtime error raised while evaluating a step
#[derive(Debug, Clone, Error)]
#[error("Runtime error: {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Undefined variable
    UndefinedVariable,
    /// Undefined function
    UndefinedFunction,
    /// Operand or target of the wrong type
    TypeError,
    /// Integer division or remainder by zero
    DivisionByZero,
    /// Argument count mismatch
    ArityMismatch,
    /// Index out of bounds
    IndexOutOfBounds,
    /// Read of a declared but never assigned value
    Uninitialized,
    /// Expression cannot be assigned to
    InvalidLValue,
    /// Branch predicate did not produce a boolean
    NonBooleanPredicate,
    /// printf placeholder count does not match the supplied value
    FormatMismatch,
    /// Result of a function that returned nothing was used
    VoidValue,
    /// Call depth limit exceeded
    StackOverflow,
    /// A step crossed too many empty or branch nodes without reaching a statement
    NoProgress,
    /// Store or call stack disagrees with the frame layout
    StackInconsistency,
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: String) -> Self {
        RuntimeError { kind, message }
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedVariable, format!("undefined variable: {name}"))
    }

    pub fn undefined_function(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedFunction, format!("undefined function: {name}"))
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(
            ErrorKind::TypeError,
            format!("type error: expected {expected}, got {got}"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero".to_string())
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("function {name} expects {expected} argument(s), got {got}"),
        )
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("index {index} out of bounds for length {len}"),
        )
    }

    pub fn uninitialized(what: &str) -> Self {
        Self::new(ErrorKind::Uninitialized, format!("{what} is not initialized"))
    }

    pub fn invalid_lvalue(expr: &str) -> Self {
        Self::new(ErrorKind::InvalidLValue, format!("cannot assign to {expr}"))
    }

    pub fn non_boolean_predicate(got: &str) -> Self {
        Self::new(
            ErrorKind::NonBooleanPredicate,
            format!("branch condition must be a comparison, got {got}"),
        )
    }

    pub fn format_mismatch(format: &str, has_value: bool) -> Self {
        let message = if has_value {
            format!("format \"{format}\" has no placeholder for the supplied value")
        } else {
            format!("format \"{format}\" expects a value but none was supplied")
        };
        Self::new(ErrorKind::FormatMismatch, message)
    }

    pub fn void_value(function: &str) -> Self {
        Self::new(
            ErrorKind::VoidValue,
            format!("result of {function} used but no value was returned"),
        )
    }

    pub fn stack_overflow(depth: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("stack overflow: call depth exceeded {depth}"),
        )
    }

    pub fn no_progress(limit: usize) -> Self {
        Self::new(
            ErrorKind::NoProgress,
            format!("no statement reached after crossing {limit} nodes"),
        )
    }

    pub fn stack_inconsistency(detail: &str) -> Self {
        Self::new(ErrorKind::StackInconsistency, format!("stack inconsistency: {detail}"))
    }

    /// Fatal errors end the session; all others leave the program state
    /// exactly as it was before the failed step.
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::StackInconsistency
    }
}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;
