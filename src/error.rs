//! Error hierarchy for the interpreter.
//!
//! Every stage converts its failures into one of the types here:
//!
//! * [`LoxError`] is the crate‑wide error used by the front end (scanner,
//!   parser) and by the driver; resolver and runtime failures are wrapped in
//!   it transparently.
//! * [`ResolveError`] covers the static checks done before any statement runs.
//! * [`RuntimeError`] covers evaluation failures. [`RuntimeError::kind`]
//!   groups them into the categories a driver may want to distinguish.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Crate‑wide error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static resolution failure. Nothing has executed yet.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Malformed configuration file.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// Source text that is not UTF‑8.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**. `lexeme` is the offending token's
    /// text; an empty lexeme means the error was found at end of input.
    pub fn parse<S: Into<String>>(line: usize, lexeme: &str, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        let location = if lexeme.is_empty() {
            " at end".to_string()
        } else {
            format!(" at '{}'", lexeme)
        };

        LoxError::Parse {
            message,
            location,
            line,
        }
    }

    /// Errors raised before execution (scan, parse, resolve) exit with 65;
    /// everything that happens while running exits with 70.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve(_)
        )
    }
}

/// Static errors found by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("[line {line}] Error at '{name}': Already a variable with this name in this scope.")]
    DuplicateBinding { name: String, line: usize },

    #[error("[line {line}] Error at '{name}': Can't read local variable in its own initializer.")]
    SelfReference { name: String, line: usize },

    #[error("[line {line}] Error at 'return': Can't return from top-level code.")]
    ReturnOutsideFunction { line: usize },

    #[error("[line {line}] Error at 'return': Can't return a value from an initializer.")]
    ReturnValueFromInitializer { line: usize },

    #[error("[line {line}] Error at 'break': Can't break outside of a loop.")]
    BreakOutsideLoop { line: usize },

    #[error("[line {line}] Error at 'this': Can't use 'this' outside of a class.")]
    ThisOutsideClass { line: usize },
}

/// Coarse classification of runtime failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Name,
    Type,
    Argument,
    Attribute,
    Arithmetic,
    Resource,
    Internal,
}

/// Failures raised while evaluating a program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    /// The resolver promised a binding that is not there.
    #[error("Internal error: '{name}' not found at distance {distance}.")]
    Unresolved { name: String, distance: usize },

    #[error("Operand must be a number.\n[line {line}]")]
    OperandMustBeNumber { line: usize },

    #[error("Operands must be numbers.\n[line {line}]")]
    OperandsMustBeNumbers { line: usize },

    #[error("Operands must be two numbers or two strings.\n[line {line}]")]
    OperandsMustBeComparable { line: usize },

    #[error("Can only call functions and classes.\n[line {line}]")]
    NotCallable { line: usize },

    #[error("Expected {expected} arguments but got {got}.\n[line {line}]")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("Only instances have properties.\n[line {line}]")]
    NotAnInstance { line: usize },

    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },

    #[error("Division by zero.\n[line {line}]")]
    DivisionByZero { line: usize },

    #[error("Stack overflow.\n[line {line}]")]
    StackOverflow { line: usize },

    /// A native function failed.
    #[error("{message}")]
    Native { message: String },

    /// The print sink rejected a write.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::UndefinedVariable { .. } => ErrorKind::Name,
            RuntimeError::OperandMustBeNumber { .. }
            | RuntimeError::OperandsMustBeNumbers { .. }
            | RuntimeError::OperandsMustBeComparable { .. }
            | RuntimeError::NotCallable { .. }
            | RuntimeError::NotAnInstance { .. } => ErrorKind::Type,
            RuntimeError::ArityMismatch { .. } => ErrorKind::Argument,
            RuntimeError::UndefinedProperty { .. } => ErrorKind::Attribute,
            RuntimeError::DivisionByZero { .. } => ErrorKind::Arithmetic,
            RuntimeError::StackOverflow { .. }
            | RuntimeError::Native { .. }
            | RuntimeError::Output(_) => ErrorKind::Resource,
            RuntimeError::Unresolved { .. } => ErrorKind::Internal,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
