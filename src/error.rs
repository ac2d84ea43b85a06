use thiserror::Error;

use crate::object::Object;
use crate::token::Token;

/// Represents an error that occurs during scanning.
#[derive(Debug, Clone, Error)]
#[error("[line {line}] Syntax Error: {message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

/// Represents an error that occurs during parsing.
/// Carries the offending token so the report lands on its line.
#[derive(Debug, Clone, Error)]
#[error("[line {}] Syntax Error: {message}", .token.line)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

/// Represents an error that occurs during resolution.
#[derive(Debug, Clone, Error)]
#[error("[line {line}] Syntax Error: {message}")]
pub struct ResolveError {
    pub line: usize,
    pub message: String,
}

/// Represents an error that occurs during runtime.
#[derive(Debug, Clone, Error)]
#[error("[line {}] Runtime Error: {message}", .token.line)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

/// A non-local transfer of control propagating up the evaluation stack.
///
/// `Return` is raised by a return statement and caught exactly at the
/// function-invocation boundary; `Error` is a real runtime error and is
/// caught only by the top-level `interpret`. Anything else reaching the
/// top level is a bug.
#[derive(Debug)]
pub enum Unwind {
    Return(Object),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}
