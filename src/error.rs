//! The error taxonomy raised by the reader, compiler and evaluator.

use crate::value::Value;
use thiserror::Error;

// Arity constant strings, used at builtin call sites to avoid allocating a
// fresh description string on every arity check.
pub const ARITY_ONE: &str = "1";
pub const ARITY_TWO: &str = "2";
pub const ARITY_THREE: &str = "3";
pub const ARITY_AT_LEAST_ONE: &str = "at least 1";
pub const ARITY_ZERO_OR_ONE: &str = "0-1";
pub const ARITY_ONE_OR_TWO: &str = "1-2";
pub const ARITY_TWO_OR_THREE: &str = "2-3";
pub const ARITY_PAIRS: &str = "a non-zero even number of (variable, value) arguments";

/// Maximum number of printed-form frames kept on a propagating error, per
/// the "bounded length ≤10" stack-trace rule.
pub const MAX_TRACE_FRAMES: usize = 10;

#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// Reader failure: malformed or incomplete source text.
    #[error("{0}")]
    SyntaxError(String),

    /// A symbol resolved against neither globals, lexical frame, nor host
    /// scope.
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// `setq`/`export` target is not an assignable location (a keyword,
    /// `t`, or something other than a symbol/`ArgRef`).
    #[error("not a variable: {0}")]
    NotVariable(String),

    /// Call whose argument count doesn't match the callable's arity.
    #[error("{function}: expected {expected} argument(s), got {actual}")]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Primitive argument of the wrong kind.
    #[error("{function}: expected {expected}, got {actual} at argument {position}")]
    TypeMismatch {
        function: String,
        expected: String,
        actual: String,
        position: usize,
    },

    /// Special-form dispatch failed: malformed head form.
    #[error("malformed special form: {0}")]
    BadKeyword(String),

    /// Malformed `quote` form.
    #[error("malformed quote: {0}")]
    BadQuote(String),

    /// Malformed `quasiquote`/`unquote`/`unquote-splicing` form.
    #[error("malformed quasiquote: {0}")]
    BadQuasiquote(String),

    /// A sequence primitive received a non-iterable argument.
    #[error("not iterable: {0}")]
    NotIterable(String),

    /// Macro expansion did not reach a fixed point within the iteration
    /// bound.
    #[error("macro expansion limit exceeded for {0}")]
    MacroExpansionLimit(String),

    /// Error surfaced from a `HostScope` capability.
    #[error("host error: {0}")]
    HostError(String),

    /// A plain `(error "message")` raised from Lisp code.
    #[error("{0}")]
    Raised(String),
}

impl EvalError {
    pub fn type_error(function: &str, expected: &str, actual: &Value, position: usize) -> Self {
        EvalError::TypeMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
            position,
        }
    }

    pub fn arity_error(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        EvalError::ArityMismatch {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn runtime_error(function: &str, message: impl Into<String>) -> Self {
        EvalError::HostError(format!("{}: {}", function, message.into()))
    }
}

/// The single error shape exposed to a host at the top level: a message
/// plus a bounded trace of short printed forms, formatted by
/// `repl_eval` as `EvalException: <message>\n\t<frame>\n\t...`.
#[derive(Debug, Clone)]
pub struct EvalException {
    pub message: String,
    pub trace: Vec<String>,
}

impl EvalException {
    pub fn new(error: &EvalError, trace: Vec<String>) -> Self {
        let mut trace = trace;
        trace.truncate(MAX_TRACE_FRAMES);
        EvalException {
            message: error.to_string(),
            trace,
        }
    }

    pub fn format(&self) -> String {
        let mut out = format!("EvalException: {}", self.message);
        for frame in &self.trace {
            out.push_str("\n\t");
            out.push_str(frame);
        }
        out
    }
}
