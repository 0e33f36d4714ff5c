//! Shared helpers used across builtin categories: sequence coercion and the
//! handful of argument-shape checks every category repeats.

use crate::error::EvalError;
use crate::value::Value;

/// Converts any proper list into a `Vec`, erroring `NotIterable` for
/// anything else (dotted pairs included).
pub fn sequence_arg(function: &str, v: &Value) -> Result<Vec<Value>, EvalError> {
    v.to_vec().ok_or_else(|| EvalError::NotIterable(format!("{}: {}", function, v.type_name())))
}

pub fn require_arity(function: &str, args: &[Value], n: usize) -> Result<(), EvalError> {
    if args.len() != n {
        return Err(EvalError::arity_error(function, n.to_string(), args.len()));
    }
    Ok(())
}

pub fn as_string(function: &str, v: &Value, position: usize) -> Result<std::rc::Rc<str>, EvalError> {
    match v {
        Value::String(s) => Ok(s.clone()),
        other => Err(EvalError::type_error(function, "string", other, position)),
    }
}

pub fn as_int(function: &str, v: &Value, position: usize) -> Result<i64, EvalError> {
    match v {
        Value::Number(n) => n.as_i64().ok_or_else(|| EvalError::type_error(function, "integer", v, position)),
        other => Err(EvalError::type_error(function, "integer", other, position)),
    }
}
