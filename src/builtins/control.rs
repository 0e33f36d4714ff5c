//! Control/meta primitives : re-entering the evaluator from
//! Lisp code, and the handful of host-delegating operations (`load`,
//! `return`, `error`).

use std::cell::RefCell;
use std::collections::HashMap;

use lispcraft_macros::builtin;

use super::support::{as_string, require_arity, sequence_arg};
use crate::error::EvalError;
use crate::eval;
use crate::interpreter::Interpreter;
use crate::value::Value;

thread_local! {
    static LOAD_CACHE: RefCell<HashMap<String, Value>> = RefCell::new(HashMap::new());
}

/// Calls `fn` with the elements of `args` as its argument list.
///
/// # Examples
/// ```lisp
/// (apply + '(1 2 3)) => 6
/// ```
#[builtin(name = "apply", category = "Control")]
pub fn builtin_apply(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("apply", args, 2)?;
    let call_args = sequence_arg("apply", &args[1])?;
    eval::apply(interp, &args[0], call_args)
}

/// Evaluates a form as data, in the global scope.
///
/// # Examples
/// ```lisp
/// (eval '(+ 1 2)) => 3
/// ```
#[builtin(name = "eval", category = "Control")]
pub fn builtin_eval(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("eval", args, 1)?;
    interp.eval(&args[0])
}

/// Records `v` as the top-level return value for the host to retrieve,
/// and stops further top-level forms from evaluating.
#[builtin(name = "return", category = "Control")]
pub fn builtin_return(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let v = args.first().cloned().unwrap_or(Value::Null);
    interp.host.set_return_value(v.clone());
    interp.host.request_halt();
    Ok(v)
}

/// Raises a Lisp-level error carrying `message`.
#[builtin(name = "error", category = "Control")]
pub fn builtin_error(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("error", args, 1)?;
    let message = match &args[0] {
        Value::String(s) => s.to_string(),
        other => crate::printer::print_bare(other),
    };
    Err(EvalError::Raised(message))
}

/// Loads and evaluates a script by path through the host, for effect.
/// Results are cached by path: a second `load` of the same path returns
/// the first load's result without re-reading or re-evaluating it.
#[builtin(name = "load", category = "Control")]
pub fn builtin_load(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("load", args, 1)?;
    let path = as_string("load", &args[0], 0)?.to_string();
    if let Some(cached) = LOAD_CACHE.with(|c| c.borrow().get(&path).cloned()) {
        return Ok(cached);
    }
    let source = interp.host.clone().load_file(&path)?;
    let mut result = Value::Null;
    for form in interp.parse(&source)? {
        result = interp.eval(&form)?;
    }
    LOAD_CACHE.with(|c| c.borrow_mut().insert(path, result.clone()));
    Ok(result)
}

pub fn register(globals: &crate::env::Globals) {
    register_builtin_apply(globals);
    register_builtin_eval(globals);
    register_builtin_return(globals);
    register_builtin_error(globals);
    register_builtin_load(globals);
}

pub fn register_help() {
    register_help_builtin_apply();
    register_help_builtin_eval();
    register_help_builtin_return();
    register_help_builtin_error();
    register_help_builtin_load();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_spreads_a_list_as_arguments() {
        let mut interp = Interpreter::new();
        let plus = interp.globals.get(&crate::symbol::intern("+")).unwrap();
        let args = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        let out = builtin_apply(&mut interp, &[plus, args]).unwrap();
        assert_eq!(out.to_string(), "6");
    }

    #[test]
    fn eval_runs_a_quoted_form() {
        let mut interp = Interpreter::new();
        let form = interp.parse("(+ 1 2)").unwrap().remove(0);
        let out = builtin_eval(&mut interp, &[form]).unwrap();
        assert_eq!(out.to_string(), "3");
    }

    #[test]
    fn error_raises_with_the_given_message() {
        let mut interp = Interpreter::new();
        let err = builtin_error(&mut interp, &[Value::string("boom")]).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
