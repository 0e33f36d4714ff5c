//! Symbol primitives.

use lispcraft_macros::builtin;

use super::support::{as_string, require_arity};
use crate::error::EvalError;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Returns a freshly interned symbol, globally unique within this process
/// (backed by a counter on the owning `Interpreter`).
///
/// # Examples
/// ```lisp
/// (gensym) => g1
/// ```
#[builtin(name = "gensym", category = "Symbols", related("make-symbol"))]
pub fn builtin_gensym(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let prefix = match args.first() {
        Some(v) => as_string("gensym", v, 0)?.to_string(),
        None => "g".to_string(),
    };
    let n = interp.next_gensym();
    Ok(Value::Symbol(crate::symbol::intern(&format!("{}{}", prefix, n))))
}

/// Returns a fresh, uninterned symbol named `name`: unlike `intern`, two
/// calls with the same name produce distinct symbols.
#[builtin(name = "make-symbol", category = "Symbols", related("gensym", "intern"))]
pub fn builtin_make_symbol(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("make-symbol", args, 1)?;
    let name = as_string("make-symbol", &args[0], 0)?;
    Ok(Value::Symbol(crate::symbol::Symbol::uninterned(name.to_string())))
}

/// Interns `name`, returning the process-wide canonical symbol for it.
#[builtin(name = "intern", category = "Symbols", related("make-symbol", "symbol-name"))]
pub fn builtin_intern(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("intern", args, 1)?;
    let name = as_string("intern", &args[0], 0)?;
    Ok(Value::Symbol(crate::symbol::intern(&name)))
}

/// The printed name of a symbol, as a string.
#[builtin(name = "symbol-name", category = "Symbols", related("intern"))]
pub fn builtin_symbol_name(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("symbol-name", args, 1)?;
    match &args[0] {
        Value::Symbol(s) => Ok(Value::string(s.name())),
        other => Err(EvalError::type_error("symbol-name", "symbol", other, 0)),
    }
}

/// The name of a value's host type, or `"nil"` for the empty list.
#[builtin(name = "symbol-type", category = "Symbols")]
pub fn builtin_symbol_type(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("symbol-type", args, 1)?;
    let name = match &args[0] {
        Value::Null => "nil",
        other => other.type_name(),
    };
    Ok(Value::string(name))
}

pub fn register(globals: &crate::env::Globals) {
    register_builtin_gensym(globals);
    register_builtin_make_symbol(globals);
    register_builtin_intern(globals);
    register_builtin_symbol_name(globals);
    register_builtin_symbol_type(globals);
}

pub fn register_help() {
    register_help_builtin_gensym();
    register_help_builtin_make_symbol();
    register_help_builtin_intern();
    register_help_builtin_symbol_name();
    register_help_builtin_symbol_type();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gensym_produces_distinct_symbols_each_call() {
        let mut interp = Interpreter::new();
        let a = builtin_gensym(&mut interp, &[]).unwrap();
        let b = builtin_gensym(&mut interp, &[]).unwrap();
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn make_symbol_is_uninterned() {
        let mut interp = Interpreter::new();
        let a = builtin_make_symbol(&mut interp, &[Value::string("x")]).unwrap();
        let b = builtin_make_symbol(&mut interp, &[Value::string("x")]).unwrap();
        match (&a, &b) {
            (Value::Symbol(x), Value::Symbol(y)) => assert!(!crate::symbol::Symbol::ptr_eq(x, y)),
            _ => panic!("expected symbols"),
        }
    }

    #[test]
    fn intern_is_idempotent_by_identity() {
        let mut interp = Interpreter::new();
        let a = builtin_intern(&mut interp, &[Value::string("shared")]).unwrap();
        let b = builtin_intern(&mut interp, &[Value::string("shared")]).unwrap();
        match (&a, &b) {
            (Value::Symbol(x), Value::Symbol(y)) => assert!(crate::symbol::Symbol::ptr_eq(x, y)),
            _ => panic!("expected symbols"),
        }
    }

    #[test]
    fn symbol_type_names_nil_specially() {
        let mut interp = Interpreter::new();
        assert_eq!(builtin_symbol_type(&mut interp, &[Value::Null]).unwrap().to_string(), "\"nil\"");
    }
}
