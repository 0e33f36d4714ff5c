//! Introspection over the primitive library's own documentation, built on
//! the `#[builtin(...)]`-populated help registry.

use lispcraft_macros::builtin;

use super::support::require_arity;
use crate::error::EvalError;
use crate::interpreter::Interpreter;
use crate::value::Value;

fn entry_name(function: &str, v: &Value) -> Result<String, EvalError> {
    match v {
        Value::Symbol(s) => Ok(s.name().to_string()),
        Value::String(s) => Ok(s.to_string()),
        other => Err(EvalError::type_error(function, "symbol or string", other, 0)),
    }
}

/// With no arguments, prints a quick reference of every builtin grouped by
/// category. With one argument (a symbol or string naming a builtin),
/// prints that builtin's detailed help. Always returns `nil`.
///
/// # Examples
/// ```lisp
/// (help 'cons)
/// ```
#[builtin(name = "help", category = "Help", related("help-text"))]
pub fn builtin_help(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let host = interp.host.clone();
    match args {
        [] => {
            host.write(&crate::help::format_quick_reference());
            host.write("\n");
        }
        [name] => {
            let name = entry_name("help", name)?;
            match crate::help::get_help(&name) {
                Some(entry) => {
                    host.write(&crate::help::format_help_entry(&entry));
                    host.write("\n");
                }
                None => host.write(&format!("No help found for {}\n", name)),
            }
        }
        _ => return Err(EvalError::arity_error("help", crate::error::ARITY_ZERO_OR_ONE, args.len())),
    }
    Ok(Value::Null)
}

/// Returns help text as a string instead of printing it: the quick
/// reference with no arguments, or one builtin's detailed entry given its
/// name.
#[builtin(name = "help-text", category = "Help", related("help"))]
pub fn builtin_help_text(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Ok(Value::string(crate::help::format_quick_reference()));
    }
    require_arity("help-text", args, 1)?;
    let name = entry_name("help-text", &args[0])?;
    match crate::help::get_help(&name) {
        Some(entry) => Ok(Value::string(crate::help::format_help_entry(&entry))),
        None => Err(EvalError::Raised(format!("no help available for {}", name))),
    }
}

pub fn register(globals: &crate::env::Globals) {
    register_builtin_help(globals);
    register_builtin_help_text(globals);
}

pub fn register_help() {
    register_help_builtin_help();
    register_help_builtin_help_text();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_text_with_no_args_returns_the_quick_reference() {
        let mut interp = Interpreter::new();
        let out = builtin_help_text(&mut interp, &[]).unwrap();
        match out {
            Value::String(s) => assert!(s.contains("Arithmetic")),
            _ => panic!("expected a string"),
        }
    }

    #[test]
    fn help_text_for_a_known_builtin_includes_its_signature() {
        let mut interp = Interpreter::new();
        let out = builtin_help_text(&mut interp, &[Value::symbol("cons")]).unwrap();
        match out {
            Value::String(s) => assert!(s.contains("cons")),
            _ => panic!("expected a string"),
        }
    }

    #[test]
    fn help_text_for_an_unknown_name_errors() {
        let mut interp = Interpreter::new();
        assert!(builtin_help_text(&mut interp, &[Value::symbol("not-a-real-builtin")]).is_err());
    }

    #[test]
    fn help_returns_nil() {
        let mut interp = Interpreter::new();
        assert!(builtin_help(&mut interp, &[]).unwrap().is_null());
        assert!(builtin_help(&mut interp, &[Value::symbol("cons")]).unwrap().is_null());
    }
}
