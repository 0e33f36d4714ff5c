//! Printing primitives . All of these write through
//! `interp.host.write`, so embedding hosts capture output the same way they
//! capture any other side effect; `NullHost` just forwards to stdout.

use lispcraft_macros::builtin;

use crate::error::EvalError;
use crate::interpreter::Interpreter;
use crate::value::Value;

fn readable_forms(args: &[Value]) -> String {
    args.iter().map(crate::printer::print_readable).collect::<Vec<_>>().join(" ")
}

fn last_or_null(args: &[Value]) -> Value {
    args.last().cloned().unwrap_or(Value::Null)
}

/// Writes the readable form of each argument, space-separated, with no
/// trailing newline. Returns the last argument, or `nil` if called with
/// none.
///
/// # Examples
/// ```lisp
/// (prin1 "hi") => outputs: "hi"
/// ```
#[builtin(name = "prin1", category = "Printing", related("princ", "print"))]
pub fn builtin_prin1(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    interp.host.clone().write(&readable_forms(args));
    Ok(last_or_null(args))
}

/// Writes the bare (unquoted-string) form of each argument, space-separated,
/// with no trailing newline.
#[builtin(name = "princ", category = "Printing", related("prin1", "str"))]
pub fn builtin_princ(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let text = args.iter().map(crate::printer::print_bare).collect::<Vec<_>>().join(" ");
    interp.host.clone().write(&text);
    Ok(last_or_null(args))
}

/// Writes a leading newline followed by the readable form of each argument,
/// space-separated.
#[builtin(name = "print", category = "Printing", related("println", "prin1"))]
pub fn builtin_print(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    interp.host.clone().write(&format!("\n{}", readable_forms(args)));
    Ok(last_or_null(args))
}

/// Writes the readable form of a single argument followed by a newline.
#[builtin(name = "println", category = "Printing", related("print", "printlns"))]
pub fn builtin_println(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("println", crate::error::ARITY_ONE, args.len()));
    }
    interp.host.clone().write(&format!("{}\n", crate::printer::print_readable(&args[0])));
    Ok(args[0].clone())
}

/// Writes the readable forms of any number of arguments, space-separated,
/// followed by a newline.
#[builtin(name = "printlns", category = "Printing", related("println"))]
pub fn builtin_printlns(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    interp.host.clone().write(&format!("{}\n", readable_forms(args)));
    Ok(last_or_null(args))
}

/// Writes a single newline. Returns `nil`.
#[builtin(name = "terpri", category = "Printing")]
pub fn builtin_terpri(interp: &mut Interpreter, _args: &[Value]) -> Result<Value, EvalError> {
    interp.host.clone().write("\n");
    Ok(Value::Null)
}

/// Writes the HTML-encoded readable form of each argument, space-separated,
/// with no trailing newline.
#[builtin(name = "pr", category = "Printing", related("prn"))]
pub fn builtin_pr(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let host = interp.host.clone();
    let encoded = host.html_encode(&readable_forms(args));
    host.write(&encoded);
    Ok(last_or_null(args))
}

/// Writes the HTML-encoded readable form of each argument, space-separated,
/// followed by a newline.
#[builtin(name = "prn", category = "Printing", related("pr"))]
pub fn builtin_prn(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let host = interp.host.clone();
    let encoded = host.html_encode(&readable_forms(args));
    host.write(&encoded);
    host.write("\n");
    Ok(last_or_null(args))
}

/// Writes the host's debug-dump rendering of a single value. Returns the
/// value unchanged.
#[builtin(name = "dump", category = "Printing", related("textdump", "htmldump"))]
pub fn builtin_dump(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("dump", crate::error::ARITY_ONE, args.len()));
    }
    let host = interp.host.clone();
    let rendered = host.dump(&args[0]);
    host.write(&rendered);
    Ok(args[0].clone())
}

/// Writes the host's plain-text dump of a single value. Returns the value
/// unchanged.
#[builtin(name = "textdump", category = "Printing", related("dump", "htmldump"))]
pub fn builtin_textdump(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("textdump", crate::error::ARITY_ONE, args.len()));
    }
    let host = interp.host.clone();
    let rendered = host.text_dump(&args[0]);
    host.write(&rendered);
    Ok(args[0].clone())
}

/// Writes the HTML-encoded form of the host's debug dump of a single value.
/// Returns the value unchanged.
#[builtin(name = "htmldump", category = "Printing", related("dump", "textdump"))]
pub fn builtin_htmldump(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error("htmldump", crate::error::ARITY_ONE, args.len()));
    }
    let host = interp.host.clone();
    let rendered = host.dump(&args[0]);
    let encoded = host.html_encode(&rendered);
    host.write(&encoded);
    Ok(args[0].clone())
}

pub fn register(globals: &crate::env::Globals) {
    register_builtin_prin1(globals);
    register_builtin_princ(globals);
    register_builtin_print(globals);
    register_builtin_println(globals);
    register_builtin_printlns(globals);
    register_builtin_terpri(globals);
    register_builtin_pr(globals);
    register_builtin_prn(globals);
    register_builtin_dump(globals);
    register_builtin_textdump(globals);
    register_builtin_htmldump(globals);
}

pub fn register_help() {
    register_help_builtin_prin1();
    register_help_builtin_princ();
    register_help_builtin_print();
    register_help_builtin_println();
    register_help_builtin_printlns();
    register_help_builtin_terpri();
    register_help_builtin_pr();
    register_help_builtin_prn();
    register_help_builtin_dump();
    register_help_builtin_textdump();
    register_help_builtin_htmldump();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prin1_returns_its_last_argument() {
        let mut interp = Interpreter::new();
        let out = builtin_prin1(&mut interp, &[Value::string("hi"), Value::int(3)]).unwrap();
        assert_eq!(out.to_string(), "3");
    }

    #[test]
    fn println_requires_exactly_one_argument() {
        let mut interp = Interpreter::new();
        assert!(builtin_println(&mut interp, &[]).is_err());
        assert!(builtin_println(&mut interp, &[Value::int(1), Value::int(2)]).is_err());
        assert!(builtin_println(&mut interp, &[Value::int(1)]).is_ok());
    }

    #[test]
    fn printlns_accepts_any_number_of_arguments() {
        let mut interp = Interpreter::new();
        assert!(builtin_printlns(&mut interp, &[]).is_ok());
        assert!(builtin_printlns(&mut interp, &[Value::int(1), Value::int(2), Value::int(3)]).is_ok());
    }

    #[test]
    fn terpri_returns_nil() {
        let mut interp = Interpreter::new();
        assert!(builtin_terpri(&mut interp, &[]).unwrap().is_null());
    }

    #[test]
    fn dump_round_trips_the_value_as_its_return() {
        let mut interp = Interpreter::new();
        let v = Value::list(vec![Value::int(1), Value::int(2)]);
        let out = builtin_dump(&mut interp, &[v.clone()]).unwrap();
        assert_eq!(out.to_string(), v.to_string());
    }
}
