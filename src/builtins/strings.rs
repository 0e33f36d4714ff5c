//! String primitives.

use lispcraft_macros::builtin;

use super::support::{as_string, require_arity, sequence_arg};
use crate::error::EvalError;
use crate::interpreter::Interpreter;
use crate::value::Value;

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.to_string(),
        other => crate::printer::print_bare(other),
    }
}

/// Concatenates the printed form of its arguments into one string.
///
/// # Examples
/// ```lisp
/// (str "a" "b" 3) => "ab3"
/// ```
#[builtin(name = "str", category = "Strings")]
pub fn builtin_str(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::string(args.iter().map(display).collect::<String>()))
}

/// Lowercases a string.
#[builtin(name = "string-downcase", category = "Strings", related("string-upcase"))]
pub fn builtin_string_downcase(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("string-downcase", args, 1)?;
    Ok(Value::string(as_string("string-downcase", &args[0], 0)?.to_lowercase()))
}

/// Uppercases a string.
#[builtin(name = "string-upcase", category = "Strings", related("string-downcase"))]
pub fn builtin_string_upcase(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("string-upcase", args, 1)?;
    Ok(Value::string(as_string("string-upcase", &args[0], 0)?.to_uppercase()))
}

/// `t` if its argument is a string.
#[builtin(name = "string?", category = "Strings")]
pub fn builtin_string_p(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("string?", args, 1)?;
    Ok(Value::lisp_bool(matches!(args[0], Value::String(_))))
}

/// Matches a shell-style glob pattern (`*` and `?`) against `text`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let (mut star, mut star_ti) = (None, 0usize);
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Keeps the elements of `seq` whose printed form matches a glob pattern.
///
/// # Examples
/// ```lisp
/// (glob "a*" '("apple" "banana" "avocado")) => ("apple" "avocado")
/// ```
#[builtin(name = "glob", category = "Strings")]
pub fn builtin_glob(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("glob", args, 2)?;
    let pattern = as_string("glob", &args[0], 0)?;
    let seq = sequence_arg("glob", &args[1])?;
    Ok(Value::list(seq.into_iter().filter(|v| glob_match(&pattern, &display(v)))))
}

pub fn register(globals: &crate::env::Globals) {
    register_builtin_str(globals);
    register_builtin_string_downcase(globals);
    register_builtin_string_upcase(globals);
    register_builtin_string_p(globals);
    register_builtin_glob(globals);
}

pub fn register_help() {
    register_help_builtin_str();
    register_help_builtin_string_downcase();
    register_help_builtin_string_upcase();
    register_help_builtin_string_p();
    register_help_builtin_glob();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(f: crate::value::BuiltinFn, args: &[Value]) -> Value {
        let mut interp = Interpreter::new();
        f(&mut interp, args).unwrap()
    }

    #[test]
    fn str_concatenates_printed_forms() {
        assert_eq!(call(builtin_str, &[Value::string("a"), Value::int(1)]).to_string(), "\"a1\"");
    }

    #[test]
    fn case_conversion_round_trips() {
        assert_eq!(display(&call(builtin_string_upcase, &[Value::string("abc")])), "ABC");
        assert_eq!(display(&call(builtin_string_downcase, &[Value::string("ABC")])), "abc");
    }

    #[test]
    fn glob_filters_by_pattern() {
        let seq = Value::list(vec![Value::string("apple"), Value::string("banana"), Value::string("avocado")]);
        let out = call(builtin_glob, &[Value::string("a*"), seq]);
        assert_eq!(out.to_vec().unwrap().len(), 2);
    }
}
