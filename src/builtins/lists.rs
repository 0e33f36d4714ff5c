//! Cons and list primitives.

use lispcraft_macros::builtin;

use super::support::{require_arity, sequence_arg};
use crate::error::{self, EvalError};
use crate::interpreter::Interpreter;
use crate::value::{ConsCell, Value};

/// Builds a new cons cell.
///
/// # Examples
/// ```lisp
/// (cons 1 2) => (1 . 2)
/// (cons 1 '(2 3)) => (1 2 3)
/// ```
#[builtin(name = "cons", category = "Lists", related("car", "cdr"))]
pub fn builtin_cons(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("cons", args, 2)?;
    Ok(Value::cons(args[0].clone(), args[1].clone()))
}

/// The first element of a cons cell.
#[builtin(name = "car", category = "Lists", related("cdr", "cons"))]
pub fn builtin_car(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("car", args, 1)?;
    match &args[0] {
        Value::Cons(cell) => Ok(cell.car.borrow().clone()),
        Value::Null => Ok(Value::Null),
        other => Err(EvalError::type_error("car", "cons", other, 0)),
    }
}

/// Everything after the first element of a cons cell.
#[builtin(name = "cdr", category = "Lists", related("car", "cons"))]
pub fn builtin_cdr(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("cdr", args, 1)?;
    match &args[0] {
        Value::Cons(cell) => Ok(cell.cdr.borrow().clone()),
        Value::Null => Ok(Value::Null),
        other => Err(EvalError::type_error("cdr", "cons", other, 0)),
    }
}

/// `t` if its argument is anything other than a cons cell.
#[builtin(name = "atom", category = "Lists", related("consp"))]
pub fn builtin_atom(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("atom", args, 1)?;
    Ok(Value::lisp_bool(!args[0].is_cons()))
}

/// `t` if its argument is a (non-empty) cons cell.
#[builtin(name = "consp", category = "Lists", related("atom", "listp"))]
pub fn builtin_consp(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("consp", args, 1)?;
    Ok(Value::lisp_bool(args[0].is_cons()))
}

/// `t` if its argument is a cons cell or the empty list.
#[builtin(name = "listp", category = "Lists", related("consp", "seq?"))]
pub fn builtin_listp(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("listp", args, 1)?;
    Ok(Value::lisp_bool(matches!(args[0], Value::Cons(_) | Value::Null)))
}

/// `t` if its argument is a proper list or another sequence this
/// interpreter iterates over.
#[builtin(name = "seq?", category = "Lists", related("listp"))]
pub fn builtin_seqp(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("seq?", args, 1)?;
    Ok(Value::lisp_bool(matches!(args[0], Value::Cons(_) | Value::Null)))
}

/// `t` if its argument is the empty list; errors on a non-list.
#[builtin(name = "endp", category = "Lists", related("listp"))]
pub fn builtin_endp(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("endp", args, 1)?;
    match &args[0] {
        Value::Null => Ok(Value::lisp_bool(true)),
        Value::Cons(_) => Ok(Value::lisp_bool(false)),
        other => Err(EvalError::type_error("endp", "list", other, 0)),
    }
}

/// Builds a proper list out of its arguments (identity on an already-flat
/// argument list — no cons-unwrapping here).
#[builtin(name = "list", category = "Lists")]
pub fn builtin_list(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::list(args.to_vec()))
}

/// Destructively replaces a cons cell's `car`.
#[builtin(name = "rplaca", category = "Lists", related("rplacd"))]
pub fn builtin_rplaca(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("rplaca", args, 2)?;
    match &args[0] {
        Value::Cons(cell) => {
            *cell.car.borrow_mut() = args[1].clone();
            Ok(args[0].clone())
        }
        other => Err(EvalError::type_error("rplaca", "cons", other, 0)),
    }
}

/// Destructively replaces a cons cell's `cdr`.
#[builtin(name = "rplacd", category = "Lists", related("rplaca"))]
pub fn builtin_rplacd(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("rplacd", args, 2)?;
    match &args[0] {
        Value::Cons(cell) => {
            *cell.cdr.borrow_mut() = args[1].clone();
            Ok(args[0].clone())
        }
        other => Err(EvalError::type_error("rplacd", "cons", other, 0)),
    }
}

/// Number of elements in a sequence.
#[builtin(name = "length", category = "Lists")]
pub fn builtin_length(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("length", args, 1)?;
    Ok(Value::int(sequence_arg("length", &args[0])?.len() as i64))
}

/// The element at `index` of a sequence.
#[builtin(name = "nth", category = "Lists", related("first", "second", "third"))]
pub fn builtin_nth(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("nth", args, 2)?;
    let index = super::support::as_int("nth", &args[0], 0)?;
    let seq = sequence_arg("nth", &args[1])?;
    if index < 0 {
        return Err(EvalError::type_error("nth", "non-negative index", &args[0], 0));
    }
    Ok(seq.get(index as usize).cloned().unwrap_or(Value::Null))
}

fn nth_of(function: &'static str, n: usize, args: &[Value]) -> Result<Value, EvalError> {
    require_arity(function, args, 1)?;
    let seq = sequence_arg(function, &args[0])?;
    Ok(seq.get(n).cloned().unwrap_or(Value::Null))
}

/// The first element of a sequence.
#[builtin(name = "first", category = "Lists", related("second", "third", "rest"))]
pub fn builtin_first(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    nth_of("first", 0, args)
}

/// The second element of a sequence.
#[builtin(name = "second", category = "Lists", related("first", "third"))]
pub fn builtin_second(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    nth_of("second", 1, args)
}

/// The third element of a sequence.
#[builtin(name = "third", category = "Lists", related("first", "second"))]
pub fn builtin_third(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    nth_of("third", 2, args)
}

/// Everything after the first element: `cdr` of a cons, or every element
/// but the first of any other sequence.
#[builtin(name = "rest", category = "Lists", related("first", "skip"))]
pub fn builtin_rest(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("rest", args, 1)?;
    match &args[0] {
        Value::Cons(cell) => Ok(cell.cdr.borrow().clone()),
        Value::Null => Ok(Value::Null),
        other => {
            let seq = sequence_arg("rest", other)?;
            Ok(Value::list(seq.into_iter().skip(1)))
        }
    }
}

/// Drops the first `n` elements of a sequence.
#[builtin(name = "skip", category = "Lists", related("take", "rest"))]
pub fn builtin_skip(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("skip", args, 2)?;
    let n = super::support::as_int("skip", &args[0], 0)?.max(0) as usize;
    let seq = sequence_arg("skip", &args[1])?;
    Ok(Value::list(seq.into_iter().skip(n)))
}

/// Keeps only the first `n` elements of a sequence.
#[builtin(name = "take", category = "Lists", related("skip"))]
pub fn builtin_take(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("take", args, 2)?;
    let n = super::support::as_int("take", &args[0], 0)?.max(0) as usize;
    let seq = sequence_arg("take", &args[1])?;
    Ok(Value::list(seq.into_iter().take(n)))
}

/// A half-open slice `[start, end)` of a sequence; a negative `end` (or an
/// omitted third argument) means "through the end".
#[builtin(name = "subseq", category = "Lists", related("take", "skip"))]
pub fn builtin_subseq(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 && args.len() != 3 {
        return Err(EvalError::arity_error("subseq", error::ARITY_TWO_OR_THREE, args.len()));
    }
    let seq = sequence_arg("subseq", &args[0])?;
    let start = super::support::as_int("subseq", &args[1], 1)?.max(0) as usize;
    let end = match args.get(2) {
        Some(v) => {
            let e = super::support::as_int("subseq", v, 2)?;
            if e < 0 {
                seq.len()
            } else {
                (e as usize).min(seq.len())
            }
        }
        None => seq.len(),
    };
    if start >= end {
        return Ok(Value::Null);
    }
    Ok(Value::list(seq[start..end].to_vec()))
}

/// Concatenates its arguments into one list: every argument but the last
/// must be a proper list and is copied; the last argument becomes the
/// final cell's tail verbatim, even if it is not itself a list.
///
/// # Examples
/// ```lisp
/// (append '(1 2) '(3 4)) => (1 2 3 4)
/// (append '(1 2) 3) => (1 2 . 3)
/// (append) => nil
/// ```
#[builtin(name = "append", category = "Lists")]
pub fn builtin_append(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let Some((last, init)) = args.split_last() else {
        return Ok(Value::Null);
    };
    let mut result = last.clone();
    for arg in init.iter().rev() {
        let items = sequence_arg("append", arg)?;
        for item in items.into_iter().rev() {
            result = Value::cons(item, result);
        }
    }
    Ok(result)
}

pub fn register(globals: &crate::env::Globals) {
    register_builtin_cons(globals);
    register_builtin_car(globals);
    register_builtin_cdr(globals);
    register_builtin_atom(globals);
    register_builtin_consp(globals);
    register_builtin_listp(globals);
    register_builtin_seqp(globals);
    register_builtin_endp(globals);
    register_builtin_list(globals);
    register_builtin_rplaca(globals);
    register_builtin_rplacd(globals);
    register_builtin_length(globals);
    register_builtin_nth(globals);
    register_builtin_first(globals);
    register_builtin_second(globals);
    register_builtin_third(globals);
    register_builtin_rest(globals);
    register_builtin_skip(globals);
    register_builtin_take(globals);
    register_builtin_subseq(globals);
    register_builtin_append(globals);
}

pub fn register_help() {
    register_help_builtin_cons();
    register_help_builtin_car();
    register_help_builtin_cdr();
    register_help_builtin_atom();
    register_help_builtin_consp();
    register_help_builtin_listp();
    register_help_builtin_seqp();
    register_help_builtin_endp();
    register_help_builtin_list();
    register_help_builtin_rplaca();
    register_help_builtin_rplacd();
    register_help_builtin_length();
    register_help_builtin_nth();
    register_help_builtin_first();
    register_help_builtin_second();
    register_help_builtin_third();
    register_help_builtin_rest();
    register_help_builtin_skip();
    register_help_builtin_take();
    register_help_builtin_subseq();
    register_help_builtin_append();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(f: crate::value::BuiltinFn, args: &[Value]) -> Value {
        let mut interp = Interpreter::new();
        f(&mut interp, args).unwrap()
    }

    #[test]
    fn cons_car_cdr_round_trip() {
        let pair = call(builtin_cons, &[Value::int(1), Value::int(2)]);
        assert_eq!(call(builtin_car, &[pair.clone()]).to_string(), "1");
        assert_eq!(call(builtin_cdr, &[pair]).to_string(), "2");
    }

    #[test]
    fn list_builds_a_proper_list_from_flat_args() {
        let l = call(builtin_list, &[Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(l.to_vec().unwrap().len(), 3);
    }

    #[test]
    fn nth_and_accessors_index_into_a_list() {
        let l = Value::list(vec![Value::int(10), Value::int(20), Value::int(30)]);
        assert_eq!(call(builtin_first, &[l.clone()]).to_string(), "10");
        assert_eq!(call(builtin_second, &[l.clone()]).to_string(), "20");
        assert_eq!(call(builtin_nth, &[Value::int(2), l]).to_string(), "30");
    }

    #[test]
    fn subseq_is_half_open_and_negative_end_means_through_the_end() {
        let l = Value::list(vec![Value::int(1), Value::int(2), Value::int(3), Value::int(4)]);
        let slice = call(builtin_subseq, &[l.clone(), Value::int(1), Value::int(3)]);
        assert_eq!(slice.to_vec().unwrap().len(), 2);
        let rest = call(builtin_subseq, &[l, Value::int(1), Value::int(-1)]);
        assert_eq!(rest.to_vec().unwrap().len(), 3);
    }

    #[test]
    fn rplaca_mutates_in_place() {
        let cell = ConsCell::new(Value::int(1), Value::int(2));
        let v = Value::Cons(cell);
        call(builtin_rplaca, &[v.clone(), Value::int(99)]);
        assert_eq!(call(builtin_car, &[v]).to_string(), "99");
    }

    #[test]
    fn append_concatenates_proper_lists() {
        let a = Value::list(vec![Value::int(1), Value::int(2)]);
        let b = Value::list(vec![Value::int(3), Value::int(4)]);
        let out = call(builtin_append, &[a, b]);
        assert_eq!(out.to_vec().unwrap().len(), 4);
    }

    #[test]
    fn append_uses_the_last_argument_verbatim_as_the_tail() {
        let a = Value::list(vec![Value::int(1), Value::int(2)]);
        let out = call(builtin_append, &[a, Value::int(3)]);
        assert_eq!(out.to_string(), "(1 2 . 3)");
    }

    #[test]
    fn append_with_no_arguments_is_nil() {
        assert!(call(builtin_append, &[]).is_null());
    }
}
