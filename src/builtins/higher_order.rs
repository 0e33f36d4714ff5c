//! Higher-order sequence operations : map/filter/reduce and
//! the sort/group-by family. Each takes its function argument as an
//! ordinary callable `Value` and re-enters the evaluator via `crate::eval`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use lispcraft_macros::builtin;

use super::support::{require_arity, sequence_arg};
use crate::error::{self, EvalError};
use crate::eval;
use crate::interpreter::Interpreter;
use crate::value::{LispMap, Number, Value};

fn call1(interp: &mut Interpreter, f: &Value, arg: Value) -> Result<Value, EvalError> {
    eval::apply(interp, f, vec![arg])
}

fn call2(interp: &mut Interpreter, f: &Value, a: Value, b: Value) -> Result<Value, EvalError> {
    eval::apply(interp, f, vec![a, b])
}

/// Applies `fn` to every element of `seq`, collecting the results.
///
/// # Examples
/// ```lisp
/// (map (lambda (x) (* x x)) '(1 2 3)) => (1 4 9)
/// ```
#[builtin(name = "map", category = "Higher-order", related("where", "reduce"))]
pub fn builtin_map(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("map", args, 2)?;
    let seq = sequence_arg("map", &args[1])?;
    let mut out = Vec::with_capacity(seq.len());
    for item in seq {
        out.push(call1(interp, &args[0], item)?);
    }
    Ok(Value::list(out))
}

/// Keeps only the elements of `seq` for which `pred` is truthy.
///
/// # Examples
/// ```lisp
/// (where (lambda (x) (> x 1)) '(1 2 3)) => (2 3)
/// ```
#[builtin(name = "where", category = "Higher-order", related("map", "map-where"))]
pub fn builtin_where(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("where", args, 2)?;
    let seq = sequence_arg("where", &args[1])?;
    let mut out = Vec::new();
    for item in seq {
        if call1(interp, &args[0], item.clone())?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::list(out))
}

/// Keeps the elements of `seq` matching `pred`, then maps `fn` over them.
#[builtin(name = "map-where", category = "Higher-order", related("map", "where"))]
pub fn builtin_map_where(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 3 {
        return Err(EvalError::arity_error("map-where", error::ARITY_THREE, args.len()));
    }
    let seq = sequence_arg("map-where", &args[2])?;
    let mut out = Vec::new();
    for item in seq {
        if call1(interp, &args[0], item.clone())?.is_truthy() {
            out.push(call1(interp, &args[1], item)?);
        }
    }
    Ok(Value::list(out))
}

/// Calls `fn` on every element of `seq` for effect; always returns `nil`.
#[builtin(name = "dorun", category = "Higher-order", related("map"))]
pub fn builtin_dorun(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("dorun", args, 2)?;
    let seq = sequence_arg("dorun", &args[1])?;
    for item in seq {
        call1(interp, &args[0], item)?;
    }
    Ok(Value::Null)
}

/// Folds `fn` over `seq` left to right. With a third argument it is the
/// seed; otherwise the first element seeds and the rest fold in — an
/// empty sequence with no seed is an error.
///
/// # Examples
/// ```lisp
/// (reduce + '(1 2 3)) => 6
/// (reduce + '() 0) => 0
/// ```
#[builtin(name = "reduce", category = "Higher-order", related("map"))]
pub fn builtin_reduce(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 && args.len() != 3 {
        return Err(EvalError::arity_error("reduce", error::ARITY_TWO_OR_THREE, args.len()));
    }
    let seq = sequence_arg("reduce", &args[1])?;
    let mut it = seq.into_iter();
    let mut acc = match args.get(2) {
        Some(seed) => seed.clone(),
        None => it
            .next()
            .ok_or_else(|| EvalError::runtime_error("reduce", "empty sequence with no seed"))?,
    };
    for item in it {
        acc = call2(interp, &args[0], acc, item)?;
    }
    Ok(acc)
}

fn flatten_into(v: &Value, out: &mut Vec<Value>) {
    match v {
        Value::Null => {}
        Value::Cons(cell) => {
            flatten_into(&cell.car.borrow(), out);
            flatten_into(&cell.cdr.borrow(), out);
        }
        other => out.push(other.clone()),
    }
}

/// Flattens arbitrarily nested lists into one flat list.
///
/// # Examples
/// ```lisp
/// (flatten '((1 2) (3 (4 5)))) => (1 2 3 4 5)
/// ```
#[builtin(name = "flatten", category = "Higher-order")]
pub fn builtin_flatten(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("flatten", args, 1)?;
    let mut out = Vec::new();
    flatten_into(&args[0], &mut out);
    Ok(Value::list(out))
}

fn natural_cmp(function: &str, a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            Ok(x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(EvalError::type_error(function, "comparable values", a, 0)),
    }
}

/// Sorts `seq` in natural order (numbers and strings compare directly).
#[builtin(name = "sort", category = "Higher-order", related("sort-by", "order-by"))]
pub fn builtin_sort(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("sort", args, 1)?;
    let mut seq = sequence_arg("sort", &args[0])?;
    let mut err = None;
    seq.sort_by(|a, b| match natural_cmp("sort", a, b) {
        Ok(o) => o,
        Err(e) => {
            err.get_or_insert(e);
            Ordering::Equal
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(Value::list(seq))
}

/// Sorts `seq` by the value of `keyfn` applied to each element, optionally
/// with a custom two-argument `comparer`.
#[builtin(name = "sort-by", category = "Higher-order", related("sort", "order-by"))]
pub fn builtin_sort_by(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 && args.len() != 3 {
        return Err(EvalError::arity_error("sort-by", error::ARITY_TWO_OR_THREE, args.len()));
    }
    let seq = sequence_arg("sort-by", &args[1])?;
    let mut keyed: Vec<(Value, Value)> = Vec::with_capacity(seq.len());
    for item in seq {
        let key = call1(interp, &args[0], item.clone())?;
        keyed.push((key, item));
    }
    let mut err = None;
    match args.get(2) {
        Some(comparer) => {
            let mut with_err: Option<EvalError> = None;
            keyed.sort_by(|a, b| match call2(interp, comparer, a.0.clone(), b.0.clone()) {
                Ok(v) if v.is_truthy() => Ordering::Less,
                Ok(_) => Ordering::Greater,
                Err(e) => {
                    with_err.get_or_insert(e);
                    Ordering::Equal
                }
            });
            if let Some(e) = with_err {
                return Err(e);
            }
        }
        None => {
            keyed.sort_by(|a, b| match natural_cmp("sort-by", &a.0, &b.0) {
                Ok(o) => o,
                Err(e) => {
                    err.get_or_insert(e);
                    Ordering::Equal
                }
            });
            if let Some(e) = err {
                return Err(e);
            }
        }
    }
    Ok(Value::list(keyed.into_iter().map(|(_, v)| v)))
}

fn map_lookup(m: &LispMap, key: &str) -> Option<Value> {
    m.borrow().get(key).cloned()
}

/// Sorts `seq` by one or more key specs, each either a bare key-function or
/// a map with `:key`, optional `:comparer`, and optional `:desc`.
#[builtin(name = "order-by", category = "Higher-order", related("sort-by", "sort"))]
pub fn builtin_order_by(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("order-by", args, 2)?;
    let key_specs = sequence_arg("order-by", &args[0]).unwrap_or_else(|_| vec![args[0].clone()]);
    let seq = sequence_arg("order-by", &args[1])?;

    struct Spec {
        keyfn: Value,
        comparer: Option<Value>,
        desc: bool,
    }
    let mut specs = Vec::with_capacity(key_specs.len());
    for spec in key_specs {
        match &spec {
            Value::Map(m) => {
                let keyfn = map_lookup(m, "key")
                    .ok_or_else(|| EvalError::runtime_error("order-by", "key spec map missing :key"))?;
                specs.push(Spec {
                    keyfn,
                    comparer: map_lookup(m, "comparer"),
                    desc: map_lookup(m, "desc").map(|v| v.is_truthy()).unwrap_or(false),
                });
            }
            other => specs.push(Spec { keyfn: other.clone(), comparer: None, desc: false }),
        }
    }

    let mut keyed: Vec<(Vec<Value>, Value)> = Vec::with_capacity(seq.len());
    for item in seq {
        let mut keys = Vec::with_capacity(specs.len());
        for spec in &specs {
            keys.push(call1(interp, &spec.keyfn, item.clone())?);
        }
        keyed.push((keys, item));
    }

    let mut err = None;
    keyed.sort_by(|a, b| {
        for (i, spec) in specs.iter().enumerate() {
            let ord = match &spec.comparer {
                Some(comparer) => match call2(interp, comparer, a.0[i].clone(), b.0[i].clone()) {
                    Ok(v) if v.is_truthy() => Ordering::Less,
                    Ok(_) => Ordering::Greater,
                    Err(e) => {
                        err.get_or_insert(e);
                        Ordering::Equal
                    }
                },
                None => match natural_cmp("order-by", &a.0[i], &b.0[i]) {
                    Ok(o) => o,
                    Err(e) => {
                        err.get_or_insert(e);
                        Ordering::Equal
                    }
                },
            };
            let ord = if spec.desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok(Value::list(keyed.into_iter().map(|(_, v)| v)))
}

fn value_key(function: &str, v: &Value) -> Result<String, EvalError> {
    match v {
        Value::String(s) => Ok(s.to_string()),
        Value::Symbol(s) => Ok(s.name().to_string()),
        Value::Number(Number::Int(i)) => Ok(i.to_string()),
        Value::Number(Number::Float(f)) => Ok(f.to_string()),
        other => Err(EvalError::type_error(function, "string, symbol, or number key", other, 0)),
    }
}

/// Groups `seq` by the value of `keyfn` applied to each element, returning
/// a map from stringified key to the list of matching elements.
#[builtin(name = "group-by", category = "Higher-order")]
pub fn builtin_group_by(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("group-by", args, 2)?;
    let seq = sequence_arg("group-by", &args[1])?;
    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for item in seq {
        let key = call1(interp, &args[0], item.clone())?;
        groups.entry(value_key("group-by", &key)?).or_default().push(item);
    }
    let mut out = BTreeMap::new();
    for (k, v) in groups {
        out.insert(k, Value::list(v));
    }
    Ok(Value::Map(std::rc::Rc::new(std::cell::RefCell::new(out))))
}

/// `t` if `pred` is truthy for at least one element of `seq`.
#[builtin(name = "some", category = "Higher-order", related("every"))]
pub fn builtin_some(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("some", args, 2)?;
    let seq = sequence_arg("some", &args[1])?;
    for item in seq {
        if call1(interp, &args[0], item)?.is_truthy() {
            return Ok(Value::lisp_bool(true));
        }
    }
    Ok(Value::lisp_bool(false))
}

/// `t` if `pred` is truthy for every element of `seq`.
#[builtin(name = "every", category = "Higher-order", related("some"))]
pub fn builtin_every(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("every", args, 2)?;
    let seq = sequence_arg("every", &args[1])?;
    for item in seq {
        if !call1(interp, &args[0], item)?.is_truthy() {
            return Ok(Value::lisp_bool(false));
        }
    }
    Ok(Value::lisp_bool(true))
}

fn numeric_seq(function: &str, v: &Value) -> Result<Vec<Number>, EvalError> {
    sequence_arg(function, v)?
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Number(n) => Ok(*n),
            other => Err(EvalError::type_error(function, "number", other, i)),
        })
        .collect()
}

/// Sums a sequence of numbers.
#[builtin(name = "sum", category = "Higher-order", related("average"))]
pub fn builtin_sum(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("sum", args, 1)?;
    let ns = numeric_seq("sum", &args[0])?;
    Ok(Value::Number(ns.into_iter().fold(Number::Int(0), crate::value::num_add)))
}

/// Averages a sequence of numbers; errors on an empty sequence.
#[builtin(name = "average", category = "Higher-order", related("sum"))]
pub fn builtin_average(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    require_arity("average", args, 1)?;
    let ns = numeric_seq("average", &args[0])?;
    if ns.is_empty() {
        return Err(EvalError::runtime_error("average", "empty sequence"));
    }
    let total: f64 = ns.iter().map(|n| n.as_f64()).sum();
    Ok(Value::float(total / ns.len() as f64))
}

pub fn register(globals: &crate::env::Globals) {
    register_builtin_map(globals);
    register_builtin_where(globals);
    register_builtin_map_where(globals);
    register_builtin_dorun(globals);
    register_builtin_reduce(globals);
    register_builtin_flatten(globals);
    register_builtin_sort(globals);
    register_builtin_sort_by(globals);
    register_builtin_order_by(globals);
    register_builtin_group_by(globals);
    register_builtin_some(globals);
    register_builtin_every(globals);
    register_builtin_sum(globals);
    register_builtin_average(globals);
}

pub fn register_help() {
    register_help_builtin_map();
    register_help_builtin_where();
    register_help_builtin_map_where();
    register_help_builtin_dorun();
    register_help_builtin_reduce();
    register_help_builtin_flatten();
    register_help_builtin_sort();
    register_help_builtin_sort_by();
    register_help_builtin_order_by();
    register_help_builtin_group_by();
    register_help_builtin_some();
    register_help_builtin_every();
    register_help_builtin_sum();
    register_help_builtin_average();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Function;

    fn lambda_from(interp: &mut Interpreter, source: &str) -> Value {
        let form = interp.parse(source).unwrap().remove(0);
        interp.eval(&form).unwrap()
    }

    #[test]
    fn map_applies_a_lambda_to_every_element() {
        let mut interp = Interpreter::new();
        let f = lambda_from(&mut interp, "(lambda (x) (* x x))");
        let seq = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        let out = builtin_map(&mut interp, &[f, seq]).unwrap();
        assert_eq!(out.to_vec().unwrap().iter().map(|v| v.to_string()).collect::<Vec<_>>(), vec!["1", "4", "9"]);
    }

    #[test]
    fn where_keeps_only_truthy_elements() {
        let mut interp = Interpreter::new();
        let f = lambda_from(&mut interp, "(lambda (x) (> x 1))");
        let seq = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        let out = builtin_where(&mut interp, &[f, seq]).unwrap();
        assert_eq!(out.to_vec().unwrap().len(), 2);
    }

    #[test]
    fn reduce_without_a_seed_uses_the_first_element() {
        let mut interp = Interpreter::new();
        let plus = interp.globals.get(&crate::symbol::intern("+")).unwrap();
        assert!(matches!(plus, Value::Function(Function::BuiltIn(_, _))));
        let seq = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        let out = builtin_reduce(&mut interp, &[plus, seq]).unwrap();
        assert_eq!(out.to_string(), "6");
    }

    #[test]
    fn reduce_on_empty_sequence_without_seed_errors() {
        let mut interp = Interpreter::new();
        let plus = interp.globals.get(&crate::symbol::intern("+")).unwrap();
        assert!(builtin_reduce(&mut interp, &[plus, Value::Null]).is_err());
    }

    #[test]
    fn flatten_collapses_nested_lists() {
        let mut interp = Interpreter::new();
        let nested = Value::list(vec![
            Value::list(vec![Value::int(1), Value::int(2)]),
            Value::list(vec![Value::int(3)]),
        ]);
        let out = builtin_flatten(&mut interp, &[nested]).unwrap();
        assert_eq!(out.to_vec().unwrap().len(), 3);
    }

    #[test]
    fn sum_and_average_over_a_numeric_sequence() {
        let mut interp = Interpreter::new();
        let seq = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(builtin_sum(&mut interp, &[seq.clone()]).unwrap().to_string(), "6");
        assert_eq!(builtin_average(&mut interp, &[seq]).unwrap().to_string(), "2");
    }
}
