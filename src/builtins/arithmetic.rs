//! Arithmetic and numeric-comparison primitives . Folds over a
//! flat variadic argument list; none of these unwrap a single cons argument
//! the way the sequence/higher-order builtins do.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use lispcraft_macros::builtin;

use crate::error::EvalError;
use crate::interpreter::Interpreter;
use crate::value::{num_add, num_mul, num_sub, Number, Value};

fn as_number(function: &str, v: &Value, position: usize) -> Result<Number, EvalError> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(EvalError::type_error(function, "number", other, position)),
    }
}

fn numbers(function: &str, args: &[Value]) -> Result<Vec<Number>, EvalError> {
    args.iter()
        .enumerate()
        .map(|(i, v)| as_number(function, v, i))
        .collect()
}

fn num_div(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) if y != 0 && x % y == 0 => Number::Int(x / y),
        _ => Number::Float(a.as_f64() / b.as_f64()),
    }
}

/// Adds its arguments. `(+ )` is `0`.
///
/// # Examples
/// ```lisp
/// (+ 1 2 3) => 6
/// (+) => 0
/// ```
#[builtin(name = "+", category = "Arithmetic", related("-", "*", "/"))]
pub fn builtin_add(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let ns = numbers("+", args)?;
    Ok(Value::Number(ns.into_iter().fold(Number::Int(0), num_add)))
}

/// Subtracts. One argument negates it; two or more subtract left to right.
///
/// # Examples
/// ```lisp
/// (- 5 2) => 3
/// (- 5) => -5
/// ```
#[builtin(name = "-", category = "Arithmetic", related("+", "*", "/"))]
pub fn builtin_sub(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let ns = numbers("-", args)?;
    match ns.split_first() {
        None => Err(EvalError::arity_error("-", crate::error::ARITY_AT_LEAST_ONE, 0)),
        Some((first, [])) => Ok(Value::Number(num_sub(Number::Int(0), *first))),
        Some((first, rest)) => Ok(Value::Number(rest.iter().fold(*first, |a, b| num_sub(a, *b)))),
    }
}

/// Multiplies its arguments. `(*)` is `1`.
///
/// # Examples
/// ```lisp
/// (* 2 3 4) => 24
/// ```
#[builtin(name = "*", category = "Arithmetic", related("+", "-", "/"))]
pub fn builtin_mul(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let ns = numbers("*", args)?;
    Ok(Value::Number(ns.into_iter().fold(Number::Int(1), num_mul)))
}

/// Divides. One argument takes the reciprocal; two or more divide left to
/// right. An exact integer quotient stays an integer.
///
/// # Examples
/// ```lisp
/// (/ 10 2) => 5
/// (/ 2) => 0.5
/// ```
#[builtin(name = "/", category = "Arithmetic", related("+", "-", "*"))]
pub fn builtin_div(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let ns = numbers("/", args)?;
    match ns.split_first() {
        None => Err(EvalError::arity_error("/", crate::error::ARITY_AT_LEAST_ONE, 0)),
        Some((first, [])) => Ok(Value::Number(num_div(Number::Int(1), *first))),
        Some((first, rest)) => Ok(Value::Number(rest.iter().fold(*first, |a, b| num_div(a, *b)))),
    }
}

/// Remainder, taking its sign from the dividend (Rust/C `%`).
///
/// # Examples
/// ```lisp
/// (% 7 3) => 1
/// (% -7 3) => -1
/// ```
#[builtin(name = "%", category = "Arithmetic", related("mod"))]
pub fn builtin_rem(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let [a, b] = two_numbers("%", args)?;
    let (x, y) = (a.as_i64().ok_or_else(|| EvalError::type_error("%", "integer", &Value::Number(a), 0))?, b
        .as_i64()
        .ok_or_else(|| EvalError::type_error("%", "integer", &Value::Number(b), 1))?);
    if y == 0 {
        return Err(EvalError::runtime_error("%", "division by zero"));
    }
    Ok(Value::int(x % y))
}

/// Remainder, taking its sign from the divisor (Lisp `mod`).
///
/// # Examples
/// ```lisp
/// (mod 7 3) => 1
/// (mod -7 3) => 2
/// ```
#[builtin(name = "mod", category = "Arithmetic", related("%"))]
pub fn builtin_mod(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let [a, b] = two_numbers("mod", args)?;
    let x = a.as_i64().ok_or_else(|| EvalError::type_error("mod", "integer", &Value::Number(a), 0))?;
    let y = b.as_i64().ok_or_else(|| EvalError::type_error("mod", "integer", &Value::Number(b), 1))?;
    if y == 0 {
        return Err(EvalError::runtime_error("mod", "division by zero"));
    }
    let r = x % y;
    Ok(Value::int(if r != 0 && (r < 0) != (y < 0) { r + y } else { r }))
}

fn two_numbers(function: &str, args: &[Value]) -> Result<[Number; 2], EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error(function, crate::error::ARITY_TWO, args.len()));
    }
    Ok([as_number(function, &args[0], 0)?, as_number(function, &args[1], 1)?])
}

fn numeric_cmp(function: &str, args: &[Value], ok: impl Fn(f64, f64) -> bool) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::arity_error(function, "at least 2", args.len()));
    }
    let ns = numbers(function, args)?;
    let sorted = ns.windows(2).all(|w| ok(w[0].as_f64(), w[1].as_f64()));
    Ok(Value::lisp_bool(sorted))
}

/// `t` if its arguments are strictly increasing.
#[builtin(name = "<", category = "Arithmetic", related(">", "<=", ">=", "="))]
pub fn builtin_lt(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    numeric_cmp("<", args, |a, b| a < b)
}

/// `t` if its arguments are strictly decreasing.
#[builtin(name = ">", category = "Arithmetic", related("<", "<=", ">="))]
pub fn builtin_gt(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    numeric_cmp(">", args, |a, b| a > b)
}

/// `t` if its arguments are non-decreasing.
#[builtin(name = "<=", category = "Arithmetic", related("<", ">", ">="))]
pub fn builtin_le(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    numeric_cmp("<=", args, |a, b| a <= b)
}

/// `t` if its arguments are non-increasing.
#[builtin(name = ">=", category = "Arithmetic", related("<", ">", "<="))]
pub fn builtin_ge(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    numeric_cmp(">=", args, |a, b| a >= b)
}

/// `t` if all arguments are numerically equal.
#[builtin(name = "=", category = "Arithmetic", related("eql"))]
pub fn builtin_num_eq(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    numeric_cmp("=", args, |a, b| a == b)
}

/// Smallest of its arguments.
#[builtin(name = "min", category = "Arithmetic", related("max"))]
pub fn builtin_min(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let ns = numbers("min", args)?;
    ns.into_iter()
        .reduce(|a, b| if b.as_f64() < a.as_f64() { b } else { a })
        .map(Value::Number)
        .ok_or_else(|| EvalError::arity_error("min", crate::error::ARITY_AT_LEAST_ONE, 0))
}

/// Largest of its arguments.
#[builtin(name = "max", category = "Arithmetic", related("min"))]
pub fn builtin_max(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let ns = numbers("max", args)?;
    ns.into_iter()
        .reduce(|a, b| if b.as_f64() > a.as_f64() { b } else { a })
        .map(Value::Number)
        .ok_or_else(|| EvalError::arity_error("max", crate::error::ARITY_AT_LEAST_ONE, 0))
}

fn one_or_two(function: &str, args: &[Value]) -> Result<(Number, Number), EvalError> {
    match args.len() {
        1 => Ok((as_number(function, &args[0], 0)?, Number::Int(1))),
        2 => Ok((as_number(function, &args[0], 0)?, as_number(function, &args[1], 1)?)),
        n => Err(EvalError::arity_error(function, crate::error::ARITY_ONE_OR_TWO, n)),
    }
}

/// Truncates `numerator`, or `numerator`/`divisor`, toward zero.
#[builtin(name = "truncate", category = "Arithmetic", related("floor", "ceiling", "round"))]
pub fn builtin_truncate(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let (n, d) = one_or_two("truncate", args)?;
    Ok(Value::int((n.as_f64() / d.as_f64()).trunc() as i64))
}

/// Rounds `numerator`, or `numerator`/`divisor`, toward negative infinity.
#[builtin(name = "floor", category = "Arithmetic", related("ceiling", "truncate", "round"))]
pub fn builtin_floor(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let (n, d) = one_or_two("floor", args)?;
    Ok(Value::int((n.as_f64() / d.as_f64()).floor() as i64))
}

/// Rounds `numerator`, or `numerator`/`divisor`, toward positive infinity.
#[builtin(name = "ceiling", category = "Arithmetic", related("floor", "truncate", "round"))]
pub fn builtin_ceiling(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let (n, d) = one_or_two("ceiling", args)?;
    Ok(Value::int((n.as_f64() / d.as_f64()).ceil() as i64))
}

/// Rounds `numerator`, or `numerator`/`divisor`, to the nearest integer.
#[builtin(name = "round", category = "Arithmetic", related("floor", "ceiling", "truncate"))]
pub fn builtin_round(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let (n, d) = one_or_two("round", args)?;
    Ok(Value::int((n.as_f64() / d.as_f64()).round() as i64))
}

fn one_number(function: &str, args: &[Value]) -> Result<Number, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error(function, crate::error::ARITY_ONE, args.len()));
    }
    as_number(function, &args[0], 0)
}

/// Absolute value.
#[builtin(name = "abs", category = "Arithmetic")]
pub fn builtin_abs(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match one_number("abs", args)? {
        Number::Int(i) => Ok(Value::int(i.abs())),
        Number::Float(f) => Ok(Value::float(f.abs())),
    }
}

/// Square root.
#[builtin(name = "sqrt", category = "Arithmetic", related("isqrt"))]
pub fn builtin_sqrt(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::float(one_number("sqrt", args)?.as_f64().sqrt()))
}

/// Integer square root, truncated toward zero.
#[builtin(name = "isqrt", category = "Arithmetic", related("sqrt"))]
pub fn builtin_isqrt(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let n = one_number("isqrt", args)?.as_f64();
    Ok(Value::int(n.sqrt().trunc() as i64))
}

#[builtin(name = "sin", category = "Arithmetic")]
pub fn builtin_sin(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::float(one_number("sin", args)?.as_f64().sin()))
}

#[builtin(name = "cos", category = "Arithmetic")]
pub fn builtin_cos(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::float(one_number("cos", args)?.as_f64().cos()))
}

#[builtin(name = "tan", category = "Arithmetic")]
pub fn builtin_tan(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::float(one_number("tan", args)?.as_f64().tan()))
}

#[builtin(name = "exp", category = "Arithmetic", related("expt"))]
pub fn builtin_exp(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::float(one_number("exp", args)?.as_f64().exp()))
}

/// `(expt base power)`.
#[builtin(name = "expt", category = "Arithmetic", related("exp"))]
pub fn builtin_expt(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let [base, power] = two_numbers("expt", args)?;
    if let (Number::Int(b), Number::Int(p)) = (base, power) {
        if p >= 0 {
            return Ok(Value::int(b.wrapping_pow(p as u32)));
        }
    }
    Ok(Value::float(base.as_f64().powf(power.as_f64())))
}

/// Process-wide call counter mixed into `random`'s seed so successive calls
/// with the same argument don't repeat the same value.
static RANDOM_CALLS: AtomicU64 = AtomicU64::new(0);

/// Returns a pseudo-random non-negative number less than its argument,
/// float if the argument is a float, integer otherwise.
#[builtin(name = "random", category = "Arithmetic")]
pub fn builtin_random(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let n = one_number("random", args)?;
    // A tiny xorshift keyed off wall-clock time and a call counter; this
    // crate has no external RNG dependency, and this primitive has no
    // cryptographic quality requirement.
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64;
    let call = RANDOM_CALLS.fetch_add(1, Ordering::Relaxed);
    let mut x = (now ^ call.wrapping_mul(0x9E3779B97F4A7C15) ^ n.as_f64().to_bits()) | 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    match n {
        Number::Int(i) if i > 0 => Ok(Value::int((x % i as u64) as i64)),
        _ => Ok(Value::float((x as f64 / u64::MAX as f64) * n.as_f64())),
    }
}

/// `t` if its argument is zero.
#[builtin(name = "zerop", category = "Arithmetic")]
pub fn builtin_zerop(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::lisp_bool(one_number("zerop", args)?.is_zero()))
}

fn int_list(function: &str, args: &[Value]) -> Result<Vec<i64>, EvalError> {
    args.iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| EvalError::type_error(function, "integer", v, i)),
            other => Err(EvalError::type_error(function, "integer", other, i)),
        })
        .collect()
}

/// Bitwise AND across its arguments.
#[builtin(name = "logand", category = "Arithmetic", related("logior", "logxor"))]
pub fn builtin_logand(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let ns = int_list("logand", args)?;
    Ok(Value::int(ns.into_iter().fold(-1i64, |a, b| a & b)))
}

/// Bitwise (inclusive) OR across its arguments.
#[builtin(name = "logior", category = "Arithmetic", related("logand", "logxor"))]
pub fn builtin_logior(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let ns = int_list("logior", args)?;
    Ok(Value::int(ns.into_iter().fold(0i64, |a, b| a | b)))
}

/// Bitwise XOR across its arguments.
#[builtin(name = "logxor", category = "Arithmetic", related("logand", "logior"))]
pub fn builtin_logxor(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let ns = int_list("logxor", args)?;
    Ok(Value::int(ns.into_iter().fold(0i64, |a, b| a ^ b)))
}

pub fn register(globals: &crate::env::Globals) {
    register_builtin_add(globals);
    register_builtin_sub(globals);
    register_builtin_mul(globals);
    register_builtin_div(globals);
    register_builtin_rem(globals);
    register_builtin_mod(globals);
    register_builtin_lt(globals);
    register_builtin_gt(globals);
    register_builtin_le(globals);
    register_builtin_ge(globals);
    register_builtin_num_eq(globals);
    register_builtin_min(globals);
    register_builtin_max(globals);
    register_builtin_truncate(globals);
    register_builtin_floor(globals);
    register_builtin_ceiling(globals);
    register_builtin_round(globals);
    register_builtin_abs(globals);
    register_builtin_sqrt(globals);
    register_builtin_isqrt(globals);
    register_builtin_sin(globals);
    register_builtin_cos(globals);
    register_builtin_tan(globals);
    register_builtin_exp(globals);
    register_builtin_expt(globals);
    register_builtin_random(globals);
    register_builtin_zerop(globals);
    register_builtin_logand(globals);
    register_builtin_logior(globals);
    register_builtin_logxor(globals);
}

pub fn register_help() {
    register_help_builtin_add();
    register_help_builtin_sub();
    register_help_builtin_mul();
    register_help_builtin_div();
    register_help_builtin_rem();
    register_help_builtin_mod();
    register_help_builtin_lt();
    register_help_builtin_gt();
    register_help_builtin_le();
    register_help_builtin_ge();
    register_help_builtin_num_eq();
    register_help_builtin_min();
    register_help_builtin_max();
    register_help_builtin_truncate();
    register_help_builtin_floor();
    register_help_builtin_ceiling();
    register_help_builtin_round();
    register_help_builtin_abs();
    register_help_builtin_sqrt();
    register_help_builtin_isqrt();
    register_help_builtin_sin();
    register_help_builtin_cos();
    register_help_builtin_tan();
    register_help_builtin_exp();
    register_help_builtin_expt();
    register_help_builtin_random();
    register_help_builtin_zerop();
    register_help_builtin_logand();
    register_help_builtin_logior();
    register_help_builtin_logxor();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(f: crate::value::BuiltinFn, args: &[Value]) -> Value {
        let mut interp = Interpreter::new();
        f(&mut interp, args).unwrap()
    }

    #[test]
    fn add_folds_over_its_arguments() {
        assert_eq!(call(builtin_add, &[Value::int(1), Value::int(2), Value::int(3)]).to_string(), "6");
        assert_eq!(call(builtin_add, &[]).to_string(), "0");
    }

    #[test]
    fn sub_with_one_argument_negates() {
        assert_eq!(call(builtin_sub, &[Value::int(5)]).to_string(), "-5");
    }

    #[test]
    fn div_keeps_exact_integer_quotients_as_integers() {
        assert_eq!(call(builtin_div, &[Value::int(10), Value::int(2)]).to_string(), "5");
    }

    #[test]
    fn mod_takes_the_divisors_sign() {
        assert_eq!(call(builtin_mod, &[Value::int(-7), Value::int(3)]).to_string(), "2");
        assert_eq!(call(builtin_rem, &[Value::int(-7), Value::int(3)]).to_string(), "-1");
    }

    #[test]
    fn comparisons_chain_across_more_than_two_arguments() {
        assert!(call(builtin_lt, &[Value::int(1), Value::int(2), Value::int(3)]).is_truthy());
        assert!(!call(builtin_lt, &[Value::int(1), Value::int(3), Value::int(2)]).is_truthy());
    }

    #[test]
    fn min_and_max_pick_extremes() {
        assert_eq!(call(builtin_min, &[Value::int(3), Value::int(1), Value::int(2)]).to_string(), "1");
        assert_eq!(call(builtin_max, &[Value::int(3), Value::int(1), Value::int(2)]).to_string(), "3");
    }

    #[test]
    fn zerop_checks_numeric_zero() {
        assert!(call(builtin_zerop, &[Value::int(0)]).is_truthy());
        assert!(!call(builtin_zerop, &[Value::int(1)]).is_truthy());
    }
}
