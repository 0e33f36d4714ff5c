//! Dictionary primitives . Lookup itself goes through the
//! `(:key map)` host-dispatch indexed-accessor form handled in `eval.rs`;
//! this module only builds the maps that form reads from.

use std::collections::BTreeMap;
use std::rc::Rc;

use lispcraft_macros::builtin;

use super::support::sequence_arg;
use crate::error::EvalError;
use crate::interpreter::Interpreter;
use crate::value::Value;

fn map_key(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.to_string()),
        Value::Symbol(s) => Some(s.name().to_string()),
        _ => None,
    }
}

/// Builds a map from `(key value)` pair arguments, as produced by the
/// `{ :k1 v1 :k2 v2 }` reader form.
///
/// # Examples
/// ```lisp
/// (new-map (list "a" 1) (list "b" 2)) => {:a 1 :b 2}
/// ```
#[builtin(name = "new-map", category = "Maps")]
pub fn builtin_new_map(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let mut map = BTreeMap::new();
    for pair in args {
        let entry = sequence_arg("new-map", pair)?;
        if entry.len() != 2 {
            return Err(EvalError::type_error("new-map", "(key value) pair", pair, 0));
        }
        let key = map_key(&entry[0]).ok_or_else(|| EvalError::type_error("new-map", "string or symbol key", &entry[0], 0))?;
        map.insert(key, entry[1].clone());
    }
    Ok(Value::Map(Rc::new(std::cell::RefCell::new(map))))
}

pub fn register(globals: &crate::env::Globals) {
    register_builtin_new_map(globals);
}

pub fn register_help() {
    register_help_builtin_new_map();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_map_builds_from_key_value_pairs() {
        let mut interp = Interpreter::new();
        let pair_a = Value::list(vec![Value::string("a"), Value::int(1)]);
        let pair_b = Value::list(vec![Value::string("b"), Value::int(2)]);
        let out = builtin_new_map(&mut interp, &[pair_a, pair_b]).unwrap();
        match out {
            Value::Map(m) => {
                assert_eq!(m.borrow().get("a").unwrap().to_string(), "1");
                assert_eq!(m.borrow().get("b").unwrap().to_string(), "2");
            }
            _ => panic!("expected a map"),
        }
    }

    #[test]
    fn new_map_accepts_symbol_keys() {
        let mut interp = Interpreter::new();
        let pair = Value::list(vec![Value::Symbol(crate::symbol::intern("a")), Value::int(5)]);
        let out = builtin_new_map(&mut interp, &[pair]).unwrap();
        match out {
            Value::Map(m) => assert_eq!(m.borrow().get("a").unwrap().to_string(), "5"),
            _ => panic!("expected a map"),
        }
    }

    #[test]
    fn new_map_with_no_pairs_is_empty() {
        let mut interp = Interpreter::new();
        let out = builtin_new_map(&mut interp, &[]).unwrap();
        match out {
            Value::Map(m) => assert!(m.borrow().is_empty()),
            _ => panic!("expected a map"),
        }
    }
}
