//! The globals map: a single, mutable, symbol-identity-keyed table shared
//! by every frame in an interpreter. Lexical frames (`crate::value::Frame`)
//! are the other half of the two-tier environment the evaluator consults.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::symbol::{intern, Symbol};
use crate::value::{BuiltinFn, Function, Value};

pub struct Globals {
    bindings: RefCell<HashMap<Symbol, Value>>,
}

impl Globals {
    pub fn new() -> Rc<Self> {
        Rc::new(Globals {
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// A new interpreter's globals start as a shallow copy of an existing
    /// map: a fresh table, but every bound value is shared (cons cells,
    /// closures, etc. keep their identity).
    pub fn shallow_copy(&self) -> Rc<Self> {
        Rc::new(Globals {
            bindings: RefCell::new(self.bindings.borrow().clone()),
        })
    }

    pub fn define(&self, sym: Symbol, value: Value) {
        self.bindings.borrow_mut().insert(sym, value);
    }

    pub fn define_name(&self, name: &str, value: Value) {
        self.define(intern(name), value);
    }

    pub fn define_builtin(&self, lisp_name: &'static str, display_name: &'static str, f: BuiltinFn) {
        self.define_name(lisp_name, Value::Function(Function::BuiltIn(display_name, f)));
    }

    pub fn get(&self, sym: &Symbol) -> Option<Value> {
        self.bindings.borrow().get(sym).cloned()
    }

    pub fn is_bound(&self, sym: &Symbol) -> bool {
        self.bindings.borrow().contains_key(sym)
    }

    /// Binds or rebinds a global. Functionally identical to `define` (`setq`
    /// on an unbound name creates it, exactly like `defun`'s
    /// `(setq name (fn ...))` desugaring relies on) — kept as a distinct
    /// name so call sites read as "assignment" vs. "first definition".
    pub fn assign(&self, sym: &Symbol, value: Value) {
        self.bindings.borrow_mut().insert(sym.clone(), value);
    }

    pub fn clear(&self) {
        self.bindings.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get_round_trips() {
        let globals = Globals::new();
        globals.define_name("x", Value::int(42));
        match globals.get(&intern("x")) {
            Some(Value::Number(n)) => assert_eq!(n.as_f64(), 42.0),
            _ => panic!("expected bound value"),
        }
    }

    #[test]
    fn unbound_symbol_is_none() {
        let globals = Globals::new();
        assert!(globals.get(&intern("undefined-xyz")).is_none());
    }

    #[test]
    fn shallow_copy_is_independent_but_shares_values() {
        let base = Globals::new();
        base.define_name("x", Value::int(1));
        let copy = base.shallow_copy();
        copy.define_name("y", Value::int(2));
        assert!(base.get(&intern("y")).is_none());
        assert!(copy.get(&intern("x")).is_some());
    }
}

