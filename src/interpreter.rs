//! The embeddable `Interpreter`: globals + host + evaluation counters, and
//! the public operations a host drives it through, generalized so any embedding host can drive it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::env::Globals;
use crate::error::{EvalError, EvalException};
use crate::host::{HostScope, NullHost};
use crate::symbol::intern;
use crate::value::Value;

thread_local! {
    /// Builtins only, no prelude: the table `--no-prelude` callers copy
    /// from. Bootstrapped once per thread, same as `BASE_GLOBALS`.
    static BARE_GLOBALS: Rc<Globals> = bootstrap_bare();

    /// The process-wide bootstrap globals: builtins registered and the
    /// prelude loaded exactly once, then shallow-copied into every fresh
    /// `Interpreter`. A `static` can't hold this directly since `Rc` is
    /// `!Sync`.
    static BASE_GLOBALS: Rc<Globals> = bootstrap_base();
}

fn bootstrap_bare() -> Rc<Globals> {
    let globals = Globals::new();
    crate::builtins::register_all(&globals);
    crate::builtins::register_all_help();
    globals
}

fn bootstrap_base() -> Rc<Globals> {
    let globals = BARE_GLOBALS.with(|b| b.shallow_copy());
    let mut bootstrap = Interpreter {
        globals: globals.clone(),
        host: NullHost::new(),
        eval_count: Cell::new(0),
        gensym_count: Cell::new(0),
        trace: RefCell::new(Vec::new()),
    };
    bootstrap
        .import(crate::prelude::PRELUDE_SOURCE)
        .expect("the embedded prelude must parse and evaluate cleanly");
    globals
}

/// An isolated evaluation context: its own globals table (sharing bound
/// *values* with whatever it was copied from, and a
/// `HostScope` for the reverse-interface capabilities it delegates to.
pub struct Interpreter {
    pub globals: Rc<Globals>,
    pub host: Rc<dyn HostScope>,
    eval_count: Cell<u64>,
    gensym_count: Cell<u64>,
    /// Short printed forms of the `Cons` expressions an in-flight error is
    /// currently propagating through, innermost first, capped at
    /// `error::MAX_TRACE_FRAMES`. Drained into an `EvalException` by
    /// `repl_eval`; cleared before each top-level form.
    pub(crate) trace: RefCell<Vec<String>>,
}

impl Interpreter {
    /// A fresh interpreter with its own globals table (builtins + prelude
    /// already bound) and no attached host.
    pub fn new() -> Self {
        // `cons` stands in for "the base table has already been bootstrapped
        // in this thread" without needing a separate guard flag.
        let base = BASE_GLOBALS.with(|b| {
            if !b.is_bound(&intern("cons")) {
                unreachable!("bootstrap_base always registers builtins before returning");
            }
            b.clone()
        });
        Interpreter {
            globals: base.shallow_copy(),
            host: NullHost::new(),
            eval_count: Cell::new(0),
            gensym_count: Cell::new(0),
            trace: RefCell::new(Vec::new()),
        }
    }

    /// Attaches `host` as this interpreter's reverse-interface provider.
    pub fn with_host(mut self, host: Rc<dyn HostScope>) -> Self {
        self.host = host;
        self
    }

    pub fn parse(&self, source: &str) -> Result<Vec<Value>, EvalError> {
        crate::reader::parse(source)
    }

    /// A child interpreter shares this one's bound values (a
    /// shallow copy of the globals table) and its host, but gets its own
    /// mutable table and evaluation counters, so the two may run
    /// independently (including on separate threads) without interfering.
    pub fn create_interpreter(&self) -> Interpreter {
        Interpreter {
            globals: self.globals.shallow_copy(),
            host: self.host.clone(),
            eval_count: Cell::new(0),
            gensym_count: Cell::new(0),
            trace: RefCell::new(Vec::new()),
        }
    }

    /// Discards every binding made since construction, reverting to a fresh
    /// copy of the bootstrap globals (builtins + prelude only).
    pub fn reset(&mut self) {
        self.globals = BASE_GLOBALS.with(|b| b.shallow_copy());
    }

    /// Drops back to a fresh copy of the builtins-only table, discarding the
    /// prelude's helper definitions along with anything bound afterward.
    /// Backs the `--no-prelude` CLI flag.
    pub fn reset_to_bare_globals(&mut self) {
        self.globals = BARE_GLOBALS.with(|b| b.shallow_copy());
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.globals.define_name(name, value);
    }

    /// Parses and evaluates every top-level form in `source`, for effect.
    /// A `(return v)` partway through stops the remaining forms in this
    /// batch from evaluating, the same way `repl_eval` honors it.
    pub fn import(&mut self, source: &str) -> Result<(), EvalError> {
        self.host.clear_halt();
        for form in self.parse(source)? {
            self.eval(&form)?;
            if self.host.halted() {
                break;
            }
        }
        Ok(())
    }

    /// Monotonic, interpreter-local counter backing `gensym`.
    pub fn next_gensym(&self) -> u64 {
        let n = self.gensym_count.get();
        self.gensym_count.set(n + 1);
        n
    }

    pub(crate) fn bump_eval_count(&self) -> u64 {
        let n = self.eval_count.get();
        self.eval_count.set(n + 1);
        n
    }

    /// Evaluates one top-level form. Resets the error trace first: each
    /// top-level form gets its own, freshly accumulated stack of printed
    /// `Cons` frames (see `crate::eval::eval_cons`) rather than one that
    /// keeps growing across unrelated forms.
    pub fn eval(&mut self, form: &Value) -> Result<Value, EvalError> {
        self.trace.borrow_mut().clear();
        crate::eval::eval(self, form.clone(), None)
    }

    /// REPL-facing entry point: formats any error the way a host-visible
    /// `EvalException` is meant to read read, rather than handing
    /// back the raw `EvalError`. A `(return v)` partway through this batch
    /// of top-level forms stops the rest of them from evaluating, with
    /// `v` as the final result.
    pub fn repl_eval(&mut self, source: &str) -> Result<Value, String> {
        let forms = self.parse(source).map_err(|e| EvalException::new(&e, Vec::new()).format())?;
        self.host.clear_halt();
        let mut result = Value::Null;
        for form in forms {
            result = self.eval(&form).map_err(|e| {
                let trace = self.trace.borrow_mut().drain(..).collect();
                EvalException::new(&e, trace).format()
            })?;
            if self.host.halted() {
                break;
            }
        }
        Ok(result)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_interpreter_has_core_builtins_bound() {
        let interp = Interpreter::new();
        assert!(interp.globals.is_bound(&intern("cons")));
        assert!(interp.globals.is_bound(&intern("car")));
    }

    #[test]
    fn create_interpreter_shares_values_but_not_the_table() {
        let mut parent = Interpreter::new();
        parent.set("x", Value::int(1));
        let mut child = parent.create_interpreter();
        child.set("x", Value::int(2));
        assert_eq!(parent.eval(&Value::symbol("x")).unwrap().to_string(), "1");
        assert_eq!(child.eval(&Value::symbol("x")).unwrap().to_string(), "2");
    }

    #[test]
    fn reset_drops_bindings_made_after_construction() {
        let mut interp = Interpreter::new();
        interp.set("scratch", Value::int(42));
        interp.reset();
        assert!(interp.eval(&Value::symbol("scratch")).is_err());
        assert!(interp.globals.is_bound(&intern("cons")));
    }

    #[test]
    fn reset_to_bare_globals_drops_the_prelude() {
        let mut interp = Interpreter::new();
        assert!(interp.eval(&Value::symbol("mapcar")).is_ok());
        interp.reset_to_bare_globals();
        assert!(interp.eval(&Value::symbol("mapcar")).is_err());
        assert!(interp.globals.is_bound(&intern("cons")));
    }

    #[test]
    fn repl_eval_formats_errors_as_eval_exceptions() {
        let mut interp = Interpreter::new();
        let err = interp.repl_eval("(unbound-name)").unwrap_err();
        assert!(err.starts_with("EvalException:"));
    }

    #[test]
    fn repl_eval_includes_a_propagation_trace() {
        let mut interp = Interpreter::new();
        let err = interp.repl_eval("(+ 1 (car 5))").unwrap_err();
        assert!(err.contains("(car 5)"));
    }

    #[test]
    fn return_stops_the_rest_of_the_batch_but_not_later_calls() {
        let mut interp = Interpreter::new();
        let result = interp.repl_eval("(setq a 1) (return 99) (setq a 2)").unwrap();
        assert_eq!(result.to_string(), "99");
        assert_eq!(interp.eval(&Value::symbol("a")).unwrap().to_string(), "1");
        // a later, unrelated REPL input still runs normally.
        assert_eq!(interp.repl_eval("(+ 2 2)").unwrap().to_string(), "4");
    }

    #[test]
    fn import_evaluates_every_top_level_form() {
        let mut interp = Interpreter::new();
        interp.import("(setq a 1) (setq b 2)").unwrap();
        assert_eq!(interp.eval(&Value::symbol("a")).unwrap().to_string(), "1");
        assert_eq!(interp.eval(&Value::symbol("b")).unwrap().to_string(), "2");
    }
}
