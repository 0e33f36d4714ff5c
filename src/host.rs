//! The reverse-interface contract: capabilities the core *consumes* from an
//! embedding host, generalized so any embedding host can drive it. The evaluator never inspects a host
//! object directly — it only ever goes through this trait, so the same core
//! can be embedded by a templating engine, a REPL, or a test harness.
//!
//! `NullHost` is the default: every capability is either absent (`try_get`
//! returns `None`) or reports itself unsupported (`HostError`), which is
//! enough to run the reader/compiler/evaluator/primitive-library tests in
//! this crate without any embedding host at all.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::EvalError;
use crate::value::{HostCallable, Value};

/// A capability-provider boundary in the shape of a sandboxed scripting
/// host's tool interface, generalized to the full reverse-interface list
/// this trait names. Host boolean results must already be coerced to the
/// `t`/`nil` convention by the implementor (the nil/t-vs-true/false
/// decision is enforced at this boundary, not inside the evaluator).
pub trait HostScope {
    /// Variable lookup fallback, consulted after the globals map.
    fn try_get(&self, name: &str) -> Option<Value>;

    /// Resolves `name` to a host-native callable of the given arity, used
    /// for the bare-`/name` "host script method" dispatch heuristic.
    fn try_get_method(&self, name: &str, argcount: usize) -> Option<Rc<dyn HostCallable>>;

    /// `(.member obj args…)` — invoke a host member function on `obj`.
    fn call(&self, target: &Value, member: &str, args: &[Value]) -> Result<Value, EvalError>;

    /// `(:key obj)` — indexed/keyed access into a host object.
    fn get(&self, target: &Value, key: &Value) -> Result<Value, EvalError>;

    /// `Type.` — construct a host type by name.
    fn construct(&self, type_name: &str, args: &[Value]) -> Result<Value, EvalError>;

    /// `Namespace/Method` — invoke a qualified static host reference.
    fn function(&self, qualified_name: &str, args: &[Value]) -> Result<Value, EvalError>;

    fn html_encode(&self, s: &str) -> String;

    /// Streaming output, e.g. for `pr`/`prn`/`htmldump`.
    fn write(&self, s: &str);

    fn dump(&self, v: &Value) -> String;
    fn js_value(&self, v: &Value) -> String;
    fn text_dump(&self, v: &Value) -> String;

    /// Resolves and reads a `load`-able script by path; may be restricted.
    fn load_file(&self, path: &str) -> Result<String, EvalError>;

    /// `(return v)` sets the top-level return value retrievable by the host.
    fn set_return_value(&self, v: Value);

    /// Polled between top-level iterations and at each eval entry — the
    /// cooperative cancellation point for a host that wants to interrupt a
    /// long-running evaluation.
    fn halted(&self) -> bool;

    /// Compares the evaluator's running count against a host-side quota and
    /// flips the halt flag if exceeded; never itself returns an error (the
    /// halt flag is what actually stops evaluation).
    fn assert_next_evaluation(&self, evaluation_count: u64);

    /// Unconditionally flips the halt flag, independent of the evaluation
    /// quota — how `(return v)` stops the rest of a top-level batch from
    /// evaluating. Default is a no-op so a host with no mutable halt state
    /// of its own just keeps running (`return`'s own value is still
    /// honored either way).
    fn request_halt(&self) {}

    /// Clears a halt flag set by `request_halt`/a spent quota, called before
    /// each fresh top-level evaluation so `(return v)` in one REPL input
    /// doesn't halt every input after it. Default is a no-op.
    fn clear_halt(&self) {}

    /// `export` writes into the host scope's argument bag rather than
    /// globals. Unsupported by default — a host that wants `export` to work
    /// overrides this.
    fn export(&self, _name: &str, _value: Value) -> Result<(), EvalError> {
        Err(EvalError::HostError(
            "export: no host scope argument bag is configured".to_string(),
        ))
    }
}

/// The default host: every capability is absent or a `HostError`. Good
/// enough to run the interpreter standalone (scripts/REPL with no embedding
/// templating engine), and what `Interpreter::new` uses unless a host is
/// attached.
pub struct NullHost {
    return_value: RefCell<Option<Value>>,
    halted: Cell<bool>,
    quota: Cell<Option<u64>>,
}

impl NullHost {
    pub fn new() -> Rc<Self> {
        Rc::new(NullHost {
            return_value: RefCell::new(None),
            halted: Cell::new(false),
            quota: Cell::new(None),
        })
    }

    pub fn take_return_value(&self) -> Option<Value> {
        self.return_value.borrow_mut().take()
    }

    /// Test/embedding hook: set an evaluation-count ceiling. Once
    /// `assert_next_evaluation` observes a count at or past it, `halted()`
    /// starts reporting `true`.
    pub fn set_quota(&self, ceiling: u64) {
        self.quota.set(Some(ceiling));
    }

    pub fn set_halted(&self, halted: bool) {
        self.halted.set(halted);
    }
}

impl Default for NullHost {
    fn default() -> Self {
        NullHost {
            return_value: RefCell::new(None),
            halted: Cell::new(false),
            quota: Cell::new(None),
        }
    }
}

impl HostScope for NullHost {
    fn try_get(&self, _name: &str) -> Option<Value> {
        None
    }

    fn try_get_method(&self, _name: &str, _argcount: usize) -> Option<Rc<dyn HostCallable>> {
        None
    }

    fn call(&self, _target: &Value, member: &str, _args: &[Value]) -> Result<Value, EvalError> {
        Err(EvalError::HostError(format!(
            "no host scope configured for member call .{}",
            member
        )))
    }

    fn get(&self, _target: &Value, _key: &Value) -> Result<Value, EvalError> {
        Err(EvalError::HostError("no host scope configured for indexed access".to_string()))
    }

    fn construct(&self, type_name: &str, _args: &[Value]) -> Result<Value, EvalError> {
        Err(EvalError::HostError(format!(
            "no host scope configured to construct {}",
            type_name
        )))
    }

    fn function(&self, qualified_name: &str, _args: &[Value]) -> Result<Value, EvalError> {
        Err(EvalError::HostError(format!(
            "no host scope configured for static reference {}",
            qualified_name
        )))
    }

    fn html_encode(&self, s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }

    fn write(&self, s: &str) {
        print!("{}", s);
    }

    fn dump(&self, v: &Value) -> String {
        crate::printer::print_readable(v)
    }

    fn js_value(&self, v: &Value) -> String {
        crate::printer::print_readable(v)
    }

    fn text_dump(&self, v: &Value) -> String {
        crate::printer::print_bare(v)
    }

    fn load_file(&self, path: &str) -> Result<String, EvalError> {
        Err(EvalError::HostError(format!(
            "no host scope configured to load {}",
            path
        )))
    }

    fn set_return_value(&self, v: Value) {
        *self.return_value.borrow_mut() = Some(v);
    }

    fn halted(&self) -> bool {
        self.halted.get()
    }

    fn assert_next_evaluation(&self, evaluation_count: u64) {
        if let Some(ceiling) = self.quota.get() {
            if evaluation_count >= ceiling {
                self.halted.set(true);
            }
        }
    }

    fn request_halt(&self) {
        self.halted.set(true);
    }

    fn clear_halt(&self) {
        self.halted.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_host_has_no_variable_bindings() {
        let host = NullHost::new();
        assert!(host.try_get("anything").is_none());
    }

    #[test]
    fn null_host_reports_call_as_host_error() {
        let host = NullHost::new();
        assert!(host.call(&Value::Null, "foo", &[]).is_err());
    }

    #[test]
    fn quota_flips_halted_once_ceiling_is_reached() {
        let host = NullHost::new();
        host.set_quota(3);
        assert!(!host.halted());
        host.assert_next_evaluation(2);
        assert!(!host.halted());
        host.assert_next_evaluation(3);
        assert!(host.halted());
    }

    #[test]
    fn return_value_round_trips() {
        let host = NullHost::new();
        assert!(host.take_return_value().is_none());
        host.set_return_value(Value::int(42));
        match host.take_return_value() {
            Some(Value::Number(n)) => assert_eq!(n.as_i64(), Some(42)),
            other => panic!("expected stored return value, got {:?}", other),
        }
        assert!(host.take_return_value().is_none());
    }
}
