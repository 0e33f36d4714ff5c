//! Process-wide symbol interning.
//!
//! Symbol identity is the one truly global, shared-mutable resource in this
//! interpreter (every other piece of state — globals map, frame chain,
//! evaluation counter — belongs to a single `Interpreter`). Interning is
//! guarded by a `Mutex` rather than a thread-local so that identity holds
//! even if a host ever runs two interpreters on two threads.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock};

/// Names that name a special form (see `crate::eval`). A keyword symbol
/// cannot be the target of `setq`/`export`.
const KEYWORD_NAMES: &[&str] = &[
    "quote",
    "progn",
    "cond",
    "setq",
    "export",
    "lambda",
    "fn",
    "macro",
    "quasiquote",
    "unquote",
    "unquote-splicing",
    "bound?",
    "if",
    "let",
    "defun",
    "defmacro",
];

struct SymbolData {
    name: String,
    is_keyword: bool,
}

impl fmt::Debug for SymbolData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An interned (or explicitly uninterned) symbol. Cloning a `Symbol` is a
/// reference-count bump; equality and hashing are by identity (pointer),
/// not by name, so the globals map can key off symbol identity directly.
#[derive(Clone)]
pub struct Symbol(Arc<SymbolData>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_keyword(&self) -> bool {
        self.0.is_keyword
    }

    /// A symbol with no entry in the global intern table. Two calls with
    /// the same name produce distinct symbols (`make-symbol` semantics).
    pub fn uninterned(name: impl Into<String>) -> Symbol {
        Symbol(Arc::new(SymbolData {
            name: name.into(),
            is_keyword: false,
        }))
    }

    pub fn ptr_eq(a: &Symbol, b: &Symbol) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.0.name)
    }
}

static INTERN_TABLE: OnceLock<Mutex<std::collections::HashMap<String, Symbol>>> = OnceLock::new();

fn table() -> &'static Mutex<std::collections::HashMap<String, Symbol>> {
    INTERN_TABLE.get_or_init(|| Mutex::new(std::collections::HashMap::new()))
}

/// Interns `name`, returning the process-wide canonical `Symbol` for it.
/// Idempotent: repeated calls with the same name return symbols for which
/// `Symbol::ptr_eq` holds.
pub fn intern(name: &str) -> Symbol {
    let mut guard = table().lock().expect("symbol intern table poisoned");
    if let Some(existing) = guard.get(name) {
        return existing.clone();
    }
    let is_keyword = KEYWORD_NAMES.contains(&name);
    let sym = Symbol(Arc::new(SymbolData {
        name: name.to_string(),
        is_keyword,
    }));
    guard.insert(name.to_string(), sym.clone());
    sym
}

fn keyword_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| KEYWORD_NAMES.iter().copied().collect())
}

pub fn is_keyword_name(name: &str) -> bool {
    keyword_set().contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern("foo");
        let b = intern("foo");
        assert!(Symbol::ptr_eq(&a, &b));
    }

    #[test]
    fn uninterned_symbols_have_distinct_identity() {
        let a = Symbol::uninterned("x");
        let b = Symbol::uninterned("x");
        assert!(!Symbol::ptr_eq(&a, &b));
        assert_eq!(a.name(), b.name());
    }

    #[test]
    fn keywords_are_flagged() {
        let lambda = intern("lambda");
        assert!(lambda.is_keyword());
        let plain = intern("my-var");
        assert!(!plain.is_keyword());
    }
}
