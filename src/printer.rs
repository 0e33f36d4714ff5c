//! Printing values back to source-like text.
//!
//! Two modes: **readable** (quotes strings, renders `(quote x)` as `'x` and
//! its quasiquote siblings, used by `print`/`prn`/the REPL) and **bare**
//! (strings unquoted, used by `princ`/`str`). Both share one traversal that
//! tracks the cons cells currently on the print path so a cycle introduced
//! by `rplacd` prints as `…` instead of looping forever.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::value::{ConsCell, Function, Value};

const MAX_PRINT_DEPTH: usize = 4096;

pub fn print_readable(v: &Value) -> String {
    let mut out = String::new();
    let mut visited = HashSet::new();
    write_value(v, &mut out, true, &mut visited, 0);
    out
}

pub fn print_bare(v: &Value) -> String {
    let mut out = String::new();
    let mut visited = HashSet::new();
    write_value(v, &mut out, false, &mut visited, 0);
    out
}

fn write_value(v: &Value, out: &mut String, readable: bool, visited: &mut HashSet<usize>, depth: usize) {
    if depth > MAX_PRINT_DEPTH {
        out.push('…');
        return;
    }
    match v {
        Value::Null => out.push_str("nil"),
        Value::Bool(b) => out.push_str(if *b { "t" } else { "nil" }),
        Value::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::String(s) => {
            if readable {
                out.push('"');
                for c in s.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        '\r' => out.push_str("\\r"),
                        _ => out.push(c),
                    }
                }
                out.push('"');
            } else {
                out.push_str(s);
            }
        }
        Value::Symbol(sym) => out.push_str(sym.name()),
        Value::ArgRef(level, offset, sym) => {
            let _ = write!(out, "#<argref {}:{} {}>", level, offset, sym.name());
        }
        Value::Function(func) => write_function(func, out),
        Value::Map(map) => {
            out.push('{');
            let borrowed = map.borrow();
            for (i, (k, val)) in borrowed.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, ":{} ", k);
                write_value(val, out, readable, visited, depth + 1);
            }
            out.push('}');
        }
        Value::Opaque(_) => out.push_str("#<opaque>"),
        Value::Cons(cell) => write_cons(cell, out, readable, visited, depth),
    }
}

fn quote_prefix(cell: &Rc<ConsCell>) -> Option<&'static str> {
    let prefix = match &*cell.car.borrow() {
        Value::Symbol(sym) => match sym.name() {
            "quote" => "'",
            "quasiquote" => "`",
            "unquote" => ",",
            "unquote-splicing" => ",@",
            _ => return None,
        },
        _ => return None,
    };
    match &*cell.cdr.borrow() {
        Value::Cons(inner) if matches!(&*inner.cdr.borrow(), Value::Null) => Some(prefix),
        _ => None,
    }
}

fn write_function(func: &Function, out: &mut String) {
    match func {
        Function::Lambda(l) => {
            let name = l.name.borrow();
            match name.as_deref() {
                Some(n) => {
                    let _ = write!(out, "#<lambda {}>", n);
                }
                None => out.push_str("#<lambda>"),
            }
        }
        Function::Closure(l, _) => {
            let name = l.name.borrow();
            match name.as_deref() {
                Some(n) => {
                    let _ = write!(out, "#<closure {}>", n);
                }
                None => out.push_str("#<closure>"),
            }
        }
        Function::Macro(l) => {
            let name = l.name.borrow();
            match name.as_deref() {
                Some(n) => {
                    let _ = write!(out, "#<macro {}>", n);
                }
                None => out.push_str("#<macro>"),
            }
        }
        Function::BuiltIn(name, _) => {
            let _ = write!(out, "#<builtin {}>", name);
        }
        Function::HostDelegate(d) => {
            let _ = write!(out, "#<host {}>", d.describe());
        }
    }
}

fn write_cons(
    head: &Rc<ConsCell>,
    out: &mut String,
    readable: bool,
    visited: &mut HashSet<usize>,
    depth: usize,
) {
    if let Some(prefix) = quote_prefix(head) {
        let ptr = Rc::as_ptr(head) as usize;
        if !visited.insert(ptr) {
            out.push('…');
            return;
        }
        out.push_str(prefix);
        if let Value::Cons(inner) = &*head.cdr.borrow() {
            write_value(&inner.car.borrow(), out, readable, visited, depth + 1);
        }
        visited.remove(&ptr);
        return;
    }

    out.push('(');
    let mut first = true;
    let mut cur = Value::Cons(head.clone());
    let mut touched = Vec::new();
    loop {
        match cur {
            Value::Cons(c) => {
                let ptr = Rc::as_ptr(&c) as usize;
                if !visited.insert(ptr) {
                    if !first {
                        out.push(' ');
                    }
                    out.push('…');
                    break;
                }
                touched.push(ptr);
                if !first {
                    out.push(' ');
                }
                first = false;
                write_value(&c.car.borrow(), out, readable, visited, depth + 1);
                let next = c.cdr.borrow().clone();
                cur = next;
            }
            Value::Null => break,
            other => {
                out.push_str(" . ");
                write_value(&other, out, readable, visited, depth + 1);
                break;
            }
        }
    }
    out.push(')');
    for ptr in touched {
        visited.remove(&ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_proper_list() {
        let v = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(print_readable(&v), "(1 2 3)");
    }

    #[test]
    fn prints_dotted_pair() {
        let v = Value::cons(Value::int(1), Value::int(2));
        assert_eq!(print_readable(&v), "(1 . 2)");
    }

    #[test]
    fn prints_nil() {
        assert_eq!(print_readable(&Value::Null), "nil");
    }

    #[test]
    fn prints_quote_sugar() {
        let v = Value::list(vec![Value::symbol("quote"), Value::symbol("x")]);
        assert_eq!(print_readable(&v), "'x");
    }

    #[test]
    fn readable_strings_are_quoted_bare_strings_are_not() {
        let v = Value::string("hi");
        assert_eq!(print_readable(&v), "\"hi\"");
        assert_eq!(print_bare(&v), "hi");
    }

    #[test]
    fn cyclic_cons_prints_ellipsis_instead_of_looping() {
        let cell = ConsCell::new(Value::int(1), Value::Null);
        *cell.cdr.borrow_mut() = Value::Cons(cell.clone());
        let v = Value::Cons(cell);
        let printed = print_readable(&v);
        assert!(printed.contains('…'));
    }
}
