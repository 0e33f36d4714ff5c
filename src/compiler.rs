//! The compiler: turns a raw `lambda`/`fn`/`macro` body into a
//! `CompiledLambda` whose formal parameters have been rewritten to
//! `ArgRef` lexical addresses.
//!
//! Only `lambda`/`fn`/`macro` bodies are compiled. Ordinary top-level forms
//! are interpreted directly by `crate::eval` without ever passing through
//! here — which is also why `eval.rs` carries its own (simpler, ArgRef-free)
//! handling of `let`/`if`/`defun`/`defmacro`/quasiquote for the top-level
//! case, alongside the compile-time desugaring this module does for the
//! same forms when they occur nested inside a body being compiled.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::EvalError;
use crate::eval;
use crate::interpreter::Interpreter;
use crate::symbol::Symbol;
use crate::value::{CompiledLambda, Function, Value};

/// Safety bound on repeated expansion of a macro call at one call site
/// (bounded so a non-terminating macro cannot hang compilation).
pub const MACRO_EXPANSION_LIMIT: u32 = 32;

fn is_symbol_named(v: &Value, name: &str) -> bool {
    matches!(v, Value::Symbol(s) if s.name() == name)
}

fn head_name(items: &[Value]) -> Option<&str> {
    match items.first() {
        Some(Value::Symbol(s)) => Some(s.name()),
        _ => None,
    }
}

/// Splits a trailing docstring off a `lambda`/`fn`/`defun`/`defmacro` body:
/// `(params "doc" e1 e2…)` carries a docstring only when at least one body
/// form follows it; a lone string is the return value, not documentation.
pub(crate) fn split_docstring(forms: &[Value]) -> (Option<String>, &[Value]) {
    if forms.len() > 1 {
        if let Value::String(s) = &forms[0] {
            return (Some(s.to_string()), &forms[1..]);
        }
    }
    (None, forms)
}

/// Parses a lambda-list into its fixed parameters plus whether a `&rest`
/// parameter follows. Duplicate names, parameters
/// after a second `&rest`, and naming `t` are all compile errors.
fn parse_param_list(params: &Value) -> Result<(Vec<Symbol>, bool), EvalError> {
    let items = params
        .to_vec()
        .ok_or_else(|| EvalError::BadKeyword("lambda-list must be a proper list".to_string()))?;

    let mut fixed = Vec::new();
    let mut has_rest = false;
    let mut seen_rest_marker = false;
    let mut iter = items.into_iter();

    while let Some(item) = iter.next() {
        let sym = match item {
            Value::Symbol(s) => s,
            other => {
                return Err(EvalError::BadKeyword(format!(
                    "lambda-list parameter must be a symbol, got {}",
                    other.type_name()
                )))
            }
        };
        if sym.name() == "&rest" {
            if seen_rest_marker {
                return Err(EvalError::BadKeyword(
                    "lambda-list has more than one &rest marker".to_string(),
                ));
            }
            seen_rest_marker = true;
            let rest_name = iter.next().ok_or_else(|| {
                EvalError::BadKeyword("&rest must be followed by a parameter name".to_string())
            })?;
            let rest_sym = match rest_name {
                Value::Symbol(s) => s,
                other => {
                    return Err(EvalError::BadKeyword(format!(
                        "&rest parameter must be a symbol, got {}",
                        other.type_name()
                    )))
                }
            };
            if iter.next().is_some() {
                return Err(EvalError::BadKeyword(
                    "no parameters may follow the &rest parameter".to_string(),
                ));
            }
            check_param_name(&rest_sym, &fixed)?;
            fixed.push(rest_sym);
            has_rest = true;
            break;
        }
        check_param_name(&sym, &fixed)?;
        fixed.push(sym);
    }
    Ok((fixed, has_rest))
}

fn check_param_name(sym: &Symbol, already: &[Symbol]) -> Result<(), EvalError> {
    if sym.name() == "t" {
        return Err(EvalError::BadKeyword("t cannot be used as a parameter name".to_string()));
    }
    if already.iter().any(|s| s.name() == sym.name()) {
        return Err(EvalError::BadKeyword(format!(
            "duplicate parameter name: {}",
            sym.name()
        )));
    }
    Ok(())
}

fn level_index(scopes: &[Vec<Symbol>], sym: &Symbol) -> Option<(u16, u16)> {
    for (level, scope) in scopes.iter().enumerate() {
        if let Some(offset) = scope.iter().position(|s| s.name() == sym.name()) {
            return Some((level as u16, offset as u16));
        }
    }
    None
}

/// Compiles a `lambda`/`fn`/`macro`/`defun`/`defmacro` body.
///
/// `enclosing_scopes` lists the parameter tables of lambdas textually
/// enclosing this one, innermost first — empty for a body compiled at the
/// top level. Each recursive nested-lambda compile pushes its own new scope
/// in front of this list, which is exactly how `ArgRef.level` ends up
/// counting frame-chain hops outward.
pub fn compile(
    interp: &mut Interpreter,
    params: &Value,
    body: &[Value],
    docstring: Option<String>,
    enclosing_scopes: &[Vec<Symbol>],
) -> Result<Rc<CompiledLambda>, EvalError> {
    let (param_syms, has_rest) = parse_param_list(params)?;

    let mut scopes: Vec<Vec<Symbol>> = Vec::with_capacity(enclosing_scopes.len() + 1);
    scopes.push(param_syms.clone());
    scopes.extend_from_slice(enclosing_scopes);

    let mut compiled_body = Vec::with_capacity(body.len());
    for form in body {
        compiled_body.push(walk(interp, form, &scopes)?);
    }

    Ok(Rc::new(CompiledLambda {
        param_count: param_syms.len(),
        has_rest,
        body: compiled_body,
        docstring,
        name: RefCell::new(None),
    }))
}

fn walk(interp: &mut Interpreter, expr: &Value, scopes: &[Vec<Symbol>]) -> Result<Value, EvalError> {
    match expr {
        Value::Symbol(sym) => match level_index(scopes, sym) {
            Some((level, offset)) => Ok(Value::ArgRef(level, offset, sym.clone())),
            None => Ok(expr.clone()),
        },
        Value::ArgRef(level, offset, sym) => {
            // An already-resolved ArgRef from an enclosing compile pass
            // (possible when a macro expansion re-injects previously
            // compiled code): push it out one more frame.
            Ok(Value::ArgRef(level + 1, *offset, sym.clone()))
        }
        Value::Cons(_) => {
            let Some(items) = expr.to_vec() else {
                return Ok(expr.clone());
            };
            if items.is_empty() {
                return Ok(expr.clone());
            }
            match head_name(&items) {
                Some("quote") => Ok(expr.clone()),
                Some("lambda") | Some("fn") => compile_nested_lambda(interp, &items[1..], scopes),
                Some("macro") | Some("defmacro") => Err(EvalError::BadKeyword(
                    "macro definitions cannot be nested inside another compiled body".to_string(),
                )),
                Some("let") => {
                    let desugared = desugar_let(&items[1..])?;
                    walk(interp, &desugared, scopes)
                }
                Some("defun") => {
                    let desugared = desugar_defun(&items[1..])?;
                    walk(interp, &desugared, scopes)
                }
                Some("quasiquote") if items.len() == 2 => {
                    let expanded = qq_expand(&items[1], 1);
                    walk(interp, &expanded, scopes)
                }
                _ => {
                    if let Some(expanded) = try_expand_macro_call(interp, &items)? {
                        return walk(interp, &expanded, scopes);
                    }
                    let mut out = Vec::with_capacity(items.len());
                    for item in &items {
                        out.push(walk(interp, item, scopes)?);
                    }
                    Ok(Value::list(out))
                }
            }
        }
        _ => Ok(expr.clone()),
    }
}

fn compile_nested_lambda(
    interp: &mut Interpreter,
    args: &[Value],
    scopes: &[Vec<Symbol>],
) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::BadKeyword(
            "lambda/fn requires a parameter list and a body".to_string(),
        ));
    }
    let (docstring, body) = split_docstring(&args[1..]);
    let compiled = compile(interp, &args[0], body, docstring, scopes)?;
    Ok(Value::Function(Function::Lambda(compiled)))
}

pub(crate) fn desugar_let(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::BadKeyword("let requires bindings and a body".to_string()));
    }
    let bindings = args[0]
        .to_vec()
        .ok_or_else(|| EvalError::BadKeyword("let bindings must be a list".to_string()))?;
    let mut names = Vec::with_capacity(bindings.len());
    let mut inits = Vec::with_capacity(bindings.len());
    for binding in &bindings {
        let pair = binding
            .to_vec()
            .ok_or_else(|| EvalError::BadKeyword("let binding must be (name value)".to_string()))?;
        if pair.len() != 2 {
            return Err(EvalError::BadKeyword("let binding must be (name value)".to_string()));
        }
        names.push(pair[0].clone());
        inits.push(pair[1].clone());
    }
    let mut fn_form = vec![Value::symbol("fn"), Value::list(names)];
    fn_form.extend(args[1..].iter().cloned());
    let mut application = vec![Value::list(fn_form)];
    application.extend(inits);
    Ok(Value::list(application))
}

pub(crate) fn desugar_defun(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::BadKeyword(
            "defun requires a name, a parameter list, and a body".to_string(),
        ));
    }
    let mut fn_form = vec![Value::symbol("fn"), args[1].clone()];
    fn_form.extend(args[2..].iter().cloned());
    Ok(Value::list(vec![
        Value::symbol("setq"),
        args[0].clone(),
        Value::list(fn_form),
    ]))
}

fn try_expand_macro_call(interp: &mut Interpreter, items: &[Value]) -> Result<Option<Value>, EvalError> {
    let Value::Symbol(head_sym) = &items[0] else {
        return Ok(None);
    };
    let Some(Value::Function(Function::Macro(_))) = interp.globals.get(head_sym) else {
        return Ok(None);
    };

    let mut current = Value::list(items.to_vec());
    for _ in 0..MACRO_EXPANSION_LIMIT {
        let current_items = current.to_vec().expect("macro call form is always a proper list");
        let Value::Symbol(sym) = &current_items[0] else {
            return Ok(Some(current));
        };
        let macro_lambda = match interp.globals.get(sym) {
            Some(Value::Function(Function::Macro(m))) => m,
            _ => return Ok(Some(current)),
        };
        current = eval::invoke_macro(interp, &macro_lambda, &current_items[1..])?;
    }
    Err(EvalError::MacroExpansionLimit(
        items[0].to_string(),
    ))
}

fn call(head: &str, args: Vec<Value>) -> Value {
    let mut items = vec![Value::symbol(head)];
    items.extend(args);
    Value::list(items)
}

fn quote_call(v: Value) -> Value {
    call("quote", vec![v])
}

/// Expands `(quasiquote template)` into an equivalent expression built from
/// `cons`/`list`/`append`/`quote`. `depth` counts
/// enclosing quasiquotes; `unquote`/`unquote-splicing` only fire at depth 1.
pub(crate) fn qq_expand(template: &Value, depth: u32) -> Value {
    if let Some(items) = template.to_vec() {
        if items.len() == 2 && is_symbol_named(&items[0], "unquote") {
            return if depth == 1 {
                items[1].clone()
            } else {
                call("list", vec![quote_call(Value::symbol("unquote")), qq_expand(&items[1], depth - 1)])
            };
        }
        if items.len() == 2 && is_symbol_named(&items[0], "quasiquote") {
            return call(
                "list",
                vec![quote_call(Value::symbol("quasiquote")), qq_expand(&items[1], depth + 1)],
            );
        }
        let append_args: Vec<Value> = items.iter().map(|item| qq_expand_element(item, depth)).collect();
        return call("append", append_args);
    }
    quote_call(template.clone())
}

fn qq_expand_element(item: &Value, depth: u32) -> Value {
    if let Some(parts) = item.to_vec() {
        if parts.len() == 2 && is_symbol_named(&parts[0], "unquote-splicing") && depth == 1 {
            return parts[1].clone();
        }
    }
    call("list", vec![qq_expand(item, depth)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;

    fn params(names: &[&str]) -> Value {
        Value::list(names.iter().map(|n| Value::symbol(n)).collect::<Vec<_>>())
    }

    #[test]
    fn fixed_params_get_level_zero_offsets() {
        let mut interp = Interpreter::new();
        let body = vec![Value::symbol("x")];
        let compiled = compile(&mut interp, &params(&["x", "y"]), &body, None, &[]).unwrap();
        assert_eq!(compiled.param_count, 2);
        assert!(!compiled.has_rest);
        assert!(matches!(compiled.body[0], Value::ArgRef(0, 0, _)));
    }

    #[test]
    fn rest_parameter_is_flagged() {
        let mut interp = Interpreter::new();
        let plist = Value::list(vec![Value::symbol("a"), Value::symbol("&rest"), Value::symbol("more")]);
        let compiled = compile(&mut interp, &plist, &[Value::symbol("more")], None, &[]).unwrap();
        assert_eq!(compiled.param_count, 2);
        assert!(compiled.has_rest);
        assert_eq!(compiled.signed_arity(), -3);
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let mut interp = Interpreter::new();
        let plist = params(&["x", "x"]);
        assert!(compile(&mut interp, &plist, &[Value::symbol("x")], None, &[]).is_err());
    }

    #[test]
    fn naming_t_as_a_parameter_is_rejected() {
        let mut interp = Interpreter::new();
        let plist = params(&["t"]);
        assert!(compile(&mut interp, &plist, &[Value::symbol("t")], None, &[]).is_err());
    }

    #[test]
    fn nested_lambda_promotes_free_variable_one_level_out() {
        let mut interp = Interpreter::new();
        // (fn (x) (fn (y) x)) — body of the inner lambda references the outer x.
        let inner = Value::list(vec![
            Value::symbol("fn"),
            params(&["y"]),
            Value::symbol("x"),
        ]);
        let compiled = compile(&mut interp, &params(&["x"]), &[inner], None, &[]).unwrap();
        match &compiled.body[0] {
            Value::Function(Function::Lambda(inner_compiled)) => {
                assert!(matches!(inner_compiled.body[0], Value::ArgRef(1, 0, _)));
            }
            other => panic!("expected a compiled nested lambda, got {:?}", other),
        }
    }

    #[test]
    fn quoted_data_is_never_rewritten() {
        let mut interp = Interpreter::new();
        let quoted = Value::list(vec![Value::symbol("quote"), Value::symbol("x")]);
        let compiled = compile(&mut interp, &params(&["x"]), &[quoted], None, &[]).unwrap();
        let items = compiled.body[0].to_vec().unwrap();
        assert!(matches!(&items[1], Value::Symbol(s) if s.name() == "x"));
    }

    #[test]
    fn nested_macro_definition_is_a_compile_error() {
        let mut interp = Interpreter::new();
        let nested_macro = Value::list(vec![
            Value::symbol("macro"),
            params(&["y"]),
            Value::symbol("y"),
        ]);
        assert!(compile(&mut interp, &params(&["x"]), &[nested_macro], None, &[]).is_err());
    }
}
