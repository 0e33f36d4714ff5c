//! The evaluator: a trampoline loop over `(expression, frame)` pairs so a
//! self tail call runs in O(1) Rust stack frames, directly in Rust stack frames instead.
//!
//! Only `lambda`/`fn`/`macro`/`defmacro` bodies ever pass through
//! `crate::compiler` directly. A raw `(let …)`/`(defun …)`/`(lambda …)` form
//! reaching this module is, by construction, one that was never nested
//! inside an already-compiled body — `compiler::walk` desugars/compiles
//! those cases itself at compile time. So `eval_let`/`eval_defun`/
//! `eval_lambda_form` below compile their bodies the same way the compiler
//! does, just lazily, the first (and only) time such a form is reached.
//!
//! A compiled `(fn …)` literal embedded in a body is a template
//! (`Function::Lambda`, no captured frame) until the moment evaluation
//! actually reaches it — `close_over` is where it becomes a `Closure` over
//! whatever frame is running at that point.

use std::rc::Rc;

use crate::compiler;
use crate::error::{self, EvalError};
use crate::host::HostScope;
use crate::interpreter::Interpreter;
use crate::symbol::Symbol;
use crate::value::{CompiledLambda, ConsCell, Frame, Function, Value};

/// What a special-form or application handler produces: either the final
/// value, or the next `(expression, frame)` pair for the trampoline's loop
/// to continue with in tail position.
enum ControlFlow {
    Return(Value),
    Tail(Value, Option<Rc<Frame>>),
}

/// Evaluates `expr` under `frame` (`None` outside any lexical closure).
/// Loops internally on tail positions — a self-recursive call in tail
/// position never grows this function's own Rust call stack.
pub fn eval(interp: &mut Interpreter, expr: Value, frame: Option<Rc<Frame>>) -> Result<Value, EvalError> {
    let mut cur_expr = expr;
    let mut cur_frame = frame;
    loop {
        let count = interp.bump_eval_count();
        interp.host.assert_next_evaluation(count);
        if interp.host.halted() {
            // Cooperative cancellation point: a host-set halt flag (quota
            // exceeded, or `(return v)`) unwinds by promptly handing back
            // `nil` rather than raising — there is no exception to catch.
            return Ok(Value::Null);
        }
        match step(interp, cur_expr, cur_frame)? {
            ControlFlow::Return(v) => return Ok(v),
            ControlFlow::Tail(expr, frame) => {
                cur_expr = expr;
                cur_frame = frame;
            }
        }
    }
}

fn step(interp: &mut Interpreter, expr: Value, frame: Option<Rc<Frame>>) -> Result<ControlFlow, EvalError> {
    match expr {
        Value::Null
        | Value::Number(_)
        | Value::String(_)
        | Value::Bool(_)
        | Value::Map(_)
        | Value::Opaque(_) => Ok(ControlFlow::Return(expr)),

        Value::Function(Function::Lambda(l)) => Ok(ControlFlow::Return(close_over(l, &frame))),
        Value::Function(f) => Ok(ControlFlow::Return(Value::Function(f))),

        Value::ArgRef(level, offset, sym) => {
            let f = match &frame {
                Some(f) => f,
                None => return Err(EvalError::UnboundVariable(sym.name().to_string())),
            };
            let target = f.at_level(level);
            let slots = target.slots.borrow();
            match slots.get(offset as usize) {
                Some(v) => Ok(ControlFlow::Return(v.clone())),
                None => Err(EvalError::UnboundVariable(sym.name().to_string())),
            }
        }

        Value::Symbol(sym) => eval_symbol(interp, &sym).map(ControlFlow::Return),

        Value::Cons(cell) => eval_cons(interp, cell, frame),
    }
}

fn eval_symbol(interp: &mut Interpreter, sym: &Symbol) -> Result<Value, EvalError> {
    // "t" is self-evaluating, the same way the reader already hands back
    // `Value::Null` directly for "nil" rather than requiring it be bound.
    if sym.name() == "t" {
        return Ok(Value::symbol("t"));
    }
    if let Some(v) = interp.globals.get(sym) {
        return Ok(v);
    }
    if let Some(v) = interp.host.try_get(sym.name()) {
        return Ok(v);
    }
    Err(EvalError::UnboundVariable(sym.name().to_string()))
}

/// A literal `Function::Lambda` becomes a `Closure` over whatever frame is
/// running at the point it is evaluated; with no running frame it stays a
/// (frame-less, still perfectly callable) `Lambda`.
fn close_over(l: Rc<CompiledLambda>, frame: &Option<Rc<Frame>>) -> Value {
    match frame {
        Some(f) => Value::Function(Function::Closure(l, f.clone())),
        None => Value::Function(Function::Lambda(l)),
    }
}

/// Evaluates a `Cons` form. Every `Cons` that an error propagates through on
/// its way back up appends its own short printed form to `interp.trace`
/// (capped at `error::MAX_TRACE_FRAMES`), so `repl_eval` can hand the host a
/// bounded stack of frames rather than just the outermost form.
fn eval_cons(interp: &mut Interpreter, cell: Rc<ConsCell>, frame: Option<Rc<Frame>>) -> Result<ControlFlow, EvalError> {
    let form = Value::Cons(cell);
    let items = form
        .to_vec()
        .ok_or_else(|| EvalError::BadKeyword("a dotted pair cannot be evaluated as a form".to_string()))?;
    if items.is_empty() {
        return Ok(ControlFlow::Return(Value::Null));
    }
    let result = if let Some(name) = head_keyword_name(&items[0]) {
        eval_special_form(interp, name, &items, frame)
    } else {
        eval_application(interp, &items, frame)
    };
    result.map_err(|e| {
        let mut trace = interp.trace.borrow_mut();
        if trace.len() < error::MAX_TRACE_FRAMES {
            trace.push(crate::printer::print_readable(&form));
        }
        drop(trace);
        e
    })
}

/// `Symbol::is_keyword` is populated from the exact same name list this
/// dispatch switches on, so every keyword-flagged symbol is handled below
/// and vice versa.
fn head_keyword_name(v: &Value) -> Option<&str> {
    match v {
        Value::Symbol(s) if s.is_keyword() => Some(s.name()),
        _ => None,
    }
}

fn eval_special_form(
    interp: &mut Interpreter,
    name: &str,
    items: &[Value],
    frame: Option<Rc<Frame>>,
) -> Result<ControlFlow, EvalError> {
    match name {
        "quote" => {
            if items.len() != 2 {
                return Err(EvalError::BadQuote(format!(
                    "quote takes exactly 1 argument, got {}",
                    items.len() - 1
                )));
            }
            Ok(ControlFlow::Return(items[1].clone()))
        }
        "progn" => eval_progn(interp, &items[1..], frame),
        "if" => eval_if(interp, &items[1..], frame),
        "cond" => eval_cond(interp, &items[1..], frame),
        "setq" => eval_setq(interp, &items[1..], frame).map(ControlFlow::Return),
        "export" => eval_export(interp, &items[1..], frame).map(ControlFlow::Return),
        "bound?" => eval_bound_p(interp, &items[1..], &frame).map(ControlFlow::Return),
        "lambda" | "fn" => eval_lambda_form(interp, &items[1..], &frame).map(ControlFlow::Return),
        "macro" => eval_macro_form(interp, &items[1..]).map(ControlFlow::Return),
        "defmacro" => eval_defmacro(interp, &items[1..]).map(ControlFlow::Return),
        "defun" => eval_defun(interp, &items[1..], frame),
        "let" => eval_let(interp, &items[1..], frame),
        "quasiquote" => {
            if items.len() != 2 {
                return Err(EvalError::BadQuasiquote("quasiquote takes exactly 1 argument".to_string()));
            }
            let expanded = compiler::qq_expand(&items[1], 1);
            Ok(ControlFlow::Tail(expanded, frame))
        }
        "unquote" | "unquote-splicing" => Err(EvalError::BadQuasiquote(format!(
            "{} used outside of a quasiquote",
            name
        ))),
        other => unreachable!("keyword {} has no eval_special_form arm", other),
    }
}

fn eval_progn(interp: &mut Interpreter, body: &[Value], frame: Option<Rc<Frame>>) -> Result<ControlFlow, EvalError> {
    if body.is_empty() {
        return Ok(ControlFlow::Return(Value::Null));
    }
    for form in &body[..body.len() - 1] {
        eval(interp, form.clone(), frame.clone())?;
    }
    Ok(ControlFlow::Tail(body[body.len() - 1].clone(), frame))
}

fn eval_if(interp: &mut Interpreter, args: &[Value], frame: Option<Rc<Frame>>) -> Result<ControlFlow, EvalError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvalError::arity_error("if", error::ARITY_TWO_OR_THREE, args.len()));
    }
    let test = eval(interp, args[0].clone(), frame.clone())?;
    if test.is_truthy() {
        Ok(ControlFlow::Tail(args[1].clone(), frame))
    } else if args.len() == 3 {
        Ok(ControlFlow::Tail(args[2].clone(), frame))
    } else {
        Ok(ControlFlow::Return(Value::Null))
    }
}

fn eval_cond(interp: &mut Interpreter, clauses: &[Value], frame: Option<Rc<Frame>>) -> Result<ControlFlow, EvalError> {
    for clause in clauses {
        let parts = clause
            .to_vec()
            .ok_or_else(|| EvalError::BadKeyword("cond clause must be a list".to_string()))?;
        if parts.is_empty() {
            return Err(EvalError::BadKeyword("cond clause must not be empty".to_string()));
        }
        let test = eval(interp, parts[0].clone(), frame.clone())?;
        if test.is_truthy() {
            if parts.len() == 1 {
                return Ok(ControlFlow::Return(test));
            }
            return eval_progn(interp, &parts[1..], frame);
        }
    }
    Ok(ControlFlow::Return(Value::Null))
}

/// `(setq v1 e1 v2 e2 …)` — each `ei` is evaluated and assigned to `vi` in
/// order, left to right, before the next pair begins; the last assigned
/// value is the result. Rejects an odd number of arguments.
fn eval_setq(interp: &mut Interpreter, args: &[Value], frame: Option<Rc<Frame>>) -> Result<Value, EvalError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(EvalError::arity_error("setq", error::ARITY_PAIRS, args.len()));
    }
    let mut result = Value::Null;
    for pair in args.chunks(2) {
        result = eval(interp, pair[1].clone(), frame.clone())?;
        assign_target(interp, &pair[0], result.clone(), &frame)?;
    }
    Ok(result)
}

fn assign_target(
    interp: &mut Interpreter,
    target: &Value,
    value: Value,
    frame: &Option<Rc<Frame>>,
) -> Result<(), EvalError> {
    match target {
        Value::ArgRef(level, offset, _) => {
            let f = frame
                .as_ref()
                .ok_or_else(|| EvalError::NotVariable("no lexical frame to assign into".to_string()))?;
            let target_frame = f.at_level(*level);
            let mut slots = target_frame.slots.borrow_mut();
            match slots.get_mut(*offset as usize) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(EvalError::NotVariable("argument slot out of range".to_string())),
            }
        }
        Value::Symbol(sym) => {
            if sym.is_keyword() || sym.name() == "t" {
                return Err(EvalError::NotVariable(sym.name().to_string()));
            }
            interp.globals.assign(sym, value);
            Ok(())
        }
        other => Err(EvalError::NotVariable(crate::printer::print_readable(other))),
    }
}

/// `(export v1 e1 v2 e2 …)` — as `setq`, but each value is written into the
/// host scope's argument bag instead of globals.
fn eval_export(interp: &mut Interpreter, args: &[Value], frame: Option<Rc<Frame>>) -> Result<Value, EvalError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(EvalError::arity_error("export", error::ARITY_PAIRS, args.len()));
    }
    let host = interp.host.clone();
    let mut result = Value::Null;
    for pair in args.chunks(2) {
        let Value::Symbol(sym) = &pair[0] else {
            return Err(EvalError::NotVariable(crate::printer::print_readable(&pair[0])));
        };
        if sym.is_keyword() || sym.name() == "t" {
            return Err(EvalError::NotVariable(sym.name().to_string()));
        }
        result = eval(interp, pair[1].clone(), frame.clone())?;
        host.export(sym.name(), result.clone())?;
    }
    Ok(result)
}

fn eval_bound_p(interp: &mut Interpreter, args: &[Value], frame: &Option<Rc<Frame>>) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity_error("bound?", error::ARITY_AT_LEAST_ONE, args.len()));
    }
    for arg in args {
        let bound = match arg {
            Value::Symbol(sym) => {
                sym.name() == "t" || interp.globals.is_bound(sym) || interp.host.try_get(sym.name()).is_some()
            }
            Value::ArgRef(level, offset, _) => match frame {
                Some(f) => {
                    let target = f.at_level(*level);
                    (*offset as usize) < target.slots.borrow().len()
                }
                None => false,
            },
            other => return Err(EvalError::NotVariable(crate::printer::print_readable(other))),
        };
        if !bound {
            return Ok(Value::Null);
        }
    }
    Ok(Value::symbol("t"))
}

fn eval_lambda_form(interp: &mut Interpreter, args: &[Value], frame: &Option<Rc<Frame>>) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::BadKeyword(
            "lambda/fn requires a parameter list and a body".to_string(),
        ));
    }
    let (docstring, body) = compiler::split_docstring(&args[1..]);
    let compiled = compiler::compile(interp, &args[0], body, docstring, &[])?;
    Ok(close_over(compiled, frame))
}

fn eval_macro_form(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::BadKeyword(
            "macro requires a parameter list and a body".to_string(),
        ));
    }
    let (docstring, body) = compiler::split_docstring(&args[1..]);
    let compiled = compiler::compile(interp, &args[0], body, docstring, &[])?;
    Ok(Value::Function(Function::Macro(compiled)))
}

fn eval_defmacro(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 3 {
        return Err(EvalError::BadKeyword(
            "defmacro requires a name, a parameter list, and a body".to_string(),
        ));
    }
    let Value::Symbol(name) = &args[0] else {
        return Err(EvalError::NotVariable(crate::printer::print_readable(&args[0])));
    };
    let (docstring, body) = compiler::split_docstring(&args[2..]);
    let compiled = compiler::compile(interp, &args[1], body, docstring, &[])?;
    *compiled.name.borrow_mut() = Some(name.name().to_string());
    let value = Value::Function(Function::Macro(compiled));
    interp.globals.define(name.clone(), value.clone());
    Ok(value)
}

fn eval_defun(interp: &mut Interpreter, args: &[Value], frame: Option<Rc<Frame>>) -> Result<ControlFlow, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::BadKeyword(
            "defun requires a name, a parameter list, and a body".to_string(),
        ));
    }
    let Value::Symbol(name) = &args[0] else {
        return Err(EvalError::NotVariable(crate::printer::print_readable(&args[0])));
    };
    let (docstring, body) = compiler::split_docstring(&args[2..]);
    let compiled = compiler::compile(interp, &args[1], body, docstring, &[])?;
    *compiled.name.borrow_mut() = Some(name.name().to_string());
    let value = close_over(compiled, &frame);
    interp.globals.define(name.clone(), value.clone());
    Ok(ControlFlow::Return(value))
}

fn eval_let(interp: &mut Interpreter, args: &[Value], frame: Option<Rc<Frame>>) -> Result<ControlFlow, EvalError> {
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
        let Value::Symbol(sym) = &pair[0] else {
            return Err(EvalError::NotVariable(crate::printer::print_readable(&pair[0])));
        };
        names.push(sym.clone());
        inits.push(pair[1].clone());
    }
    let mut values = Vec::with_capacity(inits.len());
    for init in &inits {
        values.push(eval(interp, init.clone(), frame.clone())?);
    }
    let param_list = Value::list(names.iter().map(|s| Value::Symbol(s.clone())).collect::<Vec<_>>());
    let compiled = compiler::compile(interp, &param_list, &args[1..], None, &[])?;
    let new_frame = build_frame("let", &compiled, values, frame)?;
    tail_into_body(interp, &compiled.body, new_frame)
}

/// Arity-checks `args` against `compiled` and lays them out into a fresh
/// frame: a trailing `&rest` parameter absorbs every argument past the
/// fixed count into one list.
fn build_frame(
    fn_name: &str,
    compiled: &CompiledLambda,
    args: Vec<Value>,
    parent: Option<Rc<Frame>>,
) -> Result<Rc<Frame>, EvalError> {
    if compiled.has_rest {
        let fixed_count = compiled.param_count - 1;
        if args.len() < fixed_count {
            return Err(EvalError::arity_error(
                fn_name,
                format!("at least {}", fixed_count),
                args.len(),
            ));
        }
        let mut slots: Vec<Value> = args[..fixed_count].to_vec();
        slots.push(Value::list(args[fixed_count..].to_vec()));
        Ok(Frame::new(slots, parent))
    } else {
        if args.len() != compiled.param_count {
            return Err(EvalError::arity_error(fn_name, compiled.param_count.to_string(), args.len()));
        }
        Ok(Frame::new(args, parent))
    }
}

/// Evaluates every body form but the last for effect, then hands the last
/// one back as the trampoline's next tail position under `new_frame`.
fn tail_into_body(interp: &mut Interpreter, body: &[Value], new_frame: Rc<Frame>) -> Result<ControlFlow, EvalError> {
    if body.is_empty() {
        return Ok(ControlFlow::Return(Value::Null));
    }
    for form in &body[..body.len() - 1] {
        eval(interp, form.clone(), Some(new_frame.clone()))?;
    }
    Ok(ControlFlow::Tail(body[body.len() - 1].clone(), Some(new_frame)))
}

fn eval_application(
    interp: &mut Interpreter,
    items: &[Value],
    frame: Option<Rc<Frame>>,
) -> Result<ControlFlow, EvalError> {
    if let Some(expansion) = maybe_expand_macro(interp, items)? {
        return Ok(ControlFlow::Tail(expansion, frame));
    }
    if let Value::Symbol(sym) = &items[0] {
        if let Some(result) = try_host_dispatch(interp, sym, &items[1..], &frame)? {
            return Ok(ControlFlow::Return(result));
        }
    }
    let func_val = eval(interp, items[0].clone(), frame.clone())?;
    let mut args = Vec::with_capacity(items.len() - 1);
    for a in &items[1..] {
        args.push(eval(interp, a.clone(), frame.clone())?);
    }
    apply_value(interp, &func_val, args)
}

fn apply_value(interp: &mut Interpreter, func: &Value, args: Vec<Value>) -> Result<ControlFlow, EvalError> {
    match func {
        Value::Function(Function::Lambda(l)) => {
            let name = l.name.borrow().clone().unwrap_or_else(|| "lambda".to_string());
            let new_frame = build_frame(&name, l, args, None)?;
            tail_into_body(interp, &l.body, new_frame)
        }
        Value::Function(Function::Closure(l, captured)) => {
            let name = l.name.borrow().clone().unwrap_or_else(|| "closure".to_string());
            let new_frame = build_frame(&name, l, args, Some(captured.clone()))?;
            tail_into_body(interp, &l.body, new_frame)
        }
        Value::Function(Function::BuiltIn(_name, f)) => f(interp, &args).map(ControlFlow::Return),
        Value::Function(Function::HostDelegate(d)) => d.call(interp, &args).map(ControlFlow::Return),
        Value::Function(Function::Macro(_)) => Err(EvalError::BadKeyword(
            "a macro cannot be applied as a function; call it in head position instead".to_string(),
        )),
        other => Err(EvalError::type_error("apply", "function", other, 0)),
    }
}

/// Non-tail application entry point for builtins that need to call back
/// into the evaluator (`apply`, `map`, `reduce`, `funcall`…). Runs through
/// the same frame-building/tail-call machinery as ordinary application, via
/// one extra (non-tail, Rust-stack-growing) `eval` call — which is correct:
/// only a *directly self-recursive* tail call gets the trampoline's O(1)
/// stack, not calls routed through a higher-order builtin.
pub fn apply(interp: &mut Interpreter, func: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
    match apply_value(interp, func, args)? {
        ControlFlow::Return(v) => Ok(v),
        ControlFlow::Tail(expr, frame) => eval(interp, expr, frame),
    }
}

/// Expands a macro call (`items[0]` bound to a `Function::Macro`) up to the
/// compiler's own iteration bound, matching `compiler::try_expand_macro_call`
/// for the uncompiled/top-level case.
fn maybe_expand_macro(interp: &mut Interpreter, items: &[Value]) -> Result<Option<Value>, EvalError> {
    let Value::Symbol(head_sym) = &items[0] else {
        return Ok(None);
    };
    let Some(Value::Function(Function::Macro(_))) = interp.globals.get(head_sym) else {
        return Ok(None);
    };
    let mut current = Value::list(items.to_vec());
    for _ in 0..compiler::MACRO_EXPANSION_LIMIT {
        let current_items = current.to_vec().expect("macro call form is always a proper list");
        let Value::Symbol(sym) = &current_items[0] else {
            return Ok(Some(current));
        };
        let macro_lambda = match interp.globals.get(sym) {
            Some(Value::Function(Function::Macro(m))) => m,
            _ => return Ok(Some(current)),
        };
        current = invoke_macro(interp, &macro_lambda, &current_items[1..])?;
    }
    Err(EvalError::MacroExpansionLimit(items[0].to_string()))
}

/// Invokes a macro's compiled body against its *unevaluated* argument
/// forms — the same frame-building rules as an ordinary call, just without
/// evaluating the arguments first. Matches the signature `compiler.rs`
/// already calls during compile-time macro expansion.
pub fn invoke_macro(
    interp: &mut Interpreter,
    macro_lambda: &Rc<CompiledLambda>,
    unevaluated_args: &[Value],
) -> Result<Value, EvalError> {
    let pseudo = Value::Function(Function::Lambda(macro_lambda.clone()));
    apply(interp, &pseudo, unevaluated_args.to_vec())
}

enum HostPattern {
    IndexedAccessor(String),
    MemberCall(String),
    BareMethod(String),
    Constructor(String),
    StaticReference(String),
}

/// The five host-dispatch-heuristic patterns, in the priority order
/// heuristics are listed in priority order: a leading `/` is checked ahead of the generic
/// "name contains a `/`" case, so a bare script method never gets
/// misclassified as a namespaced static reference.
fn classify_host_name(name: &str) -> Option<HostPattern> {
    if let Some(rest) = name.strip_prefix(':') {
        return Some(HostPattern::IndexedAccessor(rest.to_string()));
    }
    if let Some(rest) = name.strip_prefix('.') {
        return Some(HostPattern::MemberCall(rest.to_string()));
    }
    if let Some(rest) = name.strip_prefix('/') {
        return Some(HostPattern::BareMethod(rest.to_string()));
    }
    if let Some(rest) = name.strip_suffix('.') {
        return Some(HostPattern::Constructor(rest.to_string()));
    }
    if name.contains('/') {
        return Some(HostPattern::StaticReference(name.to_string()));
    }
    None
}

fn try_host_dispatch(
    interp: &mut Interpreter,
    sym: &Symbol,
    arg_forms: &[Value],
    frame: &Option<Rc<Frame>>,
) -> Result<Option<Value>, EvalError> {
    let Some(pattern) = classify_host_name(sym.name()) else {
        return Ok(None);
    };
    let host = interp.host.clone();
    match pattern {
        HostPattern::IndexedAccessor(key_name) => {
            if arg_forms.len() != 1 {
                return Err(EvalError::arity_error(sym.name(), error::ARITY_ONE, arg_forms.len()));
            }
            let target = eval(interp, arg_forms[0].clone(), frame.clone())?;
            if let Value::Map(map) = &target {
                let found = map.borrow().get(key_name.as_str()).cloned().unwrap_or(Value::Null);
                return Ok(Some(found));
            }
            Ok(Some(host.get(&target, &Value::string(key_name))?))
        }
        HostPattern::MemberCall(member) => {
            if arg_forms.is_empty() {
                return Err(EvalError::arity_error(sym.name(), error::ARITY_AT_LEAST_ONE, 0));
            }
            let target = eval(interp, arg_forms[0].clone(), frame.clone())?;
            let mut args = Vec::with_capacity(arg_forms.len() - 1);
            for a in &arg_forms[1..] {
                args.push(eval(interp, a.clone(), frame.clone())?);
            }
            Ok(Some(host.call(&target, &member, &args)?))
        }
        HostPattern::BareMethod(method) => {
            let mut args = Vec::with_capacity(arg_forms.len());
            for a in arg_forms {
                args.push(eval(interp, a.clone(), frame.clone())?);
            }
            match host.try_get_method(&method, args.len()) {
                Some(callable) => Ok(Some(callable.call(interp, &args)?)),
                None => Err(EvalError::HostError(format!("no host method /{}", method))),
            }
        }
        HostPattern::Constructor(type_name) => {
            let mut args = Vec::with_capacity(arg_forms.len());
            for a in arg_forms {
                args.push(eval(interp, a.clone(), frame.clone())?);
            }
            Ok(Some(host.construct(&type_name, &args)?))
        }
        HostPattern::StaticReference(qualified) => {
            let mut args = Vec::with_capacity(arg_forms.len());
            for a in arg_forms {
                args.push(eval(interp, a.clone(), frame.clone())?);
            }
            Ok(Some(host.function(&qualified, &args)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;

    fn read_one(src: &str) -> Value {
        crate::reader::parse(src).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn quote_returns_data_unevaluated() {
        let mut interp = Interpreter::new();
        let result = interp.eval(&read_one("'(a b c)")).unwrap();
        assert_eq!(result.to_string(), "(a b c)");
    }

    #[test]
    fn if_picks_the_truthy_branch() {
        let mut interp = Interpreter::new();
        assert_eq!(interp.eval(&read_one("(if t 1 2)")).unwrap().to_string(), "1");
        assert_eq!(interp.eval(&read_one("(if nil 1 2)")).unwrap().to_string(), "2");
        assert_eq!(interp.eval(&read_one("(if nil 1)")).unwrap().to_string(), "nil");
    }

    #[test]
    fn lambda_application_binds_parameters() {
        let mut interp = Interpreter::new();
        let result = interp.eval(&read_one("((fn (x) x) 42)")).unwrap();
        assert_eq!(result.to_string(), "42");
    }

    #[test]
    fn let_binds_a_lexical_scope() {
        let mut interp = Interpreter::new();
        let result = interp.eval(&read_one("(let ((x 1) (y 2)) x)")).unwrap();
        assert_eq!(result.to_string(), "1");
    }

    #[test]
    fn setq_mutates_a_global_binding() {
        let mut interp = Interpreter::new();
        interp.eval(&read_one("(setq x 1)")).unwrap();
        interp.eval(&read_one("(setq x 2)")).unwrap();
        assert_eq!(interp.eval(&read_one("x")).unwrap().to_string(), "2");
    }

    #[test]
    fn setq_on_a_keyword_is_not_a_variable() {
        let mut interp = Interpreter::new();
        assert!(interp.eval(&read_one("(setq if 1)")).is_err());
        assert!(interp.eval(&read_one("(setq t 1)")).is_err());
    }

    #[test]
    fn setq_binds_multiple_pairs_left_to_right() {
        let mut interp = Interpreter::new();
        let result = interp.eval(&read_one("(setq a 1 b (+ a 1))")).unwrap();
        assert_eq!(result.to_string(), "2");
        assert_eq!(interp.eval(&read_one("a")).unwrap().to_string(), "1");
        assert_eq!(interp.eval(&read_one("b")).unwrap().to_string(), "2");
    }

    #[test]
    fn setq_rejects_an_odd_number_of_arguments() {
        let mut interp = Interpreter::new();
        assert!(interp.eval(&read_one("(setq a 1 b)")).is_err());
    }

    #[test]
    fn bare_unquote_outside_a_quasiquote_is_a_bad_quasiquote_error_not_a_panic() {
        let mut interp = Interpreter::new();
        assert!(matches!(
            interp.eval(&read_one("(unquote 5)")),
            Err(EvalError::BadQuasiquote(_))
        ));
        assert!(matches!(
            interp.eval(&read_one("(unquote-splicing (list 5))")),
            Err(EvalError::BadQuasiquote(_))
        ));
    }

    #[test]
    fn closures_capture_their_defining_frame() {
        let mut interp = Interpreter::new();
        let result = interp
            .eval(&read_one("(let ((x 10)) ((fn (y) (if y x (quote other))) t))"))
            .unwrap();
        assert_eq!(result.to_string(), "10");
    }

    #[test]
    fn bound_p_does_not_evaluate_its_argument() {
        let mut interp = Interpreter::new();
        assert_eq!(
            interp.eval(&read_one("(bound? totally-unbound-name)")).unwrap().to_string(),
            "nil"
        );
        interp.eval(&read_one("(setq totally-unbound-name 1)")).unwrap();
        assert_eq!(
            interp.eval(&read_one("(bound? totally-unbound-name)")).unwrap().to_string(),
            "t"
        );
    }

    #[test]
    fn bound_p_is_variadic_and_requires_every_symbol_bound() {
        let mut interp = Interpreter::new();
        assert_eq!(interp.eval(&read_one("(bound? t cons car)")).unwrap().to_string(), "t");
        assert_eq!(
            interp.eval(&read_one("(bound? cons totally-unbound-xyz)")).unwrap().to_string(),
            "nil"
        );
    }

    #[test]
    fn defun_then_call_runs_the_body() {
        let mut interp = Interpreter::new();
        interp.eval(&read_one("(defun identity (x) x)")).unwrap();
        assert_eq!(interp.eval(&read_one("(identity 7)")).unwrap().to_string(), "7");
    }

    #[test]
    fn cond_falls_through_clauses_in_order() {
        let mut interp = Interpreter::new();
        let result = interp.eval(&read_one("(cond (nil 1) (t 2) (t 3))")).unwrap();
        assert_eq!(result.to_string(), "2");
    }

    #[test]
    fn deep_self_tail_recursion_does_not_overflow_the_rust_stack() {
        let mut interp = Interpreter::new();
        interp
            .eval(&read_one("(defun count-down (n) (if n (count-down (cdr n)) 'done))"))
            .unwrap();
        let mut long_list = Value::Null;
        for _ in 0..200_000 {
            long_list = Value::cons(Value::Null, long_list);
        }
        interp.set("very-long-list", long_list);
        let result = interp.eval(&read_one("(count-down very-long-list)")).unwrap();
        assert_eq!(result.to_string(), "done");
    }
}
