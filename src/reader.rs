//! The reader: source text to `Value` trees.
//!
//! Delimiters split tokens: whitespace and the single characters
//! `" , ( ) ` ' ~ { } # [ ]`, plus the compound `,@`. Everything else runs
//! together into one atom, which is tried as a number before falling back
//! to a symbol. `nil` is the one atom spelling that reads as `Value::Null`
//! rather than a symbol.
//!
//! Reader macros: `'x` `` `x `` `,x` `,@x` expand to the corresponding
//! two-element list; `[a b c]` expands to `(list a b c)`; `{ :k v ... }`
//! expands to `(new-map (list "k" v) ...)`; `#(... % %2 ...)` expands to
//! `(fn (_a1 _a2 ...) ...)` with `%`/`%N` placeholders rewritten to
//! positional parameter names.

use std::cell::RefCell;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, digit1, multispace1, not_line_ending};
use nom::combinator::{opt, recognize};
use nom::sequence::preceded;
use nom::IResult;

use crate::error::EvalError;
use crate::symbol::{intern, Symbol};
use crate::value::Value;

thread_local! {
    static PENDING_DOCS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

fn set_pending_docs(docs: Vec<String>) {
    PENDING_DOCS.with(|p| *p.borrow_mut() = docs);
}

/// Drains and returns any `;;;` doc comments collected immediately before
/// the most recently read form. Used by `defun`/`defmacro` to attach a
/// docstring without the reader having to know about lambdas at all.
pub fn take_pending_docs() -> Vec<String> {
    PENDING_DOCS.with(|p| std::mem::take(&mut *p.borrow_mut()))
}

fn parse_doc_comment(input: &str) -> IResult<&str, &str> {
    let (input, _) = tag(";;;")(input)?;
    let (input, text) = not_line_ending(input)?;
    Ok((input, text.trim()))
}

fn parse_plain_comment(input: &str) -> IResult<&str, ()> {
    // `;;` or `;` not followed by a third `;` (that's a doc comment, handled
    // separately so its text can be collected).
    let (input, _) = char(';')(input)?;
    let (input, _) = opt(char(';'))(input)?;
    let (input, _) = nom::combinator::peek(nom::combinator::not(char(';')))(input)?;
    let (input, _) = not_line_ending(input)?;
    Ok((input, ()))
}

/// Consumes whitespace and plain comments, collecting any doc comments
/// encountered along the way. A doc comment block resets if a plain
/// comment or blank line intervenes before the next form.
fn ws_and_collect_docs(input: &str) -> IResult<&str, Vec<String>> {
    let mut docs = Vec::new();
    let mut rest = input;
    loop {
        if let Ok((r, _)) = multispace1::<_, nom::error::Error<&str>>(rest) {
            rest = r;
            continue;
        }
        if let Ok((r, text)) = parse_doc_comment(rest) {
            docs.push(text.to_string());
            rest = r;
            continue;
        }
        if let Ok((r, _)) = parse_plain_comment(rest) {
            docs.clear();
            rest = r;
            continue;
        }
        break;
    }
    Ok((rest, docs))
}

fn ws(input: &str) -> IResult<&str, ()> {
    let (rest, _) = ws_and_collect_docs(input)?;
    Ok((rest, ()))
}

const DELIMITERS: &str = "\",()`'~{}#[]";

fn is_delimiter_char(c: char) -> bool {
    c.is_whitespace() || DELIMITERS.contains(c)
}

fn parse_number_text(text: &str) -> Option<Value> {
    fn grammar(input: &str) -> IResult<&str, &str> {
        recognize(preceded(
            opt(char('-')),
            alt((
                recognize((digit1, opt((char('.'), opt(digit1))))),
                recognize((char('.'), digit1)),
            )),
        ))(input)
    }
    match grammar(text) {
        Ok((rest, matched)) if rest.is_empty() => {
            if matched.contains('.') {
                // The grammar above only accepts digit sequences around the
                // dot, so this parse cannot fail.
                let f: f64 = matched
                    .parse()
                    .expect("reader number grammar guarantees a valid float");
                Some(Value::float(f))
            } else {
                let i: i64 = matched
                    .parse()
                    .expect("reader number grammar guarantees a valid integer");
                Some(Value::int(i))
            }
        }
        _ => None,
    }
}

fn parse_atom(input: &str) -> IResult<&str, Value> {
    let (rest, text) = take_while1(|c: char| !is_delimiter_char(c))(input)?;
    if text == "nil" {
        return Ok((rest, Value::Null));
    }
    if let Some(n) = parse_number_text(text) {
        return Ok((rest, n));
    }
    Ok((rest, Value::Symbol(intern(text))))
}

fn parse_string(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('"')(input)?;
    let mut out = String::new();
    let mut rest = input;
    loop {
        match rest.chars().next() {
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::Eof,
                )))
            }
            Some('"') => {
                rest = &rest[1..];
                break;
            }
            Some('\\') => {
                let after = &rest[1..];
                match after.chars().next() {
                    None => {
                        return Err(nom::Err::Error(nom::error::Error::new(
                            after,
                            nom::error::ErrorKind::Eof,
                        )))
                    }
                    Some(c) => {
                        let escaped = match c {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            'b' => '\u{8}',
                            'v' => '\u{B}',
                            'f' => '\u{C}',
                            '"' => '"',
                            '\\' => '\\',
                            other => other,
                        };
                        out.push(escaped);
                        rest = &after[c.len_utf8()..];
                    }
                }
            }
            Some(c) => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    Ok((rest, Value::string(out)))
}

fn wrap(keyword: &str, inner: Value) -> Value {
    Value::list(vec![Value::symbol(keyword), inner])
}

fn parse_quote(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('\'')(input)?;
    let (input, _) = ws(input)?;
    let (input, expr) = parse_expr(input)?;
    Ok((input, wrap("quote", expr)))
}

fn parse_quasiquote(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('`')(input)?;
    let (input, _) = ws(input)?;
    let (input, expr) = parse_expr(input)?;
    Ok((input, wrap("quasiquote", expr)))
}

fn parse_unquote(input: &str) -> IResult<&str, Value> {
    let (input, _) = char(',')(input)?;
    let (input, splicing) = opt(char('@'))(input)?;
    let (input, _) = ws(input)?;
    let (input, expr) = parse_expr(input)?;
    let keyword = if splicing.is_some() {
        "unquote-splicing"
    } else {
        "unquote"
    };
    Ok((input, wrap(keyword, expr)))
}

/// Recognizes a lone `.` token used as a dotted-pair marker: a `.` followed
/// by whitespace or end of input. `.member`-style symbols (used by the
/// host-dispatch heuristics) are a single atom and never reach this parser,
/// since `.` isn't a delimiter character.
fn dotted_marker(input: &str) -> IResult<&str, ()> {
    let (_, _) = char::<_, nom::error::Error<&str>>('.')(input)?;
    let rest = &input[1..];
    let is_marker = match rest.chars().next() {
        None => true,
        Some(c) => c.is_whitespace(),
    };
    if is_marker {
        Ok((rest, ()))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )))
    }
}

fn parse_list(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('(')(input)?;
    let (mut remaining, _) = ws(input)?;
    let mut items = Vec::new();
    let mut tail = Value::Null;
    loop {
        if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>(')')(remaining) {
            remaining = rest;
            break;
        }
        if let Ok((rest, _)) = dotted_marker(remaining) {
            let (rest, _) = ws(rest)?;
            let (rest, expr) = parse_expr(rest)?;
            let (rest, _) = ws(rest)?;
            let (rest, _) = char(')')(rest)?;
            tail = expr;
            remaining = rest;
            break;
        }
        let (rest, expr) = parse_expr(remaining)?;
        items.push(expr);
        let (rest, _) = ws(rest)?;
        remaining = rest;
    }
    let mut result = tail;
    for item in items.into_iter().rev() {
        result = Value::cons(item, result);
    }
    Ok((remaining, result))
}

/// `[a b c]` desugars to `(list a b c)`.
fn parse_bracket_list(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('[')(input)?;
    let (mut remaining, _) = ws(input)?;
    let mut items = vec![Value::symbol("list")];
    loop {
        if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>(']')(remaining) {
            remaining = rest;
            break;
        }
        let (rest, expr) = parse_expr(remaining)?;
        items.push(expr);
        let (rest, _) = ws(rest)?;
        remaining = rest;
    }
    Ok((remaining, Value::list(items)))
}

fn skip_commas_and_ws(input: &str) -> IResult<&str, ()> {
    let mut rest = input;
    loop {
        let (r, _) = ws(rest)?;
        rest = r;
        if let Ok((r2, _)) = char::<_, nom::error::Error<&str>>(',')(rest) {
            rest = r2;
            continue;
        }
        break;
    }
    Ok((rest, ()))
}

fn parse_map_key(input: &str) -> IResult<&str, String> {
    alt((
        |i| {
            let (i, _) = char(':')(i)?;
            let (i, s) = take_while1(|c: char| !is_delimiter_char(c))(i)?;
            Ok((i, s.to_string()))
        },
        |i| match parse_string(i)? {
            (rest, Value::String(s)) => Ok((rest, s.to_string())),
            _ => unreachable!("parse_string only ever returns Value::String"),
        },
    ))(input)
}

/// `{ :k1 v1 :k2 v2 }` desugars to `(new-map (list "k1" v1) (list "k2" v2))`.
fn parse_map_literal(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('{')(input)?;
    let (mut remaining, _) = skip_commas_and_ws(input)?;
    let mut forms = vec![Value::symbol("new-map")];
    loop {
        if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>('}')(remaining) {
            remaining = rest;
            break;
        }
        let (rest, key) = parse_map_key(remaining)?;
        let (rest, _) = ws(rest)?;
        let (rest, val) = parse_expr(rest)?;
        forms.push(Value::list(vec![Value::string(key), val]));
        let (rest, _) = skip_commas_and_ws(rest)?;
        remaining = rest;
    }
    Ok((remaining, Value::list(forms)))
}

fn scan_placeholders(v: &Value, uses_bare: &mut bool, max_n: &mut usize) {
    match v {
        Value::Symbol(sym) => {
            let name = sym.name();
            if name == "%" {
                *uses_bare = true;
            } else if let Some(rest) = name.strip_prefix('%') {
                if let Ok(n) = rest.parse::<usize>() {
                    if n >= 1 {
                        *max_n = (*max_n).max(n);
                    }
                }
            }
        }
        Value::Cons(cell) => {
            scan_placeholders(&cell.car.borrow(), uses_bare, max_n);
            scan_placeholders(&cell.cdr.borrow(), uses_bare, max_n);
        }
        _ => {}
    }
}

fn substitute_placeholders(v: &Value, bare_name: &str) -> Value {
    match v {
        Value::Symbol(sym) => {
            let name = sym.name();
            if name == "%" {
                Value::symbol(bare_name)
            } else if let Some(rest) = name.strip_prefix('%') {
                match rest.parse::<usize>() {
                    Ok(n) if n >= 1 => Value::symbol(&format!("_a{}", n)),
                    _ => v.clone(),
                }
            } else {
                v.clone()
            }
        }
        Value::Cons(cell) => Value::cons(
            substitute_placeholders(&cell.car.borrow(), bare_name),
            substitute_placeholders(&cell.cdr.borrow(), bare_name),
        ),
        other => other.clone(),
    }
}

/// `#(... % ... %2 ...)` desugars to `(fn (_a1 _a2 ...) ...)`.
fn parse_anon_fn(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag("#(")(input)?;
    let (mut remaining, _) = ws(input)?;
    let mut forms = Vec::new();
    loop {
        if let Ok((rest, _)) = char::<_, nom::error::Error<&str>>(')')(remaining) {
            remaining = rest;
            break;
        }
        let (rest, expr) = parse_expr(remaining)?;
        forms.push(expr);
        let (rest, _) = ws(rest)?;
        remaining = rest;
    }
    let body = match forms.len() {
        1 => forms.into_iter().next().expect("len == 1"),
        _ => Value::list(std::iter::once(Value::symbol("progn")).chain(forms)),
    };
    let mut uses_bare = false;
    let mut max_n = 0usize;
    scan_placeholders(&body, &mut uses_bare, &mut max_n);
    let (params, bare_name) = if max_n == 0 {
        (vec![Value::symbol("_a")], "_a")
    } else {
        let params = (1..=max_n).map(|n| Value::symbol(&format!("_a{}", n))).collect();
        (params, "_a1")
    };
    let rewritten = substitute_placeholders(&body, bare_name);
    let lambda = Value::list(vec![Value::symbol("fn"), Value::list(params), rewritten]);
    Ok((remaining, lambda))
}

fn parse_expr(input: &str) -> IResult<&str, Value> {
    alt((
        parse_quote,
        parse_quasiquote,
        parse_unquote,
        parse_anon_fn,
        parse_list,
        parse_bracket_list,
        parse_map_literal,
        parse_string,
        parse_atom,
    ))(input)
}

fn describe_nom_err(err: &nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Incomplete(_) => "unexpected end of input".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            format!("unexpected input near {:?} ({:?})", first_chars(e.input), e.code)
        }
    }
}

fn first_chars(s: &str) -> &str {
    let end = s.char_indices().nth(20).map(|(i, _)| i).unwrap_or(s.len());
    &s[..end]
}

fn syntax_error(original: &str, at: &str, err: &nom::Err<nom::error::Error<&str>>) -> EvalError {
    let offset = original.len() - at.len();
    let consumed = &original[..offset];
    let line_no = consumed.matches('\n').count() + 1;
    let line_start = consumed.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = original[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(original.len());
    let line_text = &original[line_start..line_end];
    EvalError::SyntaxError(format!(
        "line {}: {}\n{}",
        line_no,
        describe_nom_err(err),
        line_text
    ))
}

/// Reads every top-level form out of `text`.
pub fn parse(input: &str) -> Result<Vec<Value>, EvalError> {
    let mut forms = Vec::new();
    let mut rest = input;
    loop {
        let (after_ws, docs) = ws_and_collect_docs(rest).map_err(|e| syntax_error(input, rest, &e))?;
        if !docs.is_empty() {
            set_pending_docs(docs);
        }
        if after_ws.trim().is_empty() {
            break;
        }
        match parse_expr(after_ws) {
            Ok((after_expr, value)) => {
                forms.push(value);
                rest = after_expr;
            }
            Err(e) => return Err(syntax_error(input, after_ws, &e)),
        }
    }
    Ok(forms)
}

/// Reads a single form, returning the unconsumed remainder of the input.
/// Returns an uninterned `#<eof>` symbol when `text` holds no more forms —
/// the reader's own end-of-input value, distinct from any symbol a program
/// could intern.
pub fn read_one(input: &str) -> Result<(Value, &str), EvalError> {
    let (after_ws, docs) = ws_and_collect_docs(input).map_err(|e| syntax_error(input, input, &e))?;
    if !docs.is_empty() {
        set_pending_docs(docs);
    }
    if after_ws.trim().is_empty() {
        return Ok((Value::Symbol(Symbol::uninterned("#<eof>")), after_ws));
    }
    match parse_expr(after_ws) {
        Ok((rest, value)) => Ok((value, rest)),
        Err(e) => Err(syntax_error(input, after_ws, &e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_single(src: &str) -> Value {
        let mut forms = parse(src).expect("should parse");
        assert_eq!(forms.len(), 1, "expected exactly one top-level form");
        forms.remove(0)
    }

    #[test]
    fn parses_integers_and_floats() {
        assert!(matches!(read_single("42"), Value::Number(n) if n.as_i64() == Some(42)));
        assert!(matches!(read_single("-7"), Value::Number(n) if n.as_i64() == Some(-7)));
        match read_single("3.14") {
            Value::Number(n) => assert!((n.as_f64() - 3.14).abs() < 1e-9),
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn parses_symbols_including_operator_names() {
        for name in ["+", "-", "*", "/", "list->vector", "foo?", "set!"] {
            match read_single(name) {
                Value::Symbol(s) => assert_eq!(s.name(), name),
                other => panic!("expected symbol {name}, got {:?}", other),
            }
        }
    }

    #[test]
    fn nil_atom_reads_as_null() {
        assert!(read_single("nil").is_null());
    }

    #[test]
    fn parses_strings_with_escapes() {
        match read_single(r#""line\nbreak\ttab\"quote""#) {
            Value::String(s) => assert_eq!(&*s, "line\nbreak\ttab\"quote"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn parses_proper_list() {
        let v = read_single("(1 2 3)");
        let items = v.to_vec().expect("proper list");
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn parses_dotted_pair() {
        let v = read_single("(1 . 2)");
        match v {
            Value::Cons(cell) => {
                assert!(matches!(*cell.car.borrow(), Value::Number(_)));
                assert!(matches!(*cell.cdr.borrow(), Value::Number(_)));
            }
            other => panic!("expected cons, got {:?}", other),
        }
    }

    #[test]
    fn parses_nested_lists() {
        let v = read_single("(a (b c) d)");
        let items = v.to_vec().expect("proper list");
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].to_vec().unwrap().len(), 2);
    }

    #[test]
    fn parses_quote_sugar() {
        let v = read_single("'x");
        let items = v.to_vec().expect("proper list");
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Value::Symbol(s) if s.name() == "quote"));
    }

    #[test]
    fn parses_quasiquote_and_unquote_sugar() {
        let v = read_single("`(a ,b ,@c)");
        let items = v.to_vec().unwrap();
        assert!(matches!(&items[0], Value::Symbol(s) if s.name() == "quasiquote"));
        let inner = items[1].to_vec().unwrap();
        let ub = inner[1].to_vec().unwrap();
        assert!(matches!(&ub[0], Value::Symbol(s) if s.name() == "unquote"));
        let ubs = inner[2].to_vec().unwrap();
        assert!(matches!(&ubs[0], Value::Symbol(s) if s.name() == "unquote-splicing"));
    }

    #[test]
    fn parses_bracket_list_as_list_call() {
        let v = read_single("[1 2 3]");
        let items = v.to_vec().unwrap();
        assert!(matches!(&items[0], Value::Symbol(s) if s.name() == "list"));
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn parses_map_literal_as_new_map_call() {
        let v = read_single(r#"{ :a 1 :b 2 }"#);
        let items = v.to_vec().unwrap();
        assert!(matches!(&items[0], Value::Symbol(s) if s.name() == "new-map"));
        assert_eq!(items.len(), 3);
        let pair = items[1].to_vec().unwrap();
        assert!(matches!(&pair[0], Value::String(s) if &**s == "a"));
    }

    #[test]
    fn parses_anon_fn_with_bare_placeholder() {
        let v = read_single("#(+ % 1)");
        let items = v.to_vec().unwrap();
        assert!(matches!(&items[0], Value::Symbol(s) if s.name() == "fn"));
        let params = items[1].to_vec().unwrap();
        assert_eq!(params.len(), 1);
        assert!(matches!(&params[0], Value::Symbol(s) if s.name() == "_a"));
    }

    #[test]
    fn parses_anon_fn_with_numbered_placeholders() {
        let v = read_single("#(+ %1 %2)");
        let items = v.to_vec().unwrap();
        let params = items[1].to_vec().unwrap();
        assert_eq!(params.len(), 2);
        assert!(matches!(&params[0], Value::Symbol(s) if s.name() == "_a1"));
        assert!(matches!(&params[1], Value::Symbol(s) if s.name() == "_a2"));
    }

    #[test]
    fn doc_comments_are_collected_and_plain_comments_reset_them() {
        let src = ";;; does the thing\n(defun f () 1)";
        let forms = parse(src).expect("should parse");
        assert_eq!(forms.len(), 1);
        assert_eq!(take_pending_docs(), vec!["does the thing".to_string()]);
    }

    #[test]
    fn whitespace_and_plain_comments_are_skipped() {
        let src = "; a comment\n  (1 2) ;; another\n";
        let forms = parse(src).expect("should parse");
        assert_eq!(forms.len(), 1);
    }

    #[test]
    fn multiple_top_level_forms_all_parsed() {
        let forms = parse("1 2 3").expect("should parse");
        assert_eq!(forms.len(), 3);
    }

    #[test]
    fn unclosed_list_is_a_syntax_error() {
        assert!(parse("(1 2 3").is_err());
    }

    #[test]
    fn unexpected_closing_paren_is_a_syntax_error() {
        assert!(parse(")").is_err());
    }

    #[test]
    fn read_one_reports_eof_sentinel_on_empty_input() {
        let (value, rest) = read_one("   ").expect("should not error");
        assert!(rest.trim().is_empty());
        assert!(matches!(value, Value::Symbol(s) if s.name() == "#<eof>"));
    }
}
