//! String-primitive behavior, exercised the way `integration_test.rs`
//! exercises the rest of the builtin surface: parse-and-eval through a
//! fresh `Interpreter`, compare the printed result.

use lispcraft::interpreter::Interpreter;

fn eval(src: &str) -> String {
    let mut interp = Interpreter::new();
    let result = interp.repl_eval(src).expect("evaluation should succeed");
    lispcraft::printer::print_readable(&result)
}

#[test]
fn str_concatenates_printed_forms() {
    assert_eq!(eval(r#"(str "a" "b" 3)"#), "\"ab3\"");
}

#[test]
fn str_uses_bare_not_readable_form_for_nested_strings() {
    assert_eq!(eval(r#"(str "x=" "y")"#), "\"x=y\"");
}

#[test]
fn case_conversion_round_trips() {
    assert_eq!(eval(r#"(string-upcase "shout")"#), "\"SHOUT\"");
    assert_eq!(eval(r#"(string-downcase "WHISPER")"#), "\"whisper\"");
}

#[test]
fn string_p_distinguishes_strings_from_everything_else() {
    assert_eq!(eval(r#"(string? "x")"#), "t");
    assert_eq!(eval("(string? 'x)"), "nil");
    assert_eq!(eval("(string? 5)"), "nil");
}

#[test]
fn glob_filters_by_shell_style_pattern() {
    assert_eq!(eval(r#"(glob "a*" '("apple" "banana" "avocado"))"#), "(\"apple\" \"avocado\")");
    assert_eq!(eval(r#"(glob "?at" '("cat" "hat" "scat"))"#), "(\"cat\" \"hat\")");
}

#[test]
fn symbols_print_bare_under_str() {
    assert_eq!(eval("(str 'hello)"), "\"hello\"");
}
