//! End-to-end tests driving a fresh `Interpreter` through `repl_eval`, the
//! way a host or the REPL itself would.

use lispcraft::interpreter::Interpreter;

fn eval(src: &str) -> String {
    let mut interp = Interpreter::new();
    let result = interp.repl_eval(src).expect("evaluation should succeed");
    lispcraft::printer::print_readable(&result)
}

fn eval_err(src: &str) -> String {
    let mut interp = Interpreter::new();
    interp.repl_eval(src).expect_err("evaluation should fail")
}

#[test]
fn factorial_via_named_recursion() {
    let out = eval(
        r#"
        (defun fact (n)
          (if (eq n 0) 1 (* n (fact (- n 1)))))
        (fact 10)
        "#,
    );
    assert_eq!(out, "3628800");
}

#[test]
fn fibonacci_via_let_and_tail_recursion() {
    let out = eval(
        r#"
        (defun fib-iter (n a b)
          (if (eq n 0) a (fib-iter (- n 1) b (+ a b))))
        (defun fib (n) (fib-iter n 0 1))
        (fib 20)
        "#,
    );
    assert_eq!(out, "6765");
}

#[test]
fn deep_tail_recursion_does_not_overflow_the_rust_stack() {
    let out = eval(
        r#"
        (defun count-down (n acc)
          (if (eq n 0) acc (count-down (- n 1) (+ acc 1))))
        (count-down 200000 0)
        "#,
    );
    assert_eq!(out, "200000");
}

#[test]
fn higher_order_pipeline_through_the_prelude() {
    let out = eval("(mapcar (fn (x) (* x x)) (filter (fn (x) (eq (mod x 2) 0)) '(1 2 3 4 5 6)))");
    assert_eq!(out, "(4 16 36)");
}

#[test]
fn closures_capture_their_defining_frame() {
    let out = eval(
        r#"
        (defun make-adder (n) (fn (x) (+ x n)))
        (let ((add5 (make-adder 5)))
          (add5 10))
        "#,
    );
    assert_eq!(out, "15");
}

#[test]
fn macro_expansion_runs_before_evaluation() {
    let out = eval(
        r#"
        (defmacro my-when (test &rest body)
          `(cond (,test (progn ,@body)) (t nil)))
        (my-when (eq 1 1) (+ 1 2) (+ 3 4))
        "#,
    );
    assert_eq!(out, "7");
}

#[test]
fn quasiquote_splices_and_substitutes() {
    let out = eval("(let ((x 2) (ys '(3 4))) `(1 ,x ,@ys 5))");
    assert_eq!(out, "(1 2 3 4 5)");
}

#[test]
fn list_construction_and_accessors() {
    let out = eval("(cons 1 (cons 2 (cons 3 nil)))");
    assert_eq!(out, "(1 2 3)");
    assert_eq!(eval("(append '(1 2) '(3 4) 5)"), "(1 2 3 4 . 5)");
    assert_eq!(eval("(car (cdr '(a b c)))"), "b");
}

#[test]
fn map_literal_and_indexed_lookup() {
    let out = eval("(let ((m {:a 1 :b 2})) (:b m))");
    assert_eq!(out, "2");
}

#[test]
fn predicates_and_equality() {
    assert_eq!(eval("(equal '(1 2 3) (list 1 2 3))"), "t");
    assert_eq!(eval("(endp nil)"), "t");
    assert_eq!(eval("(consp (cons 1 2))"), "t");
}

#[test]
fn arithmetic_mixes_ints_and_floats() {
    assert_eq!(eval("(+ 1 2 3)"), "6");
    assert_eq!(eval("(* 2 1.5)"), "3.0");
}

#[test]
fn error_conditions_surface_through_repl_eval() {
    let msg = eval_err("(car 1)");
    assert!(msg.starts_with("EvalException:"));
    let msg = eval_err("(undefined-name)");
    assert!(msg.contains("unbound variable"));
}

#[test]
fn help_introspection_reports_a_registered_builtin() {
    let mut interp = Interpreter::new();
    let out = interp.repl_eval("(help-text 'cons)").unwrap();
    match out {
        lispcraft::value::Value::String(s) => assert!(s.contains("cons")),
        other => panic!("expected a string, got {:?}", other),
    }
}
