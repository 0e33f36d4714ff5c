//! REPL/CLI-facing constants: version banner and welcome text. Kept
//! separate from `main.rs` so both the binary and integration tests can
//! reference the same strings.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const WELCOME_MESSAGE: &str = "lispcraft — a tree-walking Lisp interpreter";
pub const WELCOME_SUBTITLE: &str = "Type an expression and press Enter. (help) lists every builtin.";
pub const WELCOME_FOOTER: &str = "(quit) or Ctrl-D to exit.";

pub const HELP_TEXT: &str = "\
Usage:
  lispcraft                 start the REPL
  lispcraft FILE             evaluate FILE and exit
  lispcraft --eval EXPR       evaluate EXPR and print the result
  lispcraft --no-prelude     start without the bundled helper definitions

REPL commands:
  (quit) / (exit)            leave the REPL
  (clear)                    clear the screen
  (help)                     list every builtin by category
  (help 'name)                show detailed help for one builtin
";

/// A one-line-per-category summary of the builtin surface, shown by
/// `--help` above the full per-flag usage `clap` generates.
pub const BUILTINS_SUMMARY: &str = "\
Builtins: arithmetic (+ - * / mod expt sqrt ...), predicates (eq equal atom consp ...),
lists (cons car cdr list append subseq sort ...), higher-order (map where reduce apply ...),
maps ({...} new-map), strings (str string-upcase string-downcase glob ...),
symbols (gensym intern make-symbol ...), printing (print princ prin1 dump ...),
and control forms (if let cond lambda defun defmacro quasiquote ...).
Run (help) in the REPL for the full, current list.";
