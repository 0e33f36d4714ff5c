//! CLI entry point: run a script, evaluate a one-off expression, or start an
//! interactive REPL.

use std::path::PathBuf;

use clap::Parser;
use lispcraft::config::{BUILTINS_SUMMARY, HELP_TEXT, VERSION, WELCOME_FOOTER, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use lispcraft::host::NullHost;
use lispcraft::interpreter::Interpreter;
use lispcraft::printer::print_readable;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};

const HISTORY_FILE: &str = ".lispcraft_history";

/// A tree-walking Lisp interpreter with a compiled lexical-addressing
/// evaluator, macros, and REPL.
#[derive(Parser, Debug)]
#[command(name = "lispcraft")]
#[command(version = VERSION)]
#[command(about = WELCOME_MESSAGE)]
#[command(after_help = BUILTINS_SUMMARY)]
struct CliArgs {
    /// Script file to execute. If omitted, starts the REPL.
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Evaluate EXPR and print its result instead of running a script or REPL.
    #[arg(long = "eval", value_name = "EXPR")]
    eval: Option<String>,

    /// Start with only the native builtins bound, skipping the bundled
    /// helper definitions (mapcar, reverse, member, compose, ...).
    #[arg(long = "no-prelude")]
    no_prelude: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let mut interp = Interpreter::new().with_host(NullHost::new());
    if args.no_prelude {
        interp.reset_to_bare_globals();
    }

    if let Some(expr) = args.eval {
        match interp.repl_eval(&expr) {
            Ok(result) => {
                println!("{}", print_readable(&result));
                Ok(())
            }
            Err(message) => Err(message.into()),
        }
    } else if let Some(path) = args.script {
        run_script(&mut interp, &path)
    } else {
        run_repl(&mut interp)
    }
}

fn run_script(interp: &mut Interpreter, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    interp.repl_eval(&source).map_err(|e| e.into()).map(|_| ())
}

fn run_repl(interp: &mut Interpreter) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl = DefaultEditor::with_config(config)?;
    let _ = rl.load_history(HISTORY_FILE);

    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);
    println!("{}", WELCOME_FOOTER);

    loop {
        match rl.readline("lispcraft> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match trimmed {
                    "(quit)" | "(exit)" => {
                        println!("Goodbye!");
                        break;
                    }
                    "(clear)" => {
                        print!("\x1B[2J\x1B[H");
                        continue;
                    }
                    "(help)" => {
                        println!("{}", HELP_TEXT);
                        continue;
                    }
                    _ => {}
                }
                match interp.repl_eval(trimmed) {
                    Ok(result) => println!("=> {}", print_readable(&result)),
                    Err(message) => eprintln!("{}", message),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("{}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    Ok(())
}
