use qlisp::diagnostics;
use qlisp::repl;
use qlisp::runtime::{builtins, environment::Environment};
use std::env;
use std::fs;
use std::path::Path;

fn main() {
    let files: Vec<String> = env::args().skip(1).collect();

    if files.is_empty() {
        if let Err(err) = repl::run() {
            eprintln!("{err}");
            std::process::exit(1);
        }
        return;
    }

    let global = Environment::new_ref();
    builtins::install(&global);

    let mut failed = false;
    for file in &files {
        let path = Path::new(file);
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                diagnostics::report_io_error(path, &err);
                failed = true;
                continue;
            }
        };
        // Evaluation errors inside a file print and the file keeps running;
        // a file that fails to parse fails the whole invocation.
        if let Err(err) = builtins::eval_source(&global, &source) {
            diagnostics::emit_syntax_error(file, &source, &err);
            failed = true;
        }
    }

    if failed {
        std::process::exit(1);
    }
}
