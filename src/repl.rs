use crate::diagnostics;
use crate::language::parser;
use crate::runtime::{builtins, environment::Environment, interpreter, reader};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;

const PROMPT: &str = "qlisp> ";

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("readline failure: {0}")]
    Readline(#[from] ReadlineError),
}

/// Interactive loop over a single global environment. Evaluation errors are
/// printed and the session continues; only terminal failures end the loop.
pub fn run() -> Result<(), ReplError> {
    let env = Environment::new_ref();
    builtins::install(&env);

    let mut editor = DefaultEditor::new()?;
    println!("qlisp {}", env!("CARGO_PKG_VERSION"));
    println!("Press Ctrl+C to exit");

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                match parser::parse(&line) {
                    Ok(root) => {
                        let result = interpreter::eval(&env, reader::read(&root));
                        println!("{result}");
                    }
                    Err(err) => diagnostics::emit_syntax_error("<repl>", &line, &err),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(ReplError::Readline(err)),
        }
    }
    Ok(())
}
