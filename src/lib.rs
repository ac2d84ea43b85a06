//! Loxide is a tree-walk interpreter for Lox, a small dynamically typed
//! scripting language with first-class functions, closures, and classes.
//! Source text goes through four stages: scanning, parsing, resolving, and
//! interpreting. Each stage reports its own errors and the driver stops the
//! pipeline at the first stage that produced any, so semantic analysis never
//! sees a malformed tree and the evaluator never sees an unresolved one.
//!
//! ## Scanning
//! The [`scanner`] turns the source text into a flat list of tokens in a
//! single forward pass. A token carries its kind, its original text, the
//! parsed value for number and string literals, and the 1-based line it
//! started on, which is all the later stages ever need for error reporting.
//! The scanner keeps going after an error so that one run surfaces every
//! lex problem at once.
//!
//! ## Parsing
//! The [`parser`] is a hand-written recursive descent parser with one token
//! of lookahead. It produces [`statements`](stmt::Stmt) whose leaves are
//! [`expressions`](expr::Expr). `for` loops are desugared into `while`
//! loops during parsing, so the later stages only know about one looping
//! construct. On a syntax error the parser reports, discards tokens until
//! the next statement boundary, and carries on, returning everything it
//! could make sense of.
//!
//! ## Resolving
//! The [`resolver`] is a static pass over the finished tree. For every use
//! of a local variable it records how many environments up the chain the
//! binding lives, which makes closures capture the binding that was in
//! scope where the function was written rather than whatever happens to
//! share its name at call time. It also rejects programs that are
//! syntactically fine but semantically wrong: reading a variable in its own
//! initializer, declaring the same name twice in one scope, returning
//! outside a function, using `this` outside a class, and declaring
//! variables that are never used.
//!
//! ## Interpreting
//! The [`interpreter`] walks the tree and evaluates it. Values are
//! [`objects`](object::Object): literals, functions, classes, and
//! instances. Scopes are a chain of [`environments`](environment::Environment);
//! a function value keeps hold of the environment where it was defined,
//! which is all a closure is. Runtime errors unwind to the top of the
//! current statement, are reported, and abort the rest of the run while
//! leaving the interpreter's state intact, so the prompt can keep going
//! with the next line.

use std::{fs, process};

use log::debug;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub mod error;
pub mod token;
pub mod scanner;
pub mod literal;
pub mod expr;
pub mod stmt;
pub mod ast;
pub mod parser;
pub mod resolver;
pub mod environment;
pub mod object;
pub mod function;
pub mod class;
pub mod interpreter;

use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

const HISTORY_FILE: &str = ".loxide_history";

/// The interpreter facade: owns the long-lived [`Interpreter`] and feeds it
/// scripts or prompt lines.
pub struct Loxide {
    interpreter: Interpreter,
}

impl Loxide {
    pub fn new() -> Self {
        Loxide {
            interpreter: Interpreter::new(),
        }
    }

    /// Runs a script file to completion.
    /// Exits 65 on lex, parse, or resolve errors, 70 on a runtime error,
    /// and 1 if the file can not be read.
    pub fn run_file(&mut self, path: &str) {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => {
                println!("Could not read the source file: {error}");
                process::exit(1);
            }
        };

        if self.run(&source) > 0 {
            process::exit(65);
        }

        if self.interpreter.error_count > 0 {
            process::exit(70);
        }
    }

    /// Runs the interactive prompt until end of input. Errors are reported
    /// and the loop continues; globals persist between lines.
    pub fn run_prompt(&mut self) {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(error) => {
                println!("Could not start the prompt: {error}");
                process::exit(1);
            }
        };

        let history = home::home_dir().map(|dir| dir.join(HISTORY_FILE));
        if let Some(history) = &history {
            // There is no history file before the first session.
            let _ = editor.load_history(history);
        }

        loop {
            match editor.readline(">> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    self.run(&line);
                    self.interpreter.reset_errors();
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(error) => {
                    println!("Could not read the line: {error}");
                    break;
                }
            }
        }

        if let Some(history) = &history {
            let _ = editor.save_history(history);
        }
    }

    /// Runs one source string through the pipeline, gating each stage on
    /// the previous one being clean. Returns the number of lex, parse, and
    /// resolve errors; runtime errors are counted on the interpreter.
    fn run(&mut self, source: &str) -> usize {
        let mut scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens();
        debug!("scanned {} tokens", tokens.len());

        if scanner.error_count > 0 {
            return scanner.error_count;
        }

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        debug!("parsed {} statements", statements.len());

        if parser.error_count > 0 {
            return parser.error_count;
        }

        let mut resolver = Resolver::new(&mut self.interpreter);
        resolver.resolve(&statements);

        if resolver.error_count > 0 {
            return resolver.error_count;
        }

        self.interpreter.interpret(&statements);
        0
    }
}

impl Default for Loxide {
    fn default() -> Self {
        Self::new()
    }
}
