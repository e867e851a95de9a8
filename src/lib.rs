pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod config;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod native;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

use std::io::Write;

use log::info;

use crate::ast::Stmt;
use crate::config::InterpreterConfig;
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::value::Value;

/// Scan and parse `source`, reporting every lexical or syntax error.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
    let tokens = scanner::scan_tokens(source)?;
    Parser::new(&tokens).parse()
}

/// A long‑lived interpreter session. Every call to [`Lox::run`] is one
/// program (or one REPL line): it is scanned, parsed and resolved in full
/// before any of it executes, and globals carry over to the next call.
pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(output),
        }
    }

    pub fn with_config(self, config: InterpreterConfig) -> Self {
        Self {
            interpreter: self.interpreter.with_config(config),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Run one program. Front‑end errors may come back several at a time;
    /// resolve and runtime errors stop at the first.
    pub fn run(&mut self, source: &str) -> Result<(), Vec<LoxError>> {
        let statements = parse_program(source)?;

        let locals = Resolver::new()
            .resolve(&statements)
            .map_err(|e| vec![LoxError::from(e)])?;

        info!("Running {} statement(s)", statements.len());

        self.interpreter
            .interpret(&statements, locals)
            .map_err(|e| vec![LoxError::from(e)])
    }

    /// Evaluate a single expression against the current globals.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, Vec<LoxError>> {
        let tokens = scanner::scan_tokens(source)?;
        let expr = Parser::new(&tokens)
            .parse_expression()
            .map_err(|e| vec![e])?;

        self.interpreter
            .evaluate(&expr)
            .map_err(|e| vec![LoxError::from(e)])
    }
}
