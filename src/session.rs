//! Front‑to‑back pipeline: scan → parse → resolve → interpret.
//!
//! A [`Session`] keeps one interpreter alive across runs, so REPL lines see
//! the globals, functions and classes defined by earlier lines.

use std::io::Write;

use log::{debug, info};
use thiserror::Error;

use crate::error::{Diagnostics, FoxError};
use crate::expr::ExprId;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner;
use crate::stmt::Stmt;
use crate::value::Value;

/// Exit code for scan / parse / resolve errors.
pub const EXIT_STATIC_ERROR: i32 = 65;

/// Exit code for an uncaught runtime error.
pub const EXIT_RUNTIME_ERROR: i32 = 70;

/// Why a run did not complete.
#[derive(Debug, Error)]
pub enum RunError {
    /// The program never started: at least one static error.
    #[error("{0}")]
    Static(Diagnostics),

    /// The program started and was aborted.
    #[error("{0}")]
    Runtime(FoxError),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => EXIT_STATIC_ERROR,
            RunError::Runtime(_) => EXIT_RUNTIME_ERROR,
        }
    }
}

pub struct Session {
    interpreter: Interpreter,
    next_id: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session whose `print` goes to stdout.
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// A session whose `print` goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::with_interpreter(Interpreter::with_output(out))
    }

    fn with_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            next_id: 0,
        }
    }

    /// Scan, parse and resolve `source`.  Nothing is executed.  Also returns
    /// the side-table ids that only the top-level code of `source` uses.
    fn prepare(&mut self, source: &str) -> Result<(Vec<Stmt>, Vec<ExprId>), RunError> {
        let mut diagnostics = Diagnostics::new();

        let tokens = scanner::scan(source, &mut diagnostics);

        let mut parser = Parser::with_first_id(&tokens, self.next_id);
        let statements = parser.parse(&mut diagnostics);
        self.next_id = parser.next_id();

        // A broken tree would only produce follow-on noise.
        if diagnostics.has_errors() {
            info!("Static errors before resolution: {}", diagnostics.len());
            diagnostics.sort_by_line();
            return Err(RunError::Static(diagnostics));
        }

        let mut resolver = Resolver::new();
        resolver.resolve(&statements, &mut diagnostics);

        if diagnostics.has_errors() {
            info!("Resolution failed with {} error(s)", diagnostics.len());
            diagnostics.sort_by_line();
            return Err(RunError::Static(diagnostics));
        }

        let transient: Vec<ExprId> = resolver.top_level_ids().to_vec();
        self.interpreter.resolve(resolver.into_locals());

        Ok((statements, transient))
    }

    /// Run a whole program (a file or one REPL line).
    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        let (statements, transient) = self.prepare(source)?;

        debug!("Executing {} statement(s)", statements.len());

        let result = self.interpreter.interpret(&statements);

        // Top-level code never runs twice; function bodies keep their entries.
        self.interpreter.forget(&transient);

        result.map_err(RunError::Runtime)
    }

    /// Evaluate a single expression and return its value.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, RunError> {
        let mut diagnostics = Diagnostics::new();

        let tokens = scanner::scan(source, &mut diagnostics);

        let mut parser = Parser::with_first_id(&tokens, self.next_id);
        let expr = parser.parse_expression(&mut diagnostics);
        self.next_id = parser.next_id();

        let expr = match expr {
            Some(expr) if !diagnostics.has_errors() => expr,
            _ => {
                diagnostics.sort_by_line();
                return Err(RunError::Static(diagnostics));
            }
        };

        let mut resolver = Resolver::new();
        resolver.resolve_expression(&expr, &mut diagnostics);

        if diagnostics.has_errors() {
            diagnostics.sort_by_line();
            return Err(RunError::Static(diagnostics));
        }

        let transient: Vec<ExprId> = resolver.top_level_ids().to_vec();
        self.interpreter.resolve(resolver.into_locals());

        let result = self.interpreter.evaluate(&expr);
        self.interpreter.forget(&transient);

        result.map_err(RunError::Runtime)
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }
}
