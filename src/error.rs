//! Centralised error hierarchy for the **Fox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! Static passes never stop at the first problem: they push every error into a
//! [`Diagnostics`] collector and the caller decides whether execution may start.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::info;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        /// ` at 'lexeme'` or ` at end`.
        location: String,
    },

    /// Static‑analysis failure (duplicate declaration, misplaced `return`, …).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    /// Runtime evaluation error.  Terminates the whole program run.
    #[error("[line {line}] Runtime error at '{lexeme}': {message}")]
    Runtime {
        message: String,
        line: usize,
        /// Lexeme of the operator / name / paren responsible.
        lexeme: String,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// ` at 'x'` for ordinary tokens, ` at end` for the EOF marker.
fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl FoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        FoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        FoxError::Parse {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        FoxError::Resolve {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        FoxError::Runtime {
            message,
            line: token.line,
            lexeme: token.lexeme.clone(),
        }
    }

    /// Source line the error points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            FoxError::Lex { line, .. }
            | FoxError::Parse { line, .. }
            | FoxError::Resolve { line, .. }
            | FoxError::Runtime { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The bare message, without the line / location prefix.
    pub fn message(&self) -> String {
        match self {
            FoxError::Lex { message, .. }
            | FoxError::Parse { message, .. }
            | FoxError::Resolve { message, .. }
            | FoxError::Runtime { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, FoxError>;

/// Batch of static errors gathered by the scanner, parser and resolver.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<FoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FoxError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FoxError> {
        self.errors.iter()
    }

    /// Put the errors in source order.  The scanner runs to completion
    /// before the parser starts, so its errors arrive first; the sort is
    /// stable, keeping same-line errors in the order they were found.
    pub fn sort_by_line(&mut self) {
        self.errors
            .sort_by_key(|error| error.line().unwrap_or(usize::MAX));
    }
}

impl Extend<FoxError> for Diagnostics {
    fn extend<I: IntoIterator<Item = FoxError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            write!(f, "{}", error)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_by_line_is_stable() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(FoxError::lex(3, "third a"));
        diagnostics.push(FoxError::lex(1, "first"));
        diagnostics.push(FoxError::lex(3, "third b"));
        diagnostics.push(FoxError::Io(io::Error::new(io::ErrorKind::Other, "disk")));
        diagnostics.push(FoxError::lex(2, "second"));

        diagnostics.sort_by_line();

        let messages: Vec<String> = diagnostics.iter().map(FoxError::message).collect();
        assert_eq!(messages, ["first", "second", "third a", "third b", "disk"]);
    }
}
