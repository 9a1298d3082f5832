//! Error types shared across the lexer, parser, engine, and WAT generator.
//!
//! Each subsystem gets its own `thiserror`-derived enum; all of them render
//! to the `"<phase>: at line L, column C: <description>"` single-line form
//! the driver prints to the user.

use thiserror::Error;

/// Lexical errors: bad characters, malformed variables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("at line {line}, column {column}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, line: u32, column: u32 },

    #[error("at line {line}, column {column}: '$' must be followed by digits")]
    BareDollar { line: u32, column: u32 },
}

/// Parse errors: every one carries the position of the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        ParseError {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Errors raised while evaluating the fixpoint or resolving a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("at line {line}, column {column}: rule body references unbound variable ${var}")]
    UnboundVariable { var: u32, line: u32, column: u32 },

    #[error("at line {line}, column {column}: rule body must start with SCAN")]
    FirstOpNotScan { line: u32, column: u32 },

    #[error("at line {line}, column {column}: register file exhausted (more than {capacity} variables bound in one rule)")]
    RegisterFileExhausted { capacity: usize, line: u32, column: u32 },

    #[error("fixpoint did not converge within {max_passes} passes")]
    NotConverged { max_passes: u32 },

    #[error("internal engine error: {0}")]
    Internal(String),
}

/// Errors raised while lowering a program to WAT.
#[derive(Debug, Error)]
pub enum WatError {
    #[error("failed to write WAT output: {0}")]
    Write(#[from] std::io::Error),

    #[error("query references relation '{relation}', which was never interned")]
    UnknownRelation { relation: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_formats_per_spec() {
        let err = ParseError::new("expected REL, FACT, RULE, SOLVE, or QUERY", 3, 1);
        assert_eq!(
            err.to_string(),
            "at line 3, column 1: expected REL, FACT, RULE, SOLVE, or QUERY"
        );
    }

    #[test]
    fn engine_error_carries_position() {
        let err = EngineError::UnboundVariable {
            var: 4,
            line: 7,
            column: 12,
        };
        assert!(err.to_string().contains("line 7"));
        assert!(err.to_string().contains("$4"));
    }
}
