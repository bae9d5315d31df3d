//! Error and diagnostic types for the compiler core.

use thiserror::Error;

use crate::token::SourceLocation;

/// Hard lexer failures halt lexing outright (§7: invalid character, invalid
/// number, unterminated string).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("invalid character '{ch}' at line {line}, column {column}")]
    InvalidCharacter { ch: char, line: usize, column: usize },

    #[error("invalid numeric literal '{text}' at line {line}, column {column}")]
    InvalidNumber {
        text: String,
        line: usize,
        column: usize,
    },

    #[error("unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
}

impl LexError {
    pub fn location(&self) -> SourceLocation {
        match self {
            LexError::InvalidCharacter { line, column, .. }
            | LexError::InvalidNumber { line, column, .. }
            | LexError::UnterminatedString { line, column } => {
                SourceLocation::new(*line, *column)
            }
        }
    }
}

pub type LexResult<T> = Result<T, LexError>;

/// Discriminates the kind of a recorded diagnostic without re-parsing its message.
/// Mirrors the error-kind table in §7 of the compiler's error-handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnexpectedToken,
    MissingSemicolon,
    MissingThen,
    MissingUntil,
    UnclosedControlStructure,
    UndefinedWord,
    StackUnderflow,
    IfElseDepthMismatch,
    UnbalancedLoopBody,
    AnalyzerNonConvergence,
    InvalidLexeme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single compiler diagnostic, positioned for the caller to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            line: location.line,
            column: location.column,
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            line: location.line,
            column: location.column,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{} at line {}, column {}: {}",
            label, self.line, self.column, self.message
        )
    }
}
