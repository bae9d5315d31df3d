//! Front-end compiler core for a stack-based, Forth-like language.
//!
//! Covers lexing, parsing, the dictionary of known names, and stack-effect
//! inference. Code generation, an AST pretty-printer, and file I/O are left
//! to external collaborators — see [`backend`] for the seam they plug into.

pub mod analyzer;
pub mod ast;
pub mod backend;
pub mod dictionary;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use analyzer::analyze;
pub use ast::{Ast, Program, StackEffect};
pub use dictionary::{BuiltinConfig, Dictionary, DictionaryEntry, EntryKind};
pub use error::{Diagnostic, DiagnosticKind, LexError, Severity};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{MathOp, SourceLocation, Token, TokenKind};

/// Result of running the full front end over one source buffer.
#[derive(Debug)]
pub struct CompileUnit {
    pub program: Program,
    pub dictionary: Dictionary,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileUnit {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Run the lexer, parser, and analyzer over `source`, seeding the
/// dictionary with the given built-in configuration.
pub fn compile(source: &str, builtins: BuiltinConfig) -> Result<CompileUnit, LexError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut dictionary = Dictionary::with_builtins(builtins);
    let (program, mut diagnostics) = Parser::parse(tokens, &mut dictionary);
    diagnostics.extend(analyze(&program, &mut dictionary));

    Ok(CompileUnit {
        program,
        dictionary,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_pipeline_on_a_simple_definition() {
        let unit = compile(": double 2 * ;", BuiltinConfig::Standard).unwrap();
        assert!(!unit.has_errors());
        assert_eq!(unit.dictionary.effect_of("double").unwrap(), StackEffect::new(1, 1, true));
    }

    #[test]
    fn lexer_errors_short_circuit_compilation() {
        let result = compile("\"unterminated", BuiltinConfig::Standard);
        assert!(result.is_err());
    }
}
