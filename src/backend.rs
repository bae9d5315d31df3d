//! Backend contract.
//!
//! Everything downstream of the dictionary and analyzer — code emission,
//! an AST pretty-printer, a bytecode assembler — is an external
//! collaborator. This crate only defines the seam it plugs into: a visitor
//! called once per node of an already-analyzed program. A backend reads the
//! tree and the resolved `Dictionary`; it never mutates either.

use crate::ast::Ast;
use crate::dictionary::Dictionary;

/// One callback per syntax-tree node variant. Implementors consume a fully
/// parsed and analyzed `Program`/`Dictionary` pair; they do not see
/// diagnostics (a caller should stop before handing analysis results to a
/// backend if analysis produced any errors).
pub trait Backend {
    type Output;
    type Error;

    fn visit_word_definition(
        &mut self,
        name: &str,
        body: &[Ast],
        dictionary: &Dictionary,
    ) -> Result<(), Self::Error>;

    fn visit_word_call(&mut self, name: &str, dictionary: &Dictionary) -> Result<(), Self::Error>;

    fn visit_number_literal(&mut self, text: &str, is_float: bool) -> Result<(), Self::Error>;

    fn visit_string_literal(&mut self, text: &str, is_print: bool) -> Result<(), Self::Error>;

    fn visit_if_statement(
        &mut self,
        then_branch: &[Ast],
        else_branch: Option<&[Ast]>,
        dictionary: &Dictionary,
    ) -> Result<(), Self::Error>;

    fn visit_begin_until_loop(&mut self, body: &[Ast], dictionary: &Dictionary) -> Result<(), Self::Error>;

    fn visit_math_operation(&mut self, op: crate::token::MathOp) -> Result<(), Self::Error>;

    fn visit_variable_declaration(&mut self, name: &str, is_constant: bool) -> Result<(), Self::Error>;

    /// Called after every top-level statement has been visited, to let an
    /// implementor assemble its final output.
    fn finish(self) -> Result<Self::Output, Self::Error>;
}

/// Walk `nodes` in order, dispatching each to the matching `Backend` method.
/// A concrete backend calls this once per definition body and once for the
/// top-level program statements.
pub fn walk<B: Backend>(nodes: &[Ast], dictionary: &Dictionary, backend: &mut B) -> Result<(), B::Error> {
    for node in nodes {
        match node {
            Ast::WordDefinition { name, body, .. } => {
                backend.visit_word_definition(name, body, dictionary)?;
            }
            Ast::WordCall { name, .. } => backend.visit_word_call(name, dictionary)?,
            Ast::NumberLiteral { text, is_float, .. } => {
                backend.visit_number_literal(text, *is_float)?;
            }
            Ast::StringLiteral { text, is_print, .. } => {
                backend.visit_string_literal(text, *is_print)?;
            }
            Ast::IfStatement {
                then_branch,
                else_branch,
                ..
            } => backend.visit_if_statement(then_branch, else_branch.as_deref(), dictionary)?,
            Ast::BeginUntilLoop { body, .. } => backend.visit_begin_until_loop(body, dictionary)?,
            Ast::MathOperation { op, .. } => backend.visit_math_operation(*op)?,
            Ast::VariableDeclaration {
                name, is_constant, ..
            } => backend.visit_variable_declaration(name, *is_constant)?,
            Ast::Program(_) => {}
        }
    }
    Ok(())
}
