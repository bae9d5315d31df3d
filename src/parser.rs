//! Recursive-descent parser: token stream to typed syntax tree.
//!
//! Errors are collected rather than propagated: a malformed definition is
//! skipped up to its closing `;` (or end of input) and parsing continues, so
//! a single mistake doesn't hide every diagnostic after it.

use std::rc::Rc;

use crate::ast::{Ast, Program};
use crate::dictionary::Dictionary;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn error(&mut self, kind: DiagnosticKind, token: &Token, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(kind, token.location(), message));
    }

    /// Skip forward to the token after the next `;`, or to EOF — used to
    /// resynchronize after a malformed definition.
    fn recover_to_semicolon(&mut self) {
        while !self.at_eof() {
            if matches!(self.peek().kind, TokenKind::SemicolonMarker) {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    /// Parse the full token stream, registering user definitions in
    /// `dictionary` as their names are seen so self- and forward-references
    /// inside a body resolve while that body is still being parsed.
    pub fn parse(tokens: Vec<Token>, dictionary: &mut Dictionary) -> (Program, Vec<Diagnostic>) {
        let mut parser = Parser::new(tokens);
        let mut program = Program::new();

        while !parser.at_eof() {
            match &parser.peek().kind {
                TokenKind::ColonMarker => {
                    if let Some(def) = parser.parse_definition(dictionary) {
                        program.statements.push(def);
                    }
                }
                TokenKind::Word if parser.peek().lexeme.eq_ignore_ascii_case("VARIABLE") => {
                    parser.advance();
                    if let Some(stmt) = parser.parse_variable_like(dictionary, false) {
                        program.statements.push(stmt);
                    }
                }
                TokenKind::Word if parser.peek().lexeme.eq_ignore_ascii_case("CONSTANT") => {
                    parser.advance();
                    if let Some(stmt) = parser.parse_variable_like(dictionary, true) {
                        program.statements.push(stmt);
                    }
                }
                _ => match parser.parse_statement() {
                    Ok(stmt) => program.statements.push(stmt),
                    Err(()) => {}
                },
            }
        }

        (program, parser.diagnostics)
    }

    fn parse_variable_like(&mut self, dictionary: &mut Dictionary, is_constant: bool) -> Option<Ast> {
        let token = self.peek().clone();
        if !matches!(token.kind, TokenKind::Word) {
            self.error(
                DiagnosticKind::UnexpectedToken,
                &token,
                format!(
                    "expected a name after {}, found '{}'",
                    if is_constant { "CONSTANT" } else { "VARIABLE" },
                    token.lexeme
                ),
            );
            return None;
        }
        self.advance();
        if is_constant {
            dictionary.define_constant(&token.lexeme);
        } else {
            dictionary.define_variable(&token.lexeme);
        }
        Some(Ast::VariableDeclaration {
            name: token.lexeme.clone(),
            is_constant,
            location: token.location(),
        })
    }

    /// `: name ... ;` — the name is registered in the dictionary as a
    /// forward declaration before the body is parsed, so a call to the
    /// word being defined (self-recursion) or to a sibling defined earlier
    /// in the same source resolves normally during analysis.
    fn parse_definition(&mut self, dictionary: &mut Dictionary) -> Option<Ast> {
        let colon = self.advance();
        let name_token = self.peek().clone();
        let name = match &name_token.kind {
            TokenKind::Word => {
                self.advance();
                name_token.lexeme.clone()
            }
            _ => {
                self.error(
                    DiagnosticKind::UnexpectedToken,
                    &name_token,
                    format!("expected a word name after ':', found '{}'", name_token.lexeme),
                );
                self.recover_to_semicolon();
                return None;
            }
        };

        dictionary.define_forward(&name);

        let mut body = Vec::new();
        loop {
            if matches!(self.peek().kind, TokenKind::SemicolonMarker) {
                self.advance();
                let body = Rc::new(body);
                dictionary.resolve_forward(&name, Rc::clone(&body));
                return Some(Ast::WordDefinition {
                    name,
                    body,
                    location: colon.location(),
                });
            }
            if self.at_eof() {
                self.error(
                    DiagnosticKind::MissingSemicolon,
                    &colon,
                    format!("definition '{}' is missing a closing ';'", name),
                );
                return None;
            }
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(()) => {
                    self.recover_to_semicolon();
                    return None;
                }
            }
        }
    }

    /// Parse one statement — a literal, a call, or a control structure —
    /// appearing either at top level or inside a definition/control body.
    fn parse_statement(&mut self) -> Result<Ast, ()> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::Number => {
                self.advance();
                let is_float = token.lexeme.contains('.');
                Ok(Ast::NumberLiteral {
                    text: token.lexeme,
                    is_float,
                    location: token.location(),
                })
            }
            TokenKind::String(is_print) => {
                self.advance();
                Ok(Ast::StringLiteral {
                    text: token.lexeme,
                    is_print: *is_print,
                    location: token.location(),
                })
            }
            TokenKind::MathWord(op) => {
                self.advance();
                Ok(Ast::MathOperation {
                    op: *op,
                    location: token.location(),
                })
            }
            TokenKind::Word => {
                self.advance();
                Ok(Ast::WordCall {
                    name: token.lexeme,
                    location: token.location(),
                })
            }
            TokenKind::If => {
                self.advance();
                self.parse_if(token)
            }
            TokenKind::Begin => {
                self.advance();
                self.parse_begin_until(token)
            }
            TokenKind::Do | TokenKind::Loop => {
                self.advance();
                self.error(
                    DiagnosticKind::UnexpectedToken,
                    &token,
                    format!("'{}' is not supported in a definition body", token.lexeme),
                );
                Err(())
            }
            TokenKind::ColonMarker => {
                self.error(
                    DiagnosticKind::UnexpectedToken,
                    &token,
                    "nested ':' definitions are not allowed",
                );
                Err(())
            }
            TokenKind::Then | TokenKind::Else | TokenKind::Until => {
                self.error(
                    DiagnosticKind::UnexpectedToken,
                    &token,
                    format!("'{}' with no matching opener", token.lexeme),
                );
                Err(())
            }
            TokenKind::SemicolonMarker => {
                self.error(
                    DiagnosticKind::UnexpectedToken,
                    &token,
                    "unexpected ';' with no open definition",
                );
                Err(())
            }
            TokenKind::Eof => Err(()),
            TokenKind::Unknown | TokenKind::ThreadWord => {
                self.error(
                    DiagnosticKind::InvalidLexeme,
                    &token,
                    format!("unrecognized token '{}'", token.lexeme),
                );
                self.advance();
                Err(())
            }
        }
    }

    /// `IF ... THEN` or `IF ... ELSE ... THEN`.
    fn parse_if(&mut self, if_token: Token) -> Result<Ast, ()> {
        let mut then_branch = Vec::new();
        let mut else_branch: Option<Vec<Ast>> = None;
        let mut in_else = false;

        loop {
            match &self.peek().kind {
                TokenKind::Then => {
                    self.advance();
                    return Ok(Ast::IfStatement {
                        then_branch,
                        else_branch,
                        location: if_token.location(),
                    });
                }
                TokenKind::Else if !in_else => {
                    self.advance();
                    in_else = true;
                    else_branch = Some(Vec::new());
                }
                TokenKind::Eof => {
                    self.error(
                        DiagnosticKind::MissingThen,
                        &if_token,
                        "IF is missing a matching THEN",
                    );
                    return Err(());
                }
                _ => match self.parse_statement() {
                    Ok(stmt) => {
                        if in_else {
                            else_branch.as_mut().unwrap().push(stmt);
                        } else {
                            then_branch.push(stmt);
                        }
                    }
                    Err(()) => {
                        return Err(());
                    }
                },
            }
        }
    }

    /// `BEGIN ... UNTIL`.
    fn parse_begin_until(&mut self, begin_token: Token) -> Result<Ast, ()> {
        let mut body = Vec::new();

        loop {
            match &self.peek().kind {
                TokenKind::Until => {
                    self.advance();
                    return Ok(Ast::BeginUntilLoop {
                        body,
                        location: begin_token.location(),
                    });
                }
                TokenKind::Eof => {
                    self.error(
                        DiagnosticKind::MissingUntil,
                        &begin_token,
                        "BEGIN is missing a matching UNTIL",
                    );
                    return Err(());
                }
                _ => match self.parse_statement() {
                    Ok(stmt) => body.push(stmt),
                    Err(()) => {
                        return Err(());
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::BuiltinConfig;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> (Program, Vec<Diagnostic>, Dictionary) {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let mut dict = Dictionary::with_builtins(BuiltinConfig::Standard);
        let (program, diags) = Parser::parse(tokens, &mut dict);
        (program, diags, dict)
    }

    #[test]
    fn parses_simple_definition() {
        let (program, diags, dict) = parse(": double 2 * ;");
        assert!(diags.is_empty());
        assert_eq!(program.statements.len(), 1);
        assert!(dict.lookup("double").is_some());
    }

    #[test]
    fn parses_if_else_then() {
        let (program, diags, _) = parse(": abs dup 0 < IF negate THEN ;");
        assert!(diags.is_empty());
        match &program.statements[0] {
            Ast::WordDefinition { body, .. } => {
                assert!(matches!(body[2], Ast::IfStatement { .. }));
            }
            _ => panic!("expected a word definition"),
        }
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let (_, diags, _) = parse(": broken 1 2 +");
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::MissingSemicolon));
    }

    #[test]
    fn missing_then_is_reported_and_recovers() {
        let (program, diags, _) = parse(": a dup IF 1 ; : b 2 ;");
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::MissingThen));
        assert!(program.definitions().any(|(name, _, _)| name == "B"));
    }

    #[test]
    fn variable_and_constant_declarations() {
        let (program, diags, dict) = parse("VARIABLE COUNTER 10 CONSTANT LIMIT");
        assert!(diags.is_empty());
        assert_eq!(program.statements.len(), 3);
        assert!(dict.lookup("counter").is_some());
        assert!(dict.lookup("limit").is_some());
    }

    #[test]
    fn self_recursive_definition_resolves_forward_reference() {
        let (_, diags, dict) = parse(": countdown dup 0 = IF drop ELSE dup countdown THEN ;");
        assert!(diags.is_empty());
        assert!(dict.lookup("countdown").unwrap().body.is_some());
    }
}
