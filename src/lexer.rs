//! Lexical analyzer: turns source text into a stream of classified tokens.

use crate::error::{LexError, LexResult};
use crate::token::{MathOp, SourceLocation, Token, TokenKind};

/// Scans one source buffer into tokens, tracking 1-based line/column.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input[self.position..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '\n' {
                break;
            }
        }
    }

    /// `( ... )` — only opens a comment when `(` is followed by whitespace,
    /// matching the convention that `(` used as a bare word (rare, but legal
    /// as a lexeme) isn't swallowed.
    fn skip_paren_comment(&mut self) -> LexResult<()> {
        let start = self.location();
        self.advance(); // consume '('
        loop {
            match self.advance() {
                Some(')') => return Ok(()),
                Some(_) => continue,
                None => {
                    return Err(LexError::UnterminatedString {
                        line: start.line,
                        column: start.column,
                    })
                }
            }
        }
    }

    /// `." ... "` — a print-string: opener word `."` must be followed by a
    /// space, then literal characters up to the closing `"`.
    fn scan_print_string(&mut self, start: SourceLocation) -> LexResult<Token> {
        self.advance(); // consume the space after `."`
        let mut value = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::new(TokenKind::String(true), value, start.line, start.column));
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
                None => {
                    return Err(LexError::UnterminatedString {
                        line: start.line,
                        column: start.column,
                    })
                }
            }
        }
    }

    fn scan_literal_string(&mut self, start: SourceLocation) -> LexResult<Token> {
        self.advance(); // consume opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::new(TokenKind::String(false), value, start.line, start.column));
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
                None => {
                    return Err(LexError::UnterminatedString {
                        line: start.line,
                        column: start.column,
                    })
                }
            }
        }
    }

    fn scan_number(&mut self, first_char: char, start: SourceLocation) -> LexResult<Token> {
        let mut text = String::new();
        text.push(first_char);
        let mut seen_dot = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let digits_only: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits_only.is_empty() {
            return Err(LexError::InvalidNumber {
                text,
                line: start.line,
                column: start.column,
            });
        }

        Ok(Token::new(TokenKind::Number, text, start.line, start.column))
    }

    fn is_word_boundary(ch: char) -> bool {
        ch.is_whitespace() || ch == '"' || ch == '\\' || ch == '(' || ch == ')'
    }

    fn scan_word(&mut self, first_char: char, start: SourceLocation) -> Token {
        let mut text = String::new();
        text.push(first_char);

        while let Some(ch) = self.peek() {
            if Self::is_word_boundary(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }

        let upper = text.to_ascii_uppercase();
        let kind = match upper.as_str() {
            "IF" => TokenKind::If,
            "THEN" => TokenKind::Then,
            "ELSE" => TokenKind::Else,
            "BEGIN" => TokenKind::Begin,
            "UNTIL" => TokenKind::Until,
            "DO" => TokenKind::Do,
            "LOOP" => TokenKind::Loop,
            _ => match MathOp::from_uppercase(&upper) {
                Some(op) => TokenKind::MathWord(op),
                None => TokenKind::Word,
            },
        };

        Token::new(kind, text, start.line, start.column)
    }

    /// Produce the next token, or `Eof` once input is exhausted.
    pub fn next_token(&mut self) -> LexResult<Token> {
        self.skip_whitespace();
        let start = self.location();

        match self.peek() {
            None => Ok(Token::new(TokenKind::Eof, "", start.line, start.column)),
            Some(':') => {
                self.advance();
                Ok(Token::new(TokenKind::ColonMarker, ":", start.line, start.column))
            }
            Some(';') => {
                self.advance();
                Ok(Token::new(
                    TokenKind::SemicolonMarker,
                    ";",
                    start.line,
                    start.column,
                ))
            }
            Some('\\') => {
                self.skip_line_comment();
                self.next_token()
            }
            Some('(') if self.peek_at(1).map(|c| c.is_whitespace()).unwrap_or(false) => {
                self.skip_paren_comment()?;
                self.next_token()
            }
            Some('"') => self.scan_literal_string(start),
            Some('.') if self.peek_at(1) == Some('"') => {
                self.advance();
                self.advance();
                self.scan_print_string(start)
            }
            Some('-') => {
                self.advance();
                match self.peek() {
                    Some(ch) if ch.is_ascii_digit() => self.scan_number('-', start),
                    _ => Ok(self.scan_word('-', start)),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.scan_number_or_word(ch, start),
            Some(ch) => {
                if !ch.is_ascii_graphic() {
                    self.advance();
                    return Err(LexError::InvalidCharacter {
                        ch,
                        line: start.line,
                        column: start.column,
                    });
                }
                self.advance();
                Ok(self.scan_word(ch, start))
            }
        }
    }

    /// A leading digit may start a number (`2`, `3.14`) or a word that merely
    /// begins with a digit (`2DUP`, `2SWAP`) — decide by looking one
    /// character ahead before committing.
    fn scan_number_or_word(&mut self, first_char: char, start: SourceLocation) -> LexResult<Token> {
        let saved_position = self.position;
        let saved_line = self.line;
        let saved_column = self.column;
        self.advance();

        let is_word = match self.peek() {
            Some(next) => !next.is_ascii_digit() && !Self::is_word_boundary(next) && next != '.',
            None => false,
        };

        if is_word {
            self.position = saved_position;
            self.line = saved_line;
            self.column = saved_column;
            self.advance();
            Ok(self.scan_word(first_char, start))
        } else {
            self.position = saved_position;
            self.line = saved_line;
            self.column = saved_column;
            self.advance();
            self.scan_number(first_char, start)
        }
    }

    /// Scan the whole input, collecting tokens up to and including `Eof`.
    /// A hard lexer error aborts scanning immediately (§7: invalid
    /// character, invalid number, unterminated string are unrecoverable).
    pub fn tokenize(&mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn simple_definition() {
        let ks = kinds(": double 2 * ;");
        assert_eq!(
            ks,
            vec![
                TokenKind::ColonMarker,
                TokenKind::Word,
                TokenKind::Number,
                TokenKind::MathWord(MathOp::Mul),
                TokenKind::SemicolonMarker,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn block_comment_is_skipped() {
        let ks = kinds(": square ( n -- n*n ) dup * ;");
        assert!(matches!(ks[0], TokenKind::ColonMarker));
        assert!(ks.contains(&TokenKind::MathWord(MathOp::Dup)));
    }

    #[test]
    fn line_comment_is_skipped() {
        let ks = kinds("1 \\ trailing remark\n2 +");
        assert_eq!(
            ks,
            vec![
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::MathWord(MathOp::Add),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn print_string_literal() {
        let source = ".\" hello world\"";
        let tokens = Lexer::new(source).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String(true));
        assert_eq!(tokens[0].lexeme, "hello world");
    }

    #[test]
    fn literal_string_is_not_a_print_string() {
        let tokens = Lexer::new("\"stored value\"").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String(false));
        assert_eq!(tokens[0].lexeme, "stored value");
    }

    #[test]
    fn digit_prefixed_words() {
        let ks = kinds("2dup 2drop 2swap");
        assert_eq!(
            ks,
            vec![
                TokenKind::MathWord(MathOp::TwoDup),
                TokenKind::MathWord(MathOp::TwoDrop),
                TokenKind::MathWord(MathOp::TwoSwap),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn bare_minus_is_a_word() {
        let ks = kinds("- -5");
        assert_eq!(ks[0], TokenKind::MathWord(MathOp::Sub));
        assert_eq!(ks[1], TokenKind::Number);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lexer = Lexer::new("\"unterminated");
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn control_keywords_recognized_case_insensitively() {
        let ks = kinds("if ELSE then Begin until");
        assert_eq!(
            ks,
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Then,
                TokenKind::Begin,
                TokenKind::Until,
                TokenKind::Eof,
            ]
        );
    }
}
