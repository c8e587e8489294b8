//! Lexer for Quill expression text.

use crate::diagnostic::Diagnostic;
use crate::error::SemanticError;
use crate::span::{FileId, Span};

/// Kind of a token produced by the lexer.
///
/// The lexer only classifies shapes. Whether a literal is a string, a
/// char or a number is decided later by the literal evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Ident,
    DataType, // i8 .. f64, bool, str, any
    Literal,  // "..", `..`, '..', numbers, true, false, nil

    Operator,

    // Punctuation
    LParen,      // (
    RParen,      // )
    LBrace,      // {
    RBrace,      // }
    LBracket,    // [
    RBracket,    // ]
    Comma,       // ,
    Semi,        // ;
    Colon,       // :
    DoubleColon, // ::
    Dot,         // .

    // Keywords
    SelfKw,
    Return,
}

/// A single token with its kind, source text and span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    pub fn is_open_brace(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket
        )
    }

    pub fn is_close_brace(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket
        )
    }
}

/// Result of lexing a source text.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LexResult {
    /// Tokens without the trailing `Eof` marker.
    pub fn significant(&self) -> &[Token] {
        match self.tokens.last() {
            Some(last) if last.kind == TokenKind::Eof => &self.tokens[..self.tokens.len() - 1],
            _ => &self.tokens,
        }
    }
}

const PRIMITIVE_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "int", "uint", "uintptr", "f32", "f64",
    "bool", "str", "any",
];

// Longest operators first so that `<<` wins over `<`.
const OPERATORS: &[&str] = &[
    "...", "<<", ">>", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "&", "|", "^",
    "~", "!", "<", ">", "=",
];

/// Lex a source string into tokens.
pub fn lex(file_id: FileId, source: &str) -> LexResult {
    let mut lexer = Lexer {
        file_id,
        source,
        chars: source.as_bytes(),
        index: 0,
        line: 1,
        line_start: 0,
        diagnostics: Vec::new(),
    };
    lexer.run()
}

struct Lexer<'src> {
    file_id: FileId,
    source: &'src str,
    chars: &'src [u8],
    index: usize,
    line: u32,
    line_start: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> LexResult {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }
            if ch == b'/' && self.peek_next() == Some(b'/') {
                self.skip_line_comment();
                continue;
            }

            let start = self.index;
            let token = match ch {
                b'(' => self.punct(TokenKind::LParen, start, 1),
                b')' => self.punct(TokenKind::RParen, start, 1),
                b'{' => self.punct(TokenKind::LBrace, start, 1),
                b'}' => self.punct(TokenKind::RBrace, start, 1),
                b'[' => self.punct(TokenKind::LBracket, start, 1),
                b']' => self.punct(TokenKind::RBracket, start, 1),
                b',' => self.punct(TokenKind::Comma, start, 1),
                b';' => self.punct(TokenKind::Semi, start, 1),
                b':' => {
                    if self.peek_next() == Some(b':') {
                        self.punct(TokenKind::DoubleColon, start, 2)
                    } else {
                        self.punct(TokenKind::Colon, start, 1)
                    }
                }
                b'.' => {
                    if self.source[start..].starts_with("...") {
                        self.punct(TokenKind::Operator, start, 3)
                    } else {
                        self.punct(TokenKind::Dot, start, 1)
                    }
                }
                b'"' | b'`' | b'\'' => self.lex_quoted(start, ch),
                b'0'..=b'9' => self.lex_number(start),
                _ if is_ident_start(ch) => self.lex_ident_or_keyword(start),
                _ => match OPERATORS.iter().find(|op| self.source[start..].starts_with(**op)) {
                    Some(op) => self.punct(TokenKind::Operator, start, op.len()),
                    None => self.unexpected_char(start),
                },
            };

            if let Some(tok) = token {
                tokens.push(tok);
            }
        }

        let eof_span = self.span(self.chars.len(), self.chars.len());
        tokens.push(Token::new(TokenKind::Eof, "", eof_span));

        LexResult {
            tokens,
            diagnostics: std::mem::take(&mut self.diagnostics),
        }
    }

    fn span(&self, start: usize, end: usize) -> Span {
        let column = start.saturating_sub(self.line_start) as u32 + 1;
        Span::new(self.file_id, start as u32, end as u32).with_position(self.line, column)
    }

    fn punct(&mut self, kind: TokenKind, start: usize, len: usize) -> Option<Token> {
        for _ in 0..len {
            self.consume_char();
        }
        Some(Token::new(
            kind,
            &self.source[start..self.index],
            self.span(start, self.index),
        ))
    }

    fn unexpected_char(&mut self, start: usize) -> Option<Token> {
        let ch = self.source[start..].chars().next().unwrap_or('\0');
        for _ in 0..ch.len_utf8().max(1) {
            self.consume_char();
        }
        let diag = Diagnostic::error(SemanticError::UnexpectedChar(ch), self.span(start, self.index))
            .with_code("E0001");
        self.diagnostics.push(diag);
        None
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' {
                break;
            }
            self.consume_char();
        }
    }

    /// Strings (`"` and raw `` ` ``) and chars (`'`). The token text keeps
    /// its quotes; the literal evaluator decodes it.
    fn lex_quoted(&mut self, start: usize, quote: u8) -> Option<Token> {
        self.consume_char();
        while let Some(ch) = self.peek_char() {
            match ch {
                _ if ch == quote => {
                    self.consume_char();
                    return Some(Token::new(
                        TokenKind::Literal,
                        &self.source[start..self.index],
                        self.span(start, self.index),
                    ));
                }
                b'\\' if quote != b'`' => {
                    self.consume_char();
                    if self.peek_char().is_some() {
                        self.consume_char();
                    }
                }
                b'\n' if quote != b'`' => break,
                _ => self.consume_char(),
            }
        }

        let diag = Diagnostic::error(SemanticError::UnterminatedLiteral, self.span(start, self.index))
            .with_code("E0002");
        self.diagnostics.push(diag);
        None
    }

    fn lex_number(&mut self, start: usize) -> Option<Token> {
        let prefixed = self.peek_char() == Some(b'0')
            && matches!(self.peek_next(), Some(b'x' | b'X' | b'b' | b'B'));
        if prefixed {
            self.consume_char();
            self.consume_char();
            while let Some(ch) = self.peek_char() {
                if ch.is_ascii_hexdigit() || ch == b'_' {
                    self.consume_char();
                } else {
                    break;
                }
            }
        } else {
            self.consume_digits();
            // Only a digit after the dot makes a float; `1.max` stays member access.
            if self.peek_char() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit())
            {
                self.consume_char();
                self.consume_digits();
            }
            if matches!(self.peek_char(), Some(b'e' | b'E')) {
                let sign = matches!(self.peek_next(), Some(b'+' | b'-'));
                let digit_at = if sign { self.index + 2 } else { self.index + 1 };
                if self.chars.get(digit_at).is_some_and(u8::is_ascii_digit) {
                    self.consume_char();
                    if sign {
                        self.consume_char();
                    }
                    self.consume_digits();
                }
            }
        }

        Some(Token::new(
            TokenKind::Literal,
            &self.source[start..self.index],
            self.span(start, self.index),
        ))
    }

    fn consume_digits(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() || ch == b'_' {
                self.consume_char();
            } else {
                break;
            }
        }
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Option<Token> {
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.index];
        let kind = match text {
            "self" => TokenKind::SelfKw,
            "return" => TokenKind::Return,
            "true" | "false" | "nil" => TokenKind::Literal,
            _ if PRIMITIVE_TYPES.contains(&text) => TokenKind::DataType,
            _ => TokenKind::Ident,
        };

        Some(Token::new(kind, text, self.span(start, self.index)))
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if let Some(&ch) = self.chars.get(self.index) {
            self.index += 1;
            if ch == b'\n' {
                self.line += 1;
                self.line_start = self.index;
            }
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        lex(FileId(0), source)
            .tokens
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn lexes_operators_longest_first() {
        let toks = kinds("a<<b <= c...");
        let texts: Vec<&str> = toks.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["a", "<<", "b", "<=", "c", "...", ""]);
    }

    #[test]
    fn classifies_types_and_literals() {
        let toks = kinds("i32 x 0x1F 1.5e3 'a' \"s\" `r` nil self");
        let got: Vec<TokenKind> = toks.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            got,
            vec![
                TokenKind::DataType,
                TokenKind::Ident,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::SelfKw,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn member_access_on_integer_is_not_a_float() {
        let toks = kinds("1.max");
        assert_eq!(toks[0], (TokenKind::Literal, "1".to_string()));
        assert_eq!(toks[1].0, TokenKind::Dot);
    }

    #[test]
    fn tracks_lines_and_columns() {
        let result = lex(FileId(0), "a\n  b");
        let b = &result.tokens[1];
        assert_eq!((b.span.line, b.span.column), (2, 3));
    }

    #[test]
    fn reports_unterminated_string() {
        let result = lex(FileId(0), "\"abc");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some("E0002"));
    }

    #[test]
    fn reports_unexpected_character() {
        let result = lex(FileId(0), "a @ b");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.significant().len(), 2);
    }
}
