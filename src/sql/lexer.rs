//! SQL lexer.
//!
//! The [`Lexer`] converts a SQL string into a stream of [`Token`]s.

use super::error::Span;
use super::token::{Keyword, Token, TokenKind};

/// SQL lexer that tokenizes input strings.
///
/// The lexer implements `Iterator<Item = Token>` and always ends with a single
/// [`TokenKind::Eof`]. It handles:
/// - Keywords (case-insensitive)
/// - Identifiers (unquoted and double-quoted)
/// - Integer literals
/// - String literals (single-quoted with '' escape)
/// - Comments (-- line comments and nested /* */ block comments)
///
/// Lexical errors are returned as `TokenKind::Error` tokens.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    eof_returned: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            eof_returned: false,
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    /// Returns the character at `pos + offset` without consuming it.
    fn peek(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek(0) {
            self.pos += ch.len_utf8();
        }
    }

    /// Advances while `pred` holds for the current character.
    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek(0).is_some_and(&pred) {
            self.bump();
        }
    }

    /// Skips whitespace and comments.
    ///
    /// Returns an error token for an unterminated block comment.
    fn skip_trivia(&mut self) -> Option<Token> {
        loop {
            self.bump_while(char::is_whitespace);

            if self.starts_with("--") {
                self.bump_while(|ch| ch != '\n');
                continue;
            }

            if self.starts_with("/*") {
                let start = self.pos;
                self.pos += 2;
                let mut depth = 1;
                while depth > 0 && !self.is_eof() {
                    if self.starts_with("/*") {
                        depth += 1;
                        self.pos += 2;
                    } else if self.starts_with("*/") {
                        depth -= 1;
                        self.pos += 2;
                    } else {
                        self.bump();
                    }
                }
                if depth > 0 {
                    return Some(Token::new(
                        TokenKind::Error("unterminated block comment".to_string()),
                        Span::new(start, self.pos),
                    ));
                }
                continue;
            }

            return None;
        }
    }

    fn scan_token(&mut self) -> Token {
        if let Some(error) = self.skip_trivia() {
            return error;
        }

        let start = self.pos;
        let Some(ch) = self.peek(0) else {
            return Token::new(TokenKind::Eof, Span::at(start));
        };

        match ch {
            '\'' => self.scan_quoted('\'', "string literal", TokenKind::String),
            '"' => self.scan_quoted('"', "quoted identifier", TokenKind::QuotedIdentifier),
            c if c.is_ascii_digit() => self.scan_integer(),
            c if is_ident_start(c) => self.scan_identifier_or_keyword(),
            _ => self.scan_punctuation(ch),
        }
    }

    /// Scans text between `quote` characters, where a doubled quote escapes itself.
    fn scan_quoted(
        &mut self,
        quote: char,
        what: &str,
        make: impl FnOnce(String) -> TokenKind,
    ) -> Token {
        let start = self.pos;
        self.bump();

        let mut value = String::new();
        loop {
            match self.peek(0) {
                None => {
                    return Token::new(
                        TokenKind::Error(format!("unterminated {}", what)),
                        Span::new(start, self.pos),
                    );
                }
                Some(c) if c == quote => {
                    self.bump();
                    if self.peek(0) == Some(quote) {
                        value.push(quote);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }

        Token::new(make(value), Span::new(start, self.pos))
    }

    fn scan_integer(&mut self) -> Token {
        let start = self.pos;
        self.bump_while(|c| c.is_ascii_digit());

        let span = Span::new(start, self.pos);
        if self.peek(0).is_some_and(|c| c == '.' || is_ident_start(c)) {
            self.bump_while(|c| c == '.' || is_ident_continue(c));
            return Token::new(
                TokenKind::Error("invalid number literal".to_string()),
                Span::new(start, self.pos),
            );
        }

        match self.input[start..self.pos].parse::<u64>() {
            Ok(n) => Token::new(TokenKind::Integer(n), span),
            Err(_) => Token::new(TokenKind::Error("integer out of range".to_string()), span),
        }
    }

    fn scan_identifier_or_keyword(&mut self) -> Token {
        let start = self.pos;
        self.bump_while(is_ident_continue);

        let ident = &self.input[start..self.pos];
        let span = Span::new(start, self.pos);
        match Keyword::parse(ident) {
            Some(kw) => Token::new(TokenKind::Keyword(kw), span),
            // Unquoted identifiers fold to lower case.
            None => Token::new(TokenKind::Identifier(ident.to_ascii_lowercase()), span),
        }
    }

    fn scan_punctuation(&mut self, ch: char) -> Token {
        let start = self.pos;
        self.bump();
        let kind = match ch {
            '-' => TokenKind::Minus,
            '*' => TokenKind::Asterisk,
            '=' => TokenKind::Eq,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            _ => TokenKind::Error(format!("unexpected character '{ch}'")),
        };
        Token::new(kind, Span::new(start, self.pos))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof_returned {
            return None;
        }

        let token = self.scan_token();
        if token.is_eof() {
            self.eof_returned = true;
        }
        Some(token)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
