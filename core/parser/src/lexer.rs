//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans a raw formula string and produces a flat sequence of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It is also used on its own
//! by the dependency graph, which only needs the CELL and RANGE tokens of a formula.
//!
//! RULES:
//! - A leading '=' is stripped before scanning.
//! - Digits and '.' form a NUMBER run (signs are prefix operators, not part of the number).
//! - Letters followed immediately by '(' form a FUNCTION; otherwise letters plus digits form
//!   a CELL, which becomes a RANGE when followed by ':' and a second letter/digit run.
//! - Double-quoted text is a STRING; `\"` escapes a quote; an unterminated string runs to
//!   the end of input.
//! - Operators: + - * / ^ = < > & and the two-character forms <= >= <>.
//! - Any other character is skipped silently.

use crate::token::{Token, TokenKind};
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    /// Character offset of the next unread character.
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over a formula. The leading '=' (if any) is not part of the token stream.
    pub fn new(formula: &'a str) -> Self {
        let body = formula.strip_prefix('=').unwrap_or(formula);
        Lexer {
            input: body.chars().peekable(),
            position: 0,
        }
    }

    /// Consumes the lexer and returns every token, terminated by a single EOF token.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            let start = self.position;

            let ch = match self.input.peek() {
                Some(&ch) => ch,
                None => return Token::new(TokenKind::Eof, "", start),
            };

            match ch {
                c if c.is_ascii_digit() => return self.read_number(),
                '"' => return self.read_string(),
                c if c.is_ascii_alphabetic() => {
                    if self.letters_precede_paren() {
                        return self.read_function();
                    }
                    return self.read_cell_or_range();
                }
                '+' | '-' | '*' | '/' | '^' | '&' => {
                    self.bump();
                    return Token::new(TokenKind::Operator, ch.to_string(), start);
                }
                '=' => {
                    self.bump();
                    // "==" is one token; no grammar level accepts it.
                    return match self.input.peek() {
                        Some('=') => {
                            self.bump();
                            Token::new(TokenKind::Operator, "==", start)
                        }
                        _ => Token::new(TokenKind::Operator, "=", start),
                    };
                }
                '<' => {
                    self.bump();
                    return match self.input.peek() {
                        Some('=') => {
                            self.bump();
                            Token::new(TokenKind::Operator, "<=", start)
                        }
                        Some('>') => {
                            self.bump();
                            Token::new(TokenKind::Operator, "<>", start)
                        }
                        _ => Token::new(TokenKind::Operator, "<", start),
                    };
                }
                '>' => {
                    self.bump();
                    return match self.input.peek() {
                        Some('=') => {
                            self.bump();
                            Token::new(TokenKind::Operator, ">=", start)
                        }
                        _ => Token::new(TokenKind::Operator, ">", start),
                    };
                }
                '(' => {
                    self.bump();
                    return Token::new(TokenKind::LParen, "(", start);
                }
                ')' => {
                    self.bump();
                    return Token::new(TokenKind::RParen, ")", start);
                }
                ',' => {
                    self.bump();
                    return Token::new(TokenKind::Comma, ",", start);
                }
                // Unknown character: dropped, scanning continues.
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.input.next();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    /// Looks past the current run of letters without consuming it and reports whether
    /// the run is immediately followed by '('.
    fn letters_precede_paren(&self) -> bool {
        let mut ahead = self.input.clone();
        while let Some(&ch) = ahead.peek() {
            if !ch.is_ascii_alphabetic() {
                break;
            }
            ahead.next();
        }
        ahead.peek() == Some(&'(')
    }

    fn read_number(&mut self) -> Token {
        let start = self.position;
        let mut text = String::new();
        while let Some(&ch) = self.input.peek() {
            if !(ch.is_ascii_digit() || ch == '.') {
                break;
            }
            text.push(ch);
            self.bump();
        }
        Token::new(TokenKind::Number, text, start)
    }

    fn read_string(&mut self) -> Token {
        let start = self.position;
        let mut text = String::new();
        self.bump(); // opening quote

        while let Some(ch) = self.bump() {
            match ch {
                '\\' if self.input.peek() == Some(&'"') => {
                    self.bump();
                    text.push('"');
                }
                '"' => break,
                other => text.push(other),
            }
        }

        Token::new(TokenKind::String, text, start)
    }

    fn read_function(&mut self) -> Token {
        let start = self.position;
        let name = self.take_while(|c| c.is_ascii_alphabetic());
        Token::new(TokenKind::Function, name, start)
    }

    fn read_cell_or_range(&mut self) -> Token {
        let start = self.position;
        let mut text = self.take_while(|c| c.is_ascii_alphabetic());
        text.push_str(&self.take_while(|c| c.is_ascii_digit()));

        if self.input.peek() == Some(&':') {
            self.bump();
            text.push(':');
            text.push_str(&self.take_while(|c| c.is_ascii_alphanumeric()));
            return Token::new(TokenKind::Range, text, start);
        }

        Token::new(TokenKind::Cell, text, start)
    }

    /// Consumes characters while `keep` holds, returning them uppercased.
    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.input.peek() {
            if !keep(ch) {
                break;
            }
            text.push(ch.to_ascii_uppercase());
            self.bump();
        }
        text
    }
}

/// Convenience function: tokenizes a formula (leading '=' optional) into a token sequence
/// terminated by EOF.
pub fn tokenize(formula: &str) -> Vec<Token> {
    Lexer::new(formula).tokenize()
}
