//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a token sequence into an expression tree.
//! CONTEXT: This is the second stage of the parsing pipeline. It takes tokens
//! from the Lexer and builds an Expression tree that the evaluator walks.
//!
//! GRAMMAR (lowest precedence first):
//!   expression     --> comparison
//!   comparison     --> additive ( ("=" | "<>" | "<" | ">" | "<=" | ">=") additive )*
//!   additive       --> multiplicative ( ("+" | "-" | "&") multiplicative )*
//!   multiplicative --> exponent ( ("*" | "/") exponent )*
//!   exponent       --> unary ( "^" unary )*          (folds left: 2^3^2 = 64)
//!   unary          --> "-" unary | "+" unary | primary
//!   primary        --> NUMBER | STRING | CELL | RANGE | function_call | "(" expression ")"
//!   function_call  --> FUNCTION "(" arguments? ")"
//!   arguments      --> expression ("," expression)*
//!
//! Tokens left after a complete expression are ignored, so `=1 2` parses as `1`.

use crate::ast::{BinaryOperator, Expression, UnaryOperator, Value};
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};
use thiserror::Error;

/// Parser errors with descriptive messages.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("Parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Character offset of the offending token in the formula body.
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// The Parser holds the token sequence and a cursor into it.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Creates a parser over an already-lexed token sequence.
    /// A missing trailing EOF token is supplied.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let offset = tokens.last().map(|t| t.offset + t.text.chars().count()).unwrap_or(0);
            tokens.push(Token::new(TokenKind::Eof, "", offset));
        }
        Parser {
            tokens,
            position: 0,
        }
    }

    /// Parses one expression from the start of the token sequence.
    pub fn parse(&mut self) -> ParseResult<Expression> {
        self.parse_comparison()
    }

    fn current(&self) -> &Token {
        // `new` guarantees a trailing EOF and the cursor never moves past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    /// Checks that the current token has the expected kind and consumes it.
    fn expect(&mut self, expected: TokenKind) -> ParseResult<()> {
        let token = self.current();
        if token.kind == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(
                format!("Expected {}, found {}", expected, token.kind),
                token.offset,
            ))
        }
    }

    /// Returns the operator text of the current token, if it is an operator.
    fn current_operator(&self) -> Option<&str> {
        let token = self.current();
        (token.kind == TokenKind::Operator).then_some(token.text.as_str())
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive()?;

        while let Some(op) = self.current_operator().and_then(BinaryOperator::comparison) {
            self.advance();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative()?;

        while let Some(op) = self.current_operator().and_then(BinaryOperator::additive) {
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_exponent()?;

        while let Some(op) = self.current_operator().and_then(BinaryOperator::multiplicative) {
            self.advance();
            let right = self.parse_exponent()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;

        while self.current().is_operator("^") {
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, BinaryOperator::Power, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if self.current().is_operator("-") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        if self.current().is_operator("+") {
            self.advance();
            return self.parse_unary();
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let token = self.current().clone();

        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expression::Literal(Value::Number(number_prefix(&token.text))))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expression::Literal(Value::String(token.text)))
            }
            TokenKind::Cell => {
                self.advance();
                Ok(Expression::CellRef(token.text))
            }
            TokenKind::Range => {
                self.advance();
                Ok(Expression::Range(token.text))
            }
            TokenKind::Function => {
                self.advance();
                self.parse_function_call(token.text)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_comparison()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Eof => Err(ParseError::new("Unexpected end of expression", token.offset)),
            _ => Err(ParseError::new(
                format!("Unexpected token: {}", token),
                token.offset,
            )),
        }
    }

    /// Parses the argument list after a FUNCTION token.
    fn parse_function_call(&mut self, name: String) -> ParseResult<Expression> {
        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();

        if self.current().kind != TokenKind::RParen {
            args.push(self.parse_comparison()?);

            while self.current().kind == TokenKind::Comma {
                self.advance();
                args.push(self.parse_comparison()?);
            }
        }

        self.expect(TokenKind::RParen)?;

        Ok(Expression::FunctionCall { name, args })
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// Reads the longest numeric prefix of a NUMBER token: digits, then at most one '.' and
/// more digits. `1.2.3` reads as 1.2 and `7.` as 7.
fn number_prefix(text: &str) -> f64 {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, ch) in text.char_indices() {
        if ch == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        } else if !ch.is_ascii_digit() {
            break;
        }
        end = i + ch.len_utf8();
    }
    text[..end].trim_end_matches('.').parse::<f64>().unwrap_or(0.0)
}

/// Convenience function: tokenizes and parses a formula string (leading '=' optional).
pub fn parse(formula: &str) -> ParseResult<Expression> {
    Parser::new(tokenize(formula)).parse()
}
