//! FILENAME: core/parser/src/token.rs
//! PURPOSE: Token definitions for the formula lexer.
//! CONTEXT: Tokens are the atomic units produced by the lexer and consumed by the parser
//! and by the dependency graph. They are produced fresh for every formula and never shared.

/// The classification of a lexed token.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    /// A run of digits and dots: `12`, `3.5`.
    Number,
    /// A double-quoted string with the quotes removed and `\"` unescaped.
    String,
    /// A letter run optionally followed by digits: `A1`, `AA100`, `TRUE`.
    Cell,
    /// Two cell-like runs joined by `:`. The text keeps the literal form, e.g. `A1:B2`.
    Range,
    /// A letter run immediately followed by `(`.
    Function,
    /// One of `+ - * / ^ = < > & <= >= <>`.
    Operator,
    LParen,
    RParen,
    Comma,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Cell => "CELL",
            TokenKind::Range => "RANGE",
            TokenKind::Function => "FUNCTION",
            TokenKind::Operator => "OPERATOR",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::Comma => "COMMA",
            TokenKind::Eof => "EOF",
        };
        write!(f, "{}", name)
    }
}

/// A lexed token: its kind, literal text, and character offset into the formula body
/// (the text after the leading `=`).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            offset,
        }
    }

    /// Returns true if this is an operator token with exactly the given text.
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::String => write!(f, "STRING(\"{}\")", self.text),
            kind => write!(f, "{}({})", kind, self.text),
        }
    }
}
