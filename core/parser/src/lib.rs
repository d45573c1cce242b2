//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the formula lexer and parser.
//! CONTEXT: This crate turns formula strings into token sequences and expression trees.
//! It knows nothing about cells or values; the engine crate resolves references and
//! evaluates the trees.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /, ^ (power)
//! - Comparison: =, <>, <, >, <=, >=
//! - String concatenation: &
//! - Cell references: A1, AA100
//! - Ranges: A1:B10
//! - Function calls: SUM(A1:A10), IF(A1>0, "yes", "no")
//! - Parentheses for grouping
//! - Unary negation and unary plus

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;


// Re-export commonly used types for convenience
pub use ast::{BinaryOperator, Expression, UnaryOperator, Value};
pub use lexer::{tokenize, Lexer};
pub use parser::{parse, ParseError, ParseResult, Parser};
pub use token::{Token, TokenKind};
