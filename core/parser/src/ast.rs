//! FILENAME: core/parser/src/ast.rs
//! PURPOSE: Defines the expression tree for formulas.
//! CONTEXT: The parser converts a token sequence into this tree once per formula text;
//! the evaluator walks it on every recalculation. Trees are immutable after parsing.
//!
//! SUPPORTED EXPRESSIONS:
//! - Literals: Numbers, Strings
//! - Cell references: A1, AA100 (kept as uppercase text, resolved by the caller's lookup)
//! - Ranges: A1:B10 (kept as text; only function dispatch expands them)
//! - Binary operations: +, -, *, /, ^, &, =, <>, <, >, <=, >=
//! - Unary negation: -5
//! - Function calls: SUM(A1:A10), IF(A1>0, "yes", "no")

/// Represents a parsed formula expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A literal value: number or string.
    Literal(Value),

    /// A single cell reference such as `A1`. The text is exactly what the lexer produced,
    /// so it may also be a letter-only run like `TRUE` that resolves to nothing.
    CellRef(String),

    /// A range reference such as `A1:B10`, kept in literal form.
    Range(String),

    /// A binary operation: left op right (e.g., 5 + 3, A1 > 10).
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A unary operation: op operand (e.g., -5).
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// A function call. The name is uppercased by the lexer.
    FunctionCall { name: String, args: Vec<Expression> },
}

/// Literal values that can appear in formulas.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Number(f64),
    String(String),
}

/// Binary operators, listed by precedence group (comparison is lowest).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    // Comparison
    Equal,        // =
    NotEqual,     // <>
    LessThan,     // <
    GreaterThan,  // >
    LessEqual,    // <=
    GreaterEqual, // >=

    // Additive (concatenation shares this level)
    Add,      // +
    Subtract, // -
    Concat,   // &

    // Multiplicative
    Multiply, // *
    Divide,   // /

    Power, // ^
}

impl BinaryOperator {
    /// Maps comparison operator text to its operator.
    pub fn comparison(text: &str) -> Option<Self> {
        match text {
            "=" => Some(BinaryOperator::Equal),
            "<>" => Some(BinaryOperator::NotEqual),
            "<" => Some(BinaryOperator::LessThan),
            ">" => Some(BinaryOperator::GreaterThan),
            "<=" => Some(BinaryOperator::LessEqual),
            ">=" => Some(BinaryOperator::GreaterEqual),
            _ => None,
        }
    }

    pub fn additive(text: &str) -> Option<Self> {
        match text {
            "+" => Some(BinaryOperator::Add),
            "-" => Some(BinaryOperator::Subtract),
            "&" => Some(BinaryOperator::Concat),
            _ => None,
        }
    }

    pub fn multiplicative(text: &str) -> Option<Self> {
        match text {
            "*" => Some(BinaryOperator::Multiply),
            "/" => Some(BinaryOperator::Divide),
            _ => None,
        }
    }
}

/// Unary operators. Unary plus is absorbed by the parser and has no node.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Negate, // -
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Power => write!(f, "^"),
            BinaryOperator::Concat => write!(f, "&"),
            BinaryOperator::Equal => write!(f, "="),
            BinaryOperator::NotEqual => write!(f, "<>"),
            BinaryOperator::LessThan => write!(f, "<"),
            BinaryOperator::GreaterThan => write!(f, ">"),
            BinaryOperator::LessEqual => write!(f, "<="),
            BinaryOperator::GreaterEqual => write!(f, ">="),
        }
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl std::fmt::Display for Expression {
    /// Renders the tree fully parenthesized, which makes precedence visible in tests
    /// and log lines.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::CellRef(reference) | Expression::Range(reference) => {
                write!(f, "{}", reference)
            }
            Expression::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expression::UnaryOp { op, operand } => write!(f, "({}{})", op, operand),
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
