//! FILENAME: core/engine/src/evaluator.rs
//! PURPOSE: Evaluates expression trees to compute cell values.
//! CONTEXT: After a formula is parsed into a tree (once, when it is written), this
//! module walks the tree on every recalculation. Cell values come from a caller-supplied
//! lookup; function calls are handed to the function library.
//!
//! COERCION RULES:
//! - `+ - * / ^` read non-numbers as 0, errors included. `/` by 0 gives #DIV/0!, which
//!   is itself a non-number to any operator that consumes it.
//! - `&` stringifies both sides.
//! - `=` and `<>` are strict: same kind, same payload.
//! - `< > <= >=` compare two texts lexicographically and everything else as numbers;
//!   anything that does not read as a number makes the comparison false.
//! - A cell reference passes errors through, turns numeric-looking text into a number
//!   and reads an empty cell as 0.
//! - A bare range is its own text; only function dispatch expands it.
//! - Unary minus negates numbers and leaves anything else unchanged.

use crate::cell::{format_number, CellError, CellValue, Formula};
use crate::coord::CellId;
use crate::functions::dispatch;
use crate::logging::log_debug;
use formula_parser::{parse, BinaryOperator, Expression, UnaryOperator, Value};
use std::cmp::Ordering;

/// The result of evaluating an expression.
/// This maps onto CellValue but is separate to allow for intermediate states.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
    /// A list of values, produced when the function dispatcher expands a range.
    Array(Vec<EvalResult>),
}

impl EvalResult {
    /// Lifts a stored value without any coercion.
    pub fn from_cell_value(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => EvalResult::Empty,
            CellValue::Number(n) => EvalResult::Number(*n),
            CellValue::Text(s) => EvalResult::Text(s.clone()),
            CellValue::Boolean(b) => EvalResult::Boolean(*b),
            CellValue::Error(e) => EvalResult::Error(e.clone()),
        }
    }

    /// Converts the evaluation result to a CellValue for storage.
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            EvalResult::Empty => CellValue::Empty,
            EvalResult::Number(n) => CellValue::Number(*n),
            EvalResult::Text(s) => CellValue::Text(s.clone()),
            EvalResult::Boolean(b) => CellValue::Boolean(*b),
            EvalResult::Error(e) => CellValue::Error(e.clone()),
            // Arrays collapse to the first value when stored in a cell
            EvalResult::Array(arr) => arr
                .first()
                .map(EvalResult::to_cell_value)
                .unwrap_or(CellValue::Empty),
        }
    }

    /// The number held by a Number result. No other variant is numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EvalResult::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Arithmetic operand rule: numbers as-is, everything else 0.
    pub fn number_or_zero(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }

    /// Loose numeric reading used by relational operators and text positions.
    /// Booleans read as 0/1, Empty as 0, numeric-looking text as its number,
    /// anything else as NaN.
    pub fn loose_number(&self) -> f64 {
        match self {
            EvalResult::Empty => 0.0,
            EvalResult::Number(n) => *n,
            EvalResult::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            EvalResult::Text(s) => parse_numeric_text(s).unwrap_or(f64::NAN),
            EvalResult::Error(_) => f64::NAN,
            EvalResult::Array(arr) => match arr.as_slice() {
                [] => 0.0,
                [single] => single.loose_number(),
                _ => f64::NAN,
            },
        }
    }

    /// Condition truthiness for IF.
    pub fn truthy(&self) -> bool {
        match self {
            EvalResult::Empty => false,
            EvalResult::Number(n) => *n != 0.0 && !n.is_nan(),
            EvalResult::Text(s) => !s.is_empty(),
            EvalResult::Boolean(b) => *b,
            EvalResult::Error(_) | EvalResult::Array(_) => true,
        }
    }

    /// Converts the result to a string representation.
    pub fn as_text(&self) -> String {
        match self {
            EvalResult::Empty => String::new(),
            EvalResult::Number(n) => format_number(*n),
            EvalResult::Text(s) => s.clone(),
            EvalResult::Boolean(b) => {
                if *b {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            EvalResult::Error(e) => e.to_string(),
            EvalResult::Array(arr) => arr
                .iter()
                .map(EvalResult::as_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Text and errors both compare as strings.
    fn is_textual(&self) -> bool {
        matches!(self, EvalResult::Text(_) | EvalResult::Error(_))
    }

    /// Flattens an array result into individual values.
    /// Non-array values return a single-element vector.
    pub fn flatten(&self) -> Vec<EvalResult> {
        match self {
            EvalResult::Array(arr) => arr.iter().flat_map(EvalResult::flatten).collect(),
            other => vec![other.clone()],
        }
    }
}

/// Reads text as a number if it looks like one: surrounding whitespace is ignored, blank
/// text is 0, decimal and exponent forms and `Infinity` are accepted. Anything else,
/// including hex and `NaN`, is not numeric.
pub fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let unsigned = trimmed.strip_prefix(&['+', '-'][..]).unwrap_or(trimmed);
    if unsigned == "Infinity" {
        return Some(if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    if !unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Source of cell values during evaluation. A missing cell reads as Empty.
pub trait CellLookup {
    fn cell_value(&self, id: CellId) -> CellValue;
}

impl<F> CellLookup for F
where
    F: Fn(CellId) -> CellValue,
{
    fn cell_value(&self, id: CellId) -> CellValue {
        self(id)
    }
}

/// The formula evaluator.
/// Holds a reference to the lookup used for cell references.
pub struct Evaluator<'a, L: CellLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: CellLookup + ?Sized> Evaluator<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Evaluator { lookup }
    }

    /// Evaluates an expression tree and returns the result. Never fails: every problem
    /// becomes an error value.
    pub fn evaluate(&self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Literal(value) => self.eval_literal(value),
            Expression::CellRef(reference) => self.eval_cell_ref(reference),
            Expression::Range(range) => EvalResult::Text(range.clone()),
            Expression::BinaryOp { left, op, right } => self.eval_binary_op(left, *op, right),
            Expression::UnaryOp { op, operand } => self.eval_unary_op(*op, operand),
            Expression::FunctionCall { name, args } => self.eval_function(name, args),
        }
    }

    fn eval_literal(&self, value: &Value) -> EvalResult {
        match value {
            Value::Number(n) => EvalResult::Number(*n),
            Value::String(s) => EvalResult::Text(s.clone()),
        }
    }

    /// Evaluates a cell reference through the lookup.
    /// A reference that is not a well-formed A1 name (e.g. `TRUE`) reads as an empty cell.
    fn eval_cell_ref(&self, reference: &str) -> EvalResult {
        let value = match CellId::parse_a1(reference) {
            Some(id) => self.lookup.cell_value(id),
            None => CellValue::Empty,
        };

        match value {
            CellValue::Empty => EvalResult::Number(0.0),
            CellValue::Number(n) => EvalResult::Number(n),
            CellValue::Boolean(b) => EvalResult::Boolean(b),
            CellValue::Error(e) => EvalResult::Error(e),
            CellValue::Text(s) => {
                if s.starts_with('#') {
                    return EvalResult::Text(s);
                }
                match parse_numeric_text(&s) {
                    Some(n) => EvalResult::Number(n),
                    None => EvalResult::Text(s),
                }
            }
        }
    }

    fn eval_binary_op(&self, left: &Expression, op: BinaryOperator, right: &Expression) -> EvalResult {
        let left_val = self.evaluate(left);
        let right_val = self.evaluate(right);

        match op {
            // Arithmetic operations
            BinaryOperator::Add => {
                EvalResult::Number(left_val.number_or_zero() + right_val.number_or_zero())
            }
            BinaryOperator::Subtract => {
                EvalResult::Number(left_val.number_or_zero() - right_val.number_or_zero())
            }
            BinaryOperator::Multiply => {
                EvalResult::Number(left_val.number_or_zero() * right_val.number_or_zero())
            }
            BinaryOperator::Divide => {
                let divisor = right_val.number_or_zero();
                if divisor == 0.0 {
                    EvalResult::Error(CellError::Div0)
                } else {
                    EvalResult::Number(left_val.number_or_zero() / divisor)
                }
            }
            BinaryOperator::Power => {
                EvalResult::Number(left_val.number_or_zero().powf(right_val.number_or_zero()))
            }

            // String concatenation
            BinaryOperator::Concat => {
                EvalResult::Text(format!("{}{}", left_val.as_text(), right_val.as_text()))
            }

            // Comparison operations
            BinaryOperator::Equal => EvalResult::Boolean(strict_equal(&left_val, &right_val)),
            BinaryOperator::NotEqual => EvalResult::Boolean(!strict_equal(&left_val, &right_val)),
            BinaryOperator::LessThan => relational(&left_val, &right_val, Ordering::is_lt),
            BinaryOperator::GreaterThan => relational(&left_val, &right_val, Ordering::is_gt),
            BinaryOperator::LessEqual => relational(&left_val, &right_val, Ordering::is_le),
            BinaryOperator::GreaterEqual => relational(&left_val, &right_val, Ordering::is_ge),
        }
    }

    fn eval_unary_op(&self, op: UnaryOperator, operand: &Expression) -> EvalResult {
        let val = self.evaluate(operand);

        match op {
            UnaryOperator::Negate => match val {
                EvalResult::Number(n) => EvalResult::Number(-n),
                other => other,
            },
        }
    }

    /// Evaluates every argument, then hands the list to the function library.
    fn eval_function(&self, name: &str, args: &[Expression]) -> EvalResult {
        let values: Vec<EvalResult> = args.iter().map(|arg| self.evaluate(arg)).collect();
        dispatch(name, values, self.lookup)
    }
}

/// `=` semantics: same kind and same payload. Text and error markers compare as strings.
fn strict_equal(left: &EvalResult, right: &EvalResult) -> bool {
    match (left, right) {
        (EvalResult::Empty, EvalResult::Empty) => true,
        (EvalResult::Number(l), EvalResult::Number(r)) => l == r,
        (EvalResult::Boolean(l), EvalResult::Boolean(r)) => l == r,
        (l, r) if l.is_textual() && r.is_textual() => l.as_text() == r.as_text(),
        _ => false,
    }
}

fn relational(left: &EvalResult, right: &EvalResult, test: fn(Ordering) -> bool) -> EvalResult {
    let ordering = if left.is_textual() && right.is_textual() {
        Some(left.as_text().cmp(&right.as_text()))
    } else {
        left.loose_number().partial_cmp(&right.loose_number())
    };
    EvalResult::Boolean(ordering.map(test).unwrap_or(false))
}

/// Evaluates an already compiled formula. A formula that failed to parse yields `#ERROR!`.
pub fn evaluate_compiled<L: CellLookup + ?Sized>(formula: &Formula, lookup: &L) -> CellValue {
    match formula.expression() {
        Ok(expr) => Evaluator::new(lookup).evaluate(expr).to_cell_value(),
        Err(err) => {
            log_debug!("EVAL", "{} does not parse: {}", formula.source(), err);
            CellValue::Error(CellError::Generic)
        }
    }
}

/// Parses and evaluates formula text in one call.
/// Text without a leading '=' is not a formula and comes back unchanged.
pub fn evaluate_formula<L: CellLookup + ?Sized>(text: &str, lookup: &L) -> CellValue {
    if !text.starts_with('=') {
        return if text.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(text.to_string())
        };
    }

    match parse(text) {
        Ok(expr) => Evaluator::new(lookup).evaluate(&expr).to_cell_value(),
        Err(err) => {
            log_debug!("EVAL", "{} does not parse: {}", text, err);
            CellValue::Error(CellError::Generic)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn a1(s: &str) -> CellId {
        CellId::parse_a1(s).unwrap()
    }

    fn make_cells() -> HashMap<CellId, CellValue> {
        // A1 = 10, A2 = 20, A3 = 30
        // B1 = 5, B2 = "15" (numeric text), B3 = "Hello"
        // C1 = #DIV/0!, C2 = TRUE
        let mut cells = HashMap::new();
        cells.insert(a1("A1"), CellValue::Number(10.0));
        cells.insert(a1("A2"), CellValue::Number(20.0));
        cells.insert(a1("A3"), CellValue::Number(30.0));
        cells.insert(a1("B1"), CellValue::Number(5.0));
        cells.insert(a1("B2"), CellValue::Text("15".to_string()));
        cells.insert(a1("B3"), CellValue::Text("Hello".to_string()));
        cells.insert(a1("C1"), CellValue::Error(CellError::Div0));
        cells.insert(a1("C2"), CellValue::Boolean(true));
        cells
    }

    fn eval(formula: &str) -> CellValue {
        let cells = make_cells();
        let lookup = |id: CellId| cells.get(&id).cloned().unwrap_or(CellValue::Empty);
        evaluate_formula(formula, &lookup)
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    // ==================== Arithmetic ====================

    #[test]
    fn test_precedence() {
        assert_eq!(eval("=2+3*4"), num(14.0));
        assert_eq!(eval("=(2+3)*4"), num(20.0));
        assert_eq!(eval("=10-4-3"), num(3.0));
        assert_eq!(eval("=2*3^2"), num(18.0));
    }

    #[test]
    fn test_power_folds_left() {
        assert_eq!(eval("=2^3^2"), num(64.0));
        assert_eq!(eval("=-2^2"), num(4.0));
    }

    #[test]
    fn test_non_numbers_read_as_zero_in_arithmetic() {
        assert_eq!(eval("=\"abc\"+1"), num(1.0));
        assert_eq!(eval("=B3*2"), num(0.0));
        assert_eq!(eval("=C2+1"), num(1.0));
        assert_eq!(eval("=C1+1"), num(1.0));
        assert_eq!(eval("=\"x\"^2"), num(0.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("=10/0"), CellValue::Error(CellError::Div0));
        assert_eq!(eval("=A1/Z9"), CellValue::Error(CellError::Div0));
        assert_eq!(eval("=1/\"x\""), CellValue::Error(CellError::Div0));
    }

    #[test]
    fn test_division_error_reads_as_zero_downstream() {
        assert_eq!(eval("=1/0*5"), num(0.0));
        assert_eq!(eval("=(1/0)*5"), num(0.0));
        assert_eq!(eval("=1/0/2"), num(0.0));
        assert_eq!(eval("=1/0+5"), num(5.0));
        assert_eq!(eval("=1/0*5+2"), num(2.0));
        assert_eq!(eval("=2+1/0*5+100"), num(102.0));
        assert_eq!(eval("=-(1/0)*2"), num(0.0));
        assert_eq!(eval("=C1*5"), num(0.0));
        // Only the final division yields the error itself.
        assert_eq!(eval("=(1/0*5)"), num(0.0));
        assert_eq!(eval("=5*2/0"), CellValue::Error(CellError::Div0));
        assert_eq!(eval("=(1/0)"), CellValue::Error(CellError::Div0));
        assert_eq!(eval("=SUM(1/0*5, 1)"), num(1.0));
        assert_eq!(eval("=SUM(1/0, 1)"), num(1.0));
    }

    #[test]
    fn test_unary() {
        assert_eq!(eval("=-A1"), num(-10.0));
        assert_eq!(eval("=+A1"), num(10.0));
        assert_eq!(eval("=-\"abc\""), text("abc"));
        assert_eq!(eval("=--3"), num(3.0));
    }

    #[test]
    fn test_number_literal_prefix() {
        assert_eq!(eval("=1.5.5+1"), num(2.5));
    }

    // ==================== Text ====================

    #[test]
    fn test_concat() {
        assert_eq!(eval("=\"a\"&\"b\""), text("ab"));
        assert_eq!(eval("=A1&B3"), text("10Hello"));
        assert_eq!(eval("=1.5&C2"), text("1.5TRUE"));
        assert_eq!(eval("=C1&\"!\""), text("#DIV/0!!"));
    }

    #[test]
    fn test_concat_binds_with_additive() {
        // (1 & 2) + 3: the concatenation is text, so it reads as 0.
        assert_eq!(eval("=1&2+3"), num(3.0));
    }

    // ==================== Comparison ====================

    #[test]
    fn test_strict_equality() {
        assert_eq!(eval("=A1=10"), CellValue::Boolean(true));
        assert_eq!(eval("=A1=\"10\""), CellValue::Boolean(false));
        assert_eq!(eval("=\"a\"=\"a\""), CellValue::Boolean(true));
        assert_eq!(eval("=\"a\"<>\"A\""), CellValue::Boolean(true));
        assert_eq!(eval("=C2=1"), CellValue::Boolean(false));
    }

    #[test]
    fn test_relational_numbers_and_text() {
        assert_eq!(eval("=A1>5"), CellValue::Boolean(true));
        assert_eq!(eval("=A1<=9"), CellValue::Boolean(false));
        assert_eq!(eval("=\"apple\"<\"banana\""), CellValue::Boolean(true));
        // Text vs number reads the text as a number.
        assert_eq!(eval("=\"15\">10"), CellValue::Boolean(true));
        assert_eq!(eval("=C2>0"), CellValue::Boolean(true));
    }

    #[test]
    fn test_relational_with_non_numeric_text_is_false() {
        assert_eq!(eval("=\"abc\"<1"), CellValue::Boolean(false));
        assert_eq!(eval("=\"abc\">=1"), CellValue::Boolean(false));
    }

    #[test]
    fn test_comparisons_chain_left_to_right() {
        // (1 < 2) < 3 compares TRUE (as 1) with 3.
        assert_eq!(eval("=1<2<3"), CellValue::Boolean(true));
    }

    // ==================== References ====================

    #[test]
    fn test_cell_ref_coercion() {
        assert_eq!(eval("=B2"), num(15.0));
        assert_eq!(eval("=B3"), text("Hello"));
        assert_eq!(eval("=Z99"), num(0.0));
        assert_eq!(eval("=C2"), CellValue::Boolean(true));
    }

    #[test]
    fn test_cell_ref_propagates_errors() {
        assert_eq!(eval("=C1"), CellValue::Error(CellError::Div0));
    }

    #[test]
    fn test_lowercase_reference() {
        assert_eq!(eval("=a1+b1"), num(15.0));
    }

    #[test]
    fn test_non_a1_cell_token_reads_as_zero() {
        assert_eq!(eval("=TRUE"), num(0.0));
        assert_eq!(eval("=TRUE+1"), num(1.0));
    }

    #[test]
    fn test_bare_range_is_its_text() {
        assert_eq!(eval("=A1:A3"), text("A1:A3"));
        assert_eq!(eval("=A1:A3+1"), num(1.0));
    }

    // ==================== Functions ====================

    #[test]
    fn test_function_call() {
        assert_eq!(eval("=SUM(A1:A3)"), num(60.0));
        assert_eq!(eval("=SUM(A1, 5, B1)"), num(20.0));
        assert_eq!(eval("=sum(A1:A3)*2"), num(120.0));
    }

    #[test]
    fn test_nested_function_and_arithmetic_args() {
        assert_eq!(eval("=IF(A1>5, SUM(A1:A2)+1, 0)"), num(31.0));
        assert_eq!(eval("=ROUND(A1/3, 2)"), num(3.33));
    }

    #[test]
    fn test_unknown_function() {
        let value = eval("=UNKNOWNFN(1)");
        assert_eq!(value, CellValue::Error(CellError::Name("UNKNOWNFN".to_string())));
        assert!(value.to_string().starts_with("#NAME?"));
    }

    // ==================== Errors and leniency ====================

    #[test]
    fn test_malformed_formula_is_generic_error() {
        assert_eq!(eval("=1+"), CellValue::Error(CellError::Generic));
        assert_eq!(eval("=(1"), CellValue::Error(CellError::Generic));
        assert_eq!(eval("="), CellValue::Error(CellError::Generic));
        assert_eq!(eval("=SUM(1"), CellValue::Error(CellError::Generic));
    }

    #[test]
    fn test_trailing_tokens_ignored() {
        assert_eq!(eval("=1 2"), num(1.0));
        // "==" is not a comparison, so the expression ends before it
        assert_eq!(eval("=1==1"), num(1.0));
        assert_eq!(eval("=1=1"), CellValue::Boolean(true));
    }

    #[test]
    fn test_unknown_characters_skipped() {
        assert_eq!(eval("=1 $+ 2"), num(3.0));
    }

    #[test]
    fn test_non_formula_text_is_returned_unchanged() {
        assert_eq!(eval("hello"), text("hello"));
        assert_eq!(eval(""), CellValue::Empty);
    }

    #[test]
    fn test_evaluate_compiled_matches_evaluate_formula() {
        let cells = make_cells();
        let lookup = |id: CellId| cells.get(&id).cloned().unwrap_or(CellValue::Empty);
        for source in ["=A1*2+B2", "=CONCATENATE(B3, \" \", A1)", "=(", "=1/0"] {
            let formula = Formula::compile(source);
            assert_eq!(
                evaluate_compiled(&formula, &lookup),
                evaluate_formula(source, &lookup),
                "formula {}",
                source
            );
        }
    }

    // ==================== Value helpers ====================

    #[test]
    fn test_parse_numeric_text() {
        assert_eq!(parse_numeric_text(" 42 "), Some(42.0));
        assert_eq!(parse_numeric_text(""), Some(0.0));
        assert_eq!(parse_numeric_text("   "), Some(0.0));
        assert_eq!(parse_numeric_text("1e3"), Some(1000.0));
        assert_eq!(parse_numeric_text("-.5"), Some(-0.5));
        assert_eq!(parse_numeric_text("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_numeric_text("inf"), None);
        assert_eq!(parse_numeric_text("NaN"), None);
        assert_eq!(parse_numeric_text("12abc"), None);
        assert_eq!(parse_numeric_text("1e"), None);
    }

    #[test]
    fn test_array_collapses_to_first_on_store() {
        let arr = EvalResult::Array(vec![EvalResult::Number(1.0), EvalResult::Number(2.0)]);
        assert_eq!(arr.to_cell_value(), CellValue::Number(1.0));
        assert_eq!(EvalResult::Array(vec![]).to_cell_value(), CellValue::Empty);
        assert_eq!(arr.as_text(), "1,2");
    }

    #[test]
    fn test_truthiness() {
        assert!(EvalResult::Number(-1.0).truthy());
        assert!(!EvalResult::Number(0.0).truthy());
        assert!(!EvalResult::Number(f64::NAN).truthy());
        assert!(!EvalResult::Text(String::new()).truthy());
        assert!(EvalResult::Text("0".to_string()).truthy());
        assert!(!EvalResult::Empty.truthy());
        assert!(EvalResult::Error(CellError::Generic).truthy());
    }
}
