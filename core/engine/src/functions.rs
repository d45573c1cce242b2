//! FILENAME: core/engine/src/functions.rs
//! PURPOSE: The built-in function library and its dispatcher.
//! CONTEXT: The evaluator evaluates every argument of a call and hands the list to
//! `dispatch`, which resolves references hidden in text arguments and then calls the
//! registered implementation. Implementations are pure functions of their arguments.
//!
//! SUPPORTED FUNCTIONS:
//! - Aggregate: SUM, AVERAGE, MIN, MAX, COUNT, COUNTA
//! - Logical: IF
//! - Math: ABS, ROUND, SQRT, POWER
//! - Text: CONCATENATE, UPPER, LOWER, LEN, LEFT, RIGHT, MID
//!
//! Numeric aggregates only look at Number values; text, booleans, errors and empty cells
//! in their arguments are skipped, never coerced. Arity or type violations give #ERROR!.

use crate::cell::CellError;
use crate::coord::{expand_range, is_oversized_range, CellId};
use crate::evaluator::{CellLookup, EvalResult};
use crate::logging::log_debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub type FormulaFunction = fn(&[EvalResult]) -> EvalResult;

static FUNCTIONS: Lazy<HashMap<&'static str, FormulaFunction>> = Lazy::new(|| {
    let mut registry: HashMap<&'static str, FormulaFunction> = HashMap::new();

    // Aggregate functions
    registry.insert("SUM", fn_sum);
    registry.insert("AVERAGE", fn_average);
    registry.insert("MIN", fn_min);
    registry.insert("MAX", fn_max);
    registry.insert("COUNT", fn_count);
    registry.insert("COUNTA", fn_counta);

    // Logical functions
    registry.insert("IF", fn_if);

    // Math functions
    registry.insert("ABS", fn_abs);
    registry.insert("ROUND", fn_round);
    registry.insert("SQRT", fn_sqrt);
    registry.insert("POWER", fn_power);

    // Text functions
    registry.insert("CONCATENATE", fn_concatenate);
    registry.insert("UPPER", fn_upper);
    registry.insert("LOWER", fn_lower);
    registry.insert("LEN", fn_len);
    registry.insert("LEFT", fn_left);
    registry.insert("RIGHT", fn_right);
    registry.insert("MID", fn_mid);

    registry
});

/// Finds a function by name, ignoring case.
pub fn lookup_function(name: &str) -> Option<FormulaFunction> {
    FUNCTIONS.get(name.to_ascii_uppercase().as_str()).copied()
}

/// Every registered function name, sorted.
pub fn function_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = FUNCTIONS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Calls a function on already evaluated arguments.
///
/// Before the call, every text argument containing ':' is replaced by the values of the
/// cells in that range (a malformed range gives an empty list), and every text argument
/// that is exactly an A1 name is replaced by that cell's value. Range and cell values are
/// passed raw: empty cells stay Empty and text stays text.
pub fn dispatch<L: CellLookup + ?Sized>(name: &str, args: Vec<EvalResult>, lookup: &L) -> EvalResult {
    let func = match lookup_function(name) {
        Some(func) => func,
        None => {
            log_debug!("EVAL", "unknown function {}", name);
            return EvalResult::Error(CellError::Name(name.to_string()));
        }
    };

    if let Some(range) = args.iter().find_map(oversized_range) {
        log_debug!("EVAL", "{}: range {} is too large", name, range);
        return generic_error();
    }

    let resolved: Vec<EvalResult> = args
        .into_iter()
        .map(|arg| resolve_argument(arg, lookup))
        .collect();

    func(&resolved)
}

fn oversized_range(arg: &EvalResult) -> Option<&str> {
    match arg {
        EvalResult::Text(text) if is_oversized_range(text) => Some(text),
        _ => None,
    }
}

fn resolve_argument<L: CellLookup + ?Sized>(arg: EvalResult, lookup: &L) -> EvalResult {
    let text = match &arg {
        EvalResult::Text(text) => text,
        _ => return arg,
    };

    if text.contains(':') {
        let values = expand_range(text)
            .into_iter()
            .map(|id| EvalResult::from_cell_value(&lookup.cell_value(id)))
            .collect();
        return EvalResult::Array(values);
    }

    match CellId::parse_a1(text) {
        Some(id) => EvalResult::from_cell_value(&lookup.cell_value(id)),
        None => arg,
    }
}

/// Flattens every argument and keeps only the numbers.
fn collect_numbers(args: &[EvalResult]) -> Vec<f64> {
    args.iter()
        .flat_map(EvalResult::flatten)
        .filter_map(|value| value.as_number())
        .collect()
}

fn generic_error() -> EvalResult {
    EvalResult::Error(CellError::Generic)
}

// ==================== Aggregate Functions ====================

fn fn_sum(args: &[EvalResult]) -> EvalResult {
    EvalResult::Number(collect_numbers(args).iter().sum())
}

fn fn_average(args: &[EvalResult]) -> EvalResult {
    let numbers = collect_numbers(args);
    if numbers.is_empty() {
        return EvalResult::Number(0.0);
    }
    EvalResult::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

fn fn_min(args: &[EvalResult]) -> EvalResult {
    let numbers = collect_numbers(args);
    if numbers.is_empty() {
        return EvalResult::Number(0.0);
    }
    EvalResult::Number(numbers.into_iter().fold(f64::INFINITY, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            acc.min(n)
        }
    }))
}

fn fn_max(args: &[EvalResult]) -> EvalResult {
    let numbers = collect_numbers(args);
    if numbers.is_empty() {
        return EvalResult::Number(0.0);
    }
    EvalResult::Number(numbers.into_iter().fold(f64::NEG_INFINITY, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            acc.max(n)
        }
    }))
}

fn fn_count(args: &[EvalResult]) -> EvalResult {
    EvalResult::Number(collect_numbers(args).len() as f64)
}

/// Counts everything except empty cells and empty text.
fn fn_counta(args: &[EvalResult]) -> EvalResult {
    let count = args
        .iter()
        .flat_map(EvalResult::flatten)
        .filter(|value| match value {
            EvalResult::Empty => false,
            EvalResult::Text(s) => !s.is_empty(),
            _ => true,
        })
        .count();
    EvalResult::Number(count as f64)
}

// ==================== Logical Functions ====================

/// IF(condition, then, [else = FALSE])
fn fn_if(args: &[EvalResult]) -> EvalResult {
    if args.len() < 2 {
        return generic_error();
    }
    if args[0].truthy() {
        args[1].clone()
    } else {
        args.get(2).cloned().unwrap_or(EvalResult::Boolean(false))
    }
}

// ==================== Math Functions ====================

fn fn_abs(args: &[EvalResult]) -> EvalResult {
    match args.first().and_then(EvalResult::as_number) {
        Some(n) => EvalResult::Number(n.abs()),
        None => generic_error(),
    }
}

/// ROUND(value, [decimals = 0]), rounding half away from zero.
fn fn_round(args: &[EvalResult]) -> EvalResult {
    let value = match args.first().and_then(EvalResult::as_number) {
        Some(n) => n,
        None => return generic_error(),
    };
    let decimals = match args.get(1) {
        Some(arg) => match arg.as_number() {
            Some(d) => d,
            None => return generic_error(),
        },
        None => 0.0,
    };

    let factor = 10f64.powf(decimals);
    EvalResult::Number((value * factor).round() / factor)
}

fn fn_sqrt(args: &[EvalResult]) -> EvalResult {
    match args.first().and_then(EvalResult::as_number) {
        Some(n) => EvalResult::Number(n.sqrt()),
        None => generic_error(),
    }
}

fn fn_power(args: &[EvalResult]) -> EvalResult {
    if args.len() < 2 {
        return generic_error();
    }
    match (args[0].as_number(), args[1].as_number()) {
        (Some(base), Some(exponent)) => EvalResult::Number(base.powf(exponent)),
        _ => generic_error(),
    }
}

// ==================== Text Functions ====================

fn fn_concatenate(args: &[EvalResult]) -> EvalResult {
    let joined: String = args
        .iter()
        .flat_map(EvalResult::flatten)
        .map(|value| value.as_text())
        .collect();
    EvalResult::Text(joined)
}

fn fn_upper(args: &[EvalResult]) -> EvalResult {
    match args.first() {
        Some(arg) => EvalResult::Text(arg.as_text().to_uppercase()),
        None => generic_error(),
    }
}

fn fn_lower(args: &[EvalResult]) -> EvalResult {
    match args.first() {
        Some(arg) => EvalResult::Text(arg.as_text().to_lowercase()),
        None => generic_error(),
    }
}

fn fn_len(args: &[EvalResult]) -> EvalResult {
    match args.first() {
        Some(arg) => EvalResult::Number(arg.as_text().chars().count() as f64),
        None => generic_error(),
    }
}

/// LEFT(text, [count = 1])
fn fn_left(args: &[EvalResult]) -> EvalResult {
    let chars = match args.first() {
        Some(arg) => arg.as_text().chars().collect::<Vec<char>>(),
        None => return generic_error(),
    };
    let count = args.get(1).map(EvalResult::loose_number).unwrap_or(1.0);
    EvalResult::Text(substring(&chars, 0.0, count))
}

/// RIGHT(text, [count = 1])
fn fn_right(args: &[EvalResult]) -> EvalResult {
    let chars = match args.first() {
        Some(arg) => arg.as_text().chars().collect::<Vec<char>>(),
        None => return generic_error(),
    };
    let count = args.get(1).map(EvalResult::loose_number).unwrap_or(1.0);
    let len = chars.len() as f64;
    EvalResult::Text(substring(&chars, len - count, len))
}

/// MID(text, start, [count = rest of text]), with a 1-based start.
fn fn_mid(args: &[EvalResult]) -> EvalResult {
    if args.len() < 2 {
        return generic_error();
    }
    let chars: Vec<char> = args[0].as_text().chars().collect();
    let start = args[1].loose_number() - 1.0;
    let count = args
        .get(2)
        .map(EvalResult::loose_number)
        .unwrap_or(chars.len() as f64);
    EvalResult::Text(substring(&chars, start, start + count))
}

/// Characters between two positions. Positions are truncated toward zero, NaN reads as
/// 0, both are clamped to the text, and a start past the end swaps the two.
fn substring(chars: &[char], start: f64, end: f64) -> String {
    let clamp = |position: f64| -> usize {
        if position.is_nan() {
            0
        } else {
            position.trunc().clamp(0.0, chars.len() as f64) as usize
        }
    };

    let (mut from, mut to) = (clamp(start), clamp(end));
    if from > to {
        std::mem::swap(&mut from, &mut to);
    }
    chars[from..to].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    fn n(v: f64) -> EvalResult {
        EvalResult::Number(v)
    }

    fn t(s: &str) -> EvalResult {
        EvalResult::Text(s.to_string())
    }

    fn call(name: &str, args: Vec<EvalResult>) -> EvalResult {
        // A1 = 1, A2 = "x", A3 = 3, B1 = "" (empty text), B2 = TRUE
        let lookup = |id: CellId| match id.to_string().as_str() {
            "A1" => CellValue::Number(1.0),
            "A2" => CellValue::Text("x".to_string()),
            "A3" => CellValue::Number(3.0),
            "B1" => CellValue::Text(String::new()),
            "B2" => CellValue::Boolean(true),
            _ => CellValue::Empty,
        };
        dispatch(name, args, &lookup)
    }

    // ==================== Dispatch ====================

    #[test]
    fn test_registry_has_every_function() {
        assert_eq!(
            function_names(),
            vec![
                "ABS", "AVERAGE", "CONCATENATE", "COUNT", "COUNTA", "IF", "LEFT", "LEN", "LOWER",
                "MAX", "MID", "MIN", "POWER", "RIGHT", "ROUND", "SQRT", "SUM", "UPPER"
            ]
        );
        assert!(lookup_function("sum").is_some());
        assert!(lookup_function("VLOOKUP").is_none());
    }

    #[test]
    fn test_unknown_function_is_name_error() {
        assert_eq!(
            call("FOO", vec![n(1.0)]),
            EvalResult::Error(CellError::Name("FOO".to_string()))
        );
    }

    #[test]
    fn test_range_text_expands_to_raw_values() {
        // A1=1, A2="x", A3=3: the text is skipped, not coerced
        assert_eq!(call("SUM", vec![t("A1:A3")]), n(4.0));
        assert_eq!(call("COUNT", vec![t("A1:A3")]), n(2.0));
    }

    #[test]
    fn test_reference_text_is_looked_up() {
        assert_eq!(call("SUM", vec![t("A3"), n(1.0)]), n(4.0));
        assert_eq!(call("UPPER", vec![t("A2")]), t("X"));
        // Not a strict A1 name: stays text
        assert_eq!(call("UPPER", vec![t("a2")]), t("A2"));
    }

    #[test]
    fn test_oversized_range_is_generic_error() {
        assert_eq!(call("SUM", vec![t("A1:A4000000000")]), generic_error());
        assert_eq!(call("COUNTA", vec![n(1.0), t("A4000000000:A1")]), generic_error());
        assert_eq!(call("SUM", vec![t("A1:A3")]), n(4.0));
    }

    #[test]
    fn test_malformed_range_text_is_empty_list() {
        assert_eq!(call("CONCATENATE", vec![t("10:30")]), t(""));
        assert_eq!(call("COUNTA", vec![t("x:y")]), n(0.0));
    }

    // ==================== Aggregate Functions ====================

    #[test]
    fn test_aggregates_with_no_numbers_are_zero() {
        for name in ["SUM", "AVERAGE", "MIN", "MAX", "COUNT"] {
            assert_eq!(call(name, vec![t("abc")]), n(0.0), "{}", name);
            assert_eq!(call(name, vec![]), n(0.0), "{}", name);
        }
    }

    #[test]
    fn test_average_min_max() {
        assert_eq!(call("AVERAGE", vec![n(1.0), n(2.0), n(6.0)]), n(3.0));
        assert_eq!(call("MIN", vec![n(4.0), t("A1:A3")]), n(1.0));
        assert_eq!(call("MAX", vec![n(-4.0), n(-2.0)]), n(-2.0));
    }

    #[test]
    fn test_aggregates_skip_booleans_and_errors() {
        let args = vec![
            n(2.0),
            EvalResult::Boolean(true),
            EvalResult::Error(CellError::Div0),
            t("5"),
        ];
        assert_eq!(call("SUM", args.clone()), n(2.0));
        assert_eq!(call("COUNT", args), n(1.0));
    }

    #[test]
    fn test_counta() {
        // A1:B2 holds 1, "", "x", TRUE (B1 is empty text)
        assert_eq!(call("COUNTA", vec![t("A1:B2")]), n(3.0));
        assert_eq!(call("COUNTA", vec![t("C1:C9")]), n(0.0));
        assert_eq!(
            call("COUNTA", vec![n(0.0), EvalResult::Boolean(false), EvalResult::Error(CellError::Generic)]),
            n(3.0)
        );
    }

    // ==================== Logical Functions ====================

    #[test]
    fn test_if() {
        assert_eq!(call("IF", vec![EvalResult::Boolean(true), n(1.0), n(2.0)]), n(1.0));
        assert_eq!(call("IF", vec![n(0.0), n(1.0), n(2.0)]), n(2.0));
        assert_eq!(call("IF", vec![t(""), n(1.0)]), EvalResult::Boolean(false));
        assert_eq!(call("IF", vec![t("no"), n(1.0)]), n(1.0));
        assert_eq!(call("IF", vec![n(1.0)]), EvalResult::Error(CellError::Generic));
    }

    // ==================== Math Functions ====================

    #[test]
    fn test_abs_sqrt_power() {
        assert_eq!(call("ABS", vec![n(-3.5)]), n(3.5));
        assert_eq!(call("SQRT", vec![n(16.0)]), n(4.0));
        assert_eq!(call("POWER", vec![n(2.0), n(10.0)]), n(1024.0));
        assert_eq!(call("ABS", vec![t("x")]), EvalResult::Error(CellError::Generic));
        assert_eq!(call("SQRT", vec![]), EvalResult::Error(CellError::Generic));
        assert_eq!(call("POWER", vec![n(2.0)]), EvalResult::Error(CellError::Generic));
        assert_eq!(call("POWER", vec![n(2.0), t("3")]), EvalResult::Error(CellError::Generic));
    }

    #[test]
    fn test_sqrt_of_negative_is_nan() {
        match call("SQRT", vec![n(-1.0)]) {
            EvalResult::Number(v) => assert!(v.is_nan()),
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn test_round() {
        assert_eq!(call("ROUND", vec![n(2.5)]), n(3.0));
        assert_eq!(call("ROUND", vec![n(-2.5)]), n(-3.0));
        assert_eq!(call("ROUND", vec![n(3.14159), n(2.0)]), n(3.14));
        assert_eq!(call("ROUND", vec![n(1234.0), n(-2.0)]), n(1200.0));
        assert_eq!(call("ROUND", vec![n(1.0), t("2")]), EvalResult::Error(CellError::Generic));
        assert_eq!(call("ROUND", vec![]), EvalResult::Error(CellError::Generic));
    }

    // ==================== Text Functions ====================

    #[test]
    fn test_concatenate_flattens() {
        assert_eq!(call("CONCATENATE", vec![t("a"), n(1.0), t("A1:A3")]), t("a11x3"));
        assert_eq!(call("CONCATENATE", vec![]), t(""));
    }

    #[test]
    fn test_case_and_length() {
        assert_eq!(call("UPPER", vec![t("abc")]), t("ABC"));
        assert_eq!(call("LOWER", vec![t("AbC")]), t("abc"));
        assert_eq!(call("LEN", vec![t("héllo")]), n(5.0));
        assert_eq!(call("LEN", vec![n(12.5)]), n(4.0));
        assert_eq!(call("UPPER", vec![]), EvalResult::Error(CellError::Generic));
    }

    #[test]
    fn test_left_right() {
        assert_eq!(call("LEFT", vec![t("hello")]), t("h"));
        assert_eq!(call("LEFT", vec![t("hello"), n(3.0)]), t("hel"));
        assert_eq!(call("LEFT", vec![t("hello"), n(99.0)]), t("hello"));
        assert_eq!(call("RIGHT", vec![t("hello")]), t("o"));
        assert_eq!(call("RIGHT", vec![t("hello"), n(3.0)]), t("llo"));
        assert_eq!(call("RIGHT", vec![t("hello"), n(99.0)]), t("hello"));
        assert_eq!(call("LEFT", vec![t("hello"), t("2")]), t("he"));
        assert_eq!(call("LEFT", vec![t("hello"), n(-1.0)]), t(""));
    }

    #[test]
    fn test_mid() {
        assert_eq!(call("MID", vec![t("spreadsheet"), n(7.0), n(5.0)]), t("sheet"));
        assert_eq!(call("MID", vec![t("spreadsheet"), n(7.0)]), t("sheet"));
        assert_eq!(call("MID", vec![t("hello"), n(2.7), n(2.0)]), t("el"));
        // Negative count swaps the ends: positions 3 and 0.
        assert_eq!(call("MID", vec![t("hello"), n(4.0), n(-5.0)]), t("hel"));
        assert_eq!(call("MID", vec![t("hello")]), EvalResult::Error(CellError::Generic));
    }

    #[test]
    fn test_substring_clamps_and_swaps() {
        let chars: Vec<char> = "abcdef".chars().collect();
        assert_eq!(substring(&chars, 1.0, 3.0), "bc");
        assert_eq!(substring(&chars, 3.0, 1.0), "bc");
        assert_eq!(substring(&chars, -5.0, 2.0), "ab");
        assert_eq!(substring(&chars, f64::NAN, 2.0), "ab");
        assert_eq!(substring(&chars, 4.0, 100.0), "ef");
    }
}
