//! FILENAME: core/engine/src/coord.rs
//! PURPOSE: Cell identifiers and conversions between A1 notation and 0-based indices.
//! CONTEXT: `CellId` is the universal key of the engine: the grid, the dependency graph
//! and every lookup address cells by it. References are never pointers; an "A1" string
//! is resolved afresh into a `CellId` each time it is used.
//! Column "A" = 0, "B" = 1, ..., "Z" = 25, "AA" = 26, etc.
//! Row 1 in A1 notation = row 0 internally.

use crate::error::EngineError;
use std::fmt;
use std::str::FromStr;

/// A cell coordinate with 0-based indices.
/// Ordering is row-major (row first, then column), which is the order ranges expand in
/// and the order the dependency graph visits siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub row: u32,
    pub col: u32,
}

impl CellId {
    pub const fn new(row: u32, col: u32) -> Self {
        CellId { row, col }
    }

    /// Parses a strict A1 reference: one or more uppercase ASCII letters followed by one
    /// or more digits, with a row number of at least 1. "A1" -> (0, 0), "AA100" -> (99, 26).
    /// Lowercase letters, `$` markers and sheet prefixes are rejected.
    pub fn parse_a1(reference: &str) -> Option<CellId> {
        let split = reference
            .char_indices()
            .find(|(_, c)| !c.is_ascii_uppercase())
            .map(|(i, _)| i)?;
        let (letters, digits) = reference.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let col = col_to_index(letters)?;
        let row_num: u32 = digits.parse().ok()?;
        if row_num == 0 {
            return None;
        }
        Some(CellId::new(row_num - 1, col))
    }

    /// The A1-style name of this cell.
    pub fn to_a1(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", index_to_col(self.col), u64::from(self.row) + 1)
    }
}

impl FromStr for CellId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellId::parse_a1(s).ok_or_else(|| EngineError::InvalidCellKey(s.to_string()))
    }
}

impl From<(u32, u32)> for CellId {
    fn from((row, col): (u32, u32)) -> Self {
        CellId::new(row, col)
    }
}

/// Converts a column string (e.g., "A", "AA", "ABC") to a 0-based column index.
/// "A" -> 0, "B" -> 1, ..., "Z" -> 25, "AA" -> 26, "AB" -> 27, etc.
///
/// Returns None for an empty string, a non-letter character, or a column past u32 range.
pub fn col_to_index(col_str: &str) -> Option<u32> {
    if col_str.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result - 1)
}

/// Converts a 0-based column index to a column string.
/// 0 -> "A", 1 -> "B", ..., 25 -> "Z", 26 -> "AA", 27 -> "AB", etc.
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

/// Splits a range string such as "A1:B10" into its two corners.
/// Returns None unless there are exactly two parts and both are strict A1 references.
pub fn parse_range(range: &str) -> Option<(CellId, CellId)> {
    let mut parts = range.split(':');
    let start = CellId::parse_a1(parts.next()?)?;
    let end = CellId::parse_a1(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((start, end))
}

/// The most cells a range may expand to. Larger ranges expand to nothing.
pub const MAX_RANGE_CELLS: u64 = 1_000_000;

/// The number of cells in the rectangle spanned by two corners.
pub fn range_cell_count(start: CellId, end: CellId) -> u64 {
    let rows = u64::from(start.row.abs_diff(end.row)) + 1;
    let cols = u64::from(start.col.abs_diff(end.col)) + 1;
    rows.saturating_mul(cols)
}

/// True for a well-formed range with more than `MAX_RANGE_CELLS` cells.
pub fn is_oversized_range(range: &str) -> bool {
    parse_range(range).is_some_and(|(start, end)| range_cell_count(start, end) > MAX_RANGE_CELLS)
}

/// Every cell in the rectangle spanned by two corners, in row-major order.
/// The corners may be given in any order. Unbounded; callers holding user input go
/// through `expand_range`.
pub fn cells_in_range(start: CellId, end: CellId) -> Vec<CellId> {
    let (min_row, max_row) = (start.row.min(end.row), start.row.max(end.row));
    let (min_col, max_col) = (start.col.min(end.col), start.col.max(end.col));

    let mut cells = Vec::new();
    for row in min_row..=max_row {
        for col in min_col..=max_col {
            cells.push(CellId::new(row, col));
        }
    }
    cells
}

/// Expands a range string into its cells. A malformed range, or one with more than
/// `MAX_RANGE_CELLS` cells, expands to nothing.
pub fn expand_range(range: &str) -> Vec<CellId> {
    match parse_range(range) {
        Some((start, end)) if range_cell_count(start, end) <= MAX_RANGE_CELLS => {
            cells_in_range(start, end)
        }
        _ => Vec::new(),
    }
}
