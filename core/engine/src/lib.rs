//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the formula engine.
//! CONTEXT: Re-exports public types and modules for use by other crates. The parser
//! lives in `formula-parser`; this crate adds values, evaluation, the function library,
//! dependency tracking and the recalculating `Sheet`.

mod logging;

pub mod actions;
pub mod cell;
pub mod config;
pub mod coord;
pub mod dependency_graph;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod grid;
pub mod sheet;
pub mod snapshot;

// Re-export commonly used types at the crate root
pub use actions::{
    ActionTarget, AssistantAction, AssistantReply, CellModification, CellPosition, SortOrder,
    TargetKind,
};
pub use cell::{format_number, Cell, CellError, CellValue, Formula};
pub use config::{CalculationMode, EngineConfig, RecalcOrder};
pub use coord::{
    cells_in_range, col_to_index, expand_range, index_to_col, is_oversized_range, parse_range,
    range_cell_count, CellId, MAX_RANGE_CELLS,
};
pub use dependency_graph::{extract_references, CycleError, DependencyGraph};
pub use error::{EngineError, EngineResult};
pub use evaluator::{evaluate_compiled, evaluate_formula, CellLookup, EvalResult, Evaluator};
pub use functions::{dispatch, function_names, lookup_function, FormulaFunction};
pub use grid::Grid;
pub use sheet::{Sheet, DEFAULT_COLUMNS, DEFAULT_ROWS};
pub use snapshot::{CellRecord, RecordValue, SheetData};
