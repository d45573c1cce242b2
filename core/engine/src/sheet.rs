//! FILENAME: core/engine/src/sheet.rs
//! PURPOSE: The cell store and recalculation driver.
//! CONTEXT: A `Sheet` owns the grid, the dependency graph and the settings. Every write
//! goes through here: it is classified as a formula or a literal, the graph is updated,
//! and the affected formula cells are re-evaluated one after another, each fresh result
//! stored before the next cell is evaluated. Everything runs to completion inside the
//! call; there is no background work.

use crate::cell::{Cell, CellValue, Formula};
use crate::config::{CalculationMode, EngineConfig, RecalcOrder};
use crate::coord::CellId;
use crate::dependency_graph::DependencyGraph;
use crate::evaluator::{evaluate_compiled, evaluate_formula};
use crate::grid::Grid;
use crate::logging::{log_debug, log_enter, log_exit, log_info, log_warn};
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_ROWS: u32 = 100;
pub const DEFAULT_COLUMNS: u32 = 26;

#[derive(Debug, Clone)]
pub struct Sheet {
    pub(crate) grid: Grid,
    pub(crate) graph: DependencyGraph,
    pub(crate) rows: u32,
    pub(crate) columns: u32,
    pub(crate) row_heights: BTreeMap<u32, f64>,
    pub(crate) column_widths: BTreeMap<u32, f64>,
    config: EngineConfig,
}

impl Default for Sheet {
    fn default() -> Self {
        Sheet::new()
    }
}

impl Sheet {
    /// An empty 100 x 26 sheet with the default settings.
    pub fn new() -> Self {
        Sheet::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Sheet {
            grid: Grid::new(),
            graph: DependencyGraph::new(),
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            row_heights: BTreeMap::new(),
            column_widths: BTreeMap::new(),
            config,
        }
    }

    // ========================================================================
    // SETTINGS & LAYOUT
    // ========================================================================

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        log_info!(
            "CONFIG",
            "calculation mode {}, recalc order {:?}",
            config.calculation_mode,
            config.recalc_order
        );
        self.config = config;
    }

    pub fn set_calculation_mode(&mut self, mode: CalculationMode) {
        self.set_config(EngineConfig {
            calculation_mode: mode,
            ..self.config
        });
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn set_dimensions(&mut self, rows: u32, columns: u32) {
        self.rows = rows;
        self.columns = columns;
    }

    /// The height override for a row, if one was set.
    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    /// The width override for a column, if one was set.
    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    pub fn set_column_width(&mut self, col: u32, width: f64) {
        self.column_widths.insert(col, width);
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.grid.get_cell(id)
    }

    /// The stored value of a cell: the literal, or the last computed formula result.
    /// Cells that were never written read as Empty.
    pub fn cell_value(&self, id: CellId) -> CellValue {
        self.grid.value(id)
    }

    /// The formula text of a cell, including the leading '='.
    pub fn formula(&self, id: CellId) -> Option<&str> {
        self.grid
            .get_cell(id)
            .and_then(|cell| cell.formula.as_ref())
            .map(Formula::source)
    }

    /// Read-only access to the dependency graph.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Evaluates formula text against the current cell values without storing anything.
    pub fn evaluate(&self, text: &str) -> CellValue {
        let grid = &self.grid;
        evaluate_formula(text, &|id: CellId| grid.value(id))
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Writes user input into a cell.
    /// Text starting with '=' is a formula, empty text clears the value (the style is
    /// kept) and anything else is stored verbatim as text.
    /// Returns the formula cells that were re-evaluated, in evaluation order.
    pub fn set_cell_input(&mut self, id: CellId, input: &str) -> Vec<CellId> {
        if input.starts_with('=') {
            self.write_formula(id, input)
        } else if input.is_empty() {
            self.write_literal(id, CellValue::Empty)
        } else {
            self.write_literal(id, CellValue::Text(input.to_string()))
        }
    }

    /// Writes a typed value into a cell. Text starting with '=' is still a formula and
    /// empty text clears the value.
    pub fn set_cell_value(&mut self, id: CellId, value: CellValue) -> Vec<CellId> {
        match value {
            CellValue::Text(text) => self.set_cell_input(id, &text),
            other => self.write_literal(id, other),
        }
    }

    /// Removes a cell entirely, style included, then recomputes whatever read it.
    pub fn clear_cell(&mut self, id: CellId) -> Vec<CellId> {
        log_debug!("RECALC", "clear {}", id);
        self.graph.remove_all_edges_from(id);
        self.grid.clear_cell(id);
        self.propagate(id)
    }

    /// Sets or removes the presentation attributes of a cell. Never triggers evaluation.
    pub fn set_cell_style(&mut self, id: CellId, style: Option<serde_json::Value>) {
        match style {
            Some(style) => self.grid.cell_entry(id).style = Some(style),
            None => {
                let now_blank = match self.grid.get_cell_mut(id) {
                    Some(cell) => {
                        cell.style = None;
                        cell.is_blank()
                    }
                    None => false,
                };
                if now_blank {
                    self.grid.clear_cell(id);
                }
            }
        }
    }

    fn write_formula(&mut self, id: CellId, source: &str) -> Vec<CellId> {
        log_enter!("RECALC", "write_formula", "{} {}", id, source);

        self.graph.rebuild_edges_for_cell(id, Some(source));
        let cell = self.grid.cell_entry(id);
        cell.formula = Some(Formula::compile(source));
        cell.value = CellValue::Empty;

        let recomputed = self.propagate(id);
        log_exit!("RECALC", "write_formula", "recomputed={}", recomputed.len());
        recomputed
    }

    fn write_literal(&mut self, id: CellId, value: CellValue) -> Vec<CellId> {
        log_enter!("RECALC", "write_literal", "{} {:?}", id, value);

        self.graph.remove_all_edges_from(id);
        let now_blank = {
            let cell = self.grid.cell_entry(id);
            cell.formula = None;
            cell.value = value;
            cell.is_blank()
        };
        if now_blank {
            self.grid.clear_cell(id);
        }

        let recomputed = self.propagate(id);
        log_exit!("RECALC", "write_literal", "recomputed={}", recomputed.len());
        recomputed
    }

    // ========================================================================
    // RECALCULATION
    // ========================================================================

    /// Re-evaluates what a write to `id` affects, according to the settings.
    fn propagate(&mut self, id: CellId) -> Vec<CellId> {
        let order = match self.config.calculation_mode {
            CalculationMode::Manual => vec![id],
            CalculationMode::Automatic => self.affected_order(id),
        };
        log_debug!("RECALC", "write to {} affects {} cell(s)", id, order.len());

        order
            .into_iter()
            .filter(|&cell| self.recompute_cell(cell))
            .collect()
    }

    /// The written cell plus its transitive dependents, each once.
    fn affected_order(&self, id: CellId) -> Vec<CellId> {
        let mut seen = HashSet::new();
        let affected: Vec<CellId> = std::iter::once(id)
            .chain(self.graph.transitive_dependents(id))
            .filter(|cell| seen.insert(*cell))
            .collect();

        match self.config.recalc_order {
            RecalcOrder::BreadthFirst => affected,
            RecalcOrder::Topological => self
                .graph
                .topological_order(&affected)
                .into_iter()
                .filter(|cell| seen.contains(cell))
                .collect(),
        }
    }

    /// Evaluates one cell's formula and stores the result.
    /// Returns false when the cell holds no formula.
    fn recompute_cell(&mut self, id: CellId) -> bool {
        let value = {
            let grid = &self.grid;
            match grid.get_cell(id).and_then(|cell| cell.formula.as_ref()) {
                Some(formula) => evaluate_compiled(formula, &|cid: CellId| grid.value(cid)),
                None => return false,
            }
        };

        if let Some(cell) = self.grid.get_cell_mut(id) {
            cell.value = value;
        }
        true
    }

    /// Re-evaluates every formula cell, inputs before the cells that read them. With a
    /// circular reference anywhere, falls back to row-major order.
    /// Returns the cells in the order they were evaluated.
    pub fn calculate_now(&mut self) -> Vec<CellId> {
        log_enter!("RECALC", "calculate_now");

        let formula_cells = self.grid.formula_cells();
        let order: Vec<CellId> = match self.graph.try_topological_order(&formula_cells) {
            Ok(order) => {
                let wanted: HashSet<CellId> = formula_cells.iter().copied().collect();
                order.into_iter().filter(|cell| wanted.contains(cell)).collect()
            }
            Err(err) => {
                log_warn!("RECALC", "{}; evaluating in row-major order", err);
                formula_cells
            }
        };

        let recomputed: Vec<CellId> = order
            .into_iter()
            .filter(|&cell| self.recompute_cell(cell))
            .collect();

        log_exit!("RECALC", "calculate_now", "recomputed={}", recomputed.len());
        recomputed
    }
}
