//! FILENAME: core/engine/src/grid.rs
//! PURPOSE: Manages the collection of cells (The Spreadsheet Grid).
//! CONTEXT: This file defines the `Grid` struct which acts as the container
//! for all cell data. It uses a sparse storage strategy (HashMap) so that
//! sheets where most cells are empty cost nothing for the empty ones.

use crate::cell::{Cell, CellValue};
use crate::coord::CellId;
use std::collections::HashMap;

/// The Grid struct holds the state of the spreadsheet data.
/// Cells that were never written are simply absent.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    cells: HashMap<CellId, Cell>,
}

impl Grid {
    /// Creates a new, empty Grid.
    pub fn new() -> Self {
        Grid {
            cells: HashMap::new(),
        }
    }

    /// Sets a cell at the specified coordinates, replacing whatever was there.
    pub fn set_cell(&mut self, id: CellId, cell: Cell) {
        self.cells.insert(id, cell);
    }

    /// Retrieves a reference to a cell. Returns None if the cell is not stored.
    pub fn get_cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(&id)
    }

    pub fn get_cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(&id)
    }

    /// Returns the cell, creating an empty one if it is not stored yet.
    pub fn cell_entry(&mut self, id: CellId) -> &mut Cell {
        self.cells.entry(id).or_default()
    }

    /// Removes a cell from the grid (clearing it).
    pub fn clear_cell(&mut self, id: CellId) -> Option<Cell> {
        self.cells.remove(&id)
    }

    /// The stored value of a cell; absent cells read as Empty.
    pub fn value(&self, id: CellId) -> CellValue {
        self.cells
            .get(&id)
            .map(|cell| cell.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellId, &Cell)> {
        self.cells.iter()
    }

    /// All cells carrying a formula, in row-major order.
    pub fn formula_cells(&self) -> Vec<CellId> {
        let mut ids: Vec<CellId> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.has_formula())
            .map(|(&id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
