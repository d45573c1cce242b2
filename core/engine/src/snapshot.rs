//! FILENAME: core/engine/src/snapshot.rs
//! PURPOSE: The persisted form of a sheet and its conversion to and from a live `Sheet`.
//! CONTEXT: Import and export exchange a JSON document keyed by A1 names. Loading
//! restores the stored values as they are and rebuilds the dependency graph by scanning
//! every formula once; nothing is recomputed on load.

use crate::cell::{Cell, CellError, CellValue, Formula};
use crate::config::EngineConfig;
use crate::coord::CellId;
use crate::error::EngineResult;
use crate::logging::{log_enter, log_exit, log_info, log_warn};
use crate::sheet::{Sheet, DEFAULT_COLUMNS, DEFAULT_ROWS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored cell value as it appears in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Number(f64),
    Boolean(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellRecord {
    /// The literal, or the last computed result of the formula. `null` when empty.
    #[serde(default)]
    pub value: Option<RecordValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetData {
    #[serde(default)]
    pub cells: BTreeMap<String, CellRecord>,
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_columns")]
    pub columns: u32,
    #[serde(default)]
    pub row_heights: BTreeMap<u32, f64>,
    #[serde(default)]
    pub column_widths: BTreeMap<u32, f64>,
}

fn default_rows() -> u32 {
    DEFAULT_ROWS
}

fn default_columns() -> u32 {
    DEFAULT_COLUMNS
}

impl Default for SheetData {
    fn default() -> Self {
        SheetData {
            cells: BTreeMap::new(),
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            row_heights: BTreeMap::new(),
            column_widths: BTreeMap::new(),
        }
    }
}

impl SheetData {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl CellRecord {
    /// Converts to a live cell. A formula result that spells an error marker becomes
    /// that error; literal text is kept verbatim.
    fn to_cell(&self) -> Cell {
        let formula = match &self.formula {
            Some(source) if source.starts_with('=') => Some(Formula::compile(source.as_str())),
            Some(source) => {
                log_warn!("LOAD", "ignoring formula without '=': {}", source);
                None
            }
            None => None,
        };

        let value = match &self.value {
            None => CellValue::Empty,
            Some(RecordValue::Number(n)) => CellValue::Number(*n),
            Some(RecordValue::Boolean(b)) => CellValue::Boolean(*b),
            Some(RecordValue::Text(s)) if s.is_empty() => CellValue::Empty,
            Some(RecordValue::Text(s)) => match CellError::from_marker(s) {
                Some(err) if formula.is_some() => CellValue::Error(err),
                _ => CellValue::Text(s.clone()),
            },
        };

        Cell {
            formula,
            value,
            style: self.style.clone(),
        }
    }

    fn from_cell(cell: &Cell) -> Self {
        let value = match &cell.value {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(RecordValue::Number(*n)),
            CellValue::Boolean(b) => Some(RecordValue::Boolean(*b)),
            CellValue::Text(s) => Some(RecordValue::Text(s.clone())),
            CellValue::Error(e) => Some(RecordValue::Text(e.to_string())),
        };

        CellRecord {
            value,
            formula: cell.formula.as_ref().map(|f| f.source().to_string()),
            style: cell.style.clone(),
        }
    }
}

impl Sheet {
    /// Builds a sheet from a snapshot. Fails on a key that is not an A1 name.
    pub fn from_data(data: &SheetData, config: EngineConfig) -> EngineResult<Sheet> {
        log_enter!("LOAD", "from_data", "cells={}", data.cells.len());

        let mut sheet = Sheet::with_config(config);
        sheet.set_dimensions(data.rows, data.columns);
        sheet.row_heights = data.row_heights.clone();
        sheet.column_widths = data.column_widths.clone();

        for (key, record) in &data.cells {
            let id: CellId = key.parse()?;
            let cell = record.to_cell();
            if !cell.is_blank() {
                sheet.grid.set_cell(id, cell);
            }
        }

        for id in sheet.grid.formula_cells() {
            let source = sheet.formula(id).map(str::to_string);
            sheet.graph.rebuild_edges_for_cell(id, source.as_deref());
        }

        log_info!(
            "LOAD",
            "loaded {} cell(s), {} formula(s), {} edge(s)",
            sheet.grid.len(),
            sheet.graph.formula_cell_count(),
            sheet.graph.dependency_count()
        );
        log_exit!("LOAD", "from_data");
        Ok(sheet)
    }

    /// Parses a JSON snapshot and loads it.
    pub fn from_json(json: &str, config: EngineConfig) -> EngineResult<Sheet> {
        Sheet::from_data(&SheetData::from_json(json)?, config)
    }

    /// The snapshot of this sheet, keyed by A1 names.
    pub fn to_data(&self) -> SheetData {
        let cells = self
            .grid
            .iter()
            .filter(|(_, cell)| !cell.is_blank())
            .map(|(id, cell)| (id.to_a1(), CellRecord::from_cell(cell)))
            .collect();

        SheetData {
            cells,
            rows: self.rows,
            columns: self.columns,
            row_heights: self.row_heights.clone(),
            column_widths: self.column_widths.clone(),
        }
    }

    pub fn to_json(&self) -> EngineResult<String> {
        self.to_data().to_json()
    }
}
