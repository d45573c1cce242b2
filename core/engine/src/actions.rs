//! FILENAME: core/engine/src/actions.rs
// PURPOSE: Structured edits proposed by the data assistant.
// CONTEXT: The assistant answers either with a formula for the active cell or with one
// of a few bulk actions. Both are applied as ordinary cell writes, so every write runs
// the normal recalculation path. The assistant never touches the dependency graph.

use crate::cell::CellValue;
use crate::coord::CellId;
use crate::error::{EngineError, EngineResult};
use crate::logging::{log_enter, log_exit, log_info};
use crate::sheet::Sheet;
use serde::{Deserialize, Serialize};

// ============================================================================
// ACTION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Row,
    Column,
}

/// A whole row or column, by zero-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTarget {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub index: u32,
}

impl ActionTarget {
    /// The `position`-th cell along the target.
    fn cell_at(&self, position: u32) -> CellId {
        match self.kind {
            TargetKind::Row => CellId::new(self.index, position),
            TargetKind::Column => CellId::new(position, self.index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellModification {
    pub row: u32,
    pub col: u32,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPosition {
    pub row: u32,
    pub col: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantAction {
    #[serde(rename_all = "camelCase")]
    RemoveDuplicates {
        target: ActionTarget,
        unique_values: Vec<serde_json::Value>,
        #[serde(default)]
        removed_count: u32,
    },
    #[serde(rename_all = "camelCase")]
    Sort {
        target: ActionTarget,
        sorted_values: Vec<serde_json::Value>,
        #[serde(default)]
        order: Option<SortOrder>,
    },
    Modify {
        #[serde(default)]
        modifications: Vec<CellModification>,
    },
    DeleteCells {
        #[serde(default)]
        cells: Vec<CellPosition>,
    },
}

/// What the assistant sends back: a formula for the active cell, or a bulk action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssistantReply {
    Formula(String),
    Action(AssistantAction),
}

impl AssistantAction {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Converts a JSON value from the assistant into a cell value.
/// Text is kept as text, so "=..." still becomes a formula when written.
pub fn json_to_cell_value(value: &serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Empty,
        serde_json::Value::Bool(b) => CellValue::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(n) => CellValue::Number(n),
            None => CellValue::Text(n.to_string()),
        },
        serde_json::Value::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

// ============================================================================
// APPLICATION
// ============================================================================

impl Sheet {
    /// Applies an action as a batch of ordinary writes and returns the number of writes.
    pub fn apply_action(&mut self, action: &AssistantAction) -> EngineResult<usize> {
        log_enter!("ACTION", "apply_action", "{:?}", action);

        let writes = match action {
            AssistantAction::RemoveDuplicates {
                target,
                unique_values,
                removed_count,
            } => {
                let length = self.target_length(target)?;
                for position in 0..length {
                    self.set_cell_value(target.cell_at(position), CellValue::Empty);
                }
                let written = self.write_along(target, unique_values);
                log_info!(
                    "ACTION",
                    "removed {} duplicate(s), {} unique value(s) remain",
                    removed_count,
                    written
                );
                length as usize + written
            }
            AssistantAction::Sort {
                target,
                sorted_values,
                order,
            } => {
                self.target_length(target)?;
                let written = self.write_along(target, sorted_values);
                log_info!("ACTION", "sorted {} value(s) {:?}", written, order);
                written
            }
            AssistantAction::Modify { modifications } => {
                for modification in modifications {
                    let id = CellId::new(modification.row, modification.col);
                    self.set_cell_value(id, json_to_cell_value(&modification.value));
                }
                modifications.len()
            }
            AssistantAction::DeleteCells { cells } => {
                for position in cells {
                    self.set_cell_value(CellId::new(position.row, position.col), CellValue::Empty);
                }
                cells.len()
            }
        };

        log_exit!("ACTION", "apply_action", "writes={}", writes);
        Ok(writes)
    }

    /// Applies an assistant reply. A formula reply is written into `active_cell` like
    /// user input.
    pub fn apply_reply(&mut self, active_cell: CellId, reply: &AssistantReply) -> EngineResult<usize> {
        match reply {
            AssistantReply::Formula(formula) => {
                log_info!("ACTION", "inserting {} into {}", formula, active_cell);
                self.set_cell_input(active_cell, formula);
                Ok(1)
            }
            AssistantReply::Action(action) => self.apply_action(action),
        }
    }

    /// The number of cells along a target, bounded by the sheet's dimensions.
    fn target_length(&self, target: &ActionTarget) -> EngineResult<u32> {
        let (index_bound, length) = match target.kind {
            TargetKind::Row => (self.rows(), self.columns()),
            TargetKind::Column => (self.columns(), self.rows()),
        };
        if target.index >= index_bound {
            return Err(EngineError::InvalidAction(format!(
                "{:?} {} is outside the sheet",
                target.kind, target.index
            )));
        }
        Ok(length)
    }

    /// Writes values along a target starting at position 0.
    fn write_along(&mut self, target: &ActionTarget, values: &[serde_json::Value]) -> usize {
        for (position, value) in (0u32..).zip(values) {
            self.set_cell_value(target.cell_at(position), json_to_cell_value(value));
        }
        values.len()
    }
}
