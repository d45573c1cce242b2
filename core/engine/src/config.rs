//! FILENAME: core/engine/src/config.rs
// PURPOSE: Recalculation settings for a sheet.
// CONTEXT: A sheet reads these on every write. Modes are parsed leniently so a host can
// pass user-facing strings straight through; unknown values fall back to the default
// with a warning instead of failing.

use crate::error::EngineResult;
use crate::logging::log_warn;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CALCULATION MODE
// ============================================================================

/// Whether a write propagates to dependents immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CalculationMode {
    /// Every write recomputes the written cell and all its transitive dependents.
    #[default]
    Automatic,
    /// A write only evaluates the written formula cell; dependents wait for
    /// `Sheet::calculate_now`.
    Manual,
}

impl CalculationMode {
    /// Accepts "automatic", "auto" and "manual" in any case.
    pub fn parse_lenient(mode: &str) -> Self {
        match mode.trim().to_lowercase().as_str() {
            "automatic" | "auto" => CalculationMode::Automatic,
            "manual" => CalculationMode::Manual,
            _ => {
                log_warn!("CONFIG", "invalid calculation mode: {}, defaulting to automatic", mode);
                CalculationMode::Automatic
            }
        }
    }
}

impl From<String> for CalculationMode {
    fn from(mode: String) -> Self {
        CalculationMode::parse_lenient(&mode)
    }
}

impl fmt::Display for CalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationMode::Automatic => write!(f, "automatic"),
            CalculationMode::Manual => write!(f, "manual"),
        }
    }
}

// ============================================================================
// RECALCULATION ORDER
// ============================================================================

/// The order in which the cells affected by a write are re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalcOrder {
    /// The written cell, then its dependents in breadth-first discovery order.
    /// A cell can be evaluated before all of its inputs were refreshed.
    #[default]
    BreadthFirst,
    /// The affected cells sorted so that inputs always come first. Falls back to
    /// breadth-first order when the affected cells contain a cycle.
    Topological,
}

// ============================================================================
// ENGINE CONFIG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub calculation_mode: CalculationMode,
    pub recalc_order: RecalcOrder,
}

impl EngineConfig {
    pub fn new(calculation_mode: CalculationMode, recalc_order: RecalcOrder) -> Self {
        EngineConfig {
            calculation_mode,
            recalc_order,
        }
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
