//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for formula engine integration tests.

#![allow(dead_code)]

use formula_engine::{CellId, CellValue, EngineConfig, Sheet};

/// Wraps a sheet with A1-addressed helpers.
pub struct TestHarness {
    pub sheet: Sheet,
}

impl TestHarness {
    /// Create a new test harness with an empty sheet and default settings.
    pub fn new() -> Self {
        TestHarness { sheet: Sheet::new() }
    }

    pub fn with_config(config: EngineConfig) -> Self {
        TestHarness {
            sheet: Sheet::with_config(config),
        }
    }

    /// Create a harness with the diamond: B1 = A1*2, C1 = A1*3, D1 = B1+C1.
    pub fn with_diamond() -> Self {
        let mut harness = Self::new();
        harness.number("A1", 2.0);
        harness.input("B1", "=A1*2");
        harness.input("C1", "=A1*3");
        harness.input("D1", "=B1+C1");
        harness
    }

    /// Create a harness where A2 reads A1 directly and through the chain B1 -> C1.
    pub fn with_lagging_chain(config: EngineConfig) -> Self {
        let mut harness = Self::with_config(config);
        harness.number("A1", 1.0);
        harness.input("B1", "=A1+1");
        harness.input("C1", "=B1+1");
        harness.input("A2", "=A1+C1");
        harness
    }

    pub fn input(&mut self, a1: &str, text: &str) -> Vec<CellId> {
        self.sheet.set_cell_input(cell(a1), text)
    }

    pub fn number(&mut self, a1: &str, n: f64) -> Vec<CellId> {
        self.sheet.set_cell_value(cell(a1), CellValue::Number(n))
    }

    pub fn value(&self, a1: &str) -> CellValue {
        self.sheet.cell_value(cell(a1))
    }

    /// The rendered value of a cell.
    pub fn display(&self, a1: &str) -> String {
        self.value(a1).to_string()
    }
}

pub fn cell(a1: &str) -> CellId {
    CellId::parse_a1(a1).unwrap_or_else(|| panic!("bad test reference {}", a1))
}

pub fn cells(list: &[&str]) -> Vec<CellId> {
    list.iter().map(|a1| cell(a1)).collect()
}
