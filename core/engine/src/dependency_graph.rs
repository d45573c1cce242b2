//! FILENAME: core/engine/src/dependency_graph.rs
//! PURPOSE: Tracks which cells depend on which other cells.
//! CONTEXT: This module is the bookkeeping behind recalculation. It keeps a forward map
//! (what a formula cell reads) mirrored by a reverse map (who reads a cell), answers
//! transitive queries over the reverse map, detects circular references and orders
//! cells so that every cell comes after the cells it reads.
//!
//! TERMINOLOGY:
//! - Dependencies: Cells that a formula cell references (its inputs).
//!   If A3 = A1 + A2, then A1 and A2 are dependencies of A3.
//! - Dependents: Cells that reference a given cell (reverse lookup).
//!   If A3 = A1 + A2, then A3 is a dependent of A1 and A2.
//!
//! USAGE:
//! 1. When a cell's content changes, call `rebuild_edges_for_cell()` with its new text.
//!    Edges are derived from the formula's CELL and RANGE tokens; every cell of a range
//!    becomes its own edge.
//! 2. Call `transitive_dependents()` to find everything a write can affect.
//! 3. Use `has_cycle()` or `try_topological_order()` before trusting an ordering.
//!
//! Adjacency sets are ordered, so every traversal visits cells in row-major order within
//! a level and results are reproducible.

use crate::coord::{expand_range, is_oversized_range, CellId};
use crate::logging::{log_debug, log_warn};
use formula_parser::{tokenize, TokenKind};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Error type for cycle detection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circular reference detected: {}", format_path(.cycle_path))]
pub struct CycleError {
    /// The cells involved in the cycle, in order, with the first cell repeated at the end.
    pub cycle_path: Vec<CellId>,
}

fn format_path(path: &[CellId]) -> String {
    path.iter()
        .map(CellId::to_a1)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Collects the cells a formula references, from its CELL and RANGE tokens.
/// Text that is not a formula references nothing. CELL tokens that are not well-formed
/// A1 names (such as `TRUE`) are ignored.
pub fn extract_references(formula: &str) -> BTreeSet<CellId> {
    let mut refs = BTreeSet::new();
    if !formula.starts_with('=') {
        return refs;
    }

    for token in tokenize(formula) {
        match token.kind {
            TokenKind::Cell => {
                if let Some(id) = CellId::parse_a1(&token.text) {
                    refs.insert(id);
                }
            }
            TokenKind::Range if is_oversized_range(&token.text) => {
                log_warn!("GRAPH", "range {} is too large to track", token.text);
            }
            TokenKind::Range => refs.extend(expand_range(&token.text)),
            _ => {}
        }
    }
    refs
}

/// The Dependency Graph tracks relationships between cells.
/// It maintains both forward (dependencies) and reverse (dependents) mappings
/// for efficient lookups in either direction.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// If A3 = A1 + A2, then dependencies[A3] = {A1, A2}.
    dependencies: HashMap<CellId, BTreeSet<CellId>>,

    /// If A3 = A1 + A2, then dependents[A1] contains A3, and dependents[A2] contains A3.
    dependents: HashMap<CellId, BTreeSet<CellId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph {
            dependencies: HashMap::new(),
            dependents: HashMap::new(),
        }
    }

    /// Records that `from` reads `to`.
    pub fn add_edge(&mut self, from: CellId, to: CellId) {
        self.dependencies.entry(from).or_default().insert(to);
        self.dependents.entry(to).or_default().insert(from);
    }

    /// Removes every outgoing edge of a cell.
    /// Call this when a cell becomes a literal value or is cleared.
    pub fn remove_all_edges_from(&mut self, cell: CellId) {
        if let Some(old_deps) = self.dependencies.remove(&cell) {
            for dep in old_deps {
                if let Some(readers) = self.dependents.get_mut(&dep) {
                    readers.remove(&cell);
                    if readers.is_empty() {
                        self.dependents.remove(&dep);
                    }
                }
            }
        }
    }

    /// Replaces the outgoing edges of a cell in one step.
    pub fn set_dependencies(&mut self, cell: CellId, new_deps: BTreeSet<CellId>) {
        self.remove_all_edges_from(cell);

        if new_deps.is_empty() {
            return;
        }
        for &dep in &new_deps {
            self.dependents.entry(dep).or_default().insert(cell);
        }
        self.dependencies.insert(cell, new_deps);
    }

    /// Re-derives a cell's outgoing edges from its content.
    /// `None` or non-formula text leaves the cell with no edges.
    pub fn rebuild_edges_for_cell(&mut self, cell: CellId, content: Option<&str>) {
        let refs = content.map(extract_references).unwrap_or_default();
        log_debug!("GRAPH", "{} reads {} cell(s)", cell, refs.len());
        self.set_dependencies(cell, refs);
    }

    /// The cells a cell reads directly, or None if it reads nothing.
    pub fn direct_dependencies(&self, cell: CellId) -> Option<&BTreeSet<CellId>> {
        self.dependencies.get(&cell)
    }

    /// The cells that read a cell directly, or None if nobody does.
    pub fn direct_dependents(&self, cell: CellId) -> Option<&BTreeSet<CellId>> {
        self.dependents.get(&cell)
    }

    /// Every cell reachable over reverse edges, in breadth-first discovery order.
    /// The cell itself is only included when it sits on a cycle.
    pub fn transitive_dependents(&self, cell: CellId) -> Vec<CellId> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::from([cell]);

        while let Some(current) = queue.pop_front() {
            if let Some(readers) = self.dependents.get(&current) {
                for &reader in readers {
                    if seen.insert(reader) {
                        result.push(reader);
                        queue.push_back(reader);
                    }
                }
            }
        }

        result
    }

    /// True if a circular reference can be reached from `cell` by following
    /// dependencies. Cycles elsewhere in the graph are not reported.
    pub fn has_cycle(&self, cell: CellId) -> bool {
        // Cells on the current path are in `on_path`; fully explored ones in `done`.
        let mut on_path: HashSet<CellId> = HashSet::new();
        let mut done: HashSet<CellId> = HashSet::new();
        let mut stack: Vec<(CellId, Vec<CellId>)> = vec![(cell, self.pending_dependencies(cell))];
        on_path.insert(cell);

        while let Some((current, pending)) = stack.last_mut() {
            match pending.pop() {
                Some(next) => {
                    if on_path.contains(&next) {
                        return true;
                    }
                    if done.contains(&next) {
                        continue;
                    }
                    on_path.insert(next);
                    let deps = self.pending_dependencies(next);
                    stack.push((next, deps));
                }
                None => {
                    let finished = *current;
                    on_path.remove(&finished);
                    done.insert(finished);
                    stack.pop();
                }
            }
        }

        false
    }

    /// Orders `cells` and everything they transitively read so that every cell comes
    /// after its dependencies. Fails on the first cycle found.
    pub fn try_topological_order(&self, cells: &[CellId]) -> Result<Vec<CellId>, CycleError> {
        let mut order = Vec::new();
        let mut visited: HashSet<CellId> = HashSet::new();

        for &start in cells {
            if visited.contains(&start) {
                continue;
            }

            let mut on_path: HashSet<CellId> = HashSet::from([start]);
            let mut stack: Vec<(CellId, Vec<CellId>)> =
                vec![(start, self.pending_dependencies(start))];

            while let Some((current, pending)) = stack.last_mut() {
                match pending.pop() {
                    Some(next) => {
                        if on_path.contains(&next) {
                            let from = stack
                                .iter()
                                .position(|(id, _)| *id == next)
                                .unwrap_or(0);
                            let mut cycle_path: Vec<CellId> =
                                stack[from..].iter().map(|(id, _)| *id).collect();
                            cycle_path.push(next);
                            return Err(CycleError { cycle_path });
                        }
                        if visited.contains(&next) {
                            continue;
                        }
                        on_path.insert(next);
                        let deps = self.pending_dependencies(next);
                        stack.push((next, deps));
                    }
                    None => {
                        let finished = *current;
                        on_path.remove(&finished);
                        visited.insert(finished);
                        order.push(finished);
                        stack.pop();
                    }
                }
            }
        }

        Ok(order)
    }

    /// Like `try_topological_order`, but a cycle returns the input unchanged.
    /// That result is a degraded ordering, not a valid one.
    pub fn topological_order(&self, cells: &[CellId]) -> Vec<CellId> {
        match self.try_topological_order(cells) {
            Ok(order) => order,
            Err(err) => {
                log_warn!("GRAPH", "{}; keeping the given order", err);
                cells.to_vec()
            }
        }
    }

    /// Dependencies of a cell as a stack, so popping yields them in row-major order.
    fn pending_dependencies(&self, cell: CellId) -> Vec<CellId> {
        self.dependencies
            .get(&cell)
            .map(|deps| deps.iter().rev().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the total number of cells that have dependencies.
    pub fn formula_cell_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Returns the total number of dependency relationships.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.values().map(|v| v.len()).sum()
    }

    pub fn clear(&mut self) {
        self.dependencies.clear();
        self.dependents.clear();
    }
}
