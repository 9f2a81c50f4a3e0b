// SPDX-License-Identifier: MIT

//! Per-die and spatial indexes over a defect set.
//!
//! The index stores positions into the defect slice it was built from, so a
//! query costs O(1) per die instead of a scan over all n defects. Builds are
//! all-or-nothing: a new index is constructed from scratch and replaces the
//! old one wholesale, never patched incrementally.

use std::collections::HashMap;
use std::time::Instant;

use log::debug;

use crate::defect::spatial::SpatialGrid;
use crate::defect::{Defect, DieKey};
use crate::wafer::DiePosition;

/// Cell size, in die coordinates, of the secondary range-query grid.
const RANGE_CELL_SIZE: f32 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndexStats {
    pub total_defects: usize,
    pub die_count: usize,
    pub avg_defects_per_die: f64,
    pub max_defects_per_die: usize,
    pub build_ms: f64,
}

/// Die-keyed defect index plus die canvas positions.
#[derive(Debug, Clone, Default)]
pub struct DefectIndex {
    by_die: HashMap<DieKey, Vec<u32>>,
    die_positions: HashMap<DieKey, (f32, f32)>,
    range_grid: SpatialGrid<u32>,
    total: usize,
    build_ms: f64,
}

impl DefectIndex {
    /// Build the index over a defect slice. O(n). The returned value is
    /// complete; there is no observable half-built state.
    pub fn build(defects: &[Defect]) -> Self {
        let start = Instant::now();

        let mut by_die: HashMap<DieKey, Vec<u32>> = HashMap::new();
        let mut range_grid = SpatialGrid::new(RANGE_CELL_SIZE);

        for (i, defect) in defects.iter().enumerate() {
            by_die.entry(defect.die_key()).or_default().push(i as u32);
            range_grid.insert(defect.die_col as f32, defect.die_row as f32, i as u32);
        }

        let index = Self {
            by_die,
            die_positions: HashMap::new(),
            range_grid,
            total: defects.len(),
            build_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        debug!(
            "defect index built: {} defects over {} dies in {:.1} ms",
            index.total,
            index.by_die.len(),
            index.build_ms
        );

        index
    }

    /// Index die canvas positions for O(1) lookup. O(m).
    pub fn build_die_positions(&mut self, positions: &[DiePosition]) {
        let mut map = HashMap::with_capacity(positions.len());
        for pos in positions {
            map.insert((pos.row, pos.col), (pos.canvas_x, pos.canvas_y));
        }
        self.die_positions = map;
    }

    /// Positions of all defects on one die, in insertion order. O(1) lookup.
    pub fn defects_on_die(&self, die_row: i32, die_col: i32) -> &[u32] {
        self.by_die
            .get(&(die_row, die_col))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Batch lookup over several dies; O(k) in the number of queried dies
    /// rather than O(n) in the defect count.
    pub fn defects_on_dies(&self, dies: &[DieKey]) -> Vec<u32> {
        let mut result = Vec::new();
        for &(row, col) in dies {
            result.extend_from_slice(self.defects_on_die(row, col));
        }
        result
    }

    /// Resolve a batch query straight to defect values.
    pub fn collect_defects<'a>(&self, dies: &[DieKey], defects: &'a [Defect]) -> Vec<&'a Defect> {
        self.defects_on_dies(dies)
            .iter()
            .filter_map(|&i| defects.get(i as usize))
            .collect()
    }

    /// Canvas top-left of a die, if it is on the wafer. O(1).
    pub fn die_position(&self, die_row: i32, die_col: i32) -> Option<(f32, f32)> {
        self.die_positions.get(&(die_row, die_col)).copied()
    }

    /// Range query over die coordinates through the secondary spatial grid:
    /// only overlapping buckets are scanned, then exact-filtered.
    pub fn query_range(
        &self,
        min_row: i32,
        max_row: i32,
        min_col: i32,
        max_col: i32,
    ) -> Vec<u32> {
        self.range_grid
            .query_range(
                min_col as f32,
                min_row as f32,
                max_col as f32,
                max_row as f32,
            )
            .into_iter()
            .copied()
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        let max = self.by_die.values().map(Vec::len).max().unwrap_or(0);
        let die_count = self.by_die.len();
        IndexStats {
            total_defects: self.total,
            die_count,
            avg_defects_per_die: if die_count > 0 {
                self.total as f64 / die_count as f64
            } else {
                0.0
            },
            max_defects_per_die: max,
            build_ms: self.build_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn clear(&mut self) {
        self.by_die.clear();
        self.die_positions.clear();
        self.range_grid.clear();
        self.total = 0;
        self.build_ms = 0.0;
    }
}
