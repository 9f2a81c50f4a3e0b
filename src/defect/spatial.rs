// SPDX-License-Identifier: MIT

//! Fixed-cell spatial bucketing, independent of the die structure.
//!
//! Items are keyed by `floor(coord / cell_size)`. Range queries scan only
//! the overlapping buckets and exact-filter on the stored positions; radius
//! queries return the coarse cell neighborhood for the caller to refine.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    cells: HashMap<(i32, i32), Vec<(f32, f32, T)>>,
    cell_size: f32,
}

impl<T> Default for SpatialGrid<T> {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl<T> SpatialGrid<T> {
    pub fn new(cell_size: f32) -> Self {
        assert!(cell_size > 0.0, "cell size must be positive");
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, x: f32, y: f32, item: T) {
        self.cells.entry(self.cell_of(x, y)).or_default().push((x, y, item));
    }

    /// All items whose position lies inside the closed rectangle
    /// `[min_x, max_x] x [min_y, max_y]`.
    pub fn query_range(&self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Vec<&T> {
        let (min_cx, min_cy) = self.cell_of(min_x, min_y);
        let (max_cx, max_cy) = self.cell_of(max_x, max_y);

        let mut result = Vec::new();
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                if let Some(items) = self.cells.get(&(cx, cy)) {
                    for (x, y, item) in items {
                        if *x >= min_x && *x <= max_x && *y >= min_y && *y <= max_y {
                            result.push(item);
                        }
                    }
                }
            }
        }
        result
    }

    /// Coarse neighborhood query: everything in cells within `radius` of the
    /// given point. May include items slightly beyond the radius.
    pub fn nearby(&self, x: f32, y: f32, radius: f32) -> Vec<&T> {
        let cell_radius = (radius / self.cell_size).ceil() as i32;
        let (center_cx, center_cy) = self.cell_of(x, y);

        let mut result = Vec::new();
        for dx in -cell_radius..=cell_radius {
            for dy in -cell_radius..=cell_radius {
                if let Some(items) = self.cells.get(&(center_cx + dx, center_cy + dy)) {
                    result.extend(items.iter().map(|(_, _, item)| item));
                }
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
