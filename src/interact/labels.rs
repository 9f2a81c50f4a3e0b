// SPDX-License-Identifier: MIT

//! Selected-defect label placement.
//!
//! Labels start beside their anchor defect and a force-separation pass
//! pushes apart pairs whose overlap exceeds a threshold. The pass is a
//! bounded-effort heuristic: it runs until no serious overlap remains or an
//! iteration cap is hit, whichever comes first.

use crate::defect::{DefectClass, SpatialGrid};

/// Label box edge margin against the canvas border.
const EDGE_MARGIN: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelLayoutParams {
    pub width: f32,
    pub height: f32,
    /// Allowed proximity between boxes; negative permits mild overlap.
    pub min_distance: f32,
    pub max_iterations: usize,
    /// Pairs overlapping by more than this fraction of box area get pushed.
    pub overlap_threshold: f32,
    pub push_distance: f32,
    pub canvas_size: f32,
}

impl LabelLayoutParams {
    pub fn for_canvas(canvas_size: f32) -> Self {
        Self {
            width: 250.0,
            height: 80.0,
            min_distance: -20.0,
            max_iterations: 15,
            overlap_threshold: 0.3,
            push_distance: 5.0,
            canvas_size,
        }
    }
}

/// One selected defect paired with its draggable label box position.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBox {
    /// The defect this label describes, in screen space.
    pub anchor_x: f32,
    pub anchor_y: f32,
    /// Top-left of the label box.
    pub x: f32,
    pub y: f32,
    pub lines: Vec<String>,
}

pub fn rects_overlap(
    x1: f32,
    y1: f32,
    w1: f32,
    h1: f32,
    x2: f32,
    y2: f32,
    w2: f32,
    h2: f32,
    margin: f32,
) -> bool {
    !(x1 + w1 + margin < x2 || x2 + w2 + margin < x1 || y1 + h1 + margin < y2 || y2 + h2 + margin < y1)
}

pub fn overlap_area(
    x1: f32,
    y1: f32,
    w1: f32,
    h1: f32,
    x2: f32,
    y2: f32,
    w2: f32,
    h2: f32,
) -> f32 {
    let overlap_x = ((x1 + w1).min(x2 + w2) - x1.max(x2)).max(0.0);
    let overlap_y = ((y1 + h1).min(y2 + h2) - y1.max(y2)).max(0.0);
    overlap_x * overlap_y
}

/// Initial label position: to the right of the anchor, flipped left when it
/// would leave the canvas, clamped vertically.
pub fn init_label_position(
    anchor_x: f32,
    anchor_y: f32,
    width: f32,
    height: f32,
    canvas_size: f32,
    offset: f32,
) -> (f32, f32) {
    let mut x = anchor_x + offset;
    let mut y = anchor_y - height / 2.0;

    if x + width > canvas_size {
        x = anchor_x - width - offset;
    }
    if y < 0.0 {
        y = EDGE_MARGIN;
    }
    if y + height > canvas_size {
        y = canvas_size - height - EDGE_MARGIN;
    }

    (x, y)
}

/// Topmost label box under the given canvas point, if any. Boxes paint in
/// storage order, so the last hit wins.
pub fn label_at(labels: &[LabelBox], x: f32, y: f32, params: &LabelLayoutParams) -> Option<usize> {
    labels.iter().rposition(|l| {
        x >= l.x && x <= l.x + params.width && y >= l.y && y <= l.y + params.height
    })
}

/// Move one label box by a drag delta, keeping it fully on the canvas. The
/// anchor stays put so the connector line still points at the defect.
pub fn move_label(label: &mut LabelBox, dx: f32, dy: f32, params: &LabelLayoutParams) {
    let max_x = (params.canvas_size - params.width).max(0.0);
    let max_y = (params.canvas_size - params.height).max(0.0);
    label.x = (label.x + dx).clamp(0.0, max_x);
    label.y = (label.y + dy).clamp(0.0, max_y);
}

/// Force-separation pass over all label pairs. Returns the number of
/// iterations actually run.
pub fn optimize_layout(labels: &mut [LabelBox], params: &LabelLayoutParams) -> usize {
    let w = params.width;
    let h = params.height;
    let total_area = w * h;

    for iteration in 0..params.max_iterations {
        let mut serious_overlap = false;

        for i in 0..labels.len() {
            for j in (i + 1)..labels.len() {
                if !rects_overlap(
                    labels[i].x,
                    labels[i].y,
                    w,
                    h,
                    labels[j].x,
                    labels[j].y,
                    w,
                    h,
                    params.min_distance,
                ) {
                    continue;
                }

                let area = overlap_area(
                    labels[i].x,
                    labels[i].y,
                    w,
                    h,
                    labels[j].x,
                    labels[j].y,
                    w,
                    h,
                );
                if area <= total_area * params.overlap_threshold {
                    continue;
                }
                serious_overlap = true;

                // Push both boxes apart along the line between their centers.
                let c1x = labels[i].x + w / 2.0;
                let c1y = labels[i].y + h / 2.0;
                let c2x = labels[j].x + w / 2.0;
                let c2y = labels[j].y + h / 2.0;

                let dx = c2x - c1x;
                let dy = c2y - c1y;
                let distance = (dx * dx + dy * dy).sqrt();
                // Coincident centers get no direction from the geometry;
                // separate them horizontally.
                let (nx, ny) = if distance < 1e-3 {
                    (1.0, 0.0)
                } else {
                    (dx / distance, dy / distance)
                };

                labels[i].x -= nx * params.push_distance;
                labels[i].y -= ny * params.push_distance;
                labels[j].x += nx * params.push_distance;
                labels[j].y += ny * params.push_distance;

                for k in [i, j] {
                    labels[k].x = labels[k]
                        .x
                        .clamp(EDGE_MARGIN, (params.canvas_size - w - EDGE_MARGIN).max(EDGE_MARGIN));
                    labels[k].y = labels[k]
                        .y
                        .clamp(EDGE_MARGIN, (params.canvas_size - h - EDGE_MARGIN).max(EDGE_MARGIN));
                }
            }
        }

        if !serious_overlap {
            return iteration + 1;
        }
    }

    params.max_iterations
}

/// One candidate for an info label, before sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedDefect {
    pub canvas_x: f32,
    pub canvas_y: f32,
    pub class: DefectClass,
    /// Index into the source defect list.
    pub source_index: usize,
    /// Number of merged defects this entry represents (1 = not a cluster).
    pub cluster_size: usize,
}

/// Bounds the number of info labels for huge selections: canvas-padding
/// filter, density-based sampling, then distance clustering with one
/// representative per cluster.
#[derive(Debug, Clone, Copy)]
pub struct InfoBoxSampler {
    pub max_boxes: usize,
    pub cluster_threshold: f32,
    pub canvas_padding: f32,
}

impl Default for InfoBoxSampler {
    fn default() -> Self {
        Self {
            max_boxes: 50,
            cluster_threshold: 30.0,
            canvas_padding: 50.0,
        }
    }
}

impl InfoBoxSampler {
    pub fn select(
        &self,
        candidates: Vec<SelectedDefect>,
        canvas_w: f32,
        canvas_h: f32,
    ) -> Vec<SelectedDefect> {
        let pad = self.canvas_padding;
        let mut filtered: Vec<SelectedDefect> = candidates
            .into_iter()
            .filter(|d| {
                d.canvas_x >= -pad
                    && d.canvas_x <= canvas_w + pad
                    && d.canvas_y >= -pad
                    && d.canvas_y <= canvas_h + pad
            })
            .collect();

        if filtered.len() > self.max_boxes {
            filtered = self.density_sample(filtered);
        }
        if filtered.len() > 10 {
            filtered = self.cluster(filtered);
        }
        filtered
    }

    /// Keep the points in the least crowded neighborhoods; dense clumps
    /// contribute little extra information per label.
    fn density_sample(&self, defects: Vec<SelectedDefect>) -> Vec<SelectedDefect> {
        let mut grid = SpatialGrid::new(100.0);
        for (i, d) in defects.iter().enumerate() {
            grid.insert(d.canvas_x, d.canvas_y, i);
        }

        let mut by_density: Vec<(usize, usize)> = defects
            .iter()
            .enumerate()
            .map(|(i, d)| (i, grid.nearby(d.canvas_x, d.canvas_y, 100.0).len()))
            .collect();
        by_density.sort_by_key(|&(i, density)| (density, i));

        by_density
            .into_iter()
            .take(self.max_boxes)
            .map(|(i, _)| defects[i])
            .collect()
    }

    /// Merge points closer than the cluster threshold, keeping the point
    /// nearest the cluster centroid as the representative.
    fn cluster(&self, defects: Vec<SelectedDefect>) -> Vec<SelectedDefect> {
        let mut visited = vec![false; defects.len()];
        let mut result = Vec::new();

        for i in 0..defects.len() {
            if visited[i] {
                continue;
            }
            visited[i] = true;
            let mut members = vec![i];

            for j in (i + 1)..defects.len() {
                if visited[j] {
                    continue;
                }
                let dx = defects[i].canvas_x - defects[j].canvas_x;
                let dy = defects[i].canvas_y - defects[j].canvas_y;
                if (dx * dx + dy * dy).sqrt() < self.cluster_threshold {
                    members.push(j);
                    visited[j] = true;
                }
            }

            if members.len() == 1 {
                result.push(defects[i]);
                continue;
            }

            let len = members.len() as f32;
            let centroid_x = members.iter().map(|&m| defects[m].canvas_x).sum::<f32>() / len;
            let centroid_y = members.iter().map(|&m| defects[m].canvas_y).sum::<f32>() / len;

            let representative = members
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    let da = (defects[a].canvas_x - centroid_x).powi(2)
                        + (defects[a].canvas_y - centroid_y).powi(2);
                    let db = (defects[b].canvas_x - centroid_x).powi(2)
                        + (defects[b].canvas_y - centroid_y).powi(2);
                    da.total_cmp(&db)
                })
                .expect("cluster has members");

            let mut merged = defects[representative];
            merged.cluster_size = members.len();
            result.push(merged);
        }

        result
    }
}
