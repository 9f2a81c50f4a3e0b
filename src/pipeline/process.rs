// SPDX-License-Identifier: MIT

//! The per-frame defect processor.
//!
//! For each defect: pre-sampling stride gate, die lookup, canvas position,
//! viewport cull, pixel dedup / budget gate, then bucketing by class color
//! so the renderer can batch one path per color. Also hosts the one-shot
//! background job used to move this work off the UI thread for very large
//! sets.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{debug, warn};

use crate::defect::{Defect, DieKey};
use crate::error::DataError;
use crate::pipeline::{DecimationPlan, FrameStats, ViewTransform, Viewport};
use crate::render::{Dot, Rgba};
use crate::wafer::{DiePosition, VIEWPORT_MARGIN};

/// Everything one processing pass needs besides the defects themselves.
#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    pub viewport: Viewport,
    pub transform: ViewTransform,
    /// Die footprint in pixels at zoom 1.
    pub die_px_w: f32,
    pub die_px_h: f32,
    pub visible_die_count: usize,
    /// Default dot radius in pixels at zoom 1, used when a defect carries no
    /// size of its own.
    pub base_dot_radius: f32,
    /// Pixels per mm, for defects that do carry a physical size.
    pub scale: f32,
    pub enable_culling: bool,
    pub enable_decimation: bool,
    pub max_render: usize,
}

/// Color-grouped output of one pass, in screen space, ready to draw.
#[derive(Debug, Clone, Default)]
pub struct ProcessedFrame {
    pub groups: Vec<(Rgba, Vec<Dot>)>,
    pub stats: FrameStats,
}

impl ProcessedFrame {
    pub fn rendered_count(&self) -> usize {
        self.groups.iter().map(|(_, dots)| dots.len()).sum()
    }
}

/// Owns the die lookup map and runs processing passes against it.
#[derive(Debug, Clone, Default)]
pub struct DefectProcessor {
    die_map: HashMap<DieKey, (f32, f32)>,
}

impl DefectProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the die lookup map. Must be called whenever the die grid
    /// changes; positions are in base canvas space.
    pub fn build_die_map(&mut self, positions: &[DiePosition]) {
        let mut map = HashMap::with_capacity(positions.len());
        for die in positions {
            map.insert((die.row, die.col), (die.canvas_x, die.canvas_y));
        }
        self.die_map = map;
    }

    pub fn die_count(&self) -> usize {
        self.die_map.len()
    }

    pub fn clear(&mut self) {
        self.die_map.clear();
    }

    /// One synchronous processing pass. All-or-nothing: on error no partial
    /// frame is returned.
    pub fn process(
        &self,
        defects: &[Defect],
        options: &ProcessOptions,
    ) -> Result<ProcessedFrame, DataError> {
        let start = Instant::now();

        if !options.transform.zoom.is_finite() || options.transform.zoom <= 0.0 {
            return Err(DataError::processing(
                "defect processing",
                format!("non-positive zoom {}", options.transform.zoom),
            ));
        }
        if self.die_map.is_empty() && !defects.is_empty() {
            return Err(DataError::processing(
                "defect processing",
                "die map is empty; build_die_map must run before processing",
            ));
        }

        let zoom = options.transform.zoom;
        let plan = if options.enable_decimation {
            DecimationPlan::compute(
                defects.len(),
                options.visible_die_count,
                options.die_px_w * zoom,
                options.die_px_h * zoom,
                options.max_render,
            )
        } else {
            DecimationPlan::keep_all(options.max_render)
        };

        let mut groups: HashMap<Rgba, Vec<Dot>> = HashMap::new();
        let mut occupied: HashSet<(i32, i32)> = HashSet::new();
        let mut rendered = 0usize;
        let mut skipped = 0usize;

        for (i, defect) in defects.iter().enumerate() {
            if !plan.keeps(i) {
                skipped += 1;
                continue;
            }

            let Some(&(die_x, die_y)) = self.die_map.get(&defect.die_key()) else {
                skipped += 1;
                continue;
            };

            // Base canvas position inside the die.
            let world_x = die_x + defect.x * options.die_px_w;
            let world_y = die_y + defect.y * options.die_px_h;

            if options.enable_culling && !options.viewport.contains(world_x, world_y, VIEWPORT_MARGIN)
            {
                skipped += 1;
                continue;
            }

            let (screen_x, screen_y) = options.transform.to_screen(world_x, world_y);

            if plan.pixel_dedup {
                let key = (screen_x.round() as i32, screen_y.round() as i32);
                if !occupied.insert(key) {
                    skipped += 1;
                    continue;
                }
            }

            if rendered >= plan.budget {
                skipped += 1;
                continue;
            }

            let radius = match defect.size {
                Some(size) => size * options.scale * zoom,
                None => options.base_dot_radius * zoom,
            };

            groups.entry(defect.class.color()).or_default().push(Dot {
                x: screen_x,
                y: screen_y,
                radius,
            });
            rendered += 1;
        }

        // Deterministic group order regardless of hash state.
        let mut groups: Vec<(Rgba, Vec<Dot>)> = groups.into_iter().collect();
        groups.sort_by_key(|(color, _)| (color.r, color.g, color.b, color.a));

        let stats = FrameStats {
            total: defects.len(),
            rendered,
            skipped,
            stride: plan.stride,
            pixel_capacity: plan.capacity,
            budget: plan.budget,
            processing_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        debug!(
            "defects processed: total={}, rendered={}, skipped={}, stride={}, time={:.2} ms",
            stats.total, stats.rendered, stats.skipped, stats.stride, stats.processing_ms
        );

        Ok(ProcessedFrame {
            groups,
            stats,
        })
    }
}

/// A one-shot background processing job: the full parameter set goes in
/// once, a single completion message comes back. There is no cancellation;
/// a caller that wants only the latest result must guard against overlapping
/// submissions itself.
pub struct ProcessJob {
    receiver: mpsc::Receiver<Result<ProcessedFrame, DataError>>,
}

impl ProcessJob {
    pub fn spawn(
        processor: DefectProcessor,
        defects: Arc<Vec<Defect>>,
        options: ProcessOptions,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let result = processor.process(&defects, &options);
            // The receiver may have been dropped; nothing to do then.
            let _ = sender.send(result);
        });
        Self { receiver }
    }

    /// Non-blocking poll. Returns `None` while the job is still running and
    /// a terminal result exactly once.
    pub fn try_take(&mut self) -> Option<Result<ProcessedFrame, DataError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                warn!("defect processing job disconnected before sending a result");
                Some(Err(DataError::processing(
                    "background processing",
                    "worker exited without a result",
                )))
            }
        }
    }
}
