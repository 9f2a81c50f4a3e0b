// SPDX-License-Identifier: MIT

use eframe::egui;
use rfd::FileDialog;

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use wafermap_viewer::defect::{loader, Defect, DefectClass, DefectIndex, DefectSet};
use wafermap_viewer::export;
use wafermap_viewer::interact::labels::{
    init_label_position, label_at, move_label, optimize_layout, InfoBoxSampler, LabelBox,
    LabelLayoutParams, SelectedDefect,
};
use wafermap_viewer::interact::{
    DieInfo, InteractionController, InteractionEvent, PointerButton, Scene,
};
use wafermap_viewer::klarf::KlarfReader;
use wafermap_viewer::pipeline::{DefectProcessor, ProcessJob, ProcessOptions, ProcessedFrame};
use wafermap_viewer::render::{
    background::render_background, defects::render_defects, overlay::render_overlay, Dot, DotShape,
    Layer, LayerStack, Rgba, Surface,
};
use wafermap_viewer::wafer::{
    preset_150mm, preset_200mm, preset_300mm, DieGrid, RenderOptions, WaferConfig, VIEWPORT_MARGIN,
};

/// Defect counts at or above this run processing on a worker thread.
const ASYNC_PROCESS_THRESHOLD: usize = 100_000;

/// Horizontal gap between a defect and its info label.
const LABEL_ANCHOR_OFFSET: f32 = 20.0;

/// File loading state
#[derive(Debug, Clone, Default)]
enum LoadingState {
    #[default]
    Idle,
    Loading {
        file_name: String,
        start_time: Instant,
        show_progress: bool,
    },
}

/// File loading result message
#[derive(Debug)]
enum LoadingMessage {
    // DefectSet plus the wafer diameter declared by the file, if any.
    DefectsLoaded(Result<(DefectSet, Option<f64>), String>, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefectFileKind {
    Klarf,
    Csv,
}

/// [`Surface`] adapter over an egui painter. Clearing is a no-op because
/// egui repaints the whole canvas every frame anyway.
struct EguiSurface {
    painter: egui::Painter,
    origin: egui::Pos2,
    width: f32,
    height: f32,
}

fn color32(c: Rgba) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

impl EguiSurface {
    fn at(&self, x: f32, y: f32) -> egui::Pos2 {
        egui::pos2(self.origin.x + x, self.origin.y + y)
    }
}

impl Surface for EguiSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {}

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, fill: Rgba) {
        self.painter.circle_filled(self.at(cx, cy), radius, color32(fill));
    }

    fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, width: f32, color: Rgba) {
        self.painter.circle_stroke(
            self.at(cx, cy),
            radius,
            egui::Stroke::new(width, color32(color)),
        );
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: Rgba) {
        let rect = egui::Rect::from_min_size(self.at(x, y), egui::vec2(w, h));
        self.painter.rect_filled(rect, 0.0, color32(fill));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, color: Rgba, dashed: bool) {
        let rect = egui::Rect::from_min_size(self.at(x, y), egui::vec2(w, h));
        let stroke = egui::Stroke::new(width, color32(color));
        if dashed {
            let corners = [
                rect.left_top(),
                rect.right_top(),
                rect.right_bottom(),
                rect.left_bottom(),
                rect.left_top(),
            ];
            for pair in corners.windows(2) {
                self.painter
                    .extend(egui::Shape::dashed_line(pair, stroke, 6.0, 4.0));
            }
        } else {
            self.painter
                .rect_stroke(rect, 0.0, stroke, egui::StrokeKind::Middle);
        }
    }

    fn fill_triangle(&mut self, points: [(f32, f32); 3], fill: Rgba, stroke_width: f32, stroke: Rgba) {
        let points = points.iter().map(|&(x, y)| self.at(x, y)).collect();
        self.painter.add(egui::epaint::Shape::convex_polygon(
            points,
            color32(fill),
            egui::Stroke::new(stroke_width, color32(stroke)),
        ));
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32, color: Rgba) {
        self.painter.line_segment(
            [self.at(x1, y1), self.at(x2, y2)],
            egui::Stroke::new(width, color32(color)),
        );
    }

    fn text(&mut self, x: f32, y: f32, text: &str, size: f32, color: Rgba) {
        self.painter.text(
            self.at(x, y),
            egui::Align2::LEFT_TOP,
            text,
            egui::FontId::proportional(size),
            color32(color),
        );
    }

    fn fill_dots(&mut self, dots: &[Dot], shape: DotShape, fill: Rgba, stroke: Option<(f32, Rgba)>) {
        let fill = color32(fill);
        match shape {
            DotShape::Circle => {
                let stroke = stroke
                    .map(|(w, c)| egui::Stroke::new(w, color32(c)))
                    .unwrap_or(egui::Stroke::NONE);
                for dot in dots {
                    self.painter
                        .circle(self.at(dot.x, dot.y), dot.radius, fill, stroke);
                }
            }
            DotShape::Square => {
                for dot in dots {
                    let side = (dot.radius * 2.0).max(1.0);
                    let rect = egui::Rect::from_center_size(
                        self.at(dot.x, dot.y),
                        egui::Vec2::splat(side),
                    );
                    self.painter.rect_filled(rect, 0.0, fill);
                }
            }
        }
    }
}

pub struct WaferMapViewer {
    config: WaferConfig,
    options: RenderOptions,

    grid: Option<DieGrid>,
    defects: Option<Arc<Vec<Defect>>>,
    defect_file_path: Option<String>,
    index: DefectIndex,
    processor: DefectProcessor,
    controller: InteractionController,

    cached_frame: Option<ProcessedFrame>,
    process_job: Option<ProcessJob>,
    // A frame request arrived while a job was already in flight.
    frame_pending: bool,

    grid_dirty: bool,
    frame_dirty: bool,
    canvas_size: f32,

    selection: Vec<DieInfo>,
    labels: Vec<LabelBox>,
    // Index into `labels` while the user drags an info box.
    dragging_label: Option<usize>,
    clicked_die: Option<DieInfo>,
    hovered_die: Option<DieInfo>,

    synthetic_count: usize,

    error_message: Option<String>,
    success_message: Option<String>,

    // Async loading state
    loading_state: LoadingState,
    loading_receiver: Option<mpsc::Receiver<LoadingMessage>>,
}

impl WaferMapViewer {
    pub fn new() -> Self {
        let options = RenderOptions::default();
        Self {
            config: preset_300mm(),
            controller: InteractionController::new(options.clone()),
            options,
            grid: None,
            defects: None,
            defect_file_path: None,
            index: DefectIndex::default(),
            processor: DefectProcessor::new(),
            cached_frame: None,
            process_job: None,
            frame_pending: false,
            grid_dirty: true,
            frame_dirty: false,
            canvas_size: 0.0,
            selection: Vec::new(),
            labels: Vec::new(),
            dragging_label: None,
            clicked_die: None,
            hovered_die: None,
            synthetic_count: 10_000,
            error_message: None,
            success_message: None,
            loading_state: LoadingState::Idle,
            loading_receiver: None,
        }
    }

    fn check_loading_progress(&mut self, ctx: &egui::Context) {
        // Show the progress bar only for loads that take longer than 500ms
        if let LoadingState::Loading {
            start_time,
            show_progress,
            ..
        } = &mut self.loading_state
        {
            if !*show_progress && start_time.elapsed() >= Duration::from_millis(500) {
                *show_progress = true;
                ctx.request_repaint();
            }
        }

        if let Some(receiver) = &self.loading_receiver {
            match receiver.try_recv() {
                Ok(message) => {
                    self.loading_state = LoadingState::Idle;
                    self.loading_receiver = None;

                    match message {
                        LoadingMessage::DefectsLoaded(result, path) => match result {
                            Ok((set, diameter)) => {
                                self.apply_defect_set(set, diameter, path);
                            }
                            Err(error) => {
                                self.error_message = Some(error);
                            }
                        },
                    }
                    ctx.request_repaint();
                }
                Err(mpsc::TryRecvError::Empty) => {
                    // No message yet, keep waiting
                }
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.loading_state = LoadingState::Idle;
                    self.loading_receiver = None;
                    self.error_message = Some("File loading was interrupted".to_string());
                    ctx.request_repaint();
                }
            }
        }
    }

    fn start_defect_file_loading(&mut self, path: String, kind: DefectFileKind) {
        let file_name = std::path::Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());

        self.loading_state = LoadingState::Loading {
            file_name,
            start_time: Instant::now(),
            show_progress: false,
        };

        let (sender, receiver) = mpsc::channel();
        self.loading_receiver = Some(receiver);

        thread::spawn(move || {
            let result = load_defect_file(&path, kind).map_err(|e| e.to_string());
            let _ = sender.send(LoadingMessage::DefectsLoaded(result, path));
        });
    }

    fn apply_defect_set(&mut self, set: DefectSet, diameter: Option<f64>, path: String) {
        if let Some(d) = diameter {
            if (d - self.config.diameter).abs() > 1e-9 {
                log::info!("defect file declares {d} mm wafer, updating config");
                self.config.diameter = d;
                self.grid_dirty = true;
            }
        }

        let defects = set.into_defects();
        let count = defects.len();
        self.index = DefectIndex::build(&defects);
        if let Some(grid) = &self.grid {
            self.index.build_die_positions(&grid.positions);
        }
        self.defects = Some(Arc::new(defects));
        self.defect_file_path = Some(path);

        self.selection.clear();
        self.labels.clear();
        self.clicked_die = None;
        self.hovered_die = None;
        self.cached_frame = None;
        self.frame_dirty = true;
        self.success_message = Some(format!("Loaded {count} defects"));
    }

    fn close_defect_file(&mut self) {
        self.defects = None;
        self.defect_file_path = None;
        self.index = DefectIndex::default();
        self.cached_frame = None;
        self.selection.clear();
        self.labels.clear();
        self.clicked_die = None;
        self.hovered_die = None;
    }

    /// Deterministic sample data so the viewer is usable without a file.
    fn generate_synthetic_defects(&mut self) {
        let defects = {
            let Some(grid) = &self.grid else {
                self.error_message = Some("Generate a die grid first".to_string());
                return;
            };
            if grid.positions.is_empty() {
                self.error_message = Some("The die grid has no dies".to_string());
                return;
            }

            let mut state: u64 = 0x2545_F491_4F6C_DD1D;
            let mut next = move || {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 40) as f32) / (1u64 << 24) as f32
            };

            let mut defects = Vec::with_capacity(self.synthetic_count);
            for _ in 0..self.synthetic_count {
                let pick = (next() * grid.positions.len() as f32) as usize % grid.positions.len();
                let die = &grid.positions[pick];
                defects.push(Defect {
                    die_row: die.row,
                    die_col: die.col,
                    x: next().clamp(0.0, 1.0),
                    y: next().clamp(0.0, 1.0),
                    class: DefectClass::from_code((next() * 6.0) as u32 + 1),
                    size: None,
                });
            }
            defects
        };

        match DefectSet::new(defects) {
            Ok(set) => self.apply_defect_set(set, None, "synthetic".to_string()),
            Err(e) => self.error_message = Some(e.to_string()),
        }
    }

    fn handle_export_selection(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("CSV files", &["csv"])
            .set_file_name("selection.csv")
            .save_file()
        {
            match export::export_selection_to_csv(&self.selection, &path) {
                Ok(()) => {
                    self.success_message = Some(format!(
                        "Exported {} dies to {}",
                        self.selection.len(),
                        path.display()
                    ));
                }
                Err(e) => {
                    self.error_message = Some(format!("Failed to export selection: {e}"));
                }
            }
        }
    }

    fn rebuild_grid(&mut self) {
        self.grid_dirty = false;
        if self.canvas_size <= 0.0 {
            return;
        }
        match DieGrid::generate(&self.config, self.canvas_size) {
            Ok(grid) => {
                self.index.build_die_positions(&grid.positions);
                self.processor.build_die_map(&grid.positions);
                self.grid = Some(grid);
                self.frame_dirty = true;
            }
            Err(e) => {
                self.grid = None;
                self.cached_frame = None;
                self.error_message = Some(e.to_string());
            }
        }
    }

    /// Recompute the defect frame for the current view, synchronously for
    /// small data and on a worker thread for large data. Only one job runs
    /// at a time; requests arriving in between are coalesced.
    fn refresh_frame(&mut self) {
        if self.process_job.is_some() {
            self.frame_pending = true;
            return;
        }
        let Some(grid) = &self.grid else {
            self.cached_frame = None;
            return;
        };
        let Some(defects) = &self.defects else {
            self.cached_frame = None;
            return;
        };
        let defects = Arc::clone(defects);

        let transform = self.controller.transform(self.canvas_size);
        let viewport = transform.visible(self.canvas_size, self.canvas_size);
        let visible_die_count = grid
            .positions
            .iter()
            .filter(|d| viewport.contains(d.canvas_x, d.canvas_y, VIEWPORT_MARGIN))
            .count();

        let options = ProcessOptions {
            viewport,
            transform,
            die_px_w: grid.die_px_w,
            die_px_h: grid.die_px_h,
            visible_die_count,
            base_dot_radius: (self.options.defect_size * grid.scale as f64) as f32,
            scale: grid.scale,
            enable_culling: self.options.enable_viewport_culling,
            enable_decimation: self.options.enable_data_decimation,
            max_render: self.options.max_defects_to_render,
        };

        if defects.len() >= ASYNC_PROCESS_THRESHOLD {
            self.process_job = Some(ProcessJob::spawn(
                self.processor.clone(),
                defects,
                options,
            ));
        } else {
            match self.processor.process(&defects, &options) {
                Ok(frame) => self.cached_frame = Some(frame),
                Err(e) => self.error_message = Some(e.to_string()),
            }
        }
    }

    /// Rebuild the info labels for the current selection in screen space.
    fn build_labels(&mut self) {
        self.labels.clear();
        self.dragging_label = None;
        if self.selection.is_empty() {
            return;
        }
        let Some(grid) = &self.grid else { return };
        let Some(defects) = &self.defects else { return };

        let transform = self.controller.transform(self.canvas_size);
        let mut candidates = Vec::new();
        for die in &self.selection {
            let Some((die_x, die_y)) = self.index.die_position(die.row, die.col) else {
                continue;
            };
            for &idx in self.index.defects_on_die(die.row, die.col) {
                let defect = &defects[idx as usize];
                let world_x = die_x + defect.x * grid.die_px_w;
                let world_y = die_y + defect.y * grid.die_px_h;
                let (sx, sy) = transform.to_screen(world_x, world_y);
                candidates.push(SelectedDefect {
                    canvas_x: sx,
                    canvas_y: sy,
                    class: defect.class,
                    source_index: idx as usize,
                    cluster_size: 1,
                });
            }
        }

        let sampler = InfoBoxSampler::default();
        let chosen = sampler.select(candidates, self.canvas_size, self.canvas_size);
        let params = LabelLayoutParams::for_canvas(self.canvas_size);

        let mut labels = Vec::with_capacity(chosen.len());
        for sel in chosen {
            let defect = &defects[sel.source_index];
            let mut lines = vec![
                format!(
                    "{} @ die ({}, {})",
                    defect.class.label(),
                    defect.die_row,
                    defect.die_col
                ),
                format!("in-die ({:.2}, {:.2})", defect.x, defect.y),
            ];
            if sel.cluster_size > 1 {
                lines.push(format!("cluster of {}", sel.cluster_size));
            }
            let (x, y) = init_label_position(
                sel.canvas_x,
                sel.canvas_y,
                params.width,
                params.height,
                self.canvas_size,
                LABEL_ANCHOR_OFFSET,
            );
            labels.push(LabelBox {
                anchor_x: sel.canvas_x,
                anchor_y: sel.canvas_y,
                x,
                y,
                lines,
            });
        }
        optimize_layout(&mut labels, &params);
        self.labels = labels;
    }

    fn handle_event(&mut self, event: InteractionEvent) {
        match event {
            InteractionEvent::Zoom(zoom) => {
                log::debug!("zoom set to {zoom:.2}");
                self.frame_dirty = true;
            }
            InteractionEvent::Pan(_, _) => {
                self.frame_dirty = true;
            }
            InteractionEvent::Selection(dies) => {
                self.selection = dies;
                self.clicked_die = None;
                self.build_labels();
            }
            InteractionEvent::DieClick(info) => {
                self.clicked_die = Some(info);
            }
            InteractionEvent::DieHover(info) => {
                self.hovered_die = info;
            }
        }
    }

    fn render_menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open KLARF Defect File").clicked() {
                    if let Some(path) = FileDialog::new()
                        .add_filter("KLARF files", &["klarf", "001", "txt"])
                        .pick_file()
                    {
                        self.start_defect_file_loading(
                            path.to_string_lossy().to_string(),
                            DefectFileKind::Klarf,
                        );
                    }
                    ui.close_menu();
                }

                if ui.button("Open CSV Defect File").clicked() {
                    if let Some(path) = FileDialog::new()
                        .add_filter("CSV files", &["csv"])
                        .pick_file()
                    {
                        self.start_defect_file_loading(
                            path.to_string_lossy().to_string(),
                            DefectFileKind::Csv,
                        );
                    }
                    ui.close_menu();
                }

                ui.separator();

                if ui
                    .add_enabled(
                        !self.selection.is_empty(),
                        egui::Button::new("Export Selection to CSV"),
                    )
                    .clicked()
                {
                    self.handle_export_selection();
                    ui.close_menu();
                }

                ui.separator();

                if ui.button("Close Defect File").clicked() {
                    self.close_defect_file();
                    ui.close_menu();
                }

                ui.separator();

                if ui.button("Exit").clicked() {
                    ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("View", |ui| {
                if ui
                    .checkbox(&mut self.options.show_defects, "Show Defects")
                    .changed()
                {
                    self.frame_dirty = true;
                }
                if ui
                    .checkbox(&mut self.config.show_reticle_border, "Show Reticle Borders")
                    .changed()
                {
                    self.frame_dirty = true;
                }
                ui.separator();
                if ui.button("Reset View").clicked() {
                    self.controller.reset_view();
                    self.frame_dirty = true;
                    ui.close_menu();
                }
            });
        });
    }

    fn render_side_panel(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.heading("Data");
            if let Some(path) = &self.defect_file_path {
                ui.label(format!("Defects: {path}"));
            } else {
                ui.label("No defect data loaded");
            }
            ui.horizontal(|ui| {
                ui.label("Synthetic count:");
                ui.add(
                    egui::DragValue::new(&mut self.synthetic_count)
                        .speed(1000)
                        .range(1..=2_000_000),
                );
            });
            if ui.button("Generate Synthetic Defects").clicked() {
                self.generate_synthetic_defects();
            }

            ui.separator();
            ui.heading("Wafer");

            ui.horizontal(|ui| {
                if ui.button("300 mm").clicked() {
                    self.config = preset_300mm();
                    self.grid_dirty = true;
                }
                if ui.button("200 mm").clicked() {
                    self.config = preset_200mm();
                    self.grid_dirty = true;
                }
                if ui.button("150 mm").clicked() {
                    self.config = preset_150mm();
                    self.grid_dirty = true;
                }
            });

            let mut changed = false;
            egui::Grid::new("wafer_config").num_columns(2).show(ui, |ui| {
                ui.label("Diameter (mm)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.diameter).speed(1.0).range(10.0..=450.0))
                    .changed();
                ui.end_row();

                ui.label("Edge exclusion (mm)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.edge_exclusion).speed(0.1).range(0.0..=50.0))
                    .changed();
                ui.end_row();

                ui.label("Die width (mm)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.die_width).speed(0.1).range(0.1..=100.0))
                    .changed();
                ui.end_row();

                ui.label("Die height (mm)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.die_height).speed(0.1).range(0.1..=100.0))
                    .changed();
                ui.end_row();

                ui.label("Scribe line X (mm)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.scribe_line_x).speed(0.01).range(0.0..=5.0))
                    .changed();
                ui.end_row();

                ui.label("Scribe line Y (mm)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.scribe_line_y).speed(0.01).range(0.0..=5.0))
                    .changed();
                ui.end_row();

                ui.label("Die offset X (mm)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.die_offset_x).speed(0.1))
                    .changed();
                ui.end_row();

                ui.label("Die offset Y (mm)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.die_offset_y).speed(0.1))
                    .changed();
                ui.end_row();

                ui.label("Reticle X (dies)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.reticle_x).range(1..=20))
                    .changed();
                ui.end_row();

                ui.label("Reticle Y (dies)");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.reticle_y).range(1..=20))
                    .changed();
                ui.end_row();
            });
            if changed {
                self.grid_dirty = true;
            }

            ui.separator();
            ui.heading("Rendering");

            let mut options_changed = false;
            options_changed |= ui
                .checkbox(&mut self.options.enable_viewport_culling, "Viewport culling")
                .changed();
            options_changed |= ui
                .checkbox(&mut self.options.enable_data_decimation, "Data decimation")
                .changed();
            ui.horizontal(|ui| {
                ui.label("Max rendered defects:");
                options_changed |= ui
                    .add(
                        egui::DragValue::new(&mut self.options.max_defects_to_render)
                            .speed(500)
                            .range(100..=500_000),
                    )
                    .changed();
            });
            ui.horizontal(|ui| {
                ui.label("Defect size (mm):");
                options_changed |= ui
                    .add(
                        egui::DragValue::new(&mut self.options.defect_size)
                            .speed(0.05)
                            .range(0.05..=5.0),
                    )
                    .changed();
            });
            ui.checkbox(&mut self.options.enable_zoom, "Zoom");
            ui.checkbox(&mut self.options.enable_pan, "Pan");
            ui.checkbox(&mut self.options.enable_selection, "Selection");
            ui.checkbox(&mut self.options.enable_tooltip, "Hover info");
            self.controller.set_options(self.options.clone());
            if options_changed {
                self.frame_dirty = true;
            }

            ui.separator();
            ui.heading("Statistics");
            if let Some(grid) = &self.grid {
                ui.label(format!("Dies: {}", grid.positions.len()));
                ui.label(format!("Scale: {:.2} px/mm", grid.scale));
            }
            let stats = self.index.stats();
            if stats.total_defects > 0 {
                ui.label(format!("Defects: {}", stats.total_defects));
                ui.label(format!("Dies with defects: {}", stats.die_count));
                ui.label(format!("Max per die: {}", stats.max_defects_per_die));
                ui.label(format!("Index build: {:.1} ms", stats.build_ms));
            }
            if let Some(frame) = &self.cached_frame {
                ui.label(format!(
                    "Rendered: {} / {}",
                    frame.stats.rendered, frame.stats.total
                ));
                ui.label(format!("Stride: {}", frame.stats.stride));
                ui.label(format!("Budget: {}", frame.stats.budget));
                ui.label(format!("Processing: {:.2} ms", frame.stats.processing_ms));
            }
            ui.label(format!("Zoom: {:.2}x", self.controller.zoom()));

            if !self.selection.is_empty() {
                ui.separator();
                ui.heading("Selection");
                let total: usize = self.selection.iter().map(|d| d.defects.len()).sum();
                ui.label(format!(
                    "{} dies, {} defects",
                    self.selection.len(),
                    total
                ));
            }

            if let Some(die) = &self.clicked_die {
                ui.separator();
                ui.heading("Die Details");
                ui.monospace(format!("Die ({}, {})", die.row, die.col));
                ui.monospace(format!(
                    "Center ({:.2}, {:.2}) mm",
                    die.physical_x, die.physical_y
                ));
                ui.monospace(format!("Defects: {}", die.defects.len()));
                for class in DefectClass::ALL {
                    let count = die.defects.iter().filter(|d| d.class == class).count();
                    if count > 0 {
                        ui.monospace(format!("  {}: {count}", class.label()));
                    }
                }
            }
        });
    }

    fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_size();
        let side = available.x.min(available.y).max(64.0);
        let (response, painter) =
            ui.allocate_painter(egui::Vec2::splat(side), egui::Sense::click_and_drag());
        let rect = response.rect;

        if (side - self.canvas_size).abs() > 0.5 {
            self.canvas_size = side;
            self.grid_dirty = true;
        }
        if self.grid_dirty {
            self.rebuild_grid();
        }

        // Route pointer input into the interaction controller.
        let mut events: Vec<InteractionEvent> = Vec::new();
        if let Some(grid) = &self.grid {
            let defects_slice: &[Defect] =
                self.defects.as_ref().map(|d| d.as_slice()).unwrap_or(&[]);
            let scene = || Scene {
                grid,
                index: &self.index,
                defects: defects_slice,
            };
            let local = |pos: egui::Pos2| (pos.x - rect.min.x, pos.y - rect.min.y);

            if response.drag_started() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let (x, y) = local(pos);
                    let button = if response.drag_started_by(egui::PointerButton::Secondary) {
                        PointerButton::Secondary
                    } else {
                        PointerButton::Primary
                    };
                    // A primary drag starting on an info box moves the box,
                    // not the selection rectangle.
                    if button == PointerButton::Primary {
                        let params = LabelLayoutParams::for_canvas(side);
                        self.dragging_label = label_at(&self.labels, x, y, &params);
                    }
                    if self.dragging_label.is_none() {
                        self.controller.pointer_down(x, y, button);
                    }
                }
            }
            if response.dragged() {
                if let Some(i) = self.dragging_label {
                    let delta = response.drag_delta();
                    let params = LabelLayoutParams::for_canvas(side);
                    if let Some(label) = self.labels.get_mut(i) {
                        move_label(label, delta.x, delta.y, &params);
                    }
                } else if let Some(pos) = response.interact_pointer_pos() {
                    let (x, y) = local(pos);
                    if let Some(e) = self.controller.pointer_move(x, y, side, scene()) {
                        events.push(e);
                    }
                }
            }
            if response.drag_stopped() {
                if self.dragging_label.take().is_none() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let (x, y) = local(pos);
                        if let Some(e) = self.controller.pointer_up(x, y, side, scene()) {
                            events.push(e);
                        }
                    }
                }
            }
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let (x, y) = local(pos);
                    if let Some(e) = self.controller.click(x, y, side, scene()) {
                        events.push(e);
                    }
                }
            }
            if let Some(pos) = response.hover_pos() {
                if !response.dragged() {
                    let (x, y) = local(pos);
                    if let Some(e) = self.controller.pointer_move(x, y, side, scene()) {
                        events.push(e);
                    }
                }
                let scroll = ui.input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    if let Some(e) = self.controller.wheel(scroll) {
                        events.push(e);
                    }
                }
            } else if !self.controller.is_panning() {
                self.controller.pointer_leave();
                self.hovered_die = None;
            }
        }
        for event in events {
            self.handle_event(event);
        }

        if self.frame_dirty {
            self.frame_dirty = false;
            self.refresh_frame();
            self.build_labels();
        }

        // Paint the three layers back to front. A failing layer is skipped
        // for this frame, the others still paint.
        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(250, 250, 250));

        if let Some(grid) = &self.grid {
            let stack = LayerStack::init(|_| {
                Ok(EguiSurface {
                    painter: painter.clone(),
                    origin: rect.min,
                    width: side,
                    height: side,
                })
            });
            match stack {
                Ok(mut stack) => {
                    let transform = self.controller.transform(side);
                    if let Err(e) = render_background(
                        stack.get_mut(Layer::Background),
                        &self.config,
                        grid,
                        &transform,
                    ) {
                        log::error!("{e}");
                    }
                    if self.options.show_defects {
                        if let Some(frame) = &self.cached_frame {
                            if let Err(e) = render_defects(stack.get_mut(Layer::Defects), frame) {
                                log::error!("{e}");
                            }
                        }
                    }
                    let params = LabelLayoutParams::for_canvas(side);
                    if let Err(e) = render_overlay(
                        stack.get_mut(Layer::Interaction),
                        self.controller.selection_rect(),
                        &self.labels,
                        &params,
                    ) {
                        log::error!("{e}");
                    }
                }
                Err(e) => {
                    log::error!("{e}");
                }
            }
        } else {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No die grid (check wafer configuration)",
                egui::FontId::proportional(16.0),
                egui::Color32::DARK_GRAY,
            );
        }

        // Hover status line in the lower-left canvas corner.
        if let Some(die) = &self.hovered_die {
            painter.text(
                egui::pos2(rect.min.x + 8.0, rect.max.y - 20.0),
                egui::Align2::LEFT_TOP,
                format!(
                    "die ({}, {}): {} defects",
                    die.row,
                    die.col,
                    die.defects.len()
                ),
                egui::FontId::monospace(12.0),
                egui::Color32::DARK_GRAY,
            );
        }

        if self.process_job.is_some() {
            painter.text(
                egui::pos2(rect.min.x + 8.0, rect.min.y + 8.0),
                egui::Align2::LEFT_TOP,
                "processing defects...",
                egui::FontId::monospace(12.0),
                egui::Color32::DARK_GRAY,
            );
        }
    }
}

impl Default for WaferMapViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl eframe::App for WaferMapViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_loading_progress(ctx);

        // Poll the background processing job, if any.
        if let Some(job) = &mut self.process_job {
            match job.try_take() {
                Some(result) => {
                    self.process_job = None;
                    match result {
                        Ok(frame) => self.cached_frame = Some(frame),
                        Err(e) => self.error_message = Some(e.to_string()),
                    }
                    if self.frame_pending {
                        self.frame_pending = false;
                        self.refresh_frame();
                    }
                    ctx.request_repaint();
                }
                None => {
                    ctx.request_repaint_after(Duration::from_millis(50));
                }
            }
        }

        if let Some(error) = &self.error_message.clone() {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.colored_label(egui::Color32::from_rgb(244, 67, 54), error);
                    ui.separator();
                    ui.horizontal(|ui| {
                        ui.allocate_space(egui::Vec2::new(ui.available_width() / 2.0 - 25.0, 0.0));
                        if ui.button("OK").clicked() {
                            self.error_message = None;
                        }
                    });
                });
        }

        if let Some(success) = &self.success_message.clone() {
            egui::Window::new("Success")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.colored_label(egui::Color32::from_rgb(76, 175, 80), success);
                    ui.separator();
                    ui.horizontal(|ui| {
                        ui.allocate_space(egui::Vec2::new(ui.available_width() / 2.0 - 25.0, 0.0));
                        if ui.button("OK").clicked() {
                            self.success_message = None;
                        }
                    });
                });
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.render_menu_bar(ui);
        });

        if let LoadingState::Loading {
            file_name,
            start_time,
            show_progress,
        } = &self.loading_state
        {
            if *show_progress {
                egui::TopBottomPanel::top("loading_bar").show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(format!("Loading defect file: {file_name}"));
                        ui.label(format!("({:.1}s)", start_time.elapsed().as_secs_f32()));
                    });
                });
            }
        }

        egui::SidePanel::left("left_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                self.render_side_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Wafer Map");
            self.render_canvas(ui);
        });
    }
}

fn load_defect_file(
    path: &str,
    kind: DefectFileKind,
) -> Result<(DefectSet, Option<f64>), wafermap_viewer::error::DataError> {
    match kind {
        DefectFileKind::Klarf => {
            let file = KlarfReader::new().read(path)?;
            let set = DefectSet::new(file.to_defects()?)?;
            Ok((set, file.sample_size_mm))
        }
        DefectFileKind::Csv => {
            let set = loader::load_defects_csv(path)?;
            Ok((set, None))
        }
    }
}
