// ui.rs - egui front end: drains the state stream and paints two panels,
// liveness on the left and each cell's current generation on the right.

use eframe::egui;
use egui::{Color32, Rect, Stroke, Vec2};
use tokio::sync::mpsc;
use tracing::{error, info};

use conway_pipeline::{
    CompletedGeneration, CycleDetector, Flow, GenerationTracker, GridSize, ReportError, Reporter,
    Simulation, State,
};

/// Generation colours cycle through this palette.
const GENERATION_COLORS: [Color32; 6] = [
    Color32::RED,
    Color32::GREEN,
    Color32::YELLOW,
    Color32::BLUE,
    Color32::from_rgb(200, 0, 200),
    Color32::from_rgb(0, 200, 200),
];

pub struct GridView {
    size: GridSize,
    alive: Vec<bool>,
    generations: Vec<u64>,
    tracker: GenerationTracker,
    cycles: CycleDetector,
    last_completed: Option<(u64, usize)>,
    cycle: Option<(u64, u64)>,
    failed: Option<ReportError>,

    pub is_running: bool,
    pub live_color: Color32,
    pub dead_color: Color32,

    states: mpsc::Receiver<State>,
    simulation: Option<Simulation>,
    // Last field: dropped after the simulation's tasks are aborted.
    _runtime: tokio::runtime::Runtime,
}

impl GridView {
    pub fn new(
        tracker: GenerationTracker,
        states: mpsc::Receiver<State>,
        simulation: Simulation,
        runtime: tokio::runtime::Runtime,
    ) -> Self {
        let size = tracker.size();
        Self {
            size,
            alive: vec![false; size.cells()],
            generations: vec![0; size.cells()],
            tracker,
            cycles: CycleDetector::new(),
            last_completed: None,
            cycle: None,
            failed: None,
            is_running: true,
            live_color: Color32::from_rgb(0, 200, 0),
            dead_color: Color32::from_rgb(40, 40, 40),
            states,
            simulation: Some(simulation),
            _runtime: runtime,
        }
    }

    /// Pulls whatever the grid has produced since the last frame.
    fn pump(&mut self) {
        if !self.is_running || self.failed.is_some() {
            return;
        }
        // Bounded per frame so painting stays responsive.
        for _ in 0..self.size.cells() * 4 {
            let Ok(state) = self.states.try_recv() else {
                break;
            };
            match self.report(state) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break,
                Err(err) => {
                    error!(%err, "state stream rejected, display stops consuming");
                    self.failed = Some(err);
                    break;
                }
            }
        }
    }

    fn on_completed(&mut self, done: CompletedGeneration) {
        if let Some(period) = self.cycles.check(&done) {
            if self.cycle.is_none() {
                info!(generation = done.generation, period, "grid is cycling");
            }
            self.cycle = Some((done.generation, period));
        }
        self.last_completed = Some((done.generation, done.population));
    }

    fn paint_panel(
        &self,
        ui: &mut egui::Ui,
        box_size: f32,
        color_of: impl Fn(usize) -> Color32,
    ) {
        let spacing = 0.5;
        let total = Vec2::new(
            (box_size + spacing) * self.size.y_size as f32 - spacing,
            (box_size + spacing) * self.size.x_size as f32 - spacing,
        );
        let (response, painter) = ui.allocate_painter(total, egui::Sense::hover());
        let start = response.rect.min;

        painter.rect_filled(Rect::from_min_size(start, total), 0.0, Color32::BLACK);

        for coord in self.size.coords() {
            let pos = egui::pos2(
                start.x + coord.y as f32 * (box_size + spacing),
                start.y + coord.x as f32 * (box_size + spacing),
            );
            let rect = Rect::from_min_size(pos, Vec2::splat(box_size));
            painter.rect_filled(rect, 1.0, color_of(self.size.index(coord)));
            painter.rect_stroke(rect, 1.0, Stroke::new(0.2, Color32::from_gray(60)));
        }
    }
}

impl Reporter for GridView {
    fn report(&mut self, state: State) -> Result<Flow, ReportError> {
        let completed = self.tracker.observe(state)?;
        let index = self.size.index(state.coord());
        self.alive[index] = state.alive;
        self.generations[index] = state.generation;
        if let Some(done) = completed {
            self.on_completed(done);
        }
        Ok(Flow::Continue)
    }
}

impl eframe::App for GridView {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            if let Some(simulation) = self.simulation.take() {
                simulation.shutdown();
            }
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.pump();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Conway's Game of Life (one task per cell)");

            // Controls
            ui.horizontal(|ui| {
                let button_text = if self.is_running { "⏸ Pause" } else { "▶ Resume" };
                if ui.button(button_text).clicked() {
                    self.is_running = !self.is_running;
                }

                ui.separator();

                ui.label("Live:");
                ui.color_edit_button_srgba(&mut self.live_color);
                ui.label("Dead:");
                ui.color_edit_button_srgba(&mut self.dead_color);

                ui.separator();

                let min = self.tracker.min_generation().unwrap_or(0);
                let max = self.tracker.max_generation().unwrap_or(0);
                ui.label(format!("Min: {min}"));
                ui.label(format!("Max: {max}"));
            });

            ui.separator();
            ui.label("Paused means the display stops reading; the grid stalls once its buffers fill. Esc quits.");
            ui.separator();

            let available = ui.available_width() / 2.0 - 20.0;
            let box_size = (available / self.size.y_size as f32).clamp(2.0, 15.0);

            ui.horizontal(|ui| {
                self.paint_panel(ui, box_size, |i| {
                    if self.alive[i] { self.live_color } else { self.dead_color }
                });
                ui.separator();
                self.paint_panel(ui, box_size, |i| {
                    GENERATION_COLORS[(self.generations[i] % GENERATION_COLORS.len() as u64) as usize]
                });
            });

            ui.separator();

            // Statistics
            ui.horizontal(|ui| {
                match self.last_completed {
                    Some((generation, population)) => {
                        let cells = self.size.cells();
                        ui.label(format!("Generation: {generation}"));
                        ui.label(format!("Live cells: {population}"));
                        ui.label(format!("Population: {:.1}%", population as f32 / cells as f32 * 100.0));
                    }
                    None => {
                        ui.label("Waiting for the first generation...");
                    }
                }
                ui.label(format!("In flight: {}", self.tracker.in_flight()));
                if let Some((generation, period)) = self.cycle {
                    ui.label(format!("Cycling with period {period} since {generation}"));
                }
                if let Some(err) = &self.failed {
                    ui.colored_label(Color32::RED, err.to_string());
                }
            });
        });

        // Keep pulling while the grid runs.
        if self.is_running {
            ctx.request_repaint();
        }
    }
}
