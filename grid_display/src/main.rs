// main.rs - Live view of the cell-per-task Game of Life

use anyhow::Context;
use clap::Parser;
use eframe::egui;

use conway_pipeline::config::init_logging;
use conway_pipeline::{GenerationTracker, SimConfig, Simulation};

mod ui;

use ui::GridView;

#[derive(Debug, Parser)]
#[command(version, about = "Watch every cell of the grid advance on its own")]
struct Cli {
    #[command(flatten)]
    sim: SimConfig,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new().context("cannot start tokio runtime")?;
    let seed = cli.sim.seed().context("invalid seed")?;
    let (simulation, states) = {
        let _guard = runtime.enter();
        Simulation::launch(&cli.sim, seed).context("cannot build grid")?
    };

    let size = simulation.size();
    let view = GridView::new(GenerationTracker::new(size), states, simulation, runtime);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Conway's Game of Life, one task per cell",
        options,
        Box::new(|_cc| Box::new(view)),
    )
    .map_err(|err| anyhow::anyhow!("display error: {err}"))
}
