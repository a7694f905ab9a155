// main.rs - Headless run: launch the grid, log each completed generation

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use conway_pipeline::config::init_logging;
use conway_pipeline::{
    drain, CycleDetector, Flow, GenerationTracker, GridSize, ReportError, Reporter, SimConfig,
    Simulation, State,
};

#[derive(Debug, Parser)]
#[command(version, about = "Game of Life where every cell is its own task")]
struct Cli {
    #[command(flatten)]
    sim: SimConfig,

    /// Stop after this many completed generations.
    #[arg(short, long, default_value_t = 100)]
    generations: u64,

    /// Stop as soon as a generation repeats a recent one.
    #[arg(long)]
    stop_on_cycle: bool,
}

/// Logs one line per generation every cell has reported.
struct LogReporter {
    tracker: GenerationTracker,
    cycles: CycleDetector,
    limit: u64,
    stop_on_cycle: bool,
}

impl LogReporter {
    fn new(size: GridSize, limit: u64, stop_on_cycle: bool) -> Self {
        Self {
            tracker: GenerationTracker::new(size),
            cycles: CycleDetector::new(),
            limit,
            stop_on_cycle,
        }
    }
}

impl Reporter for LogReporter {
    fn report(&mut self, state: State) -> Result<Flow, ReportError> {
        let Some(done) = self.tracker.observe(state)? else {
            return Ok(Flow::Continue);
        };

        info!(
            generation = done.generation,
            population = done.population,
            fastest = self.tracker.max_generation().unwrap_or(done.generation),
            in_flight = self.tracker.in_flight(),
            "generation complete"
        );

        if let Some(period) = self.cycles.check(&done) {
            warn!(generation = done.generation, period, "grid is cycling");
            if self.stop_on_cycle {
                return Ok(Flow::Stop);
            }
        }
        if done.generation + 1 >= self.limit {
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let seed = cli.sim.seed().context("invalid seed")?;
    let (simulation, mut states) = Simulation::launch(&cli.sim, seed).context("cannot build grid")?;

    let mut reporter = LogReporter::new(simulation.size(), cli.generations, cli.stop_on_cycle);
    drain(&mut states, &mut reporter).await.context("state stream")?;

    simulation.shutdown();
    Ok(())
}
