// config.rs - Command-line configuration shared by the binaries

use clap::Args;
use tracing_subscriber::EnvFilter;

use crate::error::GridError;
use crate::grid::{GridSize, Seed};
use crate::patterns;

#[derive(Debug, Clone, Args)]
pub struct SimConfig {
    /// Rows of the torus.
    #[arg(short = 'x', long, default_value_t = 30)]
    pub x_size: usize,

    /// Columns of the torus.
    #[arg(short = 'y', long, default_value_t = 60)]
    pub y_size: usize,

    /// Decided generations a cell may hold while the state stream is full.
    #[arg(long, default_value_t = 1000)]
    pub report_backlog: usize,

    /// Seed pattern (Glider, Blinker, Toad, Beacon, Pulsar, R-pentomino,
    /// "Gosper Glider Gun"); random 50/50 when absent.
    #[arg(short, long)]
    pub pattern: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            x_size: 30,
            y_size: 60,
            report_backlog: 1000,
            pattern: None,
        }
    }
}

impl SimConfig {
    pub fn size(&self) -> Result<GridSize, GridError> {
        GridSize::new(self.x_size, self.y_size)
    }

    pub fn seed(&self) -> Result<Seed, GridError> {
        match &self.pattern {
            Some(name) => Seed::pattern(patterns::find(name)?, self.size()?),
            None => Ok(Seed::Random),
        }
    }
}

/// Installs the `fmt` subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
