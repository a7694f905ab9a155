//! Conway's Game of Life on a torus where every cell is its own tokio task.
//!
//! Cells talk only to their eight neighbours over bounded channels. There is
//! no shared grid and no barrier between generations: each cell decides its
//! next state as soon as the neighbour messages it has seen settle it, and
//! starts reading the next generation's messages before the current one is
//! reported. See [`cell`] for the per-cell pipeline and [`decision`] for the
//! early-exit rule.

pub mod cell;
pub mod config;
pub mod decision;
pub mod error;
pub mod grid;
pub mod message;
pub mod patterns;
pub mod relay;
pub mod report;

pub use config::SimConfig;
pub use error::{GridError, PipelineError, ReportError};
pub use grid::{Coord, GridSize, Seed, Simulation};
pub use report::{drain, CompletedGeneration, CycleDetector, Flow, GenerationTracker, Reporter, State};
