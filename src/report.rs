// report.rs - The boundary between the running grid and whoever watches it

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, VecDeque};
use std::hash::{Hash, Hasher};

use tokio::sync::mpsc;

use crate::error::ReportError;
use crate::grid::{Coord, GridSize};

/// One cell's liveness for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub generation: u64,
    pub x: usize,
    pub y: usize,
    pub alive: bool,
}

impl State {
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Consumer of the state stream (renderer, logger, test recorder).
///
/// States from different cells arrive in any order; each cell's own states
/// arrive in generation order. A reporter must keep up: the grid stalls once
/// the stream's buffer is full.
pub trait Reporter {
    fn report(&mut self, state: State) -> Result<Flow, ReportError>;
}

/// Feeds `states` to `reporter` until it stops, fails, or the stream ends.
pub async fn drain<R: Reporter + ?Sized>(
    states: &mut mpsc::Receiver<State>,
    reporter: &mut R,
) -> Result<(), ReportError> {
    while let Some(state) = states.recv().await {
        if reporter.report(state)? == Flow::Stop {
            break;
        }
    }
    Ok(())
}

/// A generation every cell has reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedGeneration {
    pub generation: u64,
    pub population: usize,
    pub hash: u64,
    /// Row-major liveness, see [`GridSize::index`].
    pub alive: Vec<bool>,
}

struct Snapshot {
    reported: usize,
    alive: Vec<bool>,
}

/// Assembles the per-cell stream back into whole generations and tracks how
/// far apart the fastest and slowest cells are.
pub struct GenerationTracker {
    size: GridSize,
    latest: Vec<Option<u64>>,
    pending: BTreeMap<u64, Snapshot>,
}

impl GenerationTracker {
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            latest: vec![None; size.cells()],
            pending: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Records `state`; returns the generation it completed, if any.
    ///
    /// Generations complete in order because every cell reports in order.
    pub fn observe(&mut self, state: State) -> Result<Option<CompletedGeneration>, ReportError> {
        let coord = state.coord();
        if !self.size.contains(coord) {
            return Err(ReportError::UnknownCell(coord));
        }
        let index = self.size.index(coord);
        let expected = self.latest[index].map_or(0, |g| g + 1);
        if state.generation != expected {
            return Err(ReportError::OutOfOrder {
                coord,
                expected,
                got: state.generation,
            });
        }
        self.latest[index] = Some(state.generation);

        let cells = self.size.cells();
        let snapshot = self.pending.entry(state.generation).or_insert_with(|| Snapshot {
            reported: 0,
            alive: vec![false; cells],
        });
        snapshot.alive[index] = state.alive;
        snapshot.reported += 1;
        if snapshot.reported < cells {
            return Ok(None);
        }

        let Some(snapshot) = self.pending.remove(&state.generation) else {
            return Ok(None);
        };
        Ok(Some(CompletedGeneration {
            generation: state.generation,
            population: snapshot.alive.iter().filter(|a| **a).count(),
            hash: hash_cells(&snapshot.alive),
            alive: snapshot.alive,
        }))
    }

    pub fn latest(&self, coord: Coord) -> Option<u64> {
        self.latest[self.size.index(coord)]
    }

    /// Slowest cell's generation, once every cell has reported.
    pub fn min_generation(&self) -> Option<u64> {
        self.latest.iter().copied().collect::<Option<Vec<_>>>()?.into_iter().min()
    }

    pub fn max_generation(&self) -> Option<u64> {
        self.latest.iter().flatten().copied().max()
    }

    /// Generations started but not yet reported by every cell.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

fn hash_cells(alive: &[bool]) -> u64 {
    let mut hasher = DefaultHasher::new();
    alive.hash(&mut hasher);
    hasher.finish()
}

const CYCLE_HISTORY: usize = 10;

/// Remembers the last few completed generations to spot still lifes and
/// short oscillators.
#[derive(Default)]
pub struct CycleDetector {
    history: VecDeque<(u64, u64)>,
}

impl CycleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the period if `completed` repeats a recent generation.
    pub fn check(&mut self, completed: &CompletedGeneration) -> Option<u64> {
        let period = self
            .history
            .iter()
            .rev()
            .find(|(_, hash)| *hash == completed.hash)
            .map(|(generation, _)| completed.generation - generation);

        if self.history.len() == CYCLE_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back((completed.generation, completed.hash));
        period
    }
}
