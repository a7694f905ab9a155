// grid.rs - Toroidal topology, seeding and the running simulation

use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::cell::Cell;
use crate::config::SimConfig;
use crate::error::GridError;
use crate::message::Inbox;
use crate::patterns::Pattern;
use crate::report::State;

/// Neighbours of every cell on the torus.
pub const NEIGHBOURHOOD: usize = 8;

/// Smallest edge that gives every cell 8 distinct neighbours.
pub const MIN_EDGE: usize = 3;

/// Capacity of the shared state stream for small grids.
pub const STATE_BUFFER: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// `x_size` rows by `y_size` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub x_size: usize,
    pub y_size: usize,
}

impl GridSize {
    pub fn new(x_size: usize, y_size: usize) -> Result<Self, GridError> {
        if x_size < MIN_EDGE || y_size < MIN_EDGE {
            return Err(GridError::TooSmall { x_size, y_size });
        }
        Ok(Self { x_size, y_size })
    }

    pub fn cells(&self) -> usize {
        self.x_size * self.y_size
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x < self.x_size && coord.y < self.y_size
    }

    /// Row-major index, the layout used by every per-cell buffer.
    pub fn index(&self, coord: Coord) -> usize {
        coord.x * self.y_size + coord.y
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.x_size).flat_map(move |x| (0..self.y_size).map(move |y| Coord { x, y }))
    }

    /// The 8 toroidal neighbours of `coord`.
    pub fn neighbours(&self, coord: Coord) -> [Coord; NEIGHBOURHOOD] {
        let mut out = [coord; NEIGHBOURHOOD];
        let mut i = 0;
        for dx in [self.x_size - 1, 0, 1] {
            for dy in [self.y_size - 1, 0, 1] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                out[i] = Coord {
                    x: (coord.x + dx) % self.x_size,
                    y: (coord.y + dy) % self.y_size,
                };
                i += 1;
            }
        }
        out
    }
}

/// Every cell of the grid, fully wired and not yet running.
pub struct Topology {
    size: GridSize,
    cells: Vec<Cell>,
}

impl Topology {
    /// Creates one cell per coordinate and registers each cell's 8
    /// neighbours as its outboxes. Wiring is finished before anything runs.
    pub fn build(size: GridSize) -> Self {
        let mut cells: Vec<Cell> = size.coords().map(Cell::new).collect();
        let ports: Vec<Inbox> = cells.iter().map(Cell::port).collect();

        for cell in &mut cells {
            for neighbour in size.neighbours(cell.coord()) {
                cell.connect(ports[size.index(neighbour)].clone());
            }
        }
        Self { size, cells }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }
}

/// Initial liveness of each cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    /// Independent 50/50 per cell.
    Random,
    /// Exactly these cells start alive.
    Cells(HashSet<Coord>),
}

impl Seed {
    pub fn cells(coords: impl IntoIterator<Item = Coord>, size: GridSize) -> Result<Self, GridError> {
        let mut alive = HashSet::new();
        for coord in coords {
            if !size.contains(coord) {
                return Err(GridError::SeedOutOfBounds(coord));
            }
            alive.insert(coord);
        }
        Ok(Seed::Cells(alive))
    }

    pub fn pattern(pattern: &Pattern, size: GridSize) -> Result<Self, GridError> {
        Self::cells(pattern.place(size)?, size)
    }

    pub fn liveness<R: Rng + ?Sized>(&self, coord: Coord, rng: &mut R) -> bool {
        match self {
            Seed::Random => rng.random_bool(0.5),
            Seed::Cells(alive) => alive.contains(&coord),
        }
    }
}

/// Handle on a running grid. Dropping it aborts the cell tasks.
pub struct Simulation {
    size: GridSize,
    tasks: JoinSet<()>,
}

impl Simulation {
    /// Builds the grid from `config` and starts every cell on the current
    /// tokio runtime. Returns the stream of per-cell states.
    pub fn launch(config: &SimConfig, seed: Seed) -> Result<(Self, mpsc::Receiver<State>), GridError> {
        let size = config.size()?;
        Ok(Self::launch_grid(size, seed, config.report_backlog))
    }

    pub fn launch_grid(size: GridSize, seed: Seed, report_backlog: usize) -> (Self, mpsc::Receiver<State>) {
        let (states_tx, states_rx) = mpsc::channel(STATE_BUFFER.max(size.cells()));
        let mut rng = rand::rng();
        let mut tasks = JoinSet::new();

        for cell in Topology::build(size).into_cells() {
            let coord = cell.coord();
            let alive = seed.liveness(coord, &mut rng);
            let states = states_tx.clone();
            tasks.spawn(async move {
                if let Err(err) = cell.run(alive, states, report_backlog).await {
                    debug!(x = coord.x, y = coord.y, %err, "cell stopped");
                }
            });
        }

        info!(
            x_size = size.x_size,
            y_size = size.y_size,
            cells = size.cells(),
            "simulation launched"
        );
        (Self { size, tasks }, states_rx)
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Cell tasks still running.
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    pub fn shutdown(mut self) {
        let running = self.running();
        self.tasks.abort_all();
        info!(cells = self.size.cells(), running, "simulation stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rejects_grids_smaller_than_three() {
        assert_eq!(GridSize::new(2, 5), Err(GridError::TooSmall { x_size: 2, y_size: 5 }));
        assert!(GridSize::new(3, 3).is_ok());
    }

    #[test]
    fn neighbours_wrap_around_the_torus() {
        let size = GridSize::new(4, 5).unwrap();
        let mut got: Vec<Coord> = size.neighbours(Coord::new(0, 0)).to_vec();
        got.sort();
        let mut want = vec![
            Coord::new(3, 4),
            Coord::new(3, 0),
            Coord::new(3, 1),
            Coord::new(0, 4),
            Coord::new(0, 1),
            Coord::new(1, 4),
            Coord::new(1, 0),
            Coord::new(1, 1),
        ];
        want.sort();
        assert_eq!(got, want);
    }

    #[test]
    fn neighbours_are_distinct_and_exclude_self() {
        let size = GridSize::new(3, 3).unwrap();
        for coord in size.coords() {
            let set: HashSet<Coord> = size.neighbours(coord).into_iter().collect();
            assert_eq!(set.len(), NEIGHBOURHOOD);
            assert!(!set.contains(&coord));
        }
    }

    #[test]
    fn topology_wires_every_cell_to_eight_neighbours() {
        let size = GridSize::new(4, 6).unwrap();
        let topology = Topology::build(size);
        assert_eq!(topology.size(), size);
        let cells = topology.into_cells();
        assert_eq!(cells.len(), 24);
        assert!(cells.iter().all(|c| c.neighbours() == NEIGHBOURHOOD));
    }

    #[tokio::test]
    async fn launch_starts_one_task_per_cell() {
        let size = GridSize::new(3, 4).unwrap();
        let (simulation, mut states) = Simulation::launch_grid(size, Seed::Random, 4);
        assert_eq!(simulation.running(), 12);
        assert_eq!(simulation.size(), size);

        let first = states.recv().await.unwrap();
        assert_eq!(first.generation, 0);
        simulation.shutdown();
    }

    #[test]
    fn seed_rejects_cells_outside_the_grid() {
        let size = GridSize::new(3, 3).unwrap();
        assert_eq!(
            Seed::cells([Coord::new(3, 0)], size),
            Err(GridError::SeedOutOfBounds(Coord::new(3, 0)))
        );
    }

    #[test]
    fn random_seed_is_roughly_even() {
        let mut rng = StdRng::seed_from_u64(7);
        let alive = (0..1000)
            .filter(|i| Seed::Random.liveness(Coord::new(*i, 0), &mut rng))
            .count();
        assert!((400..600).contains(&alive), "{alive}");
    }
}
