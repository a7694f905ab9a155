// End-to-end runs of the cell-per-task grid against a plain synchronous step.

use std::collections::HashMap;
use std::time::Duration;

use conway_pipeline::decision::canonical;
use conway_pipeline::patterns;
use conway_pipeline::{
    drain, CompletedGeneration, Coord, CycleDetector, Flow, GenerationTracker, GridSize,
    ReportError, Reporter, Seed, Simulation, State,
};
use tokio::time::timeout;

/// Collects whole generations until `limit` of them are complete.
struct Recorder {
    tracker: GenerationTracker,
    limit: usize,
    completed: Vec<CompletedGeneration>,
    raw: Vec<State>,
}

impl Reporter for Recorder {
    fn report(&mut self, state: State) -> Result<Flow, ReportError> {
        self.raw.push(state);
        if let Some(done) = self.tracker.observe(state)? {
            self.completed.push(done);
        }
        Ok(if self.completed.len() >= self.limit { Flow::Stop } else { Flow::Continue })
    }
}

async fn record(size: GridSize, seed: Seed, generations: usize) -> Recorder {
    let (simulation, mut states) = Simulation::launch_grid(size, seed, 16);
    let mut recorder = Recorder {
        tracker: GenerationTracker::new(size),
        limit: generations,
        completed: Vec::new(),
        raw: Vec::new(),
    };
    timeout(Duration::from_secs(30), drain(&mut states, &mut recorder))
        .await
        .expect("grid stalled")
        .expect("cells report in order");
    simulation.shutdown();
    recorder
}

fn reference_step(size: GridSize, alive: &[bool]) -> Vec<bool> {
    size.coords()
        .map(|coord| {
            let count = size
                .neighbours(coord)
                .iter()
                .filter(|n| alive[size.index(**n)])
                .count();
            canonical(count, alive[size.index(coord)])
        })
        .collect()
}

fn assert_follows_reference(size: GridSize, completed: &[CompletedGeneration]) {
    for pair in completed.windows(2) {
        assert_eq!(
            pair[1].alive,
            reference_step(size, &pair[0].alive),
            "generation {} diverged",
            pair[1].generation
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn all_alive_three_by_three_dies_and_stays_dead() {
    let size = GridSize::new(3, 3).unwrap();
    let seed = Seed::cells(size.coords(), size).unwrap();
    let recorder = record(size, seed, 4).await;

    let populations: Vec<usize> = recorder.completed.iter().map(|g| g.population).collect();
    assert_eq!(populations, vec![9, 0, 0, 0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn glider_matches_the_synchronous_rule() {
    let size = GridSize::new(8, 8).unwrap();
    let seed = Seed::pattern(patterns::find("Glider").unwrap(), size).unwrap();
    let recorder = record(size, seed, 33).await;

    assert_eq!(recorder.completed.len(), 33);
    assert!(recorder.completed.iter().all(|g| g.population == 5));
    assert_follows_reference(size, &recorder.completed);

    // A glider crosses an 8x8 torus and comes home after 32 generations.
    assert_eq!(recorder.completed[32].alive, recorder.completed[0].alive);
}

#[tokio::test]
async fn dead_cell_with_three_live_neighbours_is_born() {
    let size = GridSize::new(5, 5).unwrap();
    // Three in a row around the empty centre-bottom cell (3, 2).
    let seed = Seed::cells([Coord::new(2, 1), Coord::new(2, 2), Coord::new(2, 3)], size).unwrap();
    let recorder = record(size, seed, 2).await;

    let next = &recorder.completed[1].alive;
    assert!(next[size.index(Coord::new(3, 2))]);
    assert!(next[size.index(Coord::new(1, 2))]);
    assert!(!next[size.index(Coord::new(2, 1))]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blinker_is_detected_as_a_period_two_cycle() {
    let size = GridSize::new(5, 5).unwrap();
    let seed = Seed::pattern(patterns::find("blinker").unwrap(), size).unwrap();
    let recorder = record(size, seed, 6).await;

    let mut cycles = CycleDetector::new();
    let periods: Vec<Option<u64>> = recorder.completed.iter().map(|g| cycles.check(g)).collect();
    assert_eq!(periods[..2], [None, None]);
    assert!(periods[2..].iter().all(|p| *p == Some(2)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn random_grids_run_without_deadlock_and_follow_the_rule() {
    for (x, y) in [(3, 3), (3, 5), (4, 4), (10, 12)] {
        let size = GridSize::new(x, y).unwrap();
        let recorder = record(size, Seed::Random, 25).await;
        assert_eq!(recorder.completed.len(), 25, "{x}x{y}");
        assert_follows_reference(size, &recorder.completed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_cell_reports_consecutive_generations() {
    let size = GridSize::new(6, 6).unwrap();
    let recorder = record(size, Seed::Random, 20).await;

    let mut last: HashMap<Coord, u64> = HashMap::new();
    for state in &recorder.raw {
        match last.insert(state.coord(), state.generation) {
            Some(previous) => assert_eq!(state.generation, previous + 1),
            None => assert_eq!(state.generation, 0),
        }
    }
    assert_eq!(last.len(), size.cells());
}

#[tokio::test]
async fn single_threaded_runtime_also_progresses() {
    let size = GridSize::new(4, 7).unwrap();
    let seed = Seed::pattern(patterns::find("R-pentomino").unwrap(), size).unwrap();
    let recorder = record(size, seed, 15).await;
    assert_follows_reference(size, &recorder.completed);
}
