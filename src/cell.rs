// cell.rs - One grid cell as an independent task, and its generation pipeline
//
// A cell never waits for the grid. For each generation it allocates a fresh
// inbox and relay queue, starts deciding the next generation from the current
// inbox, and only then blocks on its own liveness so it can broadcast.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace_span, Instrument};

use crate::decision::DecisionEngine;
use crate::error::PipelineError;
use crate::grid::{Coord, NEIGHBOURHOOD};
use crate::message::{self, Inbox, InboxReceiver, Message};
use crate::relay::{self, RelayReader};
use crate::report::State;

pub struct Cell {
    coord: Coord,
    neighbours: Vec<Inbox>,
    first_inbox: InboxReceiver,
    port: Inbox,
}

impl Cell {
    pub fn new(coord: Coord) -> Self {
        let (port, first_inbox) = message::inbox(NEIGHBOURHOOD);
        Self {
            coord,
            neighbours: Vec::with_capacity(NEIGHBOURHOOD),
            first_inbox,
            port,
        }
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    /// Generation-0 inbox, handed to the neighbours during wiring.
    pub fn port(&self) -> Inbox {
        self.port.clone()
    }

    pub fn neighbours(&self) -> usize {
        self.neighbours.len()
    }

    /// Registers one neighbour inbox as an outbox target.
    pub(crate) fn connect(&mut self, neighbour: Inbox) {
        debug_assert!(
            self.neighbours.len() < NEIGHBOURHOOD,
            "first inbox is sized for {NEIGHBOURHOOD} neighbours"
        );
        self.neighbours.push(neighbour);
    }

    /// Runs the cell until the state stream closes.
    ///
    /// Reports `State { generation: 0 }` with `initial`, then one record per
    /// generation in order. `backlog` bounds how many decided generations may
    /// wait for the state stream before the pipeline stalls.
    pub async fn run(
        self,
        initial: bool,
        states: mpsc::Sender<State>,
        backlog: usize,
    ) -> Result<(), PipelineError> {
        let Cell { coord, neighbours, first_inbox, port } = self;
        drop(port);

        let (reports_tx, mut reports) = mpsc::channel(backlog.max(1));
        let (seed_tx, seed) = oneshot::channel();
        let _ = seed_tx.send(initial);

        let controller = Controller {
            coord,
            neighbours: neighbours.len(),
            reports: reports_tx,
        };
        let outboxes = RelayReader::seeded(&neighbours);
        drop(neighbours);
        let pipeline = tokio::spawn(controller.advance(seed, first_inbox, outboxes));

        let mut generation = 0;
        while let Some(alive) = reports.recv().await {
            let state = State { generation, x: coord.x, y: coord.y, alive };
            if states.send(state).await.is_err() {
                pipeline.abort();
                return Err(PipelineError::StateStreamClosed);
            }
            generation += 1;
        }

        match pipeline.await {
            Ok(Err(err)) => Err(err),
            _ => Ok(()),
        }
    }
}

/// Per-cell orchestration of generation N overlapping with N + 1.
struct Controller {
    coord: Coord,
    neighbours: usize,
    reports: mpsc::Sender<bool>,
}

impl Controller {
    async fn advance(
        self,
        mut liveness: oneshot::Receiver<bool>,
        mut inbox: InboxReceiver,
        mut outboxes: RelayReader,
    ) -> Result<(), PipelineError> {
        let Coord { x, y } = self.coord;
        let mut generation: u64 = 0;

        loop {
            let (next_inbox, next_inbox_rx) = message::inbox(self.neighbours);
            let (relay_writer, next_outboxes) = relay::queue(self.neighbours);
            let (own_tx, own_rx) = oneshot::channel();
            let (verdict_tx, verdict_rx) = oneshot::channel();

            // Start on the next generation before this one is known.
            let engine = DecisionEngine::new(inbox, self.neighbours, own_rx, verdict_tx, relay_writer);
            tokio::spawn(
                async move {
                    if let Err(err) = engine.run().await {
                        debug!(%err, "decision task stopped");
                    }
                }
                .instrument(trace_span!("decide", x, y, generation = generation + 1)),
            );

            let alive = liveness.await.map_err(|_| PipelineError::LivenessDropped)?;
            // The engine may have decided without it.
            let _ = own_tx.send(alive);
            self.reports
                .send(alive)
                .await
                .map_err(|_| PipelineError::StateStreamClosed)?;

            let msg = Message::new(alive, next_inbox);
            tokio::spawn(
                async move {
                    if let Err(err) = broadcast(msg, outboxes).await {
                        debug!(%err, "broadcast stopped");
                    }
                }
                .instrument(trace_span!("broadcast", x, y, generation)),
            );

            inbox = next_inbox_rx;
            outboxes = next_outboxes;
            liveness = verdict_rx;
            generation += 1;
        }
    }
}

/// Sends `msg` once to each destination the relay queue yields.
///
/// Destinations for generation N > 0 arrive as the previous generation's
/// engine drains its inbox, so this may trail the controller.
async fn broadcast(msg: Message, mut outboxes: RelayReader) -> Result<(), PipelineError> {
    for _ in 0..outboxes.slots() {
        let destination = outboxes.next_destination().await?;
        destination
            .send(msg.clone())
            .await
            .map_err(|_| PipelineError::NeighbourGone)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    /// A cell whose eight neighbours are all itself.
    fn self_wired() -> Cell {
        let mut cell = Cell::new(Coord::new(1, 2));
        for _ in 0..NEIGHBOURHOOD {
            let port = cell.port();
            cell.connect(port);
        }
        cell
    }

    async fn collect(cell: Cell, initial: bool, generations: usize) -> Vec<State> {
        let (tx, mut rx) = mpsc::channel(16);
        let task = tokio::spawn(cell.run(initial, tx, 4));
        let mut states = Vec::new();
        for _ in 0..generations {
            let state = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
            states.push(state);
        }
        task.abort();
        states
    }

    #[tokio::test]
    async fn live_cell_seeing_itself_eight_times_dies_and_stays_dead() {
        let states = collect(self_wired(), true, 4).await;
        let alive: Vec<bool> = states.iter().map(|s| s.alive).collect();
        assert_eq!(alive, vec![true, false, false, false]);
    }

    #[tokio::test]
    async fn generations_increase_by_one() {
        let states = collect(self_wired(), false, 10).await;
        for (i, state) in states.iter().enumerate() {
            assert_eq!(state.generation, i as u64);
            assert_eq!((state.x, state.y), (1, 2));
        }
    }

    #[tokio::test]
    async fn closing_the_state_stream_stops_the_cell() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let result = timeout(Duration::from_secs(5), self_wired().run(true, tx, 1))
            .await
            .unwrap();
        assert_eq!(result, Err(PipelineError::StateStreamClosed));
    }

    #[tokio::test]
    async fn broadcast_uses_each_relayed_destination_once() {
        let pairs: Vec<_> = (0..3).map(|_| message::inbox(3)).collect();
        let senders: Vec<Inbox> = pairs.iter().map(|(tx, _)| tx.clone()).collect();
        let (next, _next_rx) = message::inbox(3);

        broadcast(Message::new(true, next.clone()), RelayReader::seeded(&senders))
            .await
            .unwrap();

        for (_, mut rx) in pairs {
            let msg = rx.try_recv().unwrap();
            assert!(msg.alive);
            assert!(msg.next.same_channel(&next));
            assert!(rx.try_recv().is_err());
        }
    }
}
