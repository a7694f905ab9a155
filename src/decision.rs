// decision.rs - Early-exit Game of Life decision for one cell and one generation
//
// The engine reads a generation's inbox, publishes the cell's next liveness as
// soon as the partial neighbour count settles it, then keeps draining so that
// no neighbour is left blocked on a send.

use tokio::sync::oneshot;
use tracing::trace;

use crate::error::PipelineError;
use crate::message::InboxReceiver;
use crate::relay::RelayWriter;

/// Canonical rule: born with exactly 3, survives with 2 or 3, dies otherwise.
pub fn canonical(count: usize, prior: bool) -> bool {
    match (prior, count) {
        (true, 2) | (true, 3) => true, // Survival
        (false, 3) => true,            // Birth
        _ => false,                    // Death or stays dead
    }
}

/// What the partial tally allows us to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Decided(bool),
    /// The count alone is not enough; the cell's own liveness is required.
    NeedPrior,
    /// More messages are required.
    Wait,
}

/// Live-neighbour count over the messages seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub count: usize,
    pub done: usize,
    pub neighbours: usize,
}

impl Tally {
    pub fn new(neighbours: usize) -> Self {
        Self { count: 0, done: 0, neighbours }
    }

    pub fn observe(&mut self, alive: bool) {
        if alive {
            self.count += 1;
        }
        self.done += 1;
    }

    pub fn complete(&self) -> bool {
        self.done >= self.neighbours
    }

    /// Applies the early-exit rules. `prior` is `None` until own liveness has
    /// been fetched; once it is `Some`, this never returns `NeedPrior`.
    pub fn step(&self, prior: Option<bool>) -> Step {
        let Tally { count, done, neighbours } = *self;

        // Over-population is final whatever is still in flight.
        if count > 3 {
            return Step::Decided(false);
        }

        // The remaining messages cannot lift the count to 3.
        let no_birth = (count < 2 && done + 1 == neighbours) || (count < 1 && done + 2 == neighbours);
        if no_birth {
            match prior {
                None => return Step::NeedPrior,
                Some(false) => return Step::Decided(false),
                Some(true) => {}
            }
        }

        if count == 3 && done == neighbours {
            return Step::Decided(true);
        }

        // 2 or 3 live neighbours for sure: survival if we are alive.
        if count == 2 && done + 1 >= neighbours {
            match prior {
                None => return Step::NeedPrior,
                Some(true) => return Step::Decided(true),
                Some(false) => {}
            }
        }

        if done == neighbours {
            Step::Decided(false)
        } else {
            Step::Wait
        }
    }
}

/// The cell's own liveness for the generation being decided, read lazily.
#[derive(Debug)]
pub struct OwnLiveness {
    source: Option<oneshot::Receiver<bool>>,
    value: Option<bool>,
}

impl OwnLiveness {
    pub fn new(source: oneshot::Receiver<bool>) -> Self {
        Self { source: Some(source), value: None }
    }

    pub fn known(&self) -> Option<bool> {
        self.value
    }

    pub fn fetched(&self) -> bool {
        self.value.is_some()
    }

    /// Awaits the source on first use only.
    pub async fn fetch(&mut self) -> Result<bool, PipelineError> {
        if let Some(alive) = self.value {
            return Ok(alive);
        }
        let source = self.source.take().ok_or(PipelineError::LivenessDropped)?;
        let alive = source.await.map_err(|_| PipelineError::LivenessDropped)?;
        self.value = Some(alive);
        Ok(alive)
    }
}

/// Summary of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub alive: bool,
    pub drained: usize,
    pub fetched_own: bool,
    /// Messages seen when the decision was published.
    pub decided_after: usize,
}

/// Decision task for one cell and one generation.
pub struct DecisionEngine {
    inbox: InboxReceiver,
    neighbours: usize,
    own: OwnLiveness,
    verdict: Option<oneshot::Sender<bool>>,
    relay: RelayWriter,
}

impl DecisionEngine {
    pub fn new(
        inbox: InboxReceiver,
        neighbours: usize,
        own: oneshot::Receiver<bool>,
        verdict: oneshot::Sender<bool>,
        relay: RelayWriter,
    ) -> Self {
        Self {
            inbox,
            neighbours,
            own: OwnLiveness::new(own),
            verdict: Some(verdict),
            relay,
        }
    }

    pub async fn run(mut self) -> Result<Outcome, PipelineError> {
        let mut tally = Tally::new(self.neighbours);
        let mut decision: Option<(bool, usize)> = None;

        loop {
            if decision.is_none() {
                if let Some(alive) = self.decide(&tally).await? {
                    decision = Some((alive, tally.done));
                    self.publish(alive);
                }
            }
            if tally.complete() {
                break;
            }

            let msg = self.inbox.recv().await.ok_or(PipelineError::InboxClosed {
                received: tally.done,
                expected: self.neighbours,
            })?;
            tally.observe(msg.alive);
            // Decided or not, the sender's next inbox goes to our next broadcast.
            self.relay.forward(msg.next).await?;
        }

        // A complete tally always decides.
        let (alive, decided_after) = decision.ok_or(PipelineError::LivenessDropped)?;
        let outcome = Outcome {
            alive,
            drained: tally.done,
            fetched_own: self.own.fetched(),
            decided_after,
        };
        trace!(
            alive,
            count = tally.count,
            decided_after,
            fetched_own = outcome.fetched_own,
            "generation decided"
        );
        Ok(outcome)
    }

    async fn decide(&mut self, tally: &Tally) -> Result<Option<bool>, PipelineError> {
        loop {
            match tally.step(self.own.known()) {
                Step::Decided(alive) => return Ok(Some(alive)),
                Step::Wait => return Ok(None),
                Step::NeedPrior => {
                    self.own.fetch().await?;
                }
            }
        }
    }

    fn publish(&mut self, alive: bool) {
        if let Some(verdict) = self.verdict.take() {
            // Controller gone means the cell is shutting down; keep draining anyway.
            let _ = verdict.send(alive);
        }
    }
}
