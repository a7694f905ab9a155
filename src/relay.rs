// relay.rs - Outbox relay queue: where a cell's next broadcast goes

use tokio::sync::mpsc;

use crate::error::PipelineError;
use crate::message::Inbox;

/// Producer side, held by the decision engine of the previous generation.
#[derive(Debug)]
pub struct RelayWriter {
    tx: mpsc::Sender<Inbox>,
}

/// Consumer side, held by the broadcast task of the generation it serves.
#[derive(Debug)]
pub struct RelayReader {
    rx: mpsc::Receiver<Inbox>,
    slots: usize,
}

/// Bounded queue of destination inboxes, one slot per neighbour.
pub fn queue(neighbours: usize) -> (RelayWriter, RelayReader) {
    let (tx, rx) = mpsc::channel(neighbours.max(1));
    (RelayWriter { tx }, RelayReader { rx, slots: neighbours })
}

impl RelayWriter {
    pub async fn forward(&self, destination: Inbox) -> Result<(), PipelineError> {
        self.tx
            .send(destination)
            .await
            .map_err(|_| PipelineError::RelayClosed)
    }
}

impl RelayReader {
    /// Generation-0 queue, pre-filled with the wired neighbour inboxes.
    pub fn seeded(neighbours: &[Inbox]) -> Self {
        let (writer, reader) = queue(neighbours.len());
        for inbox in neighbours {
            let sent = writer.tx.try_send(inbox.clone());
            debug_assert!(sent.is_ok(), "relay queue holds one slot per neighbour");
        }
        reader
    }

    /// Destinations one broadcast goes to: the neighbour count.
    pub fn slots(&self) -> usize {
        self.slots
    }

    pub async fn next_destination(&mut self) -> Result<Inbox, PipelineError> {
        self.rx.recv().await.ok_or(PipelineError::RelayClosed)
    }
}
