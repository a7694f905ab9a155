// message.rs - Gossip exchanged between neighbouring cells

use tokio::sync::mpsc;

/// Sending half of a cell's inbox for one generation.
pub type Inbox = mpsc::Sender<Message>;

/// Receiving half of a cell's inbox for one generation.
pub type InboxReceiver = mpsc::Receiver<Message>;

/// A neighbour's liveness for one generation, plus where to reach it next.
///
/// `next` is the sender's inbox for the following generation. The receiver
/// relays it into its own outbox queue so that its next broadcast lands in
/// the right place.
#[derive(Debug, Clone)]
pub struct Message {
    pub alive: bool,
    pub next: Inbox,
}

impl Message {
    pub fn new(alive: bool, next: Inbox) -> Self {
        Self { alive, next }
    }
}

/// Allocates a generation inbox.
///
/// Every neighbour sends exactly one message per generation, possibly before
/// the owner starts draining, so the capacity is the neighbour count. Anything
/// smaller can block a sender forever.
pub fn inbox(neighbours: usize) -> (Inbox, InboxReceiver) {
    mpsc::channel(neighbours.max(1))
}
