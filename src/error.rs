// error.rs - Error types for the grid builder, the cell pipeline and reporting

use thiserror::Error;

use crate::grid::Coord;

/// Errors raised while building a grid or placing a seed pattern.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid must be at least 3x3, got {x_size}x{y_size}")]
    TooSmall { x_size: usize, y_size: usize },

    #[error("unknown pattern `{0}`")]
    UnknownPattern(String),

    #[error("pattern `{name}` ({rows}x{cols}) does not fit a {x_size}x{y_size} grid")]
    PatternTooLarge {
        name: &'static str,
        rows: usize,
        cols: usize,
        x_size: usize,
        y_size: usize,
    },

    #[error("seed cell {0} lies outside the grid")]
    SeedOutOfBounds(Coord),
}

/// Channel closures seen by a running cell. Only happens at shutdown.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("state stream closed")]
    StateStreamClosed,

    #[error("neighbour inbox closed")]
    NeighbourGone,

    #[error("inbox closed after {received} of {expected} messages")]
    InboxClosed { received: usize, expected: usize },

    #[error("own liveness source dropped")]
    LivenessDropped,

    #[error("outbox relay queue closed")]
    RelayClosed,
}

/// Errors raised by a state reporter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("cell {coord} reported generation {got}, expected {expected}")]
    OutOfOrder { coord: Coord, expected: u64, got: u64 },

    #[error("cell {0} is not part of the grid")]
    UnknownCell(Coord),
}
