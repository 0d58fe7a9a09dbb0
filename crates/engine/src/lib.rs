//! Message pipeline: applies the sequenced message stream to a layer stack.
//!
//! - `execute`: applies one message to a stack, nothing else.
//! - `history`: recorded messages, undo states and savepoints.
//! - `fork`: locally predicted messages awaiting their server echo.
//! - `pipeline`: `CanvasPipeline`, tying the three together.

mod execute;
mod fork;
mod history;
mod pipeline;

use document::{LayerStackError, ResizeOutcome};
use model::{Rectangle, UserId};
use protocol::{MessageType, ProtocolError};
use tiles::TileAllocError;

pub use fork::LocalFork;
pub use history::{DEFAULT_MAX_ENTRIES, DEFAULT_MAX_UNDO_POINTS, History, UndoState};
pub use pipeline::CanvasPipeline;

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced here and applied ahead of the server.
    Local,
    /// Delivered by the server in sequence order. Includes echoes of our
    /// own messages.
    Remote,
}

/// A message that could not be applied. The canvas is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Anomaly {
    #[error(transparent)]
    Layer(LayerStackError),
    #[error("user {0} has nothing to undo")]
    NothingToUndo(UserId),
    #[error("user {0} has nothing to redo")]
    NothingToRedo(UserId),
    #[error("{0:?} messages cannot be applied ahead of the server")]
    NotPredictable(MessageType),
    #[error("echo of a local message does not match the local fork")]
    ForkMismatch,
    #[error(transparent)]
    Malformed(#[from] ProtocolError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("message rejected: {0}")]
    Rejected(Anomaly),
    /// The canvas can no longer be trusted.
    #[error("out of memory while applying a message")]
    Fatal(#[from] TileAllocError),
}

impl From<Anomaly> for ApplyError {
    fn from(anomaly: Anomaly) -> Self {
        ApplyError::Rejected(anomaly)
    }
}

impl From<LayerStackError> for ApplyError {
    fn from(error: LayerStackError) -> Self {
        match error {
            LayerStackError::Alloc(error) => ApplyError::Fatal(error),
            error => ApplyError::Rejected(Anomaly::Layer(error)),
        }
    }
}

/// What applying messages did to the visible canvas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedEffect {
    /// Area to repaint, in canvas coordinates after any resize.
    pub area: Option<Rectangle>,
    /// Canvas resizes, oldest first.
    pub resized: Vec<ResizeOutcome>,
    pub layers_changed: bool,
}

impl AppliedEffect {
    pub fn is_empty(&self) -> bool {
        self.area.is_none() && self.resized.is_empty() && !self.layers_changed
    }

    /// Fold a later effect into this one.
    pub fn merge(&mut self, later: AppliedEffect) {
        if later.resized.is_empty() {
            self.area = match (self.area, later.area) {
                (Some(area), Some(other)) => Some(area.united(&other)),
                (area, other) => area.or(other),
            };
        } else {
            self.area = later.area;
            self.resized.extend(later.resized);
        }
        self.layers_changed |= later.layers_changed;
    }
}

/// Result of applying a buffer of encoded messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub applied: usize,
    pub effect: AppliedEffect,
    /// Messages skipped, in stream order.
    pub anomalies: Vec<Anomaly>,
}
