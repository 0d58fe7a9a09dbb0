//! Layers and the ordered layer stack that forms a canvas.

mod area;
mod layer;
mod stack;

use model::LayerId;
use tiles::TileAllocError;

pub use area::AreaAccumulator;
pub use layer::{Layer, LayerInfo};
pub use stack::{LayerStack, ResizeOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayerStackError {
    #[error("layer id 0 is reserved")]
    InvalidLayerId,
    #[error("layer {0} already exists or existed before")]
    DuplicateLayer(LayerId),
    #[error("layer {0} does not exist")]
    UnknownLayer(LayerId),
    #[error("source layer {0} does not exist")]
    UnknownSourceLayer(LayerId),
    #[error("layer {0} is the bottom layer and has nothing to merge into")]
    NothingToMergeInto(LayerId),
    #[error("layer {0} is listed more than once")]
    DuplicateInOrder(LayerId),
    #[error(transparent)]
    Alloc(#[from] TileAllocError),
}
