//! Tile storage for layer pixels.
//!
//! A layer is a [`TileGrid`]: one [`Tile`] handle per `TILE_SIZE` square.
//! Tiles are reference counted and copied on first write, so snapshots of a
//! grid cost one handle per tile and unpainted areas share a single empty
//! block. All pixel math lives in [`rasterop`].

mod grid;
mod mask;
pub mod rasterop;
mod tile;

use model::{Pixel, TILE_SIZE};
use static_assertions::{assert_eq_size, const_assert};

pub use grid::TileGrid;
pub use mask::AlphaMask;
pub use tile::Tile;

const_assert!(TILE_SIZE.is_power_of_two());
assert_eq_size!(Pixel, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TileAllocError {
    #[error("out of memory while allocating tile pixels")]
    OutOfMemory,
}

#[cfg(test)]
mod tests;
