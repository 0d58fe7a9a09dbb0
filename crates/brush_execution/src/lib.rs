//! Classic round brush: pointer samples in, quantized dab messages out, and
//! the rasterizer that turns those messages back into pixels.

mod brush;
mod dab;
mod raster;
mod stroke;

pub use brush::{BrushConfigError, ClassicBrush};
pub use dab::{Dab, MAX_DAB_RADIUS, MIN_DAB_RADIUS, classic_dab_mask};
pub use raster::draw_dabs;
pub use stroke::{BrushEngine, BrushError};
