use model::{Color, Rectangle};
use protocol::DrawDabs;
use tiles::{TileAllocError, TileGrid};

use crate::dab::classic_dab_mask;

/// Rasterize a dab message onto `grid`. Returns the canvas area the dabs
/// touched, if any.
pub fn draw_dabs(grid: &mut TileGrid, draw: &DrawDabs) -> Result<Option<Rectangle>, TileAllocError> {
    let color = Color::from_argb32(draw.color).with_alpha(255);
    let canvas = grid.layout().bounds();
    let mut touched: Option<Rectangle> = None;
    for (x, y, dab) in draw.positioned() {
        let Some(mask) = classic_dab_mask(x, y, dab.radius, dab.hardness, dab.opacity) else {
            continue;
        };
        let Some(area) = mask.bounds().intersected(&canvas) else {
            continue;
        };
        grid.apply_mask(&mask, color, draw.blend)?;
        touched = Some(match touched {
            Some(touched) => touched.united(&area),
            None => area,
        });
    }
    Ok(touched)
}
