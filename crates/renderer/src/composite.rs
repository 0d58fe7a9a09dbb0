//! CPU compositing of a layer stack.
//!
//! Tiles are composed bottom to top over the background color. Regions are
//! assembled from whole composed tiles and cropped.

use document::LayerStack;
use model::{Pixel, Rectangle, TILE_LENGTH, TILE_SIZE, TRANSPARENT_PIXEL, TilePos};

use crate::PixelBuffer;

/// Compose one tile of `stack`. `accumulator` must hold a full tile.
pub fn compose_tile_into(stack: &LayerStack, pos: TilePos, accumulator: &mut [Pixel]) {
    assert_eq!(accumulator.len(), TILE_LENGTH, "accumulator must hold one tile");
    accumulator.fill(stack.background().to_pixel());
    for layer in stack.layers() {
        layer.composite_tile_onto(pos, accumulator);
    }
}

/// Render `rect` of `stack`. Pixels outside the canvas are transparent.
pub fn compose_region(stack: &LayerStack, rect: Rectangle) -> PixelBuffer {
    let mut output = PixelBuffer::new(rect.width, rect.height);
    let layout = stack.layout();
    let Some(visible) = rect.intersected(&layout.bounds()) else {
        return output;
    };
    let mut accumulator = vec![TRANSPARENT_PIXEL; TILE_LENGTH];
    for pos in layout.tiles_in_rect(visible) {
        compose_tile_into(stack, pos, &mut accumulator);
        copy_tile_part(&accumulator, pos, visible, (rect.x, rect.y), &mut output);
    }
    output
}

/// Copy the part of a composed tile inside `clip` into `target`, whose top
/// left pixel sits at canvas position `origin`.
pub(crate) fn copy_tile_part(
    tile_pixels: &[Pixel],
    pos: TilePos,
    clip: Rectangle,
    origin: (i32, i32),
    target: &mut PixelBuffer,
) {
    let tile_rect = Rectangle::new(
        (pos.x * TILE_SIZE) as i32,
        (pos.y * TILE_SIZE) as i32,
        TILE_SIZE,
        TILE_SIZE,
    );
    let Some(part) = tile_rect.intersected(&clip) else {
        return;
    };
    let source_x = (part.x - tile_rect.x) as usize;
    let target_x = (part.x - origin.0) as usize;
    let width = part.width as usize;
    for row in 0..part.height as i32 {
        let source_y = (part.y - tile_rect.y + row) as usize;
        let target_y = (part.y - origin.1 + row) as u32;
        let source_start = source_y * TILE_SIZE as usize + source_x;
        target.row_mut(target_y)[target_x..target_x + width]
            .copy_from_slice(&tile_pixels[source_start..source_start + width]);
    }
}
