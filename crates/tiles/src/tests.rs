use super::*;
use model::{BlendMode, Color, ImageLayout, TRANSPARENT_PIXEL, TilePos};

const RED: [u8; 4] = [255, 0, 0, 255];

fn solid_mask(x: i32, y: i32, diameter: u32) -> AlphaMask {
    AlphaMask::new(x, y, diameter, vec![255; (diameter * diameter) as usize])
}

#[test]
fn unwritten_pixels_read_transparent_without_allocating() {
    let grid = TileGrid::new(ImageLayout::new(300, 200));
    assert_eq!(grid.pixel_at(150, 150), TRANSPARENT_PIXEL);
    assert_eq!(grid.pixel_at(-1, 0), TRANSPARENT_PIXEL);
    assert_eq!(grid.pixel_at(300, 0), TRANSPARENT_PIXEL);
    assert!(grid.is_blank());
    assert!(grid.tile_at(TilePos::new(99, 99)).is_empty_sentinel());
}

#[test]
fn written_pixel_reads_back() {
    let mut grid = TileGrid::new(ImageLayout::new(300, 200));
    grid.set_pixel(130, 70, [1, 2, 3, 4]).expect("write pixel");
    assert_eq!(grid.pixel_at(130, 70), [1, 2, 3, 4]);
    assert_eq!(grid.pixel_at(131, 70), TRANSPARENT_PIXEL);
    assert_eq!(grid.take_dirty_tiles(), vec![TilePos::new(2, 1)]);
    assert!(!grid.has_dirty_tiles());
}

#[test]
fn writes_outside_layout_are_ignored() {
    let mut grid = TileGrid::new(ImageLayout::new(100, 100));
    grid.set_pixel(100, 5, RED).expect("write pixel");
    grid.set_pixel(-3, 5, RED).expect("write pixel");
    assert!(grid.is_blank());
    assert_eq!(grid.dirty_tile_count(), 0);
}

#[test]
fn mask_is_clipped_to_canvas_and_marks_touched_tiles() {
    let mut grid = TileGrid::new(ImageLayout::new(100, 100));
    grid.apply_mask(&solid_mask(90, -5, 20), Color::rgba(255, 0, 0, 255), BlendMode::Normal)
        .expect("apply mask");

    assert_eq!(grid.pixel_at(95, 0), RED);
    assert_eq!(grid.pixel_at(99, 14), RED);
    assert_eq!(grid.pixel_at(99, 15), TRANSPARENT_PIXEL);
    assert_eq!(grid.pixel_at(89, 0), TRANSPARENT_PIXEL);
    assert_eq!(grid.take_dirty_tiles(), vec![TilePos::new(1, 0)]);
}

#[test]
fn mask_spanning_tile_corner_touches_four_tiles() {
    let mut grid = TileGrid::new(ImageLayout::new(256, 256));
    grid.apply_mask(&solid_mask(60, 60, 8), Color::BLACK, BlendMode::Normal)
        .expect("apply mask");
    assert_eq!(
        grid.take_dirty_tiles(),
        vec![
            TilePos::new(0, 0),
            TilePos::new(1, 0),
            TilePos::new(0, 1),
            TilePos::new(1, 1)
        ]
    );
}

#[test]
fn erasing_an_empty_grid_allocates_nothing() {
    let mut grid = TileGrid::new(ImageLayout::new(128, 128));
    grid.apply_mask(&solid_mask(0, 0, 128), Color::BLACK, BlendMode::Erase)
        .expect("apply mask");
    grid.apply_mask(&solid_mask(0, 0, 128), Color::WHITE, BlendMode::Multiply)
        .expect("apply mask");
    assert!(grid.is_blank());
    assert!(!grid.has_dirty_tiles());
}

#[test]
fn zero_mask_leaves_tiles_shared() {
    let mut grid = TileGrid::filled(ImageLayout::new(64, 64), RED).expect("fill grid");
    let before = grid.tile_at(TilePos::new(0, 0));
    grid.apply_mask(&AlphaMask::new(0, 0, 4, vec![0; 16]), Color::BLACK, BlendMode::Normal)
        .expect("apply mask");
    assert!(grid.tile_at(TilePos::new(0, 0)).ptr_eq(&before));
}

#[test]
fn snapshot_is_isolated_from_later_writes() {
    let mut grid = TileGrid::filled(ImageLayout::new(128, 64), RED).expect("fill grid");
    let snapshot = grid.clone();
    grid.set_pixel(0, 0, [0, 0, 0, 255]).expect("write pixel");

    assert_eq!(snapshot.pixel_at(0, 0), RED);
    assert_eq!(grid.pixel_at(0, 0), [0, 0, 0, 255]);
    assert!(grid.tile_at(TilePos::new(1, 0)).ptr_eq(&snapshot.tile_at(TilePos::new(1, 0))));
    assert!(!grid.tile_at(TilePos::new(0, 0)).ptr_eq(&snapshot.tile_at(TilePos::new(0, 0))));
}

#[test]
fn composite_region_blends_with_offset() {
    let layout = ImageLayout::new(128, 128);
    let mut source = TileGrid::new(layout);
    source.set_pixel(10, 10, RED).expect("write pixel");
    let mut destination = TileGrid::filled(layout, [0, 0, 255, 255]).expect("fill grid");

    let touched = destination
        .composite_region(&source, 60, 0, 255, BlendMode::Normal)
        .expect("composite");
    assert_eq!(touched, vec![TilePos::new(1, 0)]);
    assert_eq!(destination.pixel_at(70, 10), RED);
    assert_eq!(destination.pixel_at(10, 10), [0, 0, 255, 255]);
}

#[test]
fn composite_region_at_half_opacity() {
    let layout = ImageLayout::new(64, 64);
    let mut source = TileGrid::new(layout);
    source.set_pixel(0, 0, [255, 255, 255, 255]).expect("write pixel");
    let mut destination = TileGrid::new(layout);
    destination
        .composite_region(&source, 0, 0, 128, BlendMode::Normal)
        .expect("composite");
    assert_eq!(destination.pixel_at(0, 0), [128, 128, 128, 128]);
}

#[test]
fn opaque_composite_onto_empty_tiles_shares_source_tiles() {
    let layout = ImageLayout::new(128, 64);
    let source = TileGrid::filled(layout, RED).expect("fill grid");
    let mut destination = TileGrid::new(layout);
    destination
        .composite_region(&source, 0, 0, 255, BlendMode::Normal)
        .expect("composite");
    assert!(destination.tile_at(TilePos::new(0, 0)).ptr_eq(&source.tile_at(TilePos::new(0, 0))));
    assert_eq!(destination.dirty_tile_count(), 2);
}

#[test]
fn blank_source_composites_nothing() {
    let layout = ImageLayout::new(128, 128);
    let mut destination = TileGrid::filled(layout, RED).expect("fill grid");
    let touched = destination
        .composite_region(&TileGrid::new(layout), 0, 0, 255, BlendMode::Normal)
        .expect("composite");
    assert!(touched.is_empty());
}

#[test]
fn tile_aligned_resize_shares_tiles() {
    let mut grid = TileGrid::new(ImageLayout::new(128, 128));
    grid.set_pixel(5, 5, RED).expect("write pixel");
    let resized = grid
        .resized(ImageLayout::new(192, 128), 64, 0)
        .expect("resize");

    assert_eq!(resized.pixel_at(69, 5), RED);
    assert_eq!(resized.pixel_at(5, 5), TRANSPARENT_PIXEL);
    assert!(resized.tile_at(TilePos::new(1, 0)).ptr_eq(&grid.tile_at(TilePos::new(0, 0))));
    assert!(!resized.has_dirty_tiles());
}

#[test]
fn unaligned_resize_moves_pixels_and_crops() {
    let mut grid = TileGrid::new(ImageLayout::new(100, 100));
    grid.set_pixel(0, 0, RED).expect("write pixel");
    grid.set_pixel(99, 99, RED).expect("write pixel");

    let resized = grid
        .resized(ImageLayout::new(90, 90), -3, 7)
        .expect("resize");
    assert_eq!(resized.layout().width(), 90);
    assert_eq!(resized.pixel_at(0, 7), TRANSPARENT_PIXEL);
    assert_eq!(resized.pixel_at(-3, 7), TRANSPARENT_PIXEL);
    assert!(
        (0..90).all(|y| (0..90).all(|x| resized.pixel_at(x, y) == TRANSPARENT_PIXEL)),
        "both marked pixels fall outside the new bounds"
    );

    let grown = grid
        .resized(ImageLayout::new(110, 110), 5, 5)
        .expect("resize");
    assert_eq!(grown.pixel_at(5, 5), RED);
    assert_eq!(grown.pixel_at(104, 104), RED);
    assert_eq!(grown.pixel_at(105, 105), TRANSPARENT_PIXEL);
}

#[test]
fn shrinking_then_growing_does_not_resurrect_cropped_pixels() {
    let mut grid = TileGrid::new(ImageLayout::new(128, 128));
    grid.set_pixel(120, 3, RED).expect("write pixel");
    let shrunk = grid.resized(ImageLayout::new(100, 128), 0, 0).expect("resize");
    let grown = shrunk.resized(ImageLayout::new(128, 128), 0, 0).expect("resize");
    assert_eq!(grown.pixel_at(120, 3), TRANSPARENT_PIXEL);
}

#[test]
fn duplicate_shares_tiles_and_starts_clean() {
    let mut grid = TileGrid::new(ImageLayout::new(64, 64));
    grid.set_pixel(1, 1, RED).expect("write pixel");
    let copy = grid.duplicate();
    assert!(copy.tile_at(TilePos::new(0, 0)).ptr_eq(&grid.tile_at(TilePos::new(0, 0))));
    assert!(!copy.has_dirty_tiles());
    assert!(grid.has_dirty_tiles());
}

#[test]
fn set_tile_rejects_positions_outside_layout() {
    let mut grid = TileGrid::new(ImageLayout::new(64, 64));
    assert!(grid.set_tile(TilePos::new(1, 0), Tile::empty()).is_err());
    let tile = Tile::filled(RED).expect("allocate tile");
    grid.set_tile(TilePos::new(0, 0), tile).expect("set tile");
    assert_eq!(grid.pixel_at(63, 63), RED);
}
