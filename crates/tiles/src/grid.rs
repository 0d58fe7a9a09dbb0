use bitvec::prelude::{BitVec, Lsb0};
use model::{
    ALPHA, BlendMode, Color, ImageLayout, ImageLayoutError, Pixel, Rectangle, TILE_SIZE, TilePos,
    TRANSPARENT_PIXEL,
};

use crate::rasterop::{layer_blend_row, mask_blend_row};
use crate::{AlphaMask, Tile, TileAllocError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOp {
    Copy,
    Blend { opacity: u8, mode: BlendMode },
}

impl RowOp {
    fn is_plain_over(self) -> bool {
        matches!(
            self,
            RowOp::Blend {
                opacity: 255,
                mode: BlendMode::Normal
            }
        )
    }
}

/// The tiles of one layer plus a dirty bit per tile.
///
/// Every slot always holds a tile; unpainted slots hold the shared empty
/// tile. Cloning a grid shares all tiles, so a clone is a cheap snapshot.
/// Pixel writes are clipped to the layout bounds.
#[derive(Debug, Clone)]
pub struct TileGrid {
    layout: ImageLayout,
    tiles: Box<[Tile]>,
    dirty_bits: BitVec<usize, Lsb0>,
    dirty_count: usize,
}

impl TileGrid {
    pub fn new(layout: ImageLayout) -> Self {
        Self::with_tile(layout, Tile::empty())
    }

    /// A grid where every slot shares one solid tile.
    pub fn filled(layout: ImageLayout, pixel: Pixel) -> Result<Self, TileAllocError> {
        Ok(Self::with_tile(layout, Tile::filled(pixel)?))
    }

    fn with_tile(layout: ImageLayout, tile: Tile) -> Self {
        let tile_count = layout.max_tiles();
        Self {
            layout,
            tiles: vec![tile; tile_count].into_boxed_slice(),
            dirty_bits: BitVec::repeat(false, tile_count),
            dirty_count: 0,
        }
    }

    /// Shares every tile with `self`; the copy starts with no dirty tiles.
    pub fn duplicate(&self) -> Self {
        Self {
            layout: self.layout,
            tiles: self.tiles.clone(),
            dirty_bits: BitVec::repeat(false, self.tiles.len()),
            dirty_count: 0,
        }
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        let index = self.layout.tile_index(pos).ok()?;
        self.tiles.get(index)
    }

    /// Handle to the tile at `pos`, or the empty tile outside the grid.
    pub fn tile_at(&self, pos: TilePos) -> Tile {
        self.tile(pos).cloned().unwrap_or_default()
    }

    /// Mutable slot access. The tile is marked dirty.
    pub fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        let index = self.layout.tile_index(pos).ok()?;
        self.mark_dirty(index);
        self.tiles.get_mut(index)
    }

    pub fn set_tile(&mut self, pos: TilePos, tile: Tile) -> Result<(), ImageLayoutError> {
        let index = self.layout.tile_index(pos)?;
        self.tiles[index] = tile;
        self.mark_dirty(index);
        Ok(())
    }

    pub fn iter_tiles(&self) -> impl Iterator<Item = (TilePos, &Tile)> + '_ {
        self.layout.iter_tiles().zip(self.tiles.iter())
    }

    /// True when no slot holds anything but the empty tile.
    pub fn is_blank(&self) -> bool {
        self.tiles.iter().all(Tile::is_empty_sentinel)
    }

    /// Pixel at canvas coordinates; transparent outside the layout.
    pub fn pixel_at(&self, x: i32, y: i32) -> Pixel {
        if !self.layout.bounds().contains(x, y) {
            return TRANSPARENT_PIXEL;
        }
        let (x, y) = (x as u32, y as u32);
        let pos = TilePos::new(x / TILE_SIZE, y / TILE_SIZE);
        match self.tile(pos) {
            Some(tile) => tile.pixel(x % TILE_SIZE, y % TILE_SIZE),
            None => TRANSPARENT_PIXEL,
        }
    }

    /// Writes outside the layout are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, pixel: Pixel) -> Result<(), TileAllocError> {
        if !self.layout.bounds().contains(x, y) {
            return Ok(());
        }
        let (x, y) = (x as u32, y as u32);
        let pos = TilePos::new(x / TILE_SIZE, y / TILE_SIZE);
        let Ok(index) = self.layout.tile_index(pos) else {
            return Ok(());
        };
        if self.tiles[index].is_empty_sentinel() && pixel == TRANSPARENT_PIXEL {
            return Ok(());
        }
        self.tiles[index].set_pixel(x % TILE_SIZE, y % TILE_SIZE, pixel)?;
        self.mark_dirty(index);
        Ok(())
    }

    /// Paint `color` through `mask`. Tiles the mask does not cover, and
    /// empty tiles the mode cannot add paint to, are left shared.
    pub fn apply_mask(
        &mut self,
        mask: &AlphaMask,
        color: Color,
        mode: BlendMode,
    ) -> Result<(), TileAllocError> {
        let Some(area) = mask.bounds().intersected(&self.layout.bounds()) else {
            return Ok(());
        };
        for pos in self.layout.tiles_in_rect(area) {
            let Some(part) = self.layout.tile_rect(pos).intersected(&area) else {
                continue;
            };
            let mask_x = (part.x - mask.x) as usize;
            let mask_y = (part.y - mask.y) as u32;
            let width = part.width as usize;
            let covered = (0..part.height).any(|row| {
                mask.row(mask_y + row)[mask_x..mask_x + width]
                    .iter()
                    .any(|value| *value != 0)
            });
            if !covered {
                continue;
            }
            let index = self
                .layout
                .tile_index(pos)
                .expect("tiles_in_rect yields positions inside the layout");
            if self.tiles[index].is_empty_sentinel() && !mode.can_increase_alpha() {
                continue;
            }

            let local_x = (part.x as u32 % TILE_SIZE) as usize;
            let local_y = part.y as u32 % TILE_SIZE;
            let pixels = self.tiles[index].pixels_mut()?;
            for row in 0..part.height {
                let start = ((local_y + row) * TILE_SIZE) as usize + local_x;
                let mask_row = &mask.row(mask_y + row)[mask_x..mask_x + width];
                mask_blend_row(&mut pixels[start..start + width], mask_row, color, mode);
            }
            self.mark_dirty(index);
        }
        Ok(())
    }

    /// Blend `source` onto this grid, shifted by the offset. Returns the
    /// tiles that were written.
    pub fn composite_region(
        &mut self,
        source: &TileGrid,
        offset_x: i32,
        offset_y: i32,
        opacity: u8,
        mode: BlendMode,
    ) -> Result<Vec<TilePos>, TileAllocError> {
        if opacity == 0 {
            return Ok(Vec::new());
        }
        self.blit(source, offset_x, offset_y, RowOp::Blend { opacity, mode })
    }

    /// Copy of this grid on a new layout. Pixel `(x, y)` moves to
    /// `(x + offset_x, y + offset_y)`; anything outside the new bounds is
    /// dropped and new area is transparent.
    pub fn resized(
        &self,
        layout: ImageLayout,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<TileGrid, TileAllocError> {
        let mut grid = TileGrid::new(layout);
        grid.blit(self, offset_x, offset_y, RowOp::Copy)?;
        grid.clear_dirty();
        Ok(grid)
    }

    fn blit(
        &mut self,
        source: &TileGrid,
        offset_x: i32,
        offset_y: i32,
        op: RowOp,
    ) -> Result<Vec<TilePos>, TileAllocError> {
        let Some(area) = source
            .layout
            .bounds()
            .translated(offset_x, offset_y)
            .intersected(&self.layout.bounds())
        else {
            return Ok(Vec::new());
        };

        let tile_aligned = offset_x.rem_euclid(TILE_SIZE as i32) == 0
            && offset_y.rem_euclid(TILE_SIZE as i32) == 0;
        let mut touched = Vec::new();
        let mut scratch: Vec<Pixel> = Vec::new();

        for pos in self.layout.tiles_in_rect(area) {
            let Some(part) = self.layout.tile_rect(pos).intersected(&area) else {
                continue;
            };
            let source_part = part.translated(-offset_x, -offset_y);
            let index = self
                .layout
                .tile_index(pos)
                .expect("tiles_in_rect yields positions inside the layout");
            if source.is_blank_in(source_part)
                && (op != RowOp::Copy || self.tiles[index].is_empty_sentinel())
            {
                continue;
            }

            let shareable = tile_aligned
                && (op == RowOp::Copy
                    || (op.is_plain_over() && self.tiles[index].is_empty_sentinel()));
            if let Some(shared) = source.whole_tile_at(source_part).filter(|_| shareable) {
                if !shared.ptr_eq(&self.tiles[index]) {
                    self.tiles[index] = shared.clone();
                    self.mark_dirty(index);
                    touched.push(pos);
                }
                continue;
            }

            source.read_rect(source_part, &mut scratch);
            let blank = scratch.iter().all(|pixel| pixel[ALPHA] == 0);
            if blank && (op != RowOp::Copy || self.tiles[index].is_empty_sentinel()) {
                continue;
            }

            let local_x = (part.x as u32 % TILE_SIZE) as usize;
            let local_y = part.y as u32 % TILE_SIZE;
            let width = part.width as usize;
            let pixels = self.tiles[index].pixels_mut()?;
            for (row, source_row) in scratch.chunks_exact(width).enumerate() {
                let start = ((local_y + row as u32) * TILE_SIZE) as usize + local_x;
                let target = &mut pixels[start..start + width];
                match op {
                    RowOp::Copy => target.copy_from_slice(source_row),
                    RowOp::Blend { opacity, mode } => {
                        layer_blend_row(target, source_row, opacity, mode)
                    }
                }
            }
            self.mark_dirty(index);
            touched.push(pos);
        }
        Ok(touched)
    }

    /// The tile covering exactly `rect`, if `rect` is one whole in-bounds tile.
    fn whole_tile_at(&self, rect: Rectangle) -> Option<&Tile> {
        if rect.width != TILE_SIZE
            || rect.height != TILE_SIZE
            || rect.x < 0
            || rect.y < 0
            || rect.x as u32 % TILE_SIZE != 0
            || rect.y as u32 % TILE_SIZE != 0
        {
            return None;
        }
        self.tile(TilePos::new(rect.x as u32 / TILE_SIZE, rect.y as u32 / TILE_SIZE))
    }

    fn is_blank_in(&self, rect: Rectangle) -> bool {
        self.layout
            .tiles_in_rect(rect)
            .all(|pos| self.tile(pos).is_none_or(Tile::is_empty_sentinel))
    }

    /// Row-major pixels of an in-bounds rectangle.
    fn read_rect(&self, rect: Rectangle, out: &mut Vec<Pixel>) {
        out.clear();
        for y in rect.y..rect.bottom() {
            let mut x = rect.x;
            while x < rect.right() {
                let pos = TilePos::new(x as u32 / TILE_SIZE, y as u32 / TILE_SIZE);
                let local_x = x as u32 % TILE_SIZE;
                let run = (TILE_SIZE - local_x).min((rect.right() - x) as u32);
                match self.tile(pos) {
                    Some(tile) => {
                        let row = tile.row(y as u32 % TILE_SIZE);
                        out.extend_from_slice(&row[local_x as usize..(local_x + run) as usize]);
                    }
                    None => out.extend(std::iter::repeat_n(TRANSPARENT_PIXEL, run as usize)),
                }
                x += run as i32;
            }
        }
    }

    pub fn has_dirty_tiles(&self) -> bool {
        self.dirty_count != 0
    }

    pub fn dirty_tile_count(&self) -> usize {
        self.dirty_count
    }

    /// Drain the dirty set in row-major order.
    pub fn take_dirty_tiles(&mut self) -> Vec<TilePos> {
        if self.dirty_count == 0 {
            return Vec::new();
        }
        let tiles_per_row = self.layout.tiles_per_row() as usize;
        let dirty = self
            .dirty_bits
            .iter_ones()
            .map(|index| {
                TilePos::new((index % tiles_per_row) as u32, (index / tiles_per_row) as u32)
            })
            .collect();
        self.clear_dirty();
        dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty_bits.fill(false);
        self.dirty_count = 0;
    }

    fn mark_dirty(&mut self, index: usize) {
        if index < self.dirty_bits.len() && !self.dirty_bits[index] {
            self.dirty_bits.set(index, true);
            self.dirty_count += 1;
        }
    }
}
