use model::{BlendMode, LayerId, Pixel, TILE_SIZE, TilePos};
use tiles::TileGrid;
use tiles::rasterop::layer_blend_row;

/// Metadata of one layer, as reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub title: String,
    pub opacity: u8,
    pub blend: BlendMode,
    pub hidden: bool,
}

#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    title: String,
    opacity: u8,
    blend: BlendMode,
    hidden: bool,
    tiles: TileGrid,
}

impl Layer {
    pub fn new(id: LayerId, title: impl Into<String>, tiles: TileGrid) -> Self {
        Self {
            id,
            title: title.into(),
            opacity: 255,
            blend: BlendMode::Normal,
            hidden: false,
            tiles,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether the layer contributes anything to the composite.
    pub fn is_visible(&self) -> bool {
        !self.hidden && self.opacity > 0
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileGrid {
        &mut self.tiles
    }

    pub(crate) fn replace_tiles(&mut self, tiles: TileGrid) -> TileGrid {
        std::mem::replace(&mut self.tiles, tiles)
    }

    pub(crate) fn set_attributes(&mut self, opacity: u8, blend: BlendMode, hidden: bool) {
        self.opacity = opacity;
        self.blend = blend;
        self.hidden = hidden;
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub fn info(&self) -> LayerInfo {
        LayerInfo {
            id: self.id,
            title: self.title.clone(),
            opacity: self.opacity,
            blend: self.blend,
            hidden: self.hidden,
        }
    }

    /// Same id and compositing attributes. Titles do not affect rendering.
    pub fn renders_like(&self, other: &Layer) -> bool {
        self.id == other.id
            && self.opacity == other.opacity
            && self.blend == other.blend
            && self.hidden == other.hidden
    }

    /// Blend this layer's tile at `pos` onto a `TILE_SIZE` square
    /// accumulator, using the layer's opacity and blend mode.
    pub fn composite_tile_onto(&self, pos: TilePos, accumulator: &mut [Pixel]) {
        debug_assert_eq!(accumulator.len(), (TILE_SIZE * TILE_SIZE) as usize);
        if !self.is_visible() {
            return;
        }
        let Some(tile) = self.tiles.tile(pos) else {
            return;
        };
        if tile.is_empty_sentinel() {
            return;
        }
        for (row, destination) in accumulator
            .chunks_exact_mut(TILE_SIZE as usize)
            .enumerate()
        {
            layer_blend_row(destination, tile.row(row as u32), self.opacity, self.blend);
        }
    }
}
