use std::collections::BTreeSet;

use model::{
    BlendMode, Color, ImageLayout, LayerId, MAX_CANVAS_DIMENSION, Rectangle, Size, TilePos,
};
use tiles::TileGrid;

use crate::{Layer, LayerInfo, LayerStackError};

/// Where the old canvas landed after a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOutcome {
    pub x_offset: i32,
    pub y_offset: i32,
    pub old_size: Size,
}

/// Ordered layers plus the canvas they share. Index 0 paints first.
///
/// Cloning a stack shares every tile, so clones serve as undo snapshots.
/// Every mutating operation either succeeds or leaves the stack unchanged.
#[derive(Debug, Clone)]
pub struct LayerStack {
    layout: ImageLayout,
    background: Color,
    layers: Vec<Layer>,
    used_ids: BTreeSet<LayerId>,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new(ImageLayout::new(0, 0), Color::TRANSPARENT)
    }
}

impl LayerStack {
    pub fn new(layout: ImageLayout, background: Color) -> Self {
        Self {
            layout,
            background,
            layers: Vec::new(),
            used_ids: BTreeSet::new(),
        }
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    pub fn size(&self) -> Size {
        self.layout.size()
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id() == id)
    }

    fn index_of(&self, id: LayerId) -> Result<usize, LayerStackError> {
        self.layers
            .iter()
            .position(|layer| layer.id() == id)
            .ok_or(LayerStackError::UnknownLayer(id))
    }

    pub fn layer_infos(&self) -> Vec<LayerInfo> {
        self.layers.iter().map(Layer::info).collect()
    }

    /// Add a layer on top. With a `source` the new layer shares that layer's
    /// tiles; otherwise it is filled with `fill`.
    pub fn create_layer(
        &mut self,
        id: LayerId,
        source: Option<LayerId>,
        fill: Color,
        title: impl Into<String>,
    ) -> Result<(), LayerStackError> {
        if id == 0 {
            return Err(LayerStackError::InvalidLayerId);
        }
        if self.used_ids.contains(&id) {
            return Err(LayerStackError::DuplicateLayer(id));
        }
        let tiles = match source {
            Some(source_id) => self
                .layer(source_id)
                .ok_or(LayerStackError::UnknownSourceLayer(source_id))?
                .tiles()
                .duplicate(),
            None if fill.a == 0 => TileGrid::new(self.layout),
            None => TileGrid::filled(self.layout, fill.to_pixel())?,
        };
        self.layers.push(Layer::new(id, title, tiles));
        self.used_ids.insert(id);
        Ok(())
    }

    /// Ids taken in `other` stay taken here, even where `other` is an older
    /// or newer state of the same session.
    pub fn adopt_used_ids(&mut self, other: &LayerStack) {
        self.used_ids.extend(other.used_ids.iter().copied());
    }

    /// Remove a layer, optionally compositing it onto the layer below first.
    /// Merging a hidden layer only removes it.
    pub fn delete_layer(&mut self, id: LayerId, merge: bool) -> Result<(), LayerStackError> {
        let index = self.index_of(id)?;
        if merge {
            if index == 0 {
                return Err(LayerStackError::NothingToMergeInto(id));
            }
            let layer = &self.layers[index];
            if layer.is_visible() {
                let mut merged = self.layers[index - 1].tiles().clone();
                merged.composite_region(layer.tiles(), 0, 0, layer.opacity(), layer.blend())?;
                self.layers[index - 1].replace_tiles(merged);
            }
        }
        self.layers.remove(index);
        Ok(())
    }

    /// Reorder so that `order` lists layers bottom to top. Layers missing from
    /// `order` keep their relative order above the listed ones.
    pub fn reorder_layers(&mut self, order: &[LayerId]) -> Result<(), LayerStackError> {
        let mut seen = BTreeSet::new();
        for &id in order {
            self.index_of(id)?;
            if !seen.insert(id) {
                return Err(LayerStackError::DuplicateInOrder(id));
            }
        }
        let mut reordered = Vec::with_capacity(self.layers.len());
        let mut remaining = std::mem::take(&mut self.layers);
        for &id in order {
            let position = remaining
                .iter()
                .position(|layer| layer.id() == id)
                .expect("order was validated against the stack");
            reordered.push(remaining.remove(position));
        }
        reordered.append(&mut remaining);
        self.layers = reordered;
        Ok(())
    }

    pub fn set_attributes(
        &mut self,
        id: LayerId,
        opacity: u8,
        blend: BlendMode,
        hidden: bool,
    ) -> Result<(), LayerStackError> {
        let layer = self.layer_mut(id).ok_or(LayerStackError::UnknownLayer(id))?;
        layer.set_attributes(opacity, blend, hidden);
        Ok(())
    }

    pub fn retitle(&mut self, id: LayerId, title: impl Into<String>) -> Result<(), LayerStackError> {
        let layer = self.layer_mut(id).ok_or(LayerStackError::UnknownLayer(id))?;
        layer.set_title(title.into());
        Ok(())
    }

    /// Grow or crop each edge. The resulting size is clamped to
    /// `1..=MAX_CANVAS_DIMENSION`. Returns `None` when nothing changes.
    pub fn resize(
        &mut self,
        top: i32,
        right: i32,
        bottom: i32,
        left: i32,
    ) -> Result<Option<ResizeOutcome>, LayerStackError> {
        let old_size = self.size();
        let clamp = |extent: i64| extent.clamp(1, MAX_CANVAS_DIMENSION as i64) as u32;
        let width = clamp(old_size.width as i64 + left as i64 + right as i64);
        let height = clamp(old_size.height as i64 + top as i64 + bottom as i64);
        if width == old_size.width && height == old_size.height && left == 0 && top == 0 {
            return Ok(None);
        }

        let layout = ImageLayout::new(width, height);
        let mut resized = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            resized.push(layer.tiles().resized(layout, left, top)?);
        }
        for (layer, tiles) in self.layers.iter_mut().zip(resized) {
            layer.replace_tiles(tiles);
        }
        self.layout = layout;
        Ok(Some(ResizeOutcome {
            x_offset: left,
            y_offset: top,
            old_size,
        }))
    }

    /// Drain the dirty tiles of every layer.
    pub fn take_changed_tiles(&mut self) -> Vec<(LayerId, TilePos)> {
        let mut changed = Vec::new();
        for layer in &mut self.layers {
            let id = layer.id();
            changed.extend(
                layer
                    .tiles_mut()
                    .take_dirty_tiles()
                    .into_iter()
                    .map(|pos| (id, pos)),
            );
        }
        changed
    }

    pub fn clear_dirty(&mut self) {
        for layer in &mut self.layers {
            layer.tiles_mut().clear_dirty();
        }
    }

    /// Area that renders differently between two stacks. Tiles are compared
    /// by identity, so shared tiles never count as changed.
    pub fn changed_area_between(old: &LayerStack, new: &LayerStack) -> Option<Rectangle> {
        let full = || {
            let bounds = new.layout.bounds();
            (!bounds.is_empty()).then_some(bounds)
        };
        if old.layout != new.layout || old.background != new.background {
            return full();
        }
        if old.layers.len() != new.layers.len()
            || old
                .layers
                .iter()
                .zip(&new.layers)
                .any(|(a, b)| !a.renders_like(b))
        {
            return full();
        }

        let mut area: Option<Rectangle> = None;
        for (old_layer, new_layer) in old.layers.iter().zip(&new.layers) {
            for ((pos, old_tile), (_, new_tile)) in
                old_layer.tiles().iter_tiles().zip(new_layer.tiles().iter_tiles())
            {
                if old_tile.ptr_eq(new_tile) {
                    continue;
                }
                let rect = new.layout.tile_rect(pos);
                area = Some(area.map_or(rect, |area| area.united(&rect)));
            }
        }
        area
    }
}
