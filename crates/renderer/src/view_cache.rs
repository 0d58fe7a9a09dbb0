//! Per-consumer render caches.
//!
//! Each registered view keeps a full-canvas buffer and one stale bit per
//! tile. Repaint notifications only set bits; `refresh` recomposes the stale
//! tiles a request overlaps and serves the rest from the buffer.

use bitvec::prelude::{BitVec, Lsb0};
use document::LayerStack;
use model::{ImageLayout, Rectangle, TILE_LENGTH, TRANSPARENT_PIXEL};
use slotmap::{SlotMap, new_key_type};

use crate::PixelBuffer;
use crate::composite::{compose_tile_into, copy_tile_part};

new_key_type! {
    pub struct ViewId;
}

#[derive(Debug)]
struct ViewCache {
    buffer: PixelBuffer,
    stale: BitVec<usize, Lsb0>,
}

impl ViewCache {
    fn new(layout: ImageLayout) -> Self {
        Self {
            buffer: PixelBuffer::new(layout.width(), layout.height()),
            stale: BitVec::repeat(true, layout.max_tiles()),
        }
    }
}

#[derive(Debug)]
pub struct ViewCaches {
    layout: ImageLayout,
    views: SlotMap<ViewId, ViewCache>,
}

impl Default for ViewCaches {
    fn default() -> Self {
        Self::new(ImageLayout::new(0, 0))
    }
}

impl ViewCaches {
    pub fn new(layout: ImageLayout) -> Self {
        Self {
            layout,
            views: SlotMap::with_key(),
        }
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Add a view. Everything starts stale.
    pub fn register(&mut self) -> ViewId {
        self.views.insert(ViewCache::new(self.layout))
    }

    pub fn unregister(&mut self, id: ViewId) -> bool {
        self.views.remove(id).is_some()
    }

    /// Mark the tiles under `rect` stale in every view.
    pub fn mark_dirty(&mut self, rect: Rectangle) {
        let Some(area) = rect.intersected(&self.layout.bounds()) else {
            return;
        };
        for pos in self.layout.tiles_in_rect(area) {
            let index = self
                .layout
                .tile_index(pos)
                .expect("tiles_in_rect yields positions inside the layout");
            for view in self.views.values_mut() {
                view.stale.set(index, true);
            }
        }
    }

    /// Drop all cached pixels, e.g. after the canvas was resized.
    pub fn reset(&mut self, layout: ImageLayout) {
        self.layout = layout;
        for view in self.views.values_mut() {
            *view = ViewCache::new(layout);
        }
        tracing::debug!(
            width = layout.width(),
            height = layout.height(),
            views = self.views.len(),
            "view caches reset"
        );
    }

    /// Bring the part of view `id` under `rect` up to date with `stack` and
    /// return it. Returns `None` for an unknown view.
    pub fn refresh(
        &mut self,
        id: ViewId,
        stack: &LayerStack,
        rect: Rectangle,
    ) -> Option<PixelBuffer> {
        if stack.layout() != self.layout {
            self.reset(stack.layout());
        }
        let layout = self.layout;
        let view = self.views.get_mut(id)?;
        let mut output = PixelBuffer::new(rect.width, rect.height);
        let Some(visible) = rect.intersected(&layout.bounds()) else {
            return Some(output);
        };

        let mut accumulator = vec![TRANSPARENT_PIXEL; TILE_LENGTH];
        for pos in layout.tiles_in_rect(visible) {
            let index = layout
                .tile_index(pos)
                .expect("tiles_in_rect yields positions inside the layout");
            if !view.stale[index] {
                continue;
            }
            compose_tile_into(stack, pos, &mut accumulator);
            copy_tile_part(&accumulator, pos, layout.bounds(), (0, 0), &mut view.buffer);
            view.stale.set(index, false);
        }
        for row in 0..visible.height {
            let canvas_y = (visible.y as u32) + row;
            let source_x = visible.x as usize;
            let width = visible.width as usize;
            let target_x = (visible.x - rect.x) as usize;
            let target_y = (visible.y - rect.y) as u32 + row;
            output.row_mut(target_y)[target_x..target_x + width]
                .copy_from_slice(&view.buffer.row(canvas_y)[source_x..source_x + width]);
        }
        Some(output)
    }

    pub fn stale_tile_count(&self, id: ViewId) -> Option<usize> {
        self.views.get(id).map(|view| view.stale.count_ones())
    }
}

#[cfg(test)]
mod tests {
    use document::LayerStack;
    use model::{Color, ImageLayout, TilePos};

    use super::*;
    use crate::compose_region;

    fn layout() -> ImageLayout {
        ImageLayout::new(130, 70)
    }

    #[test]
    fn refresh_matches_direct_composition() {
        let mut stack = LayerStack::new(layout(), Color::WHITE);
        stack
            .create_layer(1, None, Color::rgba(0, 0, 255, 128), "tint")
            .expect("create layer");
        let mut caches = ViewCaches::new(layout());
        let view = caches.register();

        let rect = Rectangle::new(-5, 30, 100, 50);
        let cached = caches.refresh(view, &stack, rect).expect("known view");
        assert_eq!(cached, compose_region(&stack, rect));
    }

    #[test]
    fn only_stale_tiles_are_recomposed() {
        let mut stack = LayerStack::new(layout(), Color::WHITE);
        stack
            .create_layer(1, None, Color::TRANSPARENT, "ink")
            .expect("create layer");
        let mut caches = ViewCaches::new(layout());
        let view = caches.register();
        assert_eq!(caches.stale_tile_count(view), Some(6));

        let full = layout().bounds();
        caches.refresh(view, &stack, full).expect("known view");
        assert_eq!(caches.stale_tile_count(view), Some(0));

        stack
            .layer_mut(1)
            .expect("layer exists")
            .tiles_mut()
            .set_pixel(70, 10, [0, 0, 0, 255])
            .expect("set pixel");
        // Without a dirty mark the cached pixel is served unchanged.
        let before = caches.refresh(view, &stack, full).expect("known view");
        assert_eq!(before.pixel(70, 10), [255, 255, 255, 255]);

        caches.mark_dirty(Rectangle::new(70, 10, 1, 1));
        assert_eq!(caches.stale_tile_count(view), Some(1));
        let after = caches.refresh(view, &stack, full).expect("known view");
        assert_eq!(after.pixel(70, 10), [0, 0, 0, 255]);
        assert_eq!(
            layout().tile_index(TilePos::new(1, 0)).expect("inside layout"),
            1
        );
    }

    #[test]
    fn unregistered_view_is_unknown() {
        let stack = LayerStack::new(layout(), Color::WHITE);
        let mut caches = ViewCaches::new(layout());
        let view = caches.register();
        assert!(caches.unregister(view));
        assert!(!caches.unregister(view));
        assert_eq!(caches.refresh(view, &stack, layout().bounds()), None);
    }

    #[test]
    fn resized_stack_resets_caches() {
        let mut stack = LayerStack::new(layout(), Color::WHITE);
        let mut caches = ViewCaches::new(layout());
        let view = caches.register();
        caches
            .refresh(view, &stack, layout().bounds())
            .expect("known view");
        stack.resize(0, 10, 0, 0).expect("resize");
        let refreshed = caches
            .refresh(view, &stack, stack.layout().bounds())
            .expect("known view");
        assert_eq!(refreshed.width(), 140);
        assert_eq!(caches.layout(), stack.layout());
        assert_eq!(caches.stale_tile_count(view), Some(0));
    }
}
