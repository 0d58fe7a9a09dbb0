use model::{ImageLayout, LayerId, Rectangle, TilePos};

/// Collects changed tiles and reduces them to one repaint rectangle.
#[derive(Debug, Default, Clone)]
pub struct AreaAccumulator {
    tiles: Vec<(LayerId, TilePos)>,
    bounds: Option<Rectangle>,
}

impl AreaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_tile(&mut self, layer: LayerId, pos: TilePos, layout: ImageLayout) {
        self.tiles.push((layer, pos));
        self.push_rect(layout.tile_rect(pos));
    }

    pub fn push_rect(&mut self, rect: Rectangle) {
        if rect.is_empty() {
            return;
        }
        self.bounds = Some(match self.bounds {
            Some(bounds) => bounds.united(&rect),
            None => rect,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn tiles(&self) -> &[(LayerId, TilePos)] {
        &self.tiles
    }

    pub fn bounds(&self) -> Option<Rectangle> {
        self.bounds
    }

    /// Coalesced bounds of everything pushed since the last take.
    pub fn take(&mut self) -> Option<Rectangle> {
        self.tiles.clear();
        self.bounds.take()
    }
}
