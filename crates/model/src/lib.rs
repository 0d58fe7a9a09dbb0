use std::fmt;

mod color;
mod geometry;

pub use color::{ALPHA, BLUE, Color, GREEN, Pixel, RED, TRANSPARENT_PIXEL};
pub use geometry::{Rectangle, Size};

pub const TILE_SIZE: u32 = 64;
pub const TILE_LENGTH: usize = (TILE_SIZE * TILE_SIZE) as usize;

/// Largest width or height a canvas can be resized to.
pub const MAX_CANVAS_DIMENSION: u32 = 32_767;

pub type LayerId = u16;
pub type UserId = u8;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

impl TilePos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImageLayout {
    /// All layers of a canvas share one layout, so it lives apart from the tiles.
    size: Size,
    tiles_per_row: u32,
    tiles_per_column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayoutError {
    TileIndexOutOfBounds,
    LayoutMismatch,
}

impl fmt::Display for ImageLayoutError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageLayoutError::TileIndexOutOfBounds => {
                write!(formatter, "tile index is outside the image layout")
            }
            ImageLayoutError::LayoutMismatch => {
                write!(formatter, "image layouts do not match")
            }
        }
    }
}

impl std::error::Error for ImageLayoutError {}

impl ImageLayout {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.min(MAX_CANVAS_DIMENSION);
        let height = height.min(MAX_CANVAS_DIMENSION);
        Self {
            size: Size { width, height },
            tiles_per_row: width.div_ceil(TILE_SIZE),
            tiles_per_column: height.div_ceil(TILE_SIZE),
        }
    }

    pub const fn size(&self) -> Size {
        self.size
    }

    pub const fn width(&self) -> u32 {
        self.size.width
    }

    pub const fn height(&self) -> u32 {
        self.size.height
    }

    pub const fn tiles_per_row(&self) -> u32 {
        self.tiles_per_row
    }

    pub const fn tiles_per_column(&self) -> u32 {
        self.tiles_per_column
    }

    pub const fn max_tiles(self) -> usize {
        self.tiles_per_row as usize * self.tiles_per_column as usize
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(0, 0, self.size.width, self.size.height)
    }

    pub fn contains_tile(&self, tile: TilePos) -> bool {
        tile.x < self.tiles_per_row && tile.y < self.tiles_per_column
    }

    pub fn tile_index(&self, tile: TilePos) -> Result<usize, ImageLayoutError> {
        if !self.contains_tile(tile) {
            Err(ImageLayoutError::TileIndexOutOfBounds)
        } else {
            Ok((tile.y * self.tiles_per_row + tile.x) as usize)
        }
    }

    pub fn tile_pos(&self, index: usize) -> Result<TilePos, ImageLayoutError> {
        if index >= self.max_tiles() {
            Err(ImageLayoutError::TileIndexOutOfBounds)
        } else {
            let x = index % self.tiles_per_row as usize;
            let y = index / self.tiles_per_row as usize;
            Ok(TilePos {
                x: x as u32,
                y: y as u32,
            })
        }
    }

    /// Pixel area covered by a tile, clipped to the canvas.
    pub fn tile_rect(&self, tile: TilePos) -> Rectangle {
        let unclipped = Rectangle::new(
            (tile.x * TILE_SIZE) as i32,
            (tile.y * TILE_SIZE) as i32,
            TILE_SIZE,
            TILE_SIZE,
        );
        unclipped
            .intersected(&self.bounds())
            .unwrap_or(Rectangle::new(unclipped.x, unclipped.y, 0, 0))
    }

    /// All tiles that intersect `rect`, in row-major order.
    pub fn tiles_in_rect(&self, rect: Rectangle) -> impl Iterator<Item = TilePos> + use<> {
        let clipped = rect.intersected(&self.bounds());
        let (min_x, min_y, max_x, max_y) = match clipped {
            Some(area) => (
                area.x as u32 / TILE_SIZE,
                area.y as u32 / TILE_SIZE,
                (area.right() as u32 - 1) / TILE_SIZE,
                (area.bottom() as u32 - 1) / TILE_SIZE,
            ),
            None => (1, 1, 0, 0),
        };
        (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| TilePos { x, y }))
    }

    pub fn iter_tiles(&self) -> impl Iterator<Item = TilePos> + use<> {
        self.tiles_in_rect(self.bounds())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    Erase,
    #[default]
    Normal,
    Multiply,
    Divide,
    Burn,
    Dodge,
    Darken,
    Lighten,
    Subtract,
    Add,
    Recolor,
    Behind,
}

impl BlendMode {
    pub const ALL: [BlendMode; 12] = [
        BlendMode::Erase,
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Divide,
        BlendMode::Burn,
        BlendMode::Dodge,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::Subtract,
        BlendMode::Add,
        BlendMode::Recolor,
        BlendMode::Behind,
    ];

    pub const fn to_wire(self) -> u8 {
        match self {
            BlendMode::Erase => 0,
            BlendMode::Normal => 1,
            BlendMode::Multiply => 2,
            BlendMode::Divide => 3,
            BlendMode::Burn => 4,
            BlendMode::Dodge => 5,
            BlendMode::Darken => 6,
            BlendMode::Lighten => 7,
            BlendMode::Subtract => 8,
            BlendMode::Add => 9,
            BlendMode::Recolor => 10,
            BlendMode::Behind => 11,
        }
    }

    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(BlendMode::Erase),
            1 => Some(BlendMode::Normal),
            2 => Some(BlendMode::Multiply),
            3 => Some(BlendMode::Divide),
            4 => Some(BlendMode::Burn),
            5 => Some(BlendMode::Dodge),
            6 => Some(BlendMode::Darken),
            7 => Some(BlendMode::Lighten),
            8 => Some(BlendMode::Subtract),
            9 => Some(BlendMode::Add),
            10 => Some(BlendMode::Recolor),
            11 => Some(BlendMode::Behind),
            _ => None,
        }
    }

    /// Whether this mode can put paint on fully transparent pixels.
    pub const fn can_increase_alpha(self) -> bool {
        matches!(self, BlendMode::Normal | BlendMode::Behind)
    }
}
