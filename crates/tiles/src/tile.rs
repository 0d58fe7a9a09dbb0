use std::fmt;
use std::sync::{Arc, OnceLock};

use model::{Pixel, TILE_LENGTH, TILE_SIZE, TRANSPARENT_PIXEL};

use crate::TileAllocError;

struct TileData {
    pixels: Box<[Pixel]>,
}

/// A `TILE_SIZE` x `TILE_SIZE` block of premultiplied pixels.
///
/// Tiles share their storage. Cloning a tile is a reference count bump, and
/// the first write through [`Tile::pixels_mut`] copies the pixels out if any
/// other handle still points at them. Every unpainted tile points at one
/// process-wide transparent block.
#[derive(Clone)]
pub struct Tile {
    data: Arc<TileData>,
}

fn empty_tile_data() -> &'static Arc<TileData> {
    static EMPTY: OnceLock<Arc<TileData>> = OnceLock::new();
    EMPTY.get_or_init(|| {
        Arc::new(TileData {
            pixels: vec![TRANSPARENT_PIXEL; TILE_LENGTH].into_boxed_slice(),
        })
    })
}

fn allocate_pixels(fill: &[Pixel]) -> Result<Box<[Pixel]>, TileAllocError> {
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(TILE_LENGTH)
        .map_err(|_| TileAllocError::OutOfMemory)?;
    pixels.extend_from_slice(fill);
    Ok(pixels.into_boxed_slice())
}

impl Tile {
    /// Handle to the shared transparent tile. Never allocates.
    pub fn empty() -> Self {
        Self {
            data: Arc::clone(empty_tile_data()),
        }
    }

    /// A tile with every pixel set to `pixel`. Transparent fills return the
    /// shared empty tile.
    pub fn filled(pixel: Pixel) -> Result<Self, TileAllocError> {
        if pixel == TRANSPARENT_PIXEL {
            return Ok(Self::empty());
        }
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(TILE_LENGTH)
            .map_err(|_| TileAllocError::OutOfMemory)?;
        pixels.resize(TILE_LENGTH, pixel);
        Ok(Self {
            data: Arc::new(TileData {
                pixels: pixels.into_boxed_slice(),
            }),
        })
    }

    /// Build a tile from a full row-major pixel block.
    pub fn from_pixels(pixels: &[Pixel]) -> Result<Self, TileAllocError> {
        assert_eq!(pixels.len(), TILE_LENGTH, "tile pixel block has wrong length");
        Ok(Self {
            data: Arc::new(TileData {
                pixels: allocate_pixels(pixels)?,
            }),
        })
    }

    pub fn is_empty_sentinel(&self) -> bool {
        Arc::ptr_eq(&self.data, empty_tile_data())
    }

    /// Whether both handles share the same pixel storage.
    pub fn ptr_eq(&self, other: &Tile) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        debug_assert!(x < TILE_SIZE && y < TILE_SIZE);
        self.data.pixels[(y * TILE_SIZE + x) as usize]
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.data.pixels
    }

    pub fn row(&self, y: u32) -> &[Pixel] {
        let start = (y * TILE_SIZE) as usize;
        &self.data.pixels[start..start + TILE_SIZE as usize]
    }

    /// Exclusive access to the pixels, copying them first if shared.
    pub fn pixels_mut(&mut self) -> Result<&mut [Pixel], TileAllocError> {
        if Arc::get_mut(&mut self.data).is_none() {
            let copied = allocate_pixels(&self.data.pixels)?;
            self.data = Arc::new(TileData { pixels: copied });
        }
        let data = Arc::get_mut(&mut self.data).expect("freshly copied tile is unique");
        Ok(&mut data.pixels)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: Pixel) -> Result<(), TileAllocError> {
        debug_assert!(x < TILE_SIZE && y < TILE_SIZE);
        if self.is_empty_sentinel() && pixel == TRANSPARENT_PIXEL {
            return Ok(());
        }
        self.pixels_mut()?[(y * TILE_SIZE + x) as usize] = pixel;
        Ok(())
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.is_empty_sentinel() || self.data.pixels.iter().all(|pixel| *pixel == TRANSPARENT_PIXEL)
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty_sentinel() {
            return formatter.write_str("Tile(empty)");
        }
        formatter
            .debug_struct("Tile")
            .field("shared", &(Arc::strong_count(&self.data) > 1))
            .field("first_pixel", &self.data.pixels[0])
            .finish()
    }
}
