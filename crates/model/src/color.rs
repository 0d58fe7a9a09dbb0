/// Premultiplied RGBA, one byte per channel.
pub type Pixel = [u8; 4];

pub const RED: usize = 0;
pub const GREEN: usize = 1;
pub const BLUE: usize = 2;
pub const ALPHA: usize = 3;

pub const TRANSPARENT_PIXEL: Pixel = [0, 0, 0, 0];

/// Straight (non-premultiplied) 8-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_argb32(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    pub const fn to_argb32(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_pixel(self) -> Pixel {
        let premultiply = |channel: u8| mul8(channel as u32, self.a as u32) as u8;
        [
            premultiply(self.r),
            premultiply(self.g),
            premultiply(self.b),
            self.a,
        ]
    }

    pub fn from_pixel(pixel: Pixel) -> Self {
        let alpha = pixel[ALPHA] as u32;
        if alpha == 0 {
            return Color::TRANSPARENT;
        }
        let unpremultiply = |channel: u8| ((channel as u32 * 255 + alpha / 2) / alpha).min(255) as u8;
        Color {
            r: unpremultiply(pixel[RED]),
            g: unpremultiply(pixel[GREEN]),
            b: unpremultiply(pixel[BLUE]),
            a: pixel[ALPHA],
        }
    }
}

/// `a * b / 255`, rounded to nearest.
const fn mul8(a: u32, b: u32) -> u32 {
    let t = a * b + 0x80;
    ((t >> 8) + t) >> 8
}
