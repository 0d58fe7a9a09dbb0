//! Integer per-pixel blending.
//!
//! Every function here works on premultiplied pixels and rounds through
//! [`mul8`], so two engines given the same inputs produce identical bytes.
//! Channels are clamped to `[0, alpha]`, which keeps premultiplied pixels
//! valid and rules out overflow.

use model::{ALPHA, BlendMode, Color, Pixel};

/// `a * b / 255`, rounded to nearest. Exact for `a, b <= 255`.
#[inline]
pub const fn mul8(a: u32, b: u32) -> u32 {
    let t = a * b + 0x80;
    ((t >> 8) + t) >> 8
}

/// Paint source for one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Source {
    /// Color channels scaled by `alpha`.
    premultiplied: [u32; 3],
    /// Straight color channels.
    straight: [u32; 3],
    alpha: u32,
}

impl Source {
    fn from_color(color: Color, alpha: u32) -> Self {
        let straight = [color.r as u32, color.g as u32, color.b as u32];
        Self {
            premultiplied: straight.map(|channel| mul8(channel, alpha)),
            straight,
            alpha,
        }
    }

    fn from_pixel(pixel: Pixel, opacity: u32) -> Self {
        let source_alpha = pixel[ALPHA] as u32;
        let straight = if source_alpha == 0 {
            [0; 3]
        } else {
            [0, 1, 2].map(|channel| {
                ((pixel[channel] as u32 * 255 + source_alpha / 2) / source_alpha).min(255)
            })
        };
        Self {
            premultiplied: [0, 1, 2].map(|channel| mul8(pixel[channel] as u32, opacity)),
            straight,
            alpha: mul8(source_alpha, opacity),
        }
    }
}

fn blend_pixel(destination: Pixel, source: Source, mode: BlendMode) -> Pixel {
    let alpha = source.alpha;
    if alpha == 0 {
        return destination;
    }
    let da = destination[ALPHA] as u32;
    let mut out = destination;
    match mode {
        BlendMode::Normal => {
            for channel in 0..3 {
                out[channel] = (source.premultiplied[channel]
                    + mul8(destination[channel] as u32, 255 - alpha))
                    as u8;
            }
            out[ALPHA] = (alpha + mul8(da, 255 - alpha)) as u8;
        }
        BlendMode::Behind => {
            for channel in 0..3 {
                out[channel] = (destination[channel] as u32
                    + mul8(source.premultiplied[channel], 255 - da))
                    as u8;
            }
            out[ALPHA] = (da + mul8(alpha, 255 - da)) as u8;
        }
        BlendMode::Erase => {
            for value in out.iter_mut() {
                *value = mul8(*value as u32, 255 - alpha) as u8;
            }
        }
        _ => {
            for channel in 0..3 {
                let d = destination[channel] as u32;
                let target = separable_target(mode, d, da, source.straight[channel]);
                out[channel] = lerp8(d, target.min(da), alpha) as u8;
            }
        }
    }
    out
}

/// Result channel of a separable mode, before mixing by source alpha.
/// `d` is premultiplied by `da`; `c` is a straight source channel.
fn separable_target(mode: BlendMode, d: u32, da: u32, c: u32) -> u32 {
    let scaled_source = mul8(c, da);
    match mode {
        BlendMode::Multiply => mul8(d, c),
        BlendMode::Divide => {
            if c == 0 {
                da
            } else {
                (d * 255 / c).min(da)
            }
        }
        BlendMode::Burn => {
            let inverse = da.saturating_sub(d);
            if c == 0 {
                if inverse == 0 { da } else { 0 }
            } else {
                da.saturating_sub((inverse * 255 / c).min(da))
            }
        }
        BlendMode::Dodge => {
            if c == 255 {
                if d == 0 { 0 } else { da }
            } else {
                (d * 255 / (255 - c)).min(da)
            }
        }
        BlendMode::Darken => d.min(scaled_source),
        BlendMode::Lighten => d.max(scaled_source),
        BlendMode::Subtract => d.saturating_sub(scaled_source),
        BlendMode::Add => (d + scaled_source).min(da),
        BlendMode::Recolor => scaled_source,
        BlendMode::Normal | BlendMode::Behind | BlendMode::Erase => d,
    }
}

fn lerp8(from: u32, to: u32, amount: u32) -> u32 {
    if to >= from {
        from + mul8(to - from, amount)
    } else {
        from - mul8(from - to, amount)
    }
}

/// Blend a solid color through an alpha mask. `mask` and `destination` are
/// one row and must have the same length. The color's own alpha is ignored;
/// coverage comes from the mask only.
pub fn mask_blend_row(destination: &mut [Pixel], mask: &[u8], color: Color, mode: BlendMode) {
    debug_assert_eq!(destination.len(), mask.len());
    for (pixel, &coverage) in destination.iter_mut().zip(mask) {
        if coverage == 0 {
            continue;
        }
        *pixel = blend_pixel(*pixel, Source::from_color(color, coverage as u32), mode);
    }
}

/// Blend one row of premultiplied source pixels onto `destination`.
pub fn layer_blend_row(destination: &mut [Pixel], source: &[Pixel], opacity: u8, mode: BlendMode) {
    debug_assert_eq!(destination.len(), source.len());
    if opacity == 0 {
        return;
    }
    for (pixel, &source_pixel) in destination.iter_mut().zip(source) {
        if source_pixel[ALPHA] == 0 {
            continue;
        }
        *pixel = blend_pixel(*pixel, Source::from_pixel(source_pixel, opacity as u32), mode);
    }
}
