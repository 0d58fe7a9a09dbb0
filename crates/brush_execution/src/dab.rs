use tiles::AlphaMask;

/// Largest radius the wire format can carry.
pub const MAX_DAB_RADIUS: f64 = u16::MAX as f64 / 256.0;
/// Dabs are rasterized with at least this radius so a tap always marks a pixel.
pub const MIN_DAB_RADIUS: f32 = 1.0;

/// A dab quantized to wire precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dab {
    /// Center in quarter pixels.
    pub x: i32,
    pub y: i32,
    /// Radius in 1/256 pixels.
    pub radius: u16,
    pub hardness: u8,
    pub opacity: u8,
}

impl Dab {
    /// Quantize brush geometry. Out of range values saturate.
    pub fn quantize(x: f64, y: f64, radius: f64, hardness: f64, opacity: f64) -> Self {
        let unit = |value: f64| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            x: (x * 4.0).round() as i32,
            y: (y * 4.0).round() as i32,
            radius: (radius.clamp(0.0, MAX_DAB_RADIUS) * 256.0).round() as u16,
            hardness: unit(hardness),
            opacity: unit(opacity),
        }
    }

    pub fn center_pixels(&self) -> (f32, f32) {
        (self.x as f32 / 4.0, self.y as f32 / 4.0)
    }

    pub fn radius_pixels(&self) -> f32 {
        self.radius as f32 / 256.0
    }

    pub fn mask(&self) -> Option<AlphaMask> {
        classic_dab_mask(self.x, self.y, self.radius, self.hardness, self.opacity)
    }
}

/// Coverage mask of one classic dab. Inputs are wire values: position in
/// quarter pixels, radius in 1/256 pixels. Pixels are sampled at their
/// centers; inside `hardness` the coverage is full, beyond it a smoothstep
/// falls to zero at the radius. Returns `None` for a fully transparent dab.
pub fn classic_dab_mask(
    x: i32,
    y: i32,
    radius: u16,
    hardness: u8,
    opacity: u8,
) -> Option<AlphaMask> {
    if opacity == 0 {
        return None;
    }
    let center_x = x as f32 / 4.0;
    let center_y = y as f32 / 4.0;
    let radius = (radius as f32 / 256.0).max(MIN_DAB_RADIUS);
    let hardness = hardness as f32 / 255.0;
    let opacity = opacity as f32;

    let left = (center_x - radius).floor() as i32;
    let top = (center_y - radius).floor() as i32;
    let width = (center_x + radius).ceil() as i32 - left;
    let height = (center_y + radius).ceil() as i32 - top;
    let diameter = width.max(height).max(1) as u32;

    let mut data = Vec::with_capacity((diameter * diameter) as usize);
    for row in 0..diameter {
        let dy = (top as f32 + row as f32 + 0.5) - center_y;
        for column in 0..diameter {
            let dx = (left as f32 + column as f32 + 0.5) - center_x;
            let distance = (dx * dx + dy * dy).sqrt() / radius;
            let coverage = if distance >= 1.0 {
                0.0
            } else if distance <= hardness {
                1.0
            } else {
                let u = (1.0 - distance) / (1.0 - hardness);
                u * u * (3.0 - 2.0 * u)
            };
            data.push((coverage * opacity).round() as u8);
        }
    }
    let mask = AlphaMask::new(left, top, diameter, data);
    if mask.is_blank() { None } else { Some(mask) }
}
