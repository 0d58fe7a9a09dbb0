use model::Rectangle;

/// Square coverage mask placed on the canvas. `data` is row-major,
/// `diameter * diameter` bytes, 255 meaning full coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaMask {
    pub x: i32,
    pub y: i32,
    pub diameter: u32,
    pub data: Vec<u8>,
}

impl AlphaMask {
    pub fn new(x: i32, y: i32, diameter: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            diameter as usize * diameter as usize,
            "mask data does not match its diameter"
        );
        Self {
            x,
            y,
            diameter,
            data,
        }
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(self.x, self.y, self.diameter, self.diameter)
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = (y * self.diameter) as usize;
        &self.data[start..start + self.diameter as usize]
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|value| *value == 0)
    }
}
