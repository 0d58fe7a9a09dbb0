#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pixel rectangle. `x`/`y` may be negative; the extent never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Option<Self> {
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left,
            y: top,
            width: (right as i64 - left as i64) as u32,
            height: (bottom as i64 - top as i64) as u32,
        })
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> i32 {
        (self.x as i64 + self.width as i64).min(i32::MAX as i64) as i32
    }

    pub fn bottom(&self) -> i32 {
        (self.y as i64 + self.height as i64).min(i32::MAX as i64) as i32
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    pub fn intersected(&self, other: &Rectangle) -> Option<Rectangle> {
        Rectangle::from_edges(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
    }

    /// Bounding box of both rectangles. Empty rectangles are ignored.
    pub fn united(&self, other: &Rectangle) -> Rectangle {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Rectangle::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
        .unwrap_or(*self)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rectangle {
        Rectangle {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_disjoint_rects_is_none() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(10, 0, 10, 10);
        assert_eq!(a.intersected(&b), None);
        assert_eq!(
            a.intersected(&Rectangle::new(5, -5, 10, 10)),
            Some(Rectangle::new(5, 0, 5, 5))
        );
    }

    #[test]
    fn union_ignores_empty_rects() {
        let a = Rectangle::new(4, 4, 2, 2);
        assert_eq!(a.united(&Rectangle::default()), a);
        assert_eq!(
            a.united(&Rectangle::new(-1, 10, 1, 1)),
            Rectangle::new(-1, 4, 7, 7)
        );
    }
}
