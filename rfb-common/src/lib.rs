//! Common geometry types shared by the decoder crates.
//!
//! - [`Point`] - 2D point with i32 coordinates
//! - [`Rect`] - Rectangle with position and dimensions

/// A 2D point with integer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise subtraction, used for hotspot-relative placement.
    pub const fn offset_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x - dx,
            y: self.y - dy,
        }
    }
}

/// A rectangle defined by top-left position and dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from unsigned 16-bit wire coordinates.
    pub const fn from_wire(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self::new(x as i32, y as i32, width as u32, height as u32)
    }

    /// Get the right edge (x + width), widened so it cannot overflow.
    pub const fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Get the bottom edge (y + height), widened so it cannot overflow.
    pub const fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// True when the rectangle covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the rectangle lies entirely inside a `width x height` surface
    /// anchored at the origin.
    pub const fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= width as i64
            && self.bottom() <= height as i64
    }

    /// Intersection with a `width x height` surface anchored at the origin.
    ///
    /// Returns `None` when nothing of the rectangle is on the surface.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        let left = (self.x as i64).max(0);
        let top = (self.y as i64).max(0);
        let right = self.right().min(width as i64);
        let bottom = self.bottom().min(height as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}
