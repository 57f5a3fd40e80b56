use serde::{Deserialize, Serialize};

/// An axis-aligned integer rectangle in buffer-pixel coordinates.
///
/// `right()`/`bottom()` are inclusive, matching the scanline loops in the
/// windowed effects.  A rectangle with zero (or negative) extent is empty.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct RectI {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RectI {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Build from inclusive left/top and exclusive right/bottom edges.
    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { x: left, y: top, width: right - left, height: bottom - top }
    }

    pub const fn empty() -> Self {
        Self { x: 0, y: 0, width: 0, height: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub const fn left(&self) -> i32 {
        self.x
    }

    pub const fn top(&self) -> i32 {
        self.y
    }

    /// Rightmost column inside the rectangle (inclusive).
    pub const fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    /// Bottommost row inside the rectangle (inclusive).
    pub const fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        !self.is_empty() && x >= self.x && y >= self.y && x <= self.right() && y <= self.bottom()
    }

    pub fn intersect(&self, other: RectI) -> RectI {
        let l = self.x.max(other.x);
        let t = self.y.max(other.y);
        let r = (self.x + self.width).min(other.x + other.width);
        let b = (self.y + self.height).min(other.y + other.height);
        if r > l && b > t {
            RectI::from_ltrb(l, t, r, b)
        } else {
            RectI::empty()
        }
    }

    /// Smallest rectangle covering both.  An empty side is ignored.
    pub fn union(&self, other: RectI) -> RectI {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return *self;
        }
        let l = self.x.min(other.x);
        let t = self.y.min(other.y);
        let r = (self.x + self.width).max(other.x + other.width);
        let b = (self.y + self.height).max(other.y + other.height);
        RectI::from_ltrb(l, t, r, b)
    }
}
