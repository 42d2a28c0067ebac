// src/geometry.rs

//! Integer screen-space primitives shared by the damage tracker, the geometry
//! reconciler, and the input normalizer.

use serde::{Deserialize, Serialize};

/// A point in pixels (or cells, for text backends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// A width/height pair. Negative extents never occur; arithmetic saturates at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered. Zero if either extent is zero.
    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(self) -> bool {
        self.area() == 0
    }

    /// Grows both extents by `amount` on each side.
    pub fn inflate(self, amount: u32) -> Self {
        Self::new(
            self.width.saturating_add(amount.saturating_mul(2)),
            self.height.saturating_add(amount.saturating_mul(2)),
        )
    }

    /// Shrinks both extents by `amount` on each side, saturating at zero.
    pub fn deflate(self, amount: u32) -> Self {
        Self::new(
            self.width.saturating_sub(amount.saturating_mul(2)),
            self.height.saturating_sub(amount.saturating_mul(2)),
        )
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub const fn from_parts(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn x(&self) -> i32 {
        self.origin.x
    }

    pub fn y(&self) -> i32 {
        self.origin.y
    }

    pub fn end_x(&self) -> i32 {
        self.origin.x.saturating_add(self.size.width as i32)
    }

    pub fn end_y(&self) -> i32 {
        self.origin.y.saturating_add(self.size.height as i32)
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Half-open containment test: the right and bottom edges are outside.
    pub fn contains(&self, p: Point) -> bool {
        !self.is_empty() && p.x >= self.x() && p.x < self.end_x() && p.y >= self.y() && p.y < self.end_y()
    }

    /// Smallest rectangle covering both. An empty operand is ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x().min(other.x());
        let y0 = self.y().min(other.y());
        let x1 = self.end_x().max(other.end_x());
        let y1 = self.end_y().max(other.end_y());
        Rect::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x() < other.end_x()
            && other.x() < self.end_x()
            && self.y() < other.end_y()
            && other.y() < self.end_y()
    }

    /// Overlapping area of both, or an empty rectangle at `self`'s origin.
    pub fn intersection(&self, other: &Rect) -> Rect {
        if !self.intersects(other) {
            return Rect::from_parts(self.origin, Size::ZERO);
        }
        let x0 = self.x().max(other.x());
        let y0 = self.y().max(other.y());
        let x1 = self.end_x().min(other.end_x());
        let y1 = self.end_y().min(other.end_y());
        Rect::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32)
    }

    /// True if `other` lies entirely within `self`.
    pub fn covers(&self, other: &Rect) -> bool {
        other.is_empty()
            || (self.x() <= other.x()
                && self.y() <= other.y()
                && self.end_x() >= other.end_x()
                && self.end_y() >= other.end_y())
    }
}
