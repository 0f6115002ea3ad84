//! Integer pixel geometry shared by the scissors pipeline.

use serde::{Deserialize, Serialize};

/// A pixel position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Point) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// True when `other` is one of the 8 neighbours of `self`.
    pub fn is_neighbor(self, other: Point) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        dx.max(dy) == 1
    }

    /// Clamp into `[0, width) x [0, height)`.
    pub fn clamp_to(self, width: usize, height: usize) -> Point {
        let max_x = width.saturating_sub(1) as i32;
        let max_y = height.saturating_sub(1) as i32;
        Point::new(self.x.clamp(0, max_x), self.y.clamp(0, max_y))
    }

    pub fn within(self, other: Point, radius: f64) -> bool {
        (self.distance_squared(other) as f64) <= radius * radius
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point::new(x, y)
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x as f64, p.y as f64)
    }
}

/// Axis-aligned pixel rectangle, `x..x + width` by `y..y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.right() && p.y < self.bottom()
    }

    /// Row-major index of `p` inside the rectangle. `p` must be contained.
    #[inline]
    pub fn index_of(&self, p: Point) -> usize {
        (p.y - self.y) as usize * self.width + (p.x - self.x) as usize
    }
}

/// 8-connected Bresenham line from `from` to `to`, both endpoints included.
pub fn line_points(from: Point, to: Point) -> Vec<Point> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };

    let mut points = Vec::with_capacity(dx.max(-dy) as usize + 1);
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);

    loop {
        points.push(Point::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_points_is_connected() {
        let from = Point::new(3, 17);
        let to = Point::new(-12, 4);
        let line = line_points(from, to);

        assert_eq!(line.first(), Some(&from));
        assert_eq!(line.last(), Some(&to));
        assert!(line.windows(2).all(|w| w[0].is_neighbor(w[1])));
    }

    #[test]
    fn test_line_points_single_pixel() {
        let p = Point::new(5, 5);
        assert_eq!(line_points(p, p), vec![p]);
    }

    #[test]
    fn test_rect_index() {
        let rect = Rect::new(10, 20, 5, 4);
        assert!(rect.contains(Point::new(14, 23)));
        assert!(!rect.contains(Point::new(15, 23)));
        assert_eq!(rect.index_of(Point::new(12, 21)), 7);
    }

    #[test]
    fn test_clamp_to() {
        assert_eq!(Point::new(-4, 120).clamp_to(100, 100), Point::new(0, 99));
    }
}
