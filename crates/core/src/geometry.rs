//! Rectangle and point primitives in a source-native linear unit.

use serde::{Deserialize, Serialize};

/// A point in the same unit as the rectangles it is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box of a shape.
///
/// Slides use EMU (914400 per inch). A shape without geometry gets the
/// all-zero rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, point: Point) -> bool {
        self.left <= point.x
            && point.x <= self.right()
            && self.top <= point.y
            && point.y <= self.bottom()
    }

    /// Vertical distance between the top edges of two rectangles.
    pub fn top_distance(&self, other: &Rect) -> f64 {
        (self.top - other.top).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center() {
        let rect = Rect::new(100.0, 20.0, 100.0, 40.0);
        assert_eq!(rect.center(), Point::new(150.0, 40.0));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let rect = Rect::new(0.0, 0.0, 300.0, 100.0);
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(rect.contains(Point::new(300.0, 100.0)));
        assert!(rect.contains(Point::new(150.0, 40.0)));
        assert!(!rect.contains(Point::new(300.1, 50.0)));
        assert!(!rect.contains(Point::new(-0.1, 50.0)));
        assert!(!rect.contains(Point::new(10.0, 100.5)));
    }

    #[test]
    fn test_zero_rect_contains_only_origin() {
        let rect = Rect::default();
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(!rect.contains(Point::new(1.0, 0.0)));
    }

    #[test]
    fn test_top_distance() {
        let a = Rect::new(0.0, 10.0, 5.0, 5.0);
        let b = Rect::new(0.0, 50.0, 5.0, 5.0);
        assert_eq!(a.top_distance(&b), 40.0);
        assert_eq!(b.top_distance(&a), 40.0);
    }
}
