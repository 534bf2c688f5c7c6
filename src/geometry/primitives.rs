// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar primitives

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in the model plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Rect {
    pub fn new(x: f64, y: f64, dx: f64, dy: f64) -> Self {
        Self {
            min: Point2::new(x, y),
            max: Point2::new(x + dx, y + dy),
        }
    }

    pub fn from_corners(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Corners in counter-clockwise order, starting at `min`
    pub fn corners(&self) -> [Point2<f64>; 4] {
        [
            self.min,
            Point2::new(self.max.x, self.min.y),
            self.max,
            Point2::new(self.min.x, self.max.y),
        ]
    }

    /// Sides in counter-clockwise order: bottom, right, top, left
    pub fn sides(&self) -> [(Point2<f64>, Point2<f64>); 4] {
        let c = self.corners();
        [(c[0], c[1]), (c[1], c[2]), (c[2], c[3]), (c[3], c[0])]
    }

    pub fn contains(&self, p: &Point2<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Distance from an interior point to the nearest side
    pub fn inner_margin(&self, p: &Point2<f64>) -> f64 {
        (p.x - self.min.x)
            .min(self.max.x - p.x)
            .min(p.y - self.min.y)
            .min(self.max.y - p.y)
    }

    /// Split along the longer side, or into quadrants when roughly square
    pub fn subdivide(&self) -> Vec<Rect> {
        let c = self.center();
        let (w, h) = (self.width(), self.height());
        if w > 2.0 * h {
            vec![
                Rect::from_corners(self.min, Point2::new(c.x, self.max.y)),
                Rect::from_corners(Point2::new(c.x, self.min.y), self.max),
            ]
        } else if h > 2.0 * w {
            vec![
                Rect::from_corners(self.min, Point2::new(self.max.x, c.y)),
                Rect::from_corners(Point2::new(self.min.x, c.y), self.max),
            ]
        } else {
            vec![
                Rect::from_corners(self.min, c),
                Rect::from_corners(Point2::new(c.x, self.min.y), Point2::new(self.max.x, c.y)),
                Rect::from_corners(c, self.max),
                Rect::from_corners(Point2::new(self.min.x, c.y), Point2::new(c.x, self.max.y)),
            ]
        }
    }
}

/// Distance from `p` to the segment `[a, b]`
pub fn segment_distance(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let s = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * s)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rect_geometry() {
        let rect = Rect::new(-2.5, 1.0, 6.0, 0.25);
        assert_relative_eq!(rect.area(), 1.5);
        assert_eq!(rect.corners()[2], Point2::new(3.5, 1.25));
        assert!(rect.contains(&Point2::new(0.0, 1.1)));
        assert!(!rect.contains(&Point2::new(0.0, 1.3)));
        assert_relative_eq!(rect.inner_margin(&Point2::new(0.0, 1.05)), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_subdivide_thin_rect_splits_long_side() {
        let rect = Rect::new(0.0, 0.0, 4.0, 1.0);
        let parts = rect.subdivide();
        assert_eq!(parts.len(), 2);
        assert_relative_eq!(parts[0].width(), 2.0);
        assert_relative_eq!(parts.iter().map(Rect::area).sum::<f64>(), rect.area());

        let square = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(square.subdivide().len(), 4);
    }

    #[test]
    fn test_segment_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        assert_relative_eq!(segment_distance(&Point2::new(0.5, 2.0), &a, &b), 2.0);
        assert_relative_eq!(segment_distance(&Point2::new(-3.0, 4.0), &a, &b), 5.0);
    }
}
