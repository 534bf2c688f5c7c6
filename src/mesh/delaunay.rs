// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Incremental Delaunay triangulation of a rectangle
//!
//! Bowyer-Watson insertion seeded with the two triangles of the rectangle.
//! Points on the rectangle's sides split the hull edge they lie on.

use crate::geometry::{incircle, orient2d};
use ahash::{AHashMap, AHashSet};
use nalgebra::Point2;

/// Insertion outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inserted {
    New(usize),
    Duplicate(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InsertError {
    Outside,
    Degenerate,
}

enum Location {
    Inside(usize),
    Vertex(usize),
    Outside,
}

pub(crate) struct Triangulation {
    points: Vec<Point2<f64>>,
    triangles: Vec<Option<[usize; 3]>>,
    /// Directed edge to the triangle on its left
    edges: AHashMap<(usize, usize), usize>,
    last: usize,
}

impl Triangulation {
    /// Seed with the counter-clockwise corners of a rectangle; they get indices 0 to 3
    pub(crate) fn from_rect(corners: [Point2<f64>; 4]) -> Self {
        let mut tri = Self {
            points: corners.to_vec(),
            triangles: Vec::new(),
            edges: AHashMap::new(),
            last: 0,
        };
        tri.add_triangle([0, 1, 2]);
        tri.add_triangle([0, 2, 3]);
        tri
    }

    #[cfg(test)]
    pub(crate) fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    /// Live triangles, counter-clockwise
    pub(crate) fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangles.iter().flatten().copied()
    }

    fn add_triangle(&mut self, t: [usize; 3]) -> usize {
        let id = self.triangles.len();
        for k in 0..3 {
            self.edges.insert((t[k], t[(k + 1) % 3]), id);
        }
        self.triangles.push(Some(t));
        id
    }

    fn remove_triangle(&mut self, id: usize) {
        if let Some(t) = self.triangles[id].take() {
            for k in 0..3 {
                self.edges.remove(&(t[k], t[(k + 1) % 3]));
            }
        }
    }

    fn locate(&self, p: &Point2<f64>) -> Location {
        let mut current = match self.triangles.get(self.last).copied().flatten() {
            Some(_) => self.last,
            None => match self.triangles.iter().position(Option::is_some) {
                Some(id) => id,
                None => return Location::Outside,
            },
        };

        // Visibility walk; falls back to a scan if it does not settle
        'walk: for _ in 0..self.triangles.len() + 8 {
            let Some(t) = self.triangles[current] else { break };
            for k in 0..3 {
                let (u, v) = (t[k], t[(k + 1) % 3]);
                if orient2d(&self.points[u], &self.points[v], p) < 0.0 {
                    match self.edges.get(&(v, u)) {
                        Some(&next) => {
                            current = next;
                            continue 'walk;
                        }
                        None => return Location::Outside,
                    }
                }
            }
            return self.settle(current, t, p);
        }

        for (id, t) in self.triangles.iter().enumerate() {
            let Some(t) = *t else { continue };
            let inside = (0..3).all(|k| orient2d(&self.points[t[k]], &self.points[t[(k + 1) % 3]], p) >= 0.0);
            if inside {
                return self.settle(id, t, p);
            }
        }
        Location::Outside
    }

    fn settle(&self, id: usize, t: [usize; 3], p: &Point2<f64>) -> Location {
        match t.iter().find(|&&v| self.points[v] == *p) {
            Some(&v) => Location::Vertex(v),
            None => Location::Inside(id),
        }
    }

    pub(crate) fn insert(&mut self, p: Point2<f64>) -> Result<Inserted, InsertError> {
        let start = match self.locate(&p) {
            Location::Inside(id) => id,
            Location::Vertex(v) => return Ok(Inserted::Duplicate(v)),
            Location::Outside => return Err(InsertError::Outside),
        };

        // Grow the cavity of triangles whose circumcircle holds p
        let mut cavity: AHashSet<usize> = AHashSet::new();
        let mut stack = vec![start];
        cavity.insert(start);
        while let Some(id) = stack.pop() {
            let Some(t) = self.triangles[id] else { continue };
            for k in 0..3 {
                let (u, v) = (t[k], t[(k + 1) % 3]);
                let Some(&next) = self.edges.get(&(v, u)) else { continue };
                if cavity.contains(&next) {
                    continue;
                }
                let Some(n) = self.triangles[next] else { continue };
                let [a, b, c] = n.map(|i| self.points[i]);
                if incircle(&a, &b, &c, &p) > 0.0 {
                    cavity.insert(next);
                    stack.push(next);
                }
            }
        }

        let mut rim = Vec::new();
        for &id in &cavity {
            let Some(t) = self.triangles[id] else { continue };
            for k in 0..3 {
                let (u, v) = (t[k], t[(k + 1) % 3]);
                let outside = self.edges.get(&(v, u)).map_or(true, |n| !cavity.contains(n));
                if outside {
                    rim.push((u, v));
                }
            }
        }

        let mut fan = Vec::with_capacity(rim.len());
        for &(u, v) in &rim {
            let side = orient2d(&self.points[u], &self.points[v], &p);
            if side > 0.0 {
                fan.push((u, v));
            } else if side < 0.0 || self.edges.contains_key(&(v, u)) {
                // Only a hull edge may carry the new point
                return Err(InsertError::Degenerate);
            }
        }

        for &id in &cavity {
            self.remove_triangle(id);
        }
        let index = self.points.len();
        self.points.push(p);
        for (u, v) in fan {
            self.last = self.add_triangle([u, v, index]);
        }
        Ok(Inserted::New(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use approx::assert_relative_eq;

    fn area(points: &[Point2<f64>], t: [usize; 3]) -> f64 {
        0.5 * orient2d(&points[t[0]], &points[t[1]], &points[t[2]])
    }

    fn scattered(n: usize) -> Vec<Point2<f64>> {
        // Deterministic low-discrepancy points inside (0, 2) x (0, 1)
        (1..=n)
            .map(|i| {
                let u = (i as f64 * 0.618_033_988_75).fract();
                let v = (i as f64 * 0.754_877_666_25).fract();
                Point2::new(0.02 + 1.96 * u, 0.02 + 0.96 * v)
            })
            .collect()
    }

    #[test]
    fn test_rect_seed() {
        let tri = Triangulation::from_rect(Rect::new(0.0, 0.0, 2.0, 1.0).corners());
        assert_eq!(tri.triangles().count(), 2);
    }

    #[test]
    fn test_triangulation_is_valid_and_delaunay() {
        let mut tri = Triangulation::from_rect(Rect::new(0.0, 0.0, 2.0, 1.0).corners());
        for p in scattered(150) {
            tri.insert(p).unwrap();
        }
        // Points on the sides split hull edges
        for k in 1..8 {
            tri.insert(Point2::new(k as f64 * 0.25, 0.0)).unwrap();
            tri.insert(Point2::new(0.0, k as f64 * 0.125)).unwrap();
        }

        let points = tri.points();
        let triangles: Vec<_> = tri.triangles().collect();
        assert!(triangles.iter().all(|&t| area(points, t) > 0.0));
        let total: f64 = triangles.iter().map(|&t| area(points, t)).sum();
        assert_relative_eq!(total, 2.0, epsilon = 1e-9);

        // Euler: 2n - 2 - h triangles for n points with h on the hull
        let hull = 4 + 7 + 7;
        assert_eq!(triangles.len(), 2 * points.len() - 2 - hull);

        for &t in &triangles {
            let [a, b, c] = t.map(|i| points[i]);
            for (i, d) in points.iter().enumerate() {
                if !t.contains(&i) {
                    assert!(incircle(&a, &b, &c, d) <= 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_duplicates_and_outside() {
        let mut tri = Triangulation::from_rect(Rect::new(0.0, 0.0, 1.0, 1.0).corners());
        let first = tri.insert(Point2::new(0.5, 0.5)).unwrap();
        assert_eq!(first, Inserted::New(4));
        assert_eq!(tri.insert(Point2::new(0.5, 0.5)).unwrap(), Inserted::Duplicate(4));
        assert_eq!(tri.insert(Point2::new(1.0, 0.0)).unwrap(), Inserted::Duplicate(1));
        assert_eq!(tri.insert(Point2::new(1.5, 0.5)), Err(InsertError::Outside));
    }
}
