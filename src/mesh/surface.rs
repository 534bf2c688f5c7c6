// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Surface triangulation, one grid cell at a time

use super::curve::discretize_segment;
use super::delaunay::{Inserted, Triangulation};
use crate::error::{KernelError, KernelResult};
use crate::geometry::{Rect, SurfaceEntity};
use ahash::AHashMap;
use nalgebra::Point2;

const MAX_DEPTH: usize = 24;
/// Minimum distance from a cell side to an interior point, in local sizes
const SIDE_MARGIN: f64 = 0.4;

/// Node of a surface patch: a boundary node owned by a curve or point, or
/// a node created for the surface itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeRef {
    Global(usize),
    Local(usize),
}

/// Triangulation of one surface before global renumbering
#[derive(Debug, Default)]
pub(crate) struct SurfacePatch {
    pub nodes: Vec<Point2<f64>>,
    pub triangles: Vec<[NodeRef; 3]>,
}

/// Position-keyed node lookup so cells sharing a side reuse its nodes
struct Registry {
    quantum: f64,
    keys: AHashMap<(i64, i64), NodeRef>,
    local: Vec<Point2<f64>>,
}

impl Registry {
    fn new(scale: f64) -> Self {
        Self {
            quantum: 1e-10 * scale.max(1.0),
            keys: AHashMap::new(),
            local: Vec::new(),
        }
    }

    fn key(&self, p: &Point2<f64>) -> (i64, i64) {
        ((p.x / self.quantum).round() as i64, (p.y / self.quantum).round() as i64)
    }

    fn register(&mut self, p: &Point2<f64>, node: NodeRef) {
        let key = self.key(p);
        self.keys.entry(key).or_insert(node);
    }

    fn get_or_create(&mut self, p: Point2<f64>) -> NodeRef {
        let key = self.key(&p);
        if let Some(&node) = self.keys.get(&key) {
            return node;
        }
        let node = NodeRef::Local(self.local.len());
        self.local.push(p);
        self.keys.insert(key, node);
        node
    }
}

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// Index of the side of `cell` that `other` shares in full, if any
fn shared_side(cell: &Rect, other: &Rect, tol: f64) -> Option<usize> {
    let same_columns = close(cell.min.x, other.min.x, tol) && close(cell.max.x, other.max.x, tol);
    let same_rows = close(cell.min.y, other.min.y, tol) && close(cell.max.y, other.max.y, tol);
    if same_columns && close(other.max.y, cell.min.y, tol) {
        Some(0)
    } else if same_rows && close(other.min.x, cell.max.x, tol) {
        Some(1)
    } else if same_columns && close(other.min.y, cell.max.y, tol) {
        Some(2)
    } else if same_rows && close(other.max.x, cell.min.x, tol) {
        Some(3)
    } else {
        None
    }
}

/// Nodes strictly inside the side `a -> b`, ordered from `a`
fn nodes_on_side(boundary: &[(Point2<f64>, usize)], a: &Point2<f64>, b: &Point2<f64>, tol: f64) -> Vec<Point2<f64>> {
    let direction = b - a;
    let length = direction.norm();
    let mut found: Vec<(f64, Point2<f64>)> = boundary
        .iter()
        .filter_map(|(p, _)| {
            let along = (p - a).dot(&direction) / length;
            let across = (p - a).perp(&direction).abs() / length;
            (across <= tol && along > tol && along < length - tol).then_some((along, *p))
        })
        .collect();
    found.sort_by(|x, y| x.0.total_cmp(&y.0));
    found.into_iter().map(|(_, p)| p).collect()
}

/// Quadtree leaf centers far enough from the cell sides
fn interior_points<F>(cell: &Rect, size: &F) -> Vec<Point2<f64>>
where
    F: Fn(&Point2<f64>) -> f64,
{
    let mut points = Vec::new();
    let mut stack = vec![(*cell, 0)];
    while let Some((rect, depth)) = stack.pop() {
        let center = rect.center();
        let local = rect
            .corners()
            .iter()
            .map(size)
            .fold(size(&center), f64::min);
        if rect.width().max(rect.height()) > local && depth < MAX_DEPTH {
            stack.extend(rect.subdivide().into_iter().rev().map(|r| (r, depth + 1)));
            continue;
        }
        if cell.inner_margin(&center) >= SIDE_MARGIN * size(&center) {
            points.push(center);
        }
    }
    points
}

/// Triangulate every cell of `surface`.
/// `boundary` lists the nodes already placed on its bounding curves and points.
pub(crate) fn mesh_surface<F>(surface: &SurfaceEntity, boundary: &[(Point2<f64>, usize)], size: &F) -> KernelResult<SurfacePatch>
where
    F: Fn(&Point2<f64>) -> f64,
{
    let scale = surface
        .cells
        .iter()
        .flat_map(|c| [c.min.x.abs(), c.min.y.abs(), c.max.x.abs(), c.max.y.abs()])
        .fold(0.0, f64::max);
    let tol = 1e-9 * scale.max(1.0);

    let mut registry = Registry::new(scale);
    for (p, tag) in boundary {
        registry.register(p, NodeRef::Global(*tag));
    }

    let mut triangles = Vec::new();
    for (index, cell) in surface.cells.iter().enumerate() {
        let mut seams = [false; 4];
        for (other_index, other) in surface.cells.iter().enumerate() {
            if other_index != index {
                if let Some(side) = shared_side(cell, other, tol) {
                    seams[side] = true;
                }
            }
        }

        let corners = cell.corners();
        let mut nodes: Vec<NodeRef> = corners.iter().map(|c| registry.get_or_create(*c)).collect();
        let mut triangulation = Triangulation::from_rect(corners);

        let mut candidates = Vec::new();
        for (side, (a, b)) in cell.sides().iter().enumerate() {
            if seams[side] {
                // Canonical direction so both cells place the same nodes
                let (lo, hi) = if (a.x, a.y) <= (b.x, b.y) { (*a, *b) } else { (*b, *a) };
                candidates.extend(discretize_segment(lo, hi, size));
            } else {
                candidates.extend(nodes_on_side(boundary, a, b, tol));
            }
        }
        candidates.extend(interior_points(cell, size));

        for p in candidates {
            match triangulation.insert(p) {
                Ok(Inserted::New(_)) => nodes.push(registry.get_or_create(p)),
                Ok(Inserted::Duplicate(_)) => {}
                Err(err) => {
                    return Err(KernelError::Meshing {
                        surface: surface.tag,
                        reason: format!("cannot insert node ({}, {}): {err:?}", p.x, p.y),
                    })
                }
            }
        }

        triangles.extend(triangulation.triangles().map(|t| t.map(|i| nodes[i])));
    }

    Ok(SurfacePatch {
        nodes: registry.local,
        triangles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn patch_area(patch: &SurfacePatch, boundary: &[(Point2<f64>, usize)]) -> f64 {
        let position = |n: NodeRef| match n {
            NodeRef::Local(i) => patch.nodes[i],
            NodeRef::Global(tag) => boundary.iter().find(|(_, t)| *t == tag).map(|(p, _)| *p).unwrap(),
        };
        patch
            .triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(position);
                0.5 * (b - a).perp(&(c - a))
            })
            .sum()
    }

    #[test]
    fn test_single_cell_uses_boundary_nodes() {
        let cell = Rect::new(0.0, 0.0, 1.0, 1.0);
        let surface = SurfaceEntity {
            tag: 1,
            boundary: vec![1, 2, 3, 4],
            cells: vec![cell],
        };
        let mut boundary: Vec<(Point2<f64>, usize)> = cell.corners().iter().enumerate().map(|(i, p)| (*p, i + 1)).collect();
        boundary.push((Point2::new(0.5, 0.0), 5));
        boundary.push((Point2::new(1.0, 0.5), 6));

        let patch = mesh_surface(&surface, &boundary, &|_| 0.3).unwrap();
        assert_relative_eq!(patch_area(&patch, &boundary), 1.0, epsilon = 1e-12);

        // Both side nodes are used by a triangle
        for tag in [5, 6] {
            assert!(patch.triangles.iter().flatten().any(|n| *n == NodeRef::Global(tag)));
        }
        assert!(!patch.nodes.is_empty());
    }

    #[test]
    fn test_cells_share_seam_nodes() {
        let left = Rect::new(0.0, 0.0, 1.0, 1.0);
        let right = Rect::new(1.0, 0.0, 1.0, 1.0);
        let surface = SurfaceEntity {
            tag: 1,
            boundary: Vec::new(),
            cells: vec![left, right],
        };
        let boundary: Vec<(Point2<f64>, usize)> = [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| (Point2::new(x, y), i + 1))
            .collect();

        let patch = mesh_surface(&surface, &boundary, &|_| 0.2).unwrap();
        assert_relative_eq!(patch_area(&patch, &boundary), 2.0, epsilon = 1e-12);

        // Every local seam node at x = 1 appears in triangles of both cells
        let seam: Vec<usize> = patch
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, p)| p.x == 1.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(seam.len(), 4);
        for i in seam {
            let touching: Vec<_> = patch
                .triangles
                .iter()
                .filter(|t| t.contains(&NodeRef::Local(i)))
                .collect();
            let position = |n: &NodeRef| match *n {
                NodeRef::Local(j) => patch.nodes[j].x,
                NodeRef::Global(tag) => boundary[tag - 1].0.x,
            };
            assert!(touching.iter().any(|t| t.iter().any(|n| position(n) < 1.0)));
            assert!(touching.iter().any(|t| t.iter().any(|n| position(n) > 1.0)));
        }
    }

    #[test]
    fn test_graded_interior_points() {
        let cell = Rect::new(0.0, 0.0, 1.0, 1.0);
        let size = |p: &Point2<f64>| 0.05 + 0.3 * p.x;
        let points = interior_points(&cell, &size);
        let near = points.iter().filter(|p| p.x < 0.25).count();
        let far = points.iter().filter(|p| p.x > 0.75).count();
        assert!(near > far);
        assert!(points.iter().all(|p| cell.inner_margin(p) > 0.0));
    }
}
