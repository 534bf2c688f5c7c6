// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar fragmentation of rectilinear surfaces
//!
//! The input surfaces are overlaid on the grid spanned by all of their cell
//! coordinates. Grid cells covered by the same set of inputs and connected
//! through shared sides form one output surface. Output curves are maximal
//! straight runs of boundary between two topological vertices.

use super::{Dim, Entity, Model, Rect, Tag};
use crate::error::{KernelError, KernelResult};
use nalgebra::Point2;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Output of a fragment operation
#[derive(Debug, Clone, Serialize)]
pub struct FragmentResult {
    /// Every surface produced, ordered by tag
    pub entities: Vec<Entity>,
    /// For each input entity, in call order, the surfaces covering it
    pub relations: Vec<(Entity, Vec<Entity>)>,
}

impl FragmentResult {
    /// Descendants of an input entity
    pub fn children_of(&self, parent: Entity) -> Option<&[Entity]> {
        self.relations
            .iter()
            .find(|(p, _)| *p == parent)
            .map(|(_, children)| children.as_slice())
    }
}

struct Grid {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Grid {
    fn new(regions: &[Vec<Rect>]) -> Self {
        let cells = regions.iter().flatten();
        let xs = snap(cells.clone().flat_map(|r| [r.min.x, r.max.x]).collect());
        let ys = snap(cells.flat_map(|r| [r.min.y, r.max.y]).collect());
        Self { xs, ys }
    }

    fn nx(&self) -> usize {
        self.xs.len().saturating_sub(1)
    }

    fn ny(&self) -> usize {
        self.ys.len().saturating_sub(1)
    }

    fn cell(&self, i: usize, j: usize) -> Rect {
        Rect::from_corners(
            Point2::new(self.xs[i], self.ys[j]),
            Point2::new(self.xs[i + 1], self.ys[j + 1]),
        )
    }

    fn vertex(&self, i: usize, j: usize) -> Point2<f64> {
        Point2::new(self.xs[i], self.ys[j])
    }
}

/// Sorted coordinates with near-duplicates merged
fn snap(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    let span = match (values.first(), values.last()) {
        (Some(lo), Some(hi)) => hi - lo,
        _ => return values,
    };
    let tol = 1e-9 * span.abs().max(1.0);

    let mut out: Vec<f64> = Vec::with_capacity(values.len());
    for v in values {
        if out.last().map_or(true, |last| v - last > tol) {
            out.push(v);
        }
    }
    out
}

struct Face {
    label: Vec<usize>,
    cells: Vec<(usize, usize)>,
}

/// Straight run of boundary edges along one grid line
#[derive(Debug, Clone, Copy)]
struct Chain {
    horizontal: bool,
    line: usize,
    from: usize,
    to: usize,
}

impl Chain {
    /// Grid vertex at position `k` along the chain's line
    fn vertex(&self, k: usize) -> (usize, usize) {
        if self.horizontal {
            (k, self.line)
        } else {
            (self.line, k)
        }
    }
}

struct Arrangement {
    grid: Grid,
    face_of: Vec<Option<usize>>,
    faces: Vec<Face>,
}

impl Arrangement {
    fn build(regions: &[Vec<Rect>]) -> Self {
        let grid = Grid::new(regions);
        let (nx, ny) = (grid.nx(), grid.ny());

        let mut labels: Vec<Vec<usize>> = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let center = grid.cell(i, j).center();
                let label = regions
                    .iter()
                    .enumerate()
                    .filter(|(_, cells)| cells.iter().any(|r| r.contains(&center)))
                    .map(|(k, _)| k)
                    .collect();
                labels.push(label);
            }
        }

        // Flood fill cells sharing a label into faces
        let mut face_of: Vec<Option<usize>> = vec![None; nx * ny];
        let mut faces: Vec<Face> = Vec::new();
        for start in 0..nx * ny {
            if face_of[start].is_some() || labels[start].is_empty() {
                continue;
            }
            let id = faces.len();
            let mut cells = Vec::new();
            let mut stack = vec![start];
            face_of[start] = Some(id);
            while let Some(idx) = stack.pop() {
                let (i, j) = (idx % nx, idx / nx);
                cells.push((i, j));
                let mut neighbors = Vec::with_capacity(4);
                if i > 0 {
                    neighbors.push(idx - 1);
                }
                if i + 1 < nx {
                    neighbors.push(idx + 1);
                }
                if j > 0 {
                    neighbors.push(idx - nx);
                }
                if j + 1 < ny {
                    neighbors.push(idx + nx);
                }
                for n in neighbors {
                    if face_of[n].is_none() && labels[n] == labels[start] {
                        face_of[n] = Some(id);
                        stack.push(n);
                    }
                }
            }
            cells.sort_by_key(|&(i, j)| (j, i));
            faces.push(Face {
                label: labels[start].clone(),
                cells,
            });
        }

        // Order faces by lowest parent, then bottom-left cell
        let mut order: Vec<usize> = (0..faces.len()).collect();
        order.sort_by_key(|&f| (faces[f].label[0], faces[f].cells[0].1, faces[f].cells[0].0));
        let mut rank = vec![0; faces.len()];
        for (new, &old) in order.iter().enumerate() {
            rank[old] = new;
        }
        for f in face_of.iter_mut().flatten() {
            *f = rank[*f];
        }
        let mut slots: Vec<Option<Face>> = faces.into_iter().map(Some).collect();
        let faces = order.iter().filter_map(|&old| slots[old].take()).collect();

        Self { grid, face_of, faces }
    }

    fn face_at(&self, i: isize, j: isize) -> Option<usize> {
        let (nx, ny) = (self.grid.nx() as isize, self.grid.ny() as isize);
        if i < 0 || j < 0 || i >= nx || j >= ny {
            return None;
        }
        self.face_of[(j * nx + i) as usize]
    }

    /// Horizontal unit edge from vertex (i, j) to (i + 1, j)
    fn h_boundary(&self, i: usize, j: usize) -> bool {
        let (i, j) = (i as isize, j as isize);
        self.face_at(i, j - 1) != self.face_at(i, j)
    }

    /// Vertical unit edge from vertex (i, j) to (i, j + 1)
    fn v_boundary(&self, i: usize, j: usize) -> bool {
        let (i, j) = (i as isize, j as isize);
        self.face_at(i - 1, j) != self.face_at(i, j)
    }

    fn is_node(&self, i: usize, j: usize) -> bool {
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        let left = i > 0 && self.h_boundary(i - 1, j);
        let right = i < nx && self.h_boundary(i, j);
        let down = j > 0 && self.v_boundary(i, j - 1);
        let up = j < ny && self.v_boundary(i, j);
        let degree = [left, right, down, up].iter().filter(|&&b| b).count();
        degree > 0 && !(degree == 2 && ((left && right) || (down && up)))
    }

    fn chains(&self) -> Vec<Chain> {
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        let mut chains = Vec::new();

        for j in 0..=ny {
            let mut i = 0;
            while i < nx {
                if !self.h_boundary(i, j) {
                    i += 1;
                    continue;
                }
                let from = i;
                i += 1;
                while i < nx && self.h_boundary(i, j) && !self.is_node(i, j) {
                    i += 1;
                }
                chains.push(Chain {
                    horizontal: true,
                    line: j,
                    from,
                    to: i,
                });
            }
        }

        for i in 0..=nx {
            let mut j = 0;
            while j < ny {
                if !self.v_boundary(i, j) {
                    j += 1;
                    continue;
                }
                let from = j;
                j += 1;
                while j < ny && self.v_boundary(i, j) && !self.is_node(i, j) {
                    j += 1;
                }
                chains.push(Chain {
                    horizontal: false,
                    line: i,
                    from,
                    to: j,
                });
            }
        }

        chains
    }

    /// Faces on the (left-hand, right-hand) side of a chain walked in +x or +y
    fn chain_sides(&self, chain: &Chain) -> (Option<usize>, Option<usize>) {
        let (line, from) = (chain.line as isize, chain.from as isize);
        if chain.horizontal {
            (self.face_at(from, line), self.face_at(from, line - 1))
        } else {
            (self.face_at(line - 1, from), self.face_at(line, from))
        }
    }

    /// Interior chain vertices where a seam inside an adjacent face ends
    fn chain_breaks(&self, chain: &Chain) -> Vec<Point2<f64>> {
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        let mut breaks = Vec::new();
        for k in chain.from + 1..chain.to {
            let (i, j) = chain.vertex(k);
            let seam = if chain.horizontal {
                let below = j > 0 && !self.v_boundary(i, j - 1) && self.face_at(i as isize, j as isize - 1).is_some();
                let above = j < ny && !self.v_boundary(i, j) && self.face_at(i as isize, j as isize).is_some();
                below || above
            } else {
                let left = i > 0 && !self.h_boundary(i - 1, j) && self.face_at(i as isize - 1, j as isize).is_some();
                let right = i < nx && !self.h_boundary(i, j) && self.face_at(i as isize, j as isize).is_some();
                left || right
            };
            if seam {
                breaks.push(self.grid.vertex(i, j));
            }
        }
        breaks
    }
}

impl Model {
    /// Fragment `objects` against `tools`, replacing them with a conforming arrangement
    pub fn fragment(&mut self, objects: &[Entity], tools: &[Entity]) -> KernelResult<FragmentResult> {
        let inputs: Vec<Entity> = objects.iter().chain(tools).copied().collect();
        let mut regions = Vec::with_capacity(inputs.len());
        for entity in &inputs {
            if entity.dim != Dim::Surface {
                return Err(KernelError::UnsupportedDimension(*entity));
            }
            regions.push(self.surface(entity.tag)?.cells.clone());
        }
        if inputs.is_empty() {
            return Ok(FragmentResult {
                entities: Vec::new(),
                relations: Vec::new(),
            });
        }

        let arrangement = Arrangement::build(&regions);
        let chains = arrangement.chains();

        let removed: BTreeSet<Tag> = inputs.iter().map(|e| e.tag).collect();
        self.remove_surfaces(&removed);

        // Chains adjacent to each face, walked bottom-left first
        let mut face_chains: Vec<Vec<usize>> = vec![Vec::new(); arrangement.faces.len()];
        for (c, chain) in chains.iter().enumerate() {
            let (left, right) = arrangement.chain_sides(chain);
            for f in [left, right].into_iter().flatten() {
                face_chains[f].push(c);
            }
        }
        for list in &mut face_chains {
            list.sort_by_key(|&c| {
                let (i, j) = chains[c].vertex(chains[c].from);
                (j, i, !chains[c].horizontal)
            });
        }

        let mut vertex_tags: BTreeMap<(usize, usize), Tag> = BTreeMap::new();
        let mut curve_tags: Vec<Option<Tag>> = vec![None; chains.len()];
        let mut face_tags: Vec<Tag> = Vec::with_capacity(arrangement.faces.len());

        for (f, face) in arrangement.faces.iter().enumerate() {
            let mut boundary = Vec::with_capacity(face_chains[f].len());
            for &c in &face_chains[f] {
                let chain = &chains[c];
                let tag = match curve_tags[c] {
                    Some(tag) => tag,
                    None => {
                        let mut ends = [0; 2];
                        for (slot, k) in [chain.from, chain.to].into_iter().enumerate() {
                            let vertex = chain.vertex(k);
                            ends[slot] = match vertex_tags.get(&vertex) {
                                Some(&tag) => tag,
                                None => {
                                    let tag = self.add_point(arrangement.grid.vertex(vertex.0, vertex.1));
                                    vertex_tags.insert(vertex, tag);
                                    tag
                                }
                            };
                        }
                        let tag = self.add_curve(ends[0], ends[1], arrangement.chain_breaks(chain));
                        curve_tags[c] = Some(tag);
                        tag
                    }
                };
                let (left, _) = arrangement.chain_sides(chain);
                boundary.push(if left == Some(f) { tag } else { -tag });
            }

            let cells = face.cells.iter().map(|&(i, j)| arrangement.grid.cell(i, j)).collect();
            face_tags.push(self.add_surface(boundary, cells));
        }

        let relations = inputs
            .iter()
            .enumerate()
            .map(|(k, parent)| {
                let children = arrangement
                    .faces
                    .iter()
                    .zip(&face_tags)
                    .filter(|(face, _)| face.label.contains(&k))
                    .map(|(_, &tag)| Entity::surface(tag))
                    .collect();
                (*parent, children)
            })
            .collect();

        debug!(
            inputs = inputs.len(),
            surfaces = face_tags.len(),
            curves = chains.len(),
            "fragmented surfaces"
        );

        Ok(FragmentResult {
            entities: face_tags.into_iter().map(Entity::surface).collect(),
            relations,
        })
    }
}
