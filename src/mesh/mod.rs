// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation, sizing controls and generation

mod algorithm;
mod curve;
mod delaunay;
mod field;
mod generate;
mod surface;

pub use algorithm::MeshAlgorithm;
pub use field::{Field, FieldTag};
pub(crate) use generate::generate;

use crate::geometry::{Entity, Tag};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mesh size controls stored on a model
#[derive(Debug, Clone, Default)]
pub struct MeshSizing {
    pub(crate) point_sizes: BTreeMap<Tag, f64>,
    pub(crate) fields: BTreeMap<FieldTag, Field>,
    pub(crate) background: Option<FieldTag>,
    pub(crate) surface_algorithms: BTreeMap<Tag, MeshAlgorithm>,
}

impl MeshSizing {
    pub fn point_size(&self, tag: Tag) -> Option<f64> {
        self.point_sizes.get(&tag).copied()
    }

    pub fn field(&self, tag: FieldTag) -> Option<&Field> {
        self.fields.get(&tag)
    }

    pub fn background_field(&self) -> Option<FieldTag> {
        self.background
    }

    pub fn surface_algorithm(&self, surface: Tag) -> Option<MeshAlgorithm> {
        self.surface_algorithms.get(&surface).copied()
    }
}

/// Global meshing options of a kernel session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshOptions {
    /// Default 2D algorithm for surfaces without an override
    pub algorithm: MeshAlgorithm,
    /// Lower clamp on element size
    pub size_min: f64,
    /// Upper clamp on element size
    pub size_max: f64,
    /// Write elements of every entity, not only those in physical groups
    pub save_all: bool,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            algorithm: MeshAlgorithm::default(),
            size_min: 0.0,
            size_max: 1e22,
            save_all: false,
        }
    }
}

/// Element types with their MSH type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Point,
    Line,
    Triangle,
}

impl ElementKind {
    pub fn msh_code(self) -> u32 {
        match self {
            Self::Point => 15,
            Self::Line => 1,
            Self::Triangle => 2,
        }
    }

    pub fn node_count(self) -> usize {
        match self {
            Self::Point => 1,
            Self::Line => 2,
            Self::Triangle => 3,
        }
    }
}

/// Mesh element referencing node tags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub tag: usize,
    pub kind: ElementKind,
    pub nodes: Vec<usize>,
}

/// Nodes owned by and elements classified on one model entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMesh {
    pub entity: Entity,
    pub nodes: Vec<usize>,
    pub elements: Vec<Element>,
}

/// Mesh of a planar model. Node tags start at 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    nodes: Vec<Point2<f64>>,
    blocks: Vec<EntityMesh>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its tag
    pub(crate) fn add_node(&mut self, position: Point2<f64>) -> usize {
        self.nodes.push(position);
        self.nodes.len()
    }

    pub(crate) fn push_block(&mut self, block: EntityMesh) {
        self.blocks.push(block);
    }

    /// Number element tags in block order
    pub(crate) fn number_elements(&mut self) {
        let mut next = 1;
        for element in self.blocks.iter_mut().flat_map(|b| b.elements.iter_mut()) {
            element.tag = next;
            next += 1;
        }
    }

    pub fn node(&self, tag: usize) -> Option<Point2<f64>> {
        tag.checked_sub(1).and_then(|i| self.nodes.get(i)).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn blocks(&self) -> &[EntityMesh] {
        &self.blocks
    }

    pub fn block(&self, entity: Entity) -> Option<&EntityMesh> {
        self.blocks.iter().find(|b| b.entity == entity)
    }

    pub fn element_count(&self, kind: ElementKind) -> usize {
        self.blocks
            .iter()
            .flat_map(|b| &b.elements)
            .filter(|e| e.kind == kind)
            .count()
    }

    pub fn triangle_count(&self) -> usize {
        self.element_count(ElementKind::Triangle)
    }

    /// Corner positions of every triangle
    pub fn triangles(&self) -> impl Iterator<Item = [Point2<f64>; 3]> + '_ {
        self.blocks
            .iter()
            .flat_map(|b| &b.elements)
            .filter(|e| e.kind == ElementKind::Triangle)
            .map(move |e| {
                [
                    self.nodes[e.nodes[0] - 1],
                    self.nodes[e.nodes[1] - 1],
                    self.nodes[e.nodes[2] - 1],
                ]
            })
    }

    /// Summed triangle area
    pub fn area(&self) -> f64 {
        self.triangles().map(|t| triangle_area(&t)).sum()
    }
}

pub fn triangle_area(t: &[Point2<f64>; 3]) -> f64 {
    0.5 * (t[1] - t[0]).perp(&(t[2] - t[0]))
}

pub fn centroid(t: &[Point2<f64>; 3]) -> Point2<f64> {
    Point2::from((t[0].coords + t[1].coords + t[2].coords) / 3.0)
}

pub fn longest_edge(t: &[Point2<f64>; 3]) -> f64 {
    (t[1] - t[0])
        .norm()
        .max((t[2] - t[1]).norm())
        .max((t[0] - t[2]).norm())
}
