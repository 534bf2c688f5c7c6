// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh generation driver

use super::curve::discretize_curve;
use super::field::CompiledField;
use super::surface::{mesh_surface, NodeRef};
use super::{Element, ElementKind, EntityMesh, Mesh, MeshOptions};
use crate::error::{KernelError, KernelResult};
use crate::geometry::{Entity, Model, Tag};
use nalgebra::Point2;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Element size at a point
struct SizeMap<'a> {
    fallback: f64,
    point_sizes: &'a BTreeMap<Tag, f64>,
    background: Option<CompiledField>,
    min: f64,
    max: f64,
}

impl SizeMap<'_> {
    fn point_size(&self, tag: Tag) -> f64 {
        self.point_sizes.get(&tag).copied().unwrap_or(self.fallback)
    }

    /// Combine the interpolated point size with the background field and clamp
    fn resolve(&self, base: f64, p: &Point2<f64>) -> f64 {
        let h = match &self.background {
            Some(field) => base.min(field.eval(p)),
            None => base,
        };
        h.max(self.min).min(self.max)
    }
}

fn element(kind: ElementKind, nodes: Vec<usize>) -> Element {
    Element { tag: 0, kind, nodes }
}

pub(crate) fn generate(model: &Model, options: &MeshOptions, dim: usize) -> KernelResult<Mesh> {
    if dim > 2 {
        return Err(KernelError::InvalidMeshDimension(dim));
    }
    for size in [options.size_min, options.size_max] {
        if size.is_nan() || size < 0.0 {
            return Err(KernelError::InvalidSize(size));
        }
    }

    let sizing = model.sizing();
    let background = sizing
        .background
        .map(|tag| CompiledField::compile(tag, &sizing.fields, model))
        .transpose()?;
    let diagonal = model.model_bounding_box().diagonal();
    let sizes = SizeMap {
        fallback: if diagonal > 0.0 { diagonal } else { 1.0 },
        point_sizes: &sizing.point_sizes,
        background,
        min: options.size_min,
        max: options.size_max.max(options.size_min),
    };

    let mut mesh = Mesh::new();

    let mut point_nodes: BTreeMap<Tag, usize> = BTreeMap::new();
    for point in model.points() {
        let node = mesh.add_node(point.position);
        point_nodes.insert(point.tag, node);
        mesh.push_block(EntityMesh {
            entity: Entity::point(point.tag),
            nodes: vec![node],
            elements: vec![element(ElementKind::Point, vec![node])],
        });
    }
    if dim == 0 {
        mesh.number_elements();
        return Ok(mesh);
    }

    let curves: Vec<_> = model.curves().collect();
    let interiors: Vec<KernelResult<Vec<Point2<f64>>>> = curves
        .par_iter()
        .map(|curve| {
            let (a, b) = model.curve_endpoints(curve.tag)?;
            let (ha, hb) = (sizes.point_size(curve.start), sizes.point_size(curve.end));
            let length = (b - a).norm();
            let size = |p: &Point2<f64>| {
                let s = if length > 0.0 { ((p - a).norm() / length).clamp(0.0, 1.0) } else { 0.0 };
                sizes.resolve(ha + (hb - ha) * s, p)
            };
            Ok(discretize_curve(a, b, &curve.breaks, &size))
        })
        .collect();

    let mut chains: BTreeMap<Tag, Vec<usize>> = BTreeMap::new();
    for (curve, interior) in curves.iter().zip(interiors) {
        let owned: Vec<usize> = interior?.into_iter().map(|p| mesh.add_node(p)).collect();
        let mut chain = Vec::with_capacity(owned.len() + 2);
        chain.push(point_nodes[&curve.start]);
        chain.extend(&owned);
        chain.push(point_nodes[&curve.end]);

        let elements = chain.windows(2).map(|w| element(ElementKind::Line, w.to_vec())).collect();
        mesh.push_block(EntityMesh {
            entity: Entity::curve(curve.tag),
            nodes: owned,
            elements,
        });
        chains.insert(curve.tag, chain);
    }
    debug!(curves = chains.len(), nodes = mesh.node_count(), "meshed curves");
    if dim == 1 {
        mesh.number_elements();
        return Ok(mesh);
    }

    // Boundary nodes and base size of each surface
    let mut jobs = Vec::new();
    for surface in model.surfaces() {
        let mut boundary = Vec::new();
        let mut base = f64::INFINITY;
        for signed in &surface.boundary {
            let curve = model.curve(signed.abs())?;
            base = base.min(sizes.point_size(curve.start)).min(sizes.point_size(curve.end));
            for &node in &chains[&curve.tag] {
                if let Some(position) = mesh.node(node) {
                    boundary.push((position, node));
                }
            }
        }
        if !base.is_finite() {
            base = sizes.fallback;
        }
        let algorithm = sizing.surface_algorithm(surface.tag).unwrap_or(options.algorithm);
        debug!(surface = surface.tag, %algorithm, code = algorithm.code(), "meshing surface");
        jobs.push((surface, boundary, base));
    }

    let patches: Vec<_> = jobs
        .par_iter()
        .map(|(surface, boundary, base)| {
            let size = |p: &Point2<f64>| sizes.resolve(*base, p);
            mesh_surface(surface, boundary, &size)
        })
        .collect();

    for ((surface, _, _), patch) in jobs.iter().zip(patches) {
        let patch = patch?;
        let owned: Vec<usize> = patch.nodes.iter().map(|p| mesh.add_node(*p)).collect();
        let resolve = |node: NodeRef| match node {
            NodeRef::Global(tag) => tag,
            NodeRef::Local(i) => owned[i],
        };
        let elements = patch
            .triangles
            .iter()
            .map(|t| element(ElementKind::Triangle, t.iter().map(|&n| resolve(n)).collect()))
            .collect();
        mesh.push_block(EntityMesh {
            entity: Entity::surface(surface.tag),
            nodes: owned,
            elements,
        });
    }

    mesh.number_elements();
    debug!(
        nodes = mesh.node_count(),
        triangles = mesh.triangle_count(),
        "meshed surfaces"
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Field;
    use approx::assert_relative_eq;

    #[test]
    fn test_generate_square() {
        let mut model = Model::new("square");
        model.add_rectangle(0.0, 0.0, 0.0, 1.0, 1.0).unwrap();
        for tag in 1..=4 {
            model.sizing.point_sizes.insert(tag, 0.25);
        }

        let mesh = generate(&model, &MeshOptions::default(), 2).unwrap();
        assert_eq!(mesh.element_count(ElementKind::Point), 4);
        // Four segments per side
        assert_eq!(mesh.element_count(ElementKind::Line), 16);
        assert!(mesh.triangle_count() > 8);
        assert_relative_eq!(mesh.area(), 1.0, epsilon = 1e-12);
        assert!(mesh.triangles().all(|t| crate::mesh::triangle_area(&t) > 0.0));
    }

    #[test]
    fn test_lower_dimensions_and_invalid() {
        let mut model = Model::new("square");
        model.add_rectangle(0.0, 0.0, 0.0, 1.0, 1.0).unwrap();
        let options = MeshOptions::default();

        let points = generate(&model, &options, 0).unwrap();
        assert_eq!(points.node_count(), 4);
        let curves = generate(&model, &options, 1).unwrap();
        assert_eq!(curves.triangle_count(), 0);
        assert!(curves.element_count(ElementKind::Line) >= 4);
        assert!(matches!(
            generate(&model, &options, 3),
            Err(KernelError::InvalidMeshDimension(3))
        ));
    }

    #[test]
    fn test_background_field_refines_curve() {
        let mut model = Model::new("strip");
        model.add_rectangle(0.0, 0.0, 0.0, 2.0, 0.5).unwrap();
        for tag in 1..=4 {
            model.sizing.point_sizes.insert(tag, 0.5);
        }
        model.sizing.fields.insert(1, Field::distance_to_curves(vec![4], 50));
        model.sizing.fields.insert(2, Field::threshold(1, 0.05, 0.5, 0.1, 0.5));
        model.sizing.background = Some(2);

        let mesh = generate(&model, &MeshOptions::default(), 2).unwrap();
        let bottom = mesh.block(Entity::curve(1)).unwrap();
        // Nodes crowd next to the left side (curve 4) and thin out to the right
        let xs: Vec<f64> = bottom.nodes.iter().filter_map(|&n| mesh.node(n)).map(|p| p.x).collect();
        let near = xs.iter().filter(|&&x| x < 0.25).count();
        let far = xs.iter().filter(|&&x| x > 1.75).count();
        assert!(near > 2 * far);
        assert_relative_eq!(mesh.area(), 1.0, epsilon = 1e-12);
    }
}
