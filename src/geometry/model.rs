// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar B-rep model: points, straight curves, rectilinear surfaces and physical groups

use super::{BoundingBox, Dim, Entity, Rect, Tag};
use crate::error::{KernelError, KernelResult};
use crate::mesh::MeshSizing;
use nalgebra::Point2;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Model vertex
#[derive(Debug, Clone)]
pub struct PointEntity {
    pub tag: Tag,
    pub position: Point2<f64>,
}

/// Straight curve between two points
#[derive(Debug, Clone)]
pub struct CurveEntity {
    pub tag: Tag,
    pub start: Tag,
    pub end: Tag,
    /// Interior positions where seams of an adjacent surface meet the curve.
    /// Always carry a mesh node.
    pub breaks: Vec<Point2<f64>>,
}

/// Surface bounded by signed curve tags and covered by axis-aligned cells
#[derive(Debug, Clone)]
pub struct SurfaceEntity {
    pub tag: Tag,
    /// Signed curve tags; positive when the curve runs counter-clockwise around the surface.
    pub boundary: Vec<Tag>,
    pub cells: Vec<Rect>,
}

impl SurfaceEntity {
    pub fn area(&self) -> f64 {
        self.cells.iter().map(Rect::area).sum()
    }
}

/// Named, dimension-tagged set of entities
#[derive(Debug, Clone, Serialize)]
pub struct PhysicalGroup {
    pub dim: Dim,
    pub tag: Tag,
    pub name: Option<String>,
    pub members: Vec<Tag>,
}

/// Planar model owned by a kernel session
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    elevation: Option<f64>,
    pub(crate) points: BTreeMap<Tag, PointEntity>,
    pub(crate) curves: BTreeMap<Tag, CurveEntity>,
    pub(crate) surfaces: BTreeMap<Tag, SurfaceEntity>,
    pub(crate) groups: Vec<PhysicalGroup>,
    pub(crate) sizing: MeshSizing,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elevation: None,
            points: BTreeMap::new(),
            curves: BTreeMap::new(),
            surfaces: BTreeMap::new(),
            groups: Vec::new(),
            sizing: MeshSizing::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// z coordinate of the model plane
    pub fn elevation(&self) -> f64 {
        self.elevation.unwrap_or(0.0)
    }

    pub fn sizing(&self) -> &MeshSizing {
        &self.sizing
    }

    /// Add an axis-aligned rectangle; returns the surface tag
    pub fn add_rectangle(&mut self, x: f64, y: f64, z: f64, dx: f64, dy: f64) -> KernelResult<Tag> {
        let finite = [x, y, z, dx, dy].iter().all(|v| v.is_finite());
        if !finite || dx <= 0.0 || dy <= 0.0 {
            return Err(KernelError::DegenerateRectangle { x, y, dx, dy });
        }
        match self.elevation {
            Some(expected) if expected != z => {
                return Err(KernelError::NonPlanar { expected, found: z });
            }
            _ => self.elevation = Some(z),
        }

        let rect = Rect::new(x, y, dx, dy);
        let corners: Vec<Tag> = rect.corners().iter().map(|c| self.add_point(*c)).collect();
        let boundary: Vec<Tag> = (0..4)
            .map(|i| self.add_curve(corners[i], corners[(i + 1) % 4], Vec::new()))
            .collect();
        let tag = self.add_surface(boundary, vec![rect]);

        debug!(tag, x, y, dx, dy, "added rectangle");
        Ok(tag)
    }

    pub(crate) fn next_tag(&self, dim: Dim) -> Tag {
        let last = match dim {
            Dim::Point => self.points.keys().next_back(),
            Dim::Curve => self.curves.keys().next_back(),
            Dim::Surface => self.surfaces.keys().next_back(),
        };
        last.map_or(1, |t| t + 1)
    }

    pub(crate) fn add_point(&mut self, position: Point2<f64>) -> Tag {
        let tag = self.next_tag(Dim::Point);
        self.points.insert(tag, PointEntity { tag, position });
        tag
    }

    pub(crate) fn add_curve(&mut self, start: Tag, end: Tag, breaks: Vec<Point2<f64>>) -> Tag {
        let tag = self.next_tag(Dim::Curve);
        self.curves.insert(
            tag,
            CurveEntity {
                tag,
                start,
                end,
                breaks,
            },
        );
        tag
    }

    pub(crate) fn add_surface(&mut self, boundary: Vec<Tag>, cells: Vec<Rect>) -> Tag {
        let tag = self.next_tag(Dim::Surface);
        self.surfaces.insert(tag, SurfaceEntity { tag, boundary, cells });
        tag
    }

    pub fn point(&self, tag: Tag) -> KernelResult<&PointEntity> {
        self.points.get(&tag).ok_or(KernelError::UnknownEntity {
            dim: Dim::Point,
            tag,
        })
    }

    pub fn curve(&self, tag: Tag) -> KernelResult<&CurveEntity> {
        self.curves.get(&tag).ok_or(KernelError::UnknownEntity {
            dim: Dim::Curve,
            tag,
        })
    }

    pub fn surface(&self, tag: Tag) -> KernelResult<&SurfaceEntity> {
        self.surfaces.get(&tag).ok_or(KernelError::UnknownEntity {
            dim: Dim::Surface,
            tag,
        })
    }

    pub fn points(&self) -> impl Iterator<Item = &PointEntity> {
        self.points.values()
    }

    pub fn curves(&self) -> impl Iterator<Item = &CurveEntity> {
        self.curves.values()
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &SurfaceEntity> {
        self.surfaces.values()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        match entity.dim {
            Dim::Point => self.points.contains_key(&entity.tag),
            Dim::Curve => self.curves.contains_key(&entity.tag),
            Dim::Surface => self.surfaces.contains_key(&entity.tag),
        }
    }

    fn require(&self, entity: Entity) -> KernelResult<()> {
        if self.contains(entity) {
            Ok(())
        } else {
            Err(KernelError::UnknownEntity {
                dim: entity.dim,
                tag: entity.tag,
            })
        }
    }

    /// All entities of one dimension, ordered by tag
    pub fn entities(&self, dim: Dim) -> Vec<Entity> {
        let tags: Vec<Tag> = match dim {
            Dim::Point => self.points.keys().copied().collect(),
            Dim::Curve => self.curves.keys().copied().collect(),
            Dim::Surface => self.surfaces.keys().copied().collect(),
        };
        tags.into_iter().map(|tag| Entity::new(dim, tag)).collect()
    }

    /// End points of a curve
    pub fn curve_endpoints(&self, tag: Tag) -> KernelResult<(Point2<f64>, Point2<f64>)> {
        let curve = self.curve(tag)?;
        Ok((self.point(curve.start)?.position, self.point(curve.end)?.position))
    }

    pub fn bounding_box(&self, entity: Entity) -> KernelResult<BoundingBox> {
        let z = self.elevation();
        match entity.dim {
            Dim::Point => {
                let p = self.point(entity.tag)?.position;
                Ok(BoundingBox::from_planar_points(&[p], z))
            }
            Dim::Curve => {
                let (a, b) = self.curve_endpoints(entity.tag)?;
                Ok(BoundingBox::from_planar_points(&[a, b], z))
            }
            Dim::Surface => {
                let surface = self.surface(entity.tag)?;
                let corners: Vec<Point2<f64>> = surface.cells.iter().flat_map(|c| [c.min, c.max]).collect();
                Ok(BoundingBox::from_planar_points(&corners, z))
            }
        }
    }

    /// Bounding box of the whole model
    pub fn model_bounding_box(&self) -> BoundingBox {
        BoundingBox::from_planar_points(self.points.values().map(|p| &p.position), self.elevation())
    }

    /// Entities of `dim` whose bounding box lies entirely inside `bbox`
    pub fn entities_in_bounding_box(&self, bbox: &BoundingBox, dim: Dim) -> Vec<Entity> {
        self.entities(dim)
            .into_iter()
            .filter(|e| {
                self.bounding_box(*e)
                    .map(|b| bbox.contains_box(&b))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Signed boundary of a single curve or surface.
    /// Curves report `start` positive and `end` negative.
    pub fn oriented_boundary(&self, entity: Entity) -> KernelResult<Vec<Tag>> {
        match entity.dim {
            Dim::Point => {
                self.require(entity)?;
                Ok(Vec::new())
            }
            Dim::Curve => {
                let curve = self.curve(entity.tag)?;
                Ok(vec![curve.start, -curve.end])
            }
            Dim::Surface => Ok(self.surface(entity.tag)?.boundary.clone()),
        }
    }

    /// Unsigned boundary of a set of entities.
    /// With `combined`, entities bounding two members of the set cancel out.
    pub fn boundary(&self, entities: &[Entity], combined: bool) -> KernelResult<Vec<Entity>> {
        let mut ordered: Vec<Entity> = Vec::new();
        let mut counts: BTreeMap<Entity, usize> = BTreeMap::new();

        for entity in entities {
            let Some(lower) = Dim::from_index(entity.dim.index().wrapping_sub(1)) else {
                self.require(*entity)?;
                continue;
            };
            for signed in self.oriented_boundary(*entity)? {
                let child = Entity::new(lower, signed.abs());
                let count = counts.entry(child).or_insert(0);
                if *count == 0 {
                    ordered.push(child);
                }
                *count += 1;
            }
        }

        if !combined {
            return Ok(ordered);
        }
        Ok(ordered.into_iter().filter(|e| counts[e] % 2 == 1).collect())
    }

    /// Create a physical group; every member must exist
    pub fn add_physical_group(&mut self, dim: Dim, members: &[Tag], name: Option<&str>) -> KernelResult<Tag> {
        if members.is_empty() {
            return Err(KernelError::EmptyPhysicalGroup {
                dim,
                name: name.map(str::to_string),
            });
        }
        for &tag in members {
            self.require(Entity::new(dim, tag))?;
        }

        let tag = self.groups.iter().map(|g| g.tag).max().unwrap_or(0) + 1;
        self.groups.push(PhysicalGroup {
            dim,
            tag,
            name: name.map(str::to_string),
            members: members.to_vec(),
        });
        debug!(tag, %dim, ?name, count = members.len(), "added physical group");
        Ok(tag)
    }

    pub fn physical_groups(&self) -> &[PhysicalGroup] {
        &self.groups
    }

    /// Physical group tags containing `entity`
    pub fn physical_tags_of(&self, entity: Entity) -> Vec<Tag> {
        self.groups
            .iter()
            .filter(|g| g.dim == entity.dim && g.members.contains(&entity.tag))
            .map(|g| g.tag)
            .collect()
    }

    /// Drop surfaces, then any curves and points no longer referenced
    pub(crate) fn remove_surfaces(&mut self, tags: &BTreeSet<Tag>) {
        self.surfaces.retain(|t, _| !tags.contains(t));

        let used_curves: BTreeSet<Tag> = self
            .surfaces
            .values()
            .flat_map(|s| s.boundary.iter().map(|c| c.abs()))
            .collect();
        self.curves.retain(|t, _| used_curves.contains(t));

        let used_points: BTreeSet<Tag> = self.curves.values().flat_map(|c| [c.start, c.end]).collect();
        self.points.retain(|t, _| used_points.contains(t));
        self.sizing.point_sizes.retain(|t, _| used_points.contains(t));

        let (points, curves, surfaces) = (&self.points, &self.curves, &self.surfaces);
        for group in &mut self.groups {
            group.members.retain(|t| match group.dim {
                Dim::Point => points.contains_key(t),
                Dim::Curve => curves.contains_key(t),
                Dim::Surface => surfaces.contains_key(t),
            });
        }
        self.groups.retain(|g| !g.members.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_topology() {
        let mut model = Model::new("test");
        let tag = model.add_rectangle(0.0, 0.0, 0.0, 1.0, 4.25).unwrap();
        assert_eq!(tag, 1);
        assert_eq!(model.entities(Dim::Point).len(), 4);
        assert_eq!(model.entities(Dim::Curve).len(), 4);

        let bbox = model.bounding_box(Entity::surface(tag)).unwrap();
        assert_relative_eq!(bbox.max.y, 4.25);
        assert_relative_eq!(model.surface(tag).unwrap().area(), 4.25);
    }

    #[test]
    fn test_degenerate_rectangle_rejected() {
        let mut model = Model::new("test");
        assert!(matches!(
            model.add_rectangle(0.0, 0.0, 0.0, 0.0, 1.0),
            Err(KernelError::DegenerateRectangle { .. })
        ));
        assert!(model.add_rectangle(0.0, 0.0, 0.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_non_planar_rectangle_rejected() {
        let mut model = Model::new("test");
        model.add_rectangle(0.0, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(matches!(
            model.add_rectangle(0.0, 0.0, 1.0, 1.0, 1.0),
            Err(KernelError::NonPlanar { .. })
        ));
    }

    #[test]
    fn test_boundary_of_curve_and_surface() {
        let mut model = Model::new("test");
        let s = model.add_rectangle(0.0, 0.0, 0.0, 2.0, 1.0).unwrap();
        let curves = model.boundary(&[Entity::surface(s)], true).unwrap();
        assert_eq!(curves.len(), 4);
        assert!(curves.iter().all(|e| e.dim == Dim::Curve));

        let points = model.boundary(&curves, true).unwrap();
        // Every corner bounds two curves of the closed loop and cancels out
        assert!(points.is_empty());
        assert_eq!(model.boundary(&curves, false).unwrap().len(), 4);
    }

    #[test]
    fn test_entities_in_bounding_box() {
        let mut model = Model::new("test");
        model.add_rectangle(0.0, 0.0, 0.0, 1.0, 2.0).unwrap();
        let query = BoundingBox::new(
            nalgebra::Point3::new(-1e-3, -1e-3, -1e-3),
            nalgebra::Point3::new(1.0 + 1e-3, 1e-3, 1e-3),
        );
        let found = model.entities_in_bounding_box(&query, Dim::Curve);
        assert_eq!(found, vec![Entity::curve(1)]);
    }

    #[test]
    fn test_physical_group_validation() {
        let mut model = Model::new("test");
        let s = model.add_rectangle(0.0, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(model.add_physical_group(Dim::Surface, &[s], Some("Post")).unwrap(), 1);
        assert_eq!(model.add_physical_group(Dim::Curve, &[1, 2], None).unwrap(), 2);
        assert!(matches!(
            model.add_physical_group(Dim::Surface, &[99], Some("Bad")),
            Err(KernelError::UnknownEntity { tag: 99, .. })
        ));
        assert!(model.add_physical_group(Dim::Curve, &[], Some("Empty")).is_err());
        assert_eq!(model.physical_tags_of(Entity::surface(s)), vec![1]);
    }
}
