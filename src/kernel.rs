// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel session: scoped access to the geometry and meshing kernel

use crate::error::{KernelError, KernelResult};
use crate::geometry::{BoundingBox, Dim, Entity, FragmentResult, Model, PhysicalGroup, Tag};
use crate::io::export_msh;
use crate::mesh::{self, Field, FieldTag, Mesh, MeshAlgorithm, MeshOptions};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, TryLockError};
use tracing::{debug, info};

/// Held by the live session
static SESSION: Mutex<()> = Mutex::new(());

/// Kernel session. Only one may be alive per process; dropping it finalizes the kernel.
pub struct Kernel {
    _session: MutexGuard<'static, ()>,
    model: Option<Model>,
    options: MeshOptions,
    mesh: Option<Mesh>,
}

impl Kernel {
    /// Start a session, failing if another one is alive
    pub fn initialize() -> KernelResult<Self> {
        let guard = match SESSION.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(KernelError::AlreadyInitialized),
        };
        Ok(Self::with_guard(guard))
    }

    /// Start a session, waiting for the live one to finish
    pub fn acquire() -> Self {
        let guard = SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Self::with_guard(guard)
    }

    fn with_guard(guard: MutexGuard<'static, ()>) -> Self {
        debug!("kernel session initialized");
        Self {
            _session: guard,
            model: None,
            options: MeshOptions::default(),
            mesh: None,
        }
    }

    /// Start a new empty model and make it current
    pub fn add_model(&mut self, name: &str) {
        info!(name, "created model");
        self.model = Some(Model::new(name));
        self.mesh = None;
    }

    pub fn model(&self) -> KernelResult<&Model> {
        self.model.as_ref().ok_or(KernelError::NoModel)
    }

    /// Mutable model access; any edit invalidates the mesh
    fn model_mut(&mut self) -> KernelResult<&mut Model> {
        self.mesh = None;
        self.model.as_mut().ok_or(KernelError::NoModel)
    }

    pub fn add_rectangle(&mut self, x: f64, y: f64, z: f64, dx: f64, dy: f64) -> KernelResult<Tag> {
        self.model_mut()?.add_rectangle(x, y, z, dx, dy)
    }

    pub fn fragment(&mut self, objects: &[Entity], tools: &[Entity]) -> KernelResult<FragmentResult> {
        self.model_mut()?.fragment(objects, tools)
    }

    pub fn entities(&self, dim: Dim) -> KernelResult<Vec<Entity>> {
        Ok(self.model()?.entities(dim))
    }

    pub fn bounding_box(&self, entity: Entity) -> KernelResult<BoundingBox> {
        self.model()?.bounding_box(entity)
    }

    pub fn entities_in_bounding_box(&self, bbox: &BoundingBox, dim: Dim) -> KernelResult<Vec<Entity>> {
        Ok(self.model()?.entities_in_bounding_box(bbox, dim))
    }

    pub fn boundary(&self, entities: &[Entity], combined: bool) -> KernelResult<Vec<Entity>> {
        self.model()?.boundary(entities, combined)
    }

    pub fn oriented_boundary(&self, entity: Entity) -> KernelResult<Vec<Tag>> {
        self.model()?.oriented_boundary(entity)
    }

    pub fn add_physical_group(&mut self, dim: Dim, tags: &[Tag], name: Option<&str>) -> KernelResult<Tag> {
        self.model_mut()?.add_physical_group(dim, tags, name)
    }

    pub fn physical_groups(&self) -> KernelResult<&[PhysicalGroup]> {
        Ok(self.model()?.physical_groups())
    }

    /// Prescribe the mesh size at model points
    pub fn set_size(&mut self, points: &[Entity], size: f64) -> KernelResult<()> {
        if !size.is_finite() || size <= 0.0 {
            return Err(KernelError::InvalidSize(size));
        }
        let model = self.model_mut()?;
        for entity in points {
            if entity.dim != Dim::Point {
                return Err(KernelError::UnsupportedDimension(*entity));
            }
            model.point(entity.tag)?;
        }
        for entity in points {
            model.sizing.point_sizes.insert(entity.tag, size);
        }
        debug!(count = points.len(), size, "set point sizes");
        Ok(())
    }

    /// Override the 2D algorithm of one surface
    pub fn set_algorithm(&mut self, surface: Tag, algorithm: MeshAlgorithm) -> KernelResult<()> {
        let model = self.model_mut()?;
        model.surface(surface)?;
        model.sizing.surface_algorithms.insert(surface, algorithm);
        Ok(())
    }

    pub fn add_field(&mut self, field: Field) -> KernelResult<FieldTag> {
        field.validate()?;
        let sizing = &mut self.model_mut()?.sizing;
        let tag = sizing.fields.keys().next_back().map_or(1, |t| t + 1);
        debug!(tag, ?field, "added size field");
        sizing.fields.insert(tag, field);
        Ok(tag)
    }

    pub fn set_background_field(&mut self, tag: FieldTag) -> KernelResult<()> {
        let sizing = &mut self.model_mut()?.sizing;
        if !sizing.fields.contains_key(&tag) {
            return Err(KernelError::UnknownField(tag));
        }
        sizing.background = Some(tag);
        Ok(())
    }

    pub fn options(&self) -> &MeshOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut MeshOptions {
        &mut self.options
    }

    /// Mesh every entity up to `dim`, replacing any previous mesh
    pub fn generate_mesh(&mut self, dim: usize) -> KernelResult<&Mesh> {
        let model = self.model.as_ref().ok_or(KernelError::NoModel)?;
        let mesh = mesh::generate(model, &self.options, dim)?;
        info!(
            dim,
            nodes = mesh.node_count(),
            triangles = mesh.triangle_count(),
            algorithm = %self.options.algorithm,
            "generated mesh"
        );
        let mesh: &Mesh = self.mesh.insert(mesh);
        Ok(mesh)
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Write the current mesh as MSH 4.1
    pub fn write_mesh(&self, path: &Path) -> KernelResult<()> {
        let mesh = self.mesh.as_ref().ok_or(KernelError::NoMesh)?;
        export_msh(self.model()?, mesh, self.options.save_all, path)?;
        info!(path = %path.display(), "wrote mesh");
        Ok(())
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        debug!("kernel session finalized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_session() {
        let first = Kernel::acquire();
        assert!(matches!(Kernel::initialize(), Err(KernelError::AlreadyInitialized)));
        drop(first);

        let again = Kernel::acquire();
        assert!(again.model().is_err());
    }

    #[test]
    fn test_requires_model() {
        let mut kernel = Kernel::acquire();
        assert!(matches!(
            kernel.add_rectangle(0.0, 0.0, 0.0, 1.0, 1.0),
            Err(KernelError::NoModel)
        ));
        kernel.add_model("test");
        assert_eq!(kernel.add_rectangle(0.0, 0.0, 0.0, 1.0, 1.0).unwrap(), 1);
    }

    #[test]
    fn test_size_and_field_validation() {
        let mut kernel = Kernel::acquire();
        kernel.add_model("test");
        kernel.add_rectangle(0.0, 0.0, 0.0, 1.0, 1.0).unwrap();

        assert!(kernel.set_size(&[Entity::point(1)], 0.0).is_err());
        assert!(matches!(
            kernel.set_size(&[Entity::curve(1)], 0.1),
            Err(KernelError::UnsupportedDimension(_))
        ));
        kernel.set_size(&[Entity::point(1), Entity::point(2)], 0.1).unwrap();
        assert_eq!(kernel.model().unwrap().sizing().point_size(2), Some(0.1));

        let distance = kernel.add_field(Field::distance_to_curves(vec![1], 20)).unwrap();
        let threshold = kernel.add_field(Field::threshold(distance, 0.01, 0.1, 0.1, 0.2)).unwrap();
        assert_eq!((distance, threshold), (1, 2));
        assert!(matches!(kernel.set_background_field(9), Err(KernelError::UnknownField(9))));
        kernel.set_background_field(threshold).unwrap();

        assert!(kernel.set_algorithm(5, MeshAlgorithm::Delaunay).is_err());
        kernel.set_algorithm(1, MeshAlgorithm::Delaunay).unwrap();
    }

    #[test]
    fn test_mesh_lifecycle() {
        let mut kernel = Kernel::acquire();
        kernel.add_model("test");
        kernel.add_rectangle(0.0, 0.0, 0.0, 1.0, 1.0).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.msh");

        assert!(matches!(kernel.write_mesh(&path), Err(KernelError::NoMesh)));
        kernel.generate_mesh(2).unwrap();
        kernel.write_mesh(&path).unwrap();
        assert!(path.exists());

        // Editing the model drops the stale mesh
        kernel.add_rectangle(2.0, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(kernel.mesh().is_none());
    }
}
