// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fin geometry construction and fragmentation

use super::params::{FinParams, RectangleSpec};
use crate::error::KernelResult;
use crate::geometry::{Entity, FragmentResult, Tag};
use crate::kernel::Kernel;
use tracing::{debug, info};

/// Surfaces created for the post and the fins
#[derive(Debug, Clone)]
pub struct FinGeometry {
    /// Post surface
    pub root: Tag,
    /// Fin surfaces, bottom to top
    pub fins: Vec<Tag>,
    /// Set once the shapes were fragmented
    pub fragments: Option<FragmentResult>,
}

fn add(kernel: &mut Kernel, spec: RectangleSpec) -> KernelResult<Tag> {
    kernel.add_rectangle(spec.x, spec.y, spec.z, spec.dx, spec.dy)
}

impl FinGeometry {
    /// Add the post and the fins to the current model
    pub fn build(kernel: &mut Kernel, params: &FinParams) -> KernelResult<Self> {
        let root = add(kernel, params.root())?;
        let mut fins = Vec::with_capacity(params.n_fins);
        for i in 1..=params.n_fins {
            let tag = add(kernel, params.fin(i))?;
            debug!(fin = i, tag, "added fin");
            fins.push(tag);
        }
        info!(root, fins = fins.len(), "built fin geometry");

        Ok(Self {
            root,
            fins,
            fragments: None,
        })
    }

    /// Fragment the post against every fin
    pub fn fragment(&mut self, kernel: &mut Kernel) -> KernelResult<&FragmentResult> {
        let objects = [Entity::surface(self.root)];
        let tools: Vec<Entity> = self.fins.iter().map(|&t| Entity::surface(t)).collect();
        let result = kernel.fragment(&objects, &tools)?;
        info!(surfaces = result.entities.len(), "fragmented fin geometry");
        let result: &FragmentResult = self.fragments.insert(result);
        Ok(result)
    }

    /// Input surfaces in fragment call order: post first, then the fins
    pub fn inputs(&self) -> Vec<Entity> {
        std::iter::once(self.root)
            .chain(self.fins.iter().copied())
            .map(Entity::surface)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Dim;

    #[test]
    fn test_build_and_fragment() {
        let mut kernel = Kernel::acquire();
        kernel.add_model("fin");
        let params = FinParams {
            n_fins: 2,
            ..FinParams::default()
        };

        let mut geometry = FinGeometry::build(&mut kernel, &params).unwrap();
        assert_eq!(geometry.root, 1);
        assert_eq!(geometry.fins, vec![2, 3]);
        assert_eq!(geometry.inputs().len(), 3);

        let result = geometry.fragment(&mut kernel).unwrap();
        // Post: 2 free spans + 2 crossings; each fin adds a left and a right part
        assert_eq!(result.children_of(Entity::surface(1)).unwrap().len(), 4);
        assert_eq!(result.entities.len(), 8);
        assert_eq!(kernel.entities(Dim::Surface).unwrap().len(), 8);
    }
}
