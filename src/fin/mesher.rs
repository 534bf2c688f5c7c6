// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh configuration and generation for tagged fin regions

use super::tagger::FinRegions;
use crate::config::MeshConfig;
use crate::error::KernelResult;
use crate::geometry::Dim;
use crate::kernel::Kernel;
use crate::mesh::{ElementKind, Field, FieldTag};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Size parameters resolved from the configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeSettings {
    pub lc: f64,
    pub size_min: f64,
    pub size_max: f64,
    pub dist_min: f64,
    pub dist_max: f64,
}

impl SizeSettings {
    pub fn resolve(config: &MeshConfig, thickness: f64) -> Self {
        Self {
            lc: config.lc,
            size_min: config.lc * config.size_min_ratio,
            size_max: config.lc,
            dist_min: thickness * config.dist_min_ratio,
            dist_max: thickness * config.dist_max_ratio,
        }
    }
}

/// Mesh statistics reported after writing
#[derive(Debug, Clone, Serialize)]
pub struct MeshSummary {
    pub path: PathBuf,
    pub nodes: usize,
    pub lines: usize,
    pub triangles: usize,
    pub sizes: SizeSettings,
}

/// Configure algorithms, point sizes and the graded background field.
/// Returns the background field tag.
pub fn configure(kernel: &mut Kernel, regions: &FinRegions, config: &MeshConfig, thickness: f64) -> KernelResult<FieldTag> {
    let sizes = SizeSettings::resolve(config, thickness);

    let options = kernel.options_mut();
    options.algorithm = config.algorithm;
    options.save_all = config.save_all;
    if let (Some(algorithm), Some(&surface)) = (config.root_algorithm, regions.post.members.first()) {
        kernel.set_algorithm(surface, algorithm)?;
    }

    let points = kernel.entities(Dim::Point)?;
    kernel.set_size(&points, sizes.lc)?;

    let distance = kernel.add_field(Field::distance_to_curves(
        regions.gamma_ext.members.clone(),
        config.sampling,
    ))?;
    let threshold = kernel.add_field(Field::threshold(
        distance,
        sizes.size_min,
        sizes.size_max,
        sizes.dist_min,
        sizes.dist_max,
    ))?;
    kernel.set_background_field(threshold)?;

    info!(
        lc = sizes.lc,
        size_min = sizes.size_min,
        dist_min = sizes.dist_min,
        dist_max = sizes.dist_max,
        "configured mesh sizes"
    );
    Ok(threshold)
}

/// Generate the 2D mesh and write it to the configured output
pub fn mesh_and_write(kernel: &mut Kernel, config: &MeshConfig, thickness: f64) -> KernelResult<MeshSummary> {
    let mesh = kernel.generate_mesh(2)?;
    let summary = MeshSummary {
        path: config.output.clone(),
        nodes: mesh.node_count(),
        lines: mesh.element_count(ElementKind::Line),
        triangles: mesh.triangle_count(),
        sizes: SizeSettings::resolve(config, thickness),
    };
    kernel.write_mesh(&config.output)?;
    Ok(summary)
}
