// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fin pipeline: build, fragment, tag, mesh and preview

pub mod builder;
pub mod mesher;
pub mod params;
pub mod tagger;

pub use builder::FinGeometry;
pub use mesher::{configure, mesh_and_write, MeshSummary, SizeSettings};
pub use params::{FinParams, RectangleSpec};
pub use tagger::{tag_regions, FinRegions, RegionGroup};

use crate::cli::Reporter;
use crate::config::FinConfig;
use crate::geometry::{BoundingBox, Dim, Entity, FragmentResult};
use crate::kernel::Kernel;
use crate::viewer;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Name of the model created for a run
pub const MODEL_NAME: &str = "fin";

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub params: FinParams,
    /// Bounding box of the post before fragmentation
    pub root_bounding_box: BoundingBox,
    pub surfaces: usize,
    pub curves: usize,
    pub fragments: Option<FragmentResult>,
    pub regions: FinRegions,
    pub mesh: Option<MeshSummary>,
    pub preview: Option<PathBuf>,
}

impl RunSummary {
    /// Write the summary as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run summary")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Run the pipeline in a fresh kernel session
pub fn run(config: &FinConfig) -> Result<RunSummary> {
    let mut kernel = Kernel::initialize().context("Failed to start kernel session")?;
    run_with(&mut kernel, config)
}

/// Run the pipeline in an existing session
pub fn run_with(kernel: &mut Kernel, config: &FinConfig) -> Result<RunSummary> {
    config.validate()?;
    let params = &config.geometry;
    kernel.add_model(MODEL_NAME);

    let mut geometry = FinGeometry::build(kernel, params).context("Failed to build fin geometry")?;
    Reporter::report_inputs(&geometry.inputs());
    let root_bounding_box = kernel.bounding_box(Entity::surface(geometry.root))?;

    if config.fragment {
        let result = geometry.fragment(kernel).context("Failed to fragment fin geometry")?;
        Reporter::report_fragments(result);
    }

    let search = tagger::root_search_box(params);
    Reporter::report_root_query(&search, &kernel.entities_in_bounding_box(&search, Dim::Curve)?);
    let regions = tag_regions(kernel, &geometry, params).context("Failed to tag fin regions")?;
    Reporter::report_groups(&regions);

    let mesh = if config.generate_mesh {
        configure(kernel, &regions, &config.mesh, params.thickness).context("Failed to configure mesh sizes")?;
        let progress = spinner("Meshing");
        let start = Instant::now();
        let result = mesh_and_write(kernel, &config.mesh, params.thickness);
        progress.finish_and_clear();
        let summary = result.with_context(|| format!("Failed to mesh into {}", config.mesh.output.display()))?;
        Reporter::report_mesh(&summary, start.elapsed());
        Some(summary)
    } else {
        None
    };

    let preview = if config.view {
        let path = config.preview_path();
        viewer::render_to_png(kernel.model()?, kernel.mesh(), &path)?;
        Reporter::report_info(&format!("Preview written to {}. Press Enter to continue", path.display()));
        viewer::wait_for_user(std::io::stdin().lock())?;
        Some(path)
    } else {
        None
    };

    let surfaces = kernel.entities(Dim::Surface)?.len();
    let curves = kernel.entities(Dim::Curve)?.len();
    info!(surfaces, curves, meshed = mesh.is_some(), "fin pipeline finished");

    Ok(RunSummary {
        generated_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        params: params.clone(),
        root_bounding_box,
        surfaces,
        curves,
        fragments: geometry.fragments,
        regions,
        mesh,
        preview,
    })
}
