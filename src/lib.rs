// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! finmesh
//!
//! Builds a parametric 2D fin cross-section (a post crossed by evenly spaced
//! fins), fragments it into a conforming arrangement, tags physical groups
//! and writes a graded triangle mesh in MSH 4.1 format.
//!
//! The geometry and meshing kernel is in-crate and limited to rectilinear
//! planar regions. It is driven through a [`Kernel`] session.

pub mod cli;
pub mod config;
pub mod error;
pub mod fin;
pub mod geometry;
pub mod io;
pub mod kernel;
pub mod mesh;
pub mod viewer;

pub use config::{CliOverrides, FinConfig, MeshConfig};
pub use error::{KernelError, KernelResult, TaggingError};
pub use fin::{run, run_with, FinGeometry, FinParams, FinRegions, RunSummary};
pub use geometry::{BoundingBox, Dim, Entity, Model, Tag};
pub use kernel::Kernel;
pub use mesh::{Field, Mesh, MeshAlgorithm};
