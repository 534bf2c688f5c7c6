// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for the geometry kernel and the fin tagger

use crate::geometry::{Dim, Entity, Tag};
use crate::mesh::FieldTag;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Another kernel session is alive in this process.
    #[error("a kernel session is already active in this process")]
    AlreadyInitialized,

    /// No model has been added to the session.
    #[error("no model has been added to the kernel session")]
    NoModel,

    /// Rectangle with non-positive or non-finite extent.
    #[error("degenerate rectangle at ({x}, {y}): width {dx}, height {dy}")]
    DegenerateRectangle { x: f64, y: f64, dx: f64, dy: f64 },

    /// Shape placed outside the plane of the model.
    #[error("rectangle at z = {found} does not lie in the model plane z = {expected}")]
    NonPlanar { expected: f64, found: f64 },

    /// Entity tag not present in the model.
    #[error("unknown {dim} entity {tag}")]
    UnknownEntity { dim: Dim, tag: Tag },

    /// Operation does not support entities of this dimension.
    #[error("operation does not support {0}")]
    UnsupportedDimension(Entity),

    /// Physical group without members.
    #[error("physical group {name:?} of dimension {dim} has no members")]
    EmptyPhysicalGroup { dim: Dim, name: Option<String> },

    /// Field tag not registered.
    #[error("unknown mesh size field {0}")]
    UnknownField(FieldTag),

    /// Field graph references itself.
    #[error("mesh size field {0} references itself")]
    CyclicField(FieldTag),

    /// Mesh size must be finite and positive.
    #[error("invalid mesh size {0} (must be finite and > 0)")]
    InvalidSize(f64),

    /// Mesh generation only covers dimensions 0 to 2.
    #[error("cannot generate a mesh of dimension {0}")]
    InvalidMeshDimension(usize),

    /// Writing was requested before a mesh was generated.
    #[error("no mesh has been generated")]
    NoMesh,

    /// Triangulation failed for a surface.
    #[error("meshing surface {surface} failed: {reason}")]
    Meshing { surface: Tag, reason: String },

    /// IO error while writing a mesh file.
    #[error("failed to write {path}: {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for kernel operations.
pub type KernelResult<T> = std::result::Result<T, KernelError>;

/// Errors raised when the fin regions cannot be tagged consistently.
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// No curve lies along the bottom edge of the post.
    #[error("no root curve found inside [{xmin}, {xmax}] x [{ymin}, {ymax}]")]
    RootCurveNotFound {
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
    },

    /// Fragmentation did not report descendants for an input surface.
    #[error("fragment relations do not cover surface {0}")]
    MissingRelation(Tag),

    /// A region ended up without members.
    #[error("region {0} is empty")]
    EmptyRegion(String),

    /// Two surface regions share a surface.
    #[error("surface {tag} belongs to both {first} and {second}")]
    OverlappingRegions {
        tag: Tag,
        first: String,
        second: String,
    },

    /// The exterior and root groups do not partition the boundary.
    #[error("boundary partition mismatch: {0}")]
    BoundaryPartition(String),
}
