// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - planar B-rep model and operations

mod bbox;
mod entity;
mod fragment;
mod model;
mod primitives;
mod robust_predicates;

pub use bbox::BoundingBox;
pub use entity::{Dim, Entity, Tag};
pub use fragment::FragmentResult;
pub use model::{CurveEntity, Model, PhysicalGroup, PointEntity, SurfaceEntity};
pub use primitives::{segment_distance, Rect};
pub use robust_predicates::{incircle, orient2d};
