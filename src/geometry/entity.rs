// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Entity identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kernel-assigned entity tag. Positive; negated in oriented boundary lists.
pub type Tag = i32;

/// Topological dimension of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dim {
    Point,
    Curve,
    Surface,
}

impl Dim {
    pub fn index(self) -> usize {
        match self {
            Self::Point => 0,
            Self::Curve => 1,
            Self::Surface => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Point),
            1 => Some(Self::Curve),
            2 => Some(Self::Surface),
            _ => None,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::Curve => write!(f, "curve"),
            Self::Surface => write!(f, "surface"),
        }
    }
}

/// A (dimension, tag) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    pub dim: Dim,
    pub tag: Tag,
}

impl Entity {
    pub fn new(dim: Dim, tag: Tag) -> Self {
        Self { dim, tag }
    }

    pub fn point(tag: Tag) -> Self {
        Self::new(Dim::Point, tag)
    }

    pub fn curve(tag: Tag) -> Self {
        Self::new(Dim::Curve, tag)
    }

    pub fn surface(tag: Tag) -> Self {
        Self::new(Dim::Surface, tag)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dim.index(), self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_display_and_order() {
        assert_eq!(Entity::surface(3).to_string(), "(2, 3)");
        assert!(Entity::curve(10) < Entity::surface(1));
        assert_eq!(Dim::from_index(1), Some(Dim::Curve));
        assert_eq!(Dim::from_index(3), None);
    }
}
