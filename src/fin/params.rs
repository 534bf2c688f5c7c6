// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fin geometry parameters

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle placement: corner, elevation and extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RectangleSpec {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub dx: f64,
    pub dy: f64,
}

/// Dimensions of a post crossed by evenly spaced fins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinParams {
    /// Number of fins
    pub n_fins: usize,
    /// Fin overhang on each side of the post
    pub fin_length: f64,
    /// Fin thickness
    pub thickness: f64,
    /// Gap between consecutive fins
    pub spacing: f64,
    /// Post width
    pub post_width: f64,
    /// Lower-left corner of the post
    pub origin: [f64; 3],
}

impl Default for FinParams {
    fn default() -> Self {
        Self {
            n_fins: 4,
            fin_length: 2.5,
            thickness: 0.25,
            spacing: 0.75,
            post_width: 1.0,
            origin: [0.0; 3],
        }
    }
}

impl FinParams {
    /// Distance between the bottoms of consecutive fins
    pub fn pitch(&self) -> f64 {
        self.spacing + self.thickness
    }

    pub fn post_height(&self) -> f64 {
        self.n_fins as f64 * self.pitch() + self.thickness
    }

    pub fn root(&self) -> RectangleSpec {
        let [x, y, z] = self.origin;
        RectangleSpec {
            x,
            y,
            z,
            dx: self.post_width,
            dy: self.post_height(),
        }
    }

    /// Fin `i`, counted from 1 at the bottom
    pub fn fin(&self, i: usize) -> RectangleSpec {
        let [x, y, z] = self.origin;
        RectangleSpec {
            x: x - self.fin_length,
            y: y + i as f64 * self.pitch(),
            z,
            dx: 2.0 * self.fin_length + self.post_width,
            dy: self.thickness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_layout() {
        let params = FinParams::default();
        let root = params.root();
        assert_relative_eq!(root.dy, 4.25);
        assert_relative_eq!(root.dx, 1.0);

        let top = params.fin(4);
        assert_relative_eq!(top.x, -2.5);
        assert_relative_eq!(top.y, 4.0);
        assert_relative_eq!(top.dx, 6.0);
        // The top fin is flush with the top of the post
        assert_relative_eq!(top.y + top.dy, root.y + root.dy);
    }
}
