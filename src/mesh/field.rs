// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh size fields

use crate::error::{KernelError, KernelResult};
use crate::geometry::{Model, Tag};
use ahash::AHashMap;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field tag, allocated per model starting at 1
pub type FieldTag = i32;

/// Size field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Field {
    /// Distance to points and to `sampling` evenly spaced samples on each curve
    Distance {
        curves: Vec<Tag>,
        points: Vec<Tag>,
        sampling: usize,
    },
    /// Size ramp on the value of another field
    Threshold {
        in_field: FieldTag,
        size_min: f64,
        size_max: f64,
        dist_min: f64,
        dist_max: f64,
        /// Impose no size beyond `dist_max`
        stop_at_dist_max: bool,
    },
}

impl Field {
    /// Distance to a set of curves
    pub fn distance_to_curves(curves: Vec<Tag>, sampling: usize) -> Self {
        Self::Distance {
            curves,
            points: Vec::new(),
            sampling,
        }
    }

    pub fn threshold(in_field: FieldTag, size_min: f64, size_max: f64, dist_min: f64, dist_max: f64) -> Self {
        Self::Threshold {
            in_field,
            size_min,
            size_max,
            dist_min,
            dist_max,
            stop_at_dist_max: false,
        }
    }

    /// Check values that do not depend on the model
    pub(crate) fn validate(&self) -> KernelResult<()> {
        if let Self::Threshold {
            size_min,
            size_max,
            dist_min,
            dist_max,
            ..
        } = *self
        {
            for size in [size_min, size_max] {
                if !size.is_finite() || size <= 0.0 {
                    return Err(KernelError::InvalidSize(size));
                }
            }
            for dist in [dist_min, dist_max] {
                if !dist.is_finite() || dist < 0.0 {
                    return Err(KernelError::InvalidSize(dist));
                }
            }
        }
        Ok(())
    }
}

/// Uniform bucket grid over a point cloud for nearest-distance queries
#[derive(Debug)]
pub(crate) struct PointCloud {
    points: Vec<Point2<f64>>,
    origin: Point2<f64>,
    cell: f64,
    buckets: AHashMap<(i64, i64), Vec<usize>>,
    span: [i64; 4],
}

impl PointCloud {
    pub(crate) fn new(points: Vec<Point2<f64>>) -> Self {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &points {
            min = min.inf(p);
            max = max.sup(p);
        }
        let extent = if points.is_empty() { 1.0 } else { (max - min).amax() };
        let cell = (extent / (points.len() as f64).sqrt().max(1.0)).max(1e-9);

        let mut cloud = Self {
            points: Vec::new(),
            origin: if points.is_empty() { Point2::origin() } else { min },
            cell,
            buckets: AHashMap::new(),
            span: [i64::MAX, i64::MIN, i64::MAX, i64::MIN],
        };
        for (i, p) in points.iter().enumerate() {
            let key = cloud.key(p);
            cloud.span = [
                cloud.span[0].min(key.0),
                cloud.span[1].max(key.0),
                cloud.span[2].min(key.1),
                cloud.span[3].max(key.1),
            ];
            cloud.buckets.entry(key).or_default().push(i);
        }
        cloud.points = points;
        cloud
    }

    fn key(&self, p: &Point2<f64>) -> (i64, i64) {
        (
            ((p.x - self.origin.x) / self.cell).floor() as i64,
            ((p.y - self.origin.y) / self.cell).floor() as i64,
        )
    }

    /// Distance to the closest point; infinite for an empty cloud
    pub(crate) fn nearest(&self, p: &Point2<f64>) -> f64 {
        if self.points.is_empty() {
            return f64::INFINITY;
        }
        let (ci, cj) = self.key(p);
        let [imin, imax, jmin, jmax] = self.span;
        let max_ring = (ci - imin)
            .abs()
            .max((ci - imax).abs())
            .max((cj - jmin).abs())
            .max((cj - jmax).abs());

        let mut best2 = f64::INFINITY;
        for r in 0..=max_ring {
            for di in -r..=r {
                for dj in -r..=r {
                    if di.abs() != r && dj.abs() != r {
                        continue;
                    }
                    if let Some(bucket) = self.buckets.get(&(ci + di, cj + dj)) {
                        for &i in bucket {
                            best2 = best2.min((self.points[i] - p).norm_squared());
                        }
                    }
                }
            }
            // Unvisited buckets are at least r cells away
            let reach = r as f64 * self.cell;
            if best2 <= reach * reach {
                break;
            }
        }
        best2.sqrt()
    }
}

/// Field resolved against a model, ready for evaluation
#[derive(Debug)]
pub(crate) enum CompiledField {
    Distance(PointCloud),
    Threshold {
        input: Box<CompiledField>,
        size_min: f64,
        size_max: f64,
        dist_min: f64,
        dist_max: f64,
        stop_at_dist_max: bool,
    },
}

impl CompiledField {
    pub(crate) fn compile(tag: FieldTag, fields: &BTreeMap<FieldTag, Field>, model: &Model) -> KernelResult<Self> {
        Self::compile_inner(tag, fields, model, &mut Vec::new())
    }

    fn compile_inner(
        tag: FieldTag,
        fields: &BTreeMap<FieldTag, Field>,
        model: &Model,
        stack: &mut Vec<FieldTag>,
    ) -> KernelResult<Self> {
        if stack.contains(&tag) {
            return Err(KernelError::CyclicField(tag));
        }
        let field = fields.get(&tag).ok_or(KernelError::UnknownField(tag))?;

        match field {
            Field::Distance {
                curves,
                points,
                sampling,
            } => {
                let n = (*sampling).max(2);
                let mut samples = Vec::with_capacity(curves.len() * n + points.len());
                for &curve in curves {
                    let (a, b) = model.curve_endpoints(curve)?;
                    samples.extend((0..n).map(|i| a + (b - a) * (i as f64 / (n - 1) as f64)));
                }
                for &point in points {
                    samples.push(model.point(point)?.position);
                }
                Ok(Self::Distance(PointCloud::new(samples)))
            }
            Field::Threshold {
                in_field,
                size_min,
                size_max,
                dist_min,
                dist_max,
                stop_at_dist_max,
            } => {
                stack.push(tag);
                let input = Self::compile_inner(*in_field, fields, model, stack)?;
                stack.pop();
                Ok(Self::Threshold {
                    input: Box::new(input),
                    size_min: *size_min,
                    size_max: *size_max,
                    dist_min: *dist_min,
                    dist_max: *dist_max,
                    stop_at_dist_max: *stop_at_dist_max,
                })
            }
        }
    }

    pub(crate) fn eval(&self, p: &Point2<f64>) -> f64 {
        match self {
            Self::Distance(cloud) => cloud.nearest(p),
            Self::Threshold {
                input,
                size_min,
                size_max,
                dist_min,
                dist_max,
                stop_at_dist_max,
            } => {
                let d = input.eval(p);
                if *stop_at_dist_max && d > *dist_max {
                    f64::INFINITY
                } else if d <= *dist_min {
                    *size_min
                } else if d >= *dist_max {
                    *size_max
                } else {
                    let t = (d - dist_min) / (dist_max - dist_min);
                    size_min + t * (size_max - size_min)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn unit_square() -> Model {
        let mut model = Model::new("field");
        model.add_rectangle(0.0, 0.0, 0.0, 1.0, 1.0).unwrap();
        model
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let points: Vec<Point2<f64>> = (0..200)
            .map(|i| {
                let t = i as f64 * 0.37;
                Point2::new(t.sin() * 3.0, (t * 1.7).cos() * 2.0)
            })
            .collect();
        let cloud = PointCloud::new(points.clone());

        for q in [Point2::new(0.1, 0.2), Point2::new(-5.0, 4.0), Point2::new(2.9, -1.9)] {
            let brute = points.iter().map(|p| (p - q).norm()).fold(f64::INFINITY, f64::min);
            assert_relative_eq!(cloud.nearest(&q), brute, epsilon = 1e-12);
        }
        assert!(PointCloud::new(Vec::new()).nearest(&Point2::origin()).is_infinite());
    }

    #[test]
    fn test_threshold_ramp() {
        let model = unit_square();
        let mut fields = BTreeMap::new();
        fields.insert(1, Field::distance_to_curves(vec![1], 101));
        fields.insert(2, Field::threshold(1, 0.02, 0.2, 0.0625, 0.125));

        let field = CompiledField::compile(2, &fields, &model).unwrap();
        assert_relative_eq!(field.eval(&Point2::new(0.5, 0.0)), 0.02);
        assert_relative_eq!(field.eval(&Point2::new(0.5, 0.5)), 0.2);
        // Halfway along the ramp
        assert_relative_eq!(field.eval(&Point2::new(0.5, 0.09375)), 0.11, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_to_points() {
        let model = unit_square();
        let corner = model.point(1).unwrap().position;
        let mut fields = BTreeMap::new();
        fields.insert(
            1,
            Field::Distance {
                curves: Vec::new(),
                points: vec![1],
                sampling: 10,
            },
        );

        let field = CompiledField::compile(1, &fields, &model).unwrap();
        assert_relative_eq!(field.eval(&corner), 0.0);
        assert_relative_eq!(field.eval(&(corner + Vector2::new(0.3, -0.4))), 0.5, epsilon = 1e-12);

        fields.insert(
            2,
            Field::Distance {
                curves: Vec::new(),
                points: vec![99],
                sampling: 10,
            },
        );
        assert!(matches!(
            CompiledField::compile(2, &fields, &model),
            Err(KernelError::UnknownEntity { tag: 99, .. })
        ));
    }

    #[test]
    fn test_threshold_stops_at_dist_max() {
        let model = unit_square();
        let mut fields = BTreeMap::new();
        fields.insert(1, Field::distance_to_curves(vec![1], 101));
        fields.insert(
            2,
            Field::Threshold {
                in_field: 1,
                size_min: 0.02,
                size_max: 0.2,
                dist_min: 0.0625,
                dist_max: 0.125,
                stop_at_dist_max: true,
            },
        );

        let field = CompiledField::compile(2, &fields, &model).unwrap();
        assert_relative_eq!(field.eval(&Point2::new(0.5, 0.0)), 0.02);
        assert_relative_eq!(field.eval(&Point2::new(0.5, 0.09375)), 0.11, epsilon = 1e-9);
        // No size is imposed past dist_max
        assert!(field.eval(&Point2::new(0.5, 0.5)).is_infinite());
    }

    #[test]
    fn test_cycle_and_unknown_fields() {
        let model = unit_square();
        let mut fields = BTreeMap::new();
        fields.insert(1, Field::threshold(2, 0.1, 1.0, 0.0, 1.0));
        fields.insert(2, Field::threshold(1, 0.1, 1.0, 0.0, 1.0));
        assert!(matches!(
            CompiledField::compile(1, &fields, &model),
            Err(KernelError::CyclicField(1))
        ));
        assert!(matches!(
            CompiledField::compile(7, &fields, &model),
            Err(KernelError::UnknownField(7))
        ));

        fields.insert(3, Field::distance_to_curves(vec![42], 10));
        assert!(matches!(
            CompiledField::compile(3, &fields, &model),
            Err(KernelError::UnknownEntity { tag: 42, .. })
        ));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(Field::threshold(1, 0.0, 1.0, 0.0, 1.0).validate().is_err());
        assert!(Field::threshold(1, 0.1, 1.0, -1.0, 1.0).validate().is_err());
        assert!(Field::threshold(1, 0.1, 1.0, 0.0, 1.0).validate().is_ok());
    }
}
