// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 1D discretization of straight curves

use nalgebra::Point2;

const MIN_STEPS: usize = 32;
const MAX_STEPS: usize = 1 << 14;

/// Interior nodes of the segment `a -> b`, spaced at equal increments of
/// the integral of `1 / h` along it.
pub(crate) fn discretize_segment<F>(a: Point2<f64>, b: Point2<f64>, size: &F) -> Vec<Point2<f64>>
where
    F: Fn(&Point2<f64>) -> f64,
{
    let length = (b - a).norm();
    if length == 0.0 {
        return Vec::new();
    }
    let at = |s: f64| a + (b - a) * s;

    // Resolve the smallest size along the segment with a few steps per element
    let h_min = (0..=MIN_STEPS)
        .map(|k| size(&at(k as f64 / MIN_STEPS as f64)))
        .fold(f64::INFINITY, f64::min);
    let steps = ((4.0 * length / h_min).ceil() as usize).clamp(MIN_STEPS, MAX_STEPS);

    // Cumulative trapezoid integral of 1 / h
    let mut cumulative = Vec::with_capacity(steps + 1);
    cumulative.push(0.0);
    let mut previous = 1.0 / size(&a);
    for k in 1..=steps {
        let current = 1.0 / size(&at(k as f64 / steps as f64));
        let last = cumulative[k - 1];
        cumulative.push(last + 0.5 * (previous + current) * length / steps as f64);
        previous = current;
    }

    let total = cumulative[steps];
    let count = (total.round() as usize).max(1);

    let mut nodes = Vec::with_capacity(count.saturating_sub(1));
    let mut k = 0;
    for m in 1..count {
        let target = total * m as f64 / count as f64;
        while cumulative[k + 1] < target {
            k += 1;
        }
        let span = cumulative[k + 1] - cumulative[k];
        let local = if span > 0.0 { (target - cumulative[k]) / span } else { 0.0 };
        nodes.push(at((k as f64 + local) / steps as f64));
    }
    nodes
}

/// Interior nodes of a curve split at its break points, ordered from `start` to `end`
pub(crate) fn discretize_curve<F>(start: Point2<f64>, end: Point2<f64>, breaks: &[Point2<f64>], size: &F) -> Vec<Point2<f64>>
where
    F: Fn(&Point2<f64>) -> f64,
{
    let direction = end - start;
    let mut stops: Vec<Point2<f64>> = breaks.to_vec();
    stops.sort_by(|p, q| (p - start).dot(&direction).total_cmp(&(q - start).dot(&direction)));

    let mut nodes = Vec::new();
    let mut from = start;
    for stop in stops {
        nodes.extend(discretize_segment(from, stop, size));
        nodes.push(stop);
        from = stop;
    }
    nodes.extend(discretize_segment(from, end, size));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_size() {
        let nodes = discretize_segment(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), &|_| 0.1);
        assert_eq!(nodes.len(), 9);
        assert_relative_eq!(nodes[0].x, 0.1, epsilon = 1e-9);
        assert_relative_eq!(nodes[8].x, 0.9, epsilon = 1e-9);
    }

    #[test]
    fn test_short_curve_keeps_one_segment() {
        let nodes = discretize_segment(Point2::new(0.0, 0.0), Point2::new(0.0, 0.01), &|_| 1.0);
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_graded_size_clusters_nodes() {
        // Size grows linearly from 0.01 at x = 0 to 0.2 at x = 1
        let size = |p: &Point2<f64>| 0.01 + 0.19 * p.x;
        let nodes = discretize_segment(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), &size);
        let first = nodes[0].x;
        let last = 1.0 - nodes[nodes.len() - 1].x;
        assert!(first < 0.03);
        assert!(last > 0.1);
    }

    #[test]
    fn test_breaks_are_nodes() {
        let breaks = [Point2::new(0.75, 0.0), Point2::new(0.25, 0.0)];
        let nodes = discretize_curve(Point2::new(1.0, 0.0), Point2::new(0.0, 0.0), &breaks, &|_| 0.3);
        assert!(nodes.contains(&breaks[0]));
        assert!(nodes.contains(&breaks[1]));
        // Ordered from start to end
        assert!(nodes.windows(2).all(|w| w[0].x > w[1].x));
    }
}
