// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Robust planar predicates for triangulation
//! Fast floating-point filter with an error-free fallback for near-degenerate cases

use nalgebra::Point2;

const EPSILON: f64 = f64::EPSILON * 0.5;
const ORIENT_BOUND: f64 = (3.0 + 16.0 * EPSILON) * EPSILON;
const INCIRCLE_BOUND: f64 = (10.0 + 96.0 * EPSILON) * EPSILON;

/// Twice the signed area of triangle (a, b, c)
/// Positive if c lies to the left of a -> b (counter-clockwise)
pub fn orient2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    let left = (b.x - a.x) * (c.y - a.y);
    let right = (b.y - a.y) * (c.x - a.x);
    let det = left - right;

    let bound = ORIENT_BOUND * (left.abs() + right.abs());
    if det.abs() > bound {
        return det;
    }

    two_product_difference(b.x - a.x, c.y - a.y, b.y - a.y, c.x - a.x)
}

/// Positive if `d` lies strictly inside the circle through counter-clockwise (a, b, c)
pub fn incircle(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, d: &Point2<f64>) -> f64 {
    let (adx, ady) = (a.x - d.x, a.y - d.y);
    let (bdx, bdy) = (b.x - d.x, b.y - d.y);
    let (cdx, cdy) = (c.x - d.x, c.y - d.y);

    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;

    let bc = bdx * cdy - cdx * bdy;
    let ca = cdx * ady - adx * cdy;
    let ab = adx * bdy - bdx * ady;
    let det = alift * bc + blift * ca + clift * ab;

    let permanent = alift * ((bdx * cdy).abs() + (cdx * bdy).abs())
        + blift * ((cdx * ady).abs() + (adx * cdy).abs())
        + clift * ((adx * bdy).abs() + (bdx * ady).abs());
    if det.abs() > INCIRCLE_BOUND * permanent {
        return det;
    }

    adaptive_incircle(adx, ady, bdx, bdy, cdx, cdy)
}

/// Higher precision incircle determinant using error-free minors
fn adaptive_incircle(adx: f64, ady: f64, bdx: f64, bdy: f64, cdx: f64, cdy: f64) -> f64 {
    let bc = two_product_difference(bdx, cdy, cdx, bdy);
    let ca = two_product_difference(cdx, ady, adx, cdy);
    let ab = two_product_difference(adx, bdy, bdx, ady);

    let alift = adx.mul_add(adx, ady * ady);
    let blift = bdx.mul_add(bdx, bdy * bdy);
    let clift = cdx.mul_add(cdx, cdy * cdy);

    kahan_sum(&[alift * bc, blift * ca, clift * ab])
}

/// (a * b) - (c * d) with the rounding error of both products recovered
fn two_product_difference(a: f64, b: f64, c: f64, d: f64) -> f64 {
    let ab = a * b;
    let ab_err = a.mul_add(b, -ab);
    let cd = c * d;
    let cd_err = c.mul_add(d, -cd);
    (ab - cd) + (ab_err - cd_err)
}

/// Compensated summation, largest magnitude first
fn kahan_sum(terms: &[f64]) -> f64 {
    let mut sorted = terms.to_vec();
    sorted.sort_by(|a, b| b.abs().total_cmp(&a.abs()));

    let mut sum = 0.0;
    let mut c = 0.0;
    for &term in &sorted {
        let y = term - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }
    sum
}
