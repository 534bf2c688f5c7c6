// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Model preview rendering
//!
//! Renders surfaces, curves and mesh edges to a PNG, then waits for the user

use crate::geometry::{Dim, Entity, Model};
use crate::mesh::Mesh;
use anyhow::{bail, Context, Result};
use image::{Rgb, RgbImage};
use nalgebra::{Point2, Vector2};
use std::io::BufRead;
use std::path::Path;

const DEFAULT_WIDTH: u32 = 1024;
const DEFAULT_HEIGHT: u32 = 768;
const BACKGROUND: Rgb<u8> = Rgb([15, 18, 26]);
const UNGROUPED: Rgb<u8> = Rgb([90, 96, 110]);
const MESH_EDGE: Rgb<u8> = Rgb([25, 28, 36]);
const CURVE: Rgb<u8> = Rgb([230, 230, 230]);

const PALETTE: [Rgb<u8>; 6] = [
    Rgb([86, 156, 214]),
    Rgb([220, 160, 80]),
    Rgb([120, 190, 120]),
    Rgb([200, 110, 160]),
    Rgb([170, 150, 220]),
    Rgb([210, 200, 110]),
];

/// Maps model coordinates to pixel centers
struct Viewport {
    min: Point2<f64>,
    max_y: f64,
    scale: f64,
    offset: Vector2<f64>,
}

impl Viewport {
    fn fit(model: &Model) -> Self {
        let bbox = model.model_bounding_box();
        let span_x = (bbox.max.x - bbox.min.x).max(1e-3);
        let span_y = (bbox.max.y - bbox.min.y).max(1e-3);
        let scale = 0.9 * (DEFAULT_WIDTH as f64 / span_x).min(DEFAULT_HEIGHT as f64 / span_y);
        Self {
            min: Point2::new(bbox.min.x, bbox.min.y),
            max_y: bbox.max.y,
            scale,
            offset: Vector2::new(
                (DEFAULT_WIDTH as f64 - span_x * scale) * 0.5,
                (DEFAULT_HEIGHT as f64 - span_y * scale) * 0.5,
            ),
        }
    }

    fn project(&self, p: &Point2<f64>) -> Point2<f64> {
        Point2::new(
            (p.x - self.min.x) * self.scale + self.offset.x,
            (self.max_y - p.y) * self.scale + self.offset.y,
        )
    }
}

fn group_color(model: &Model, entity: Entity) -> Option<Rgb<u8>> {
    model
        .physical_tags_of(entity)
        .first()
        .map(|&tag| PALETTE[(tag as usize).saturating_sub(1) % PALETTE.len()])
}

fn fill_rect(image: &mut RgbImage, a: Point2<f64>, b: Point2<f64>, color: Rgb<u8>) {
    let x0 = a.x.min(b.x).round().max(0.0) as u32;
    let x1 = (a.x.max(b.x).round() as u32).min(image.width());
    let y0 = a.y.min(b.y).round().max(0.0) as u32;
    let y1 = (a.y.max(b.y).round() as u32).min(image.height());
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, color);
        }
    }
}

fn draw_line(image: &mut RgbImage, a: Point2<f64>, b: Point2<f64>, color: Rgb<u8>) {
    let steps = (b - a).abs().max().ceil().max(1.0) as usize;
    for k in 0..=steps {
        let p = a + (b - a) * (k as f64 / steps as f64);
        let (x, y) = (p.x.round(), p.y.round());
        if x >= 0.0 && y >= 0.0 && (x as u32) < image.width() && (y as u32) < image.height() {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Render the model, and the mesh when present, to an image
pub fn render(model: &Model, mesh: Option<&Mesh>) -> Result<RgbImage> {
    if model.entities(Dim::Surface).is_empty() {
        bail!("model {} has no surfaces to render", model.name());
    }
    let view = Viewport::fit(model);
    let mut image = RgbImage::from_pixel(DEFAULT_WIDTH, DEFAULT_HEIGHT, BACKGROUND);

    for surface in model.surfaces() {
        let color = group_color(model, Entity::surface(surface.tag)).unwrap_or(UNGROUPED);
        for cell in &surface.cells {
            fill_rect(&mut image, view.project(&cell.min), view.project(&cell.max), color);
        }
    }

    if let Some(mesh) = mesh {
        for triangle in mesh.triangles() {
            for k in 0..3 {
                let (a, b) = (triangle[k], triangle[(k + 1) % 3]);
                draw_line(&mut image, view.project(&a), view.project(&b), MESH_EDGE);
            }
        }
    }

    for curve in model.curves() {
        let (a, b) = model.curve_endpoints(curve.tag)?;
        let color = group_color(model, Entity::curve(curve.tag)).unwrap_or(CURVE);
        draw_line(&mut image, view.project(&a), view.project(&b), color);
    }

    Ok(image)
}

/// Render a preview PNG
pub fn render_to_png(model: &Model, mesh: Option<&Mesh>, output_png: &Path) -> Result<()> {
    render(model, mesh)?
        .save(output_png)
        .with_context(|| format!("Failed to save PNG to {}", output_png.display()))
}

/// Block until a line (or end of input) is read
pub fn wait_for_user<R: BufRead>(mut input: R) -> Result<()> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read from standard input")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_preview() {
        let mut model = Model::new("preview");
        model.add_rectangle(0.0, 0.0, 0.0, 1.0, 4.0).unwrap();
        model.add_physical_group(Dim::Surface, &[1], Some("Post")).unwrap();

        let temp_dir = TempDir::new().unwrap();
        let png = temp_dir.path().join("fin.png");
        render_to_png(&model, None, &png).unwrap();

        let image = image::open(&png).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
        // The surface fills the middle, the corners stay background
        assert_eq!(*image.get_pixel(DEFAULT_WIDTH / 2, DEFAULT_HEIGHT / 2), PALETTE[0]);
        assert_eq!(*image.get_pixel(0, 0), BACKGROUND);
    }

    #[test]
    fn test_empty_model_is_rejected() {
        assert!(render(&Model::new("empty"), None).is_err());
    }

    #[test]
    fn test_wait_for_user_returns_on_newline() {
        wait_for_user("\n".as_bytes()).unwrap();
        wait_for_user("".as_bytes()).unwrap();
    }
}
