// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! MSH 4.1 ASCII exporter

use crate::error::{KernelError, KernelResult};
use crate::geometry::{Dim, Entity, Model};
use crate::mesh::{EntityMesh, Mesh};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Export mesh to an MSH 4.1 file.
/// The file is written next to `path` and renamed into place once complete.
pub fn export(model: &Model, mesh: &Mesh, save_all: bool, path: &Path) -> KernelResult<()> {
    let io_error = |source| KernelError::IoWrite {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir).map_err(io_error)?;
    let mut writer = BufWriter::new(staged);
    write_msh(model, mesh, save_all, &mut writer).map_err(io_error)?;
    let staged = writer.into_inner().map_err(|e| io_error(e.into_error()))?;
    staged.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}

/// Serialize `mesh` with the topology and physical groups of `model`.
///
/// Without `save_all`, elements are written only for entities that belong
/// to a physical group (all of them when the model has no groups). Every
/// node is written.
pub fn write_msh<W: Write>(model: &Model, mesh: &Mesh, save_all: bool, out: &mut W) -> std::io::Result<()> {
    let z = model.elevation();

    writeln!(out, "$MeshFormat")?;
    writeln!(out, "4.1 0 8")?;
    writeln!(out, "$EndMeshFormat")?;

    let named: Vec<_> = model.physical_groups().iter().filter(|g| g.name.is_some()).collect();
    if !named.is_empty() {
        writeln!(out, "$PhysicalNames")?;
        writeln!(out, "{}", named.len())?;
        for group in named {
            let name = group.name.as_deref().unwrap_or_default();
            writeln!(out, "{} {} \"{}\"", group.dim.index(), group.tag, name)?;
        }
        writeln!(out, "$EndPhysicalNames")?;
    }

    write_entities(model, z, out)?;

    // Nodes
    let node_blocks: Vec<&EntityMesh> = mesh.blocks().iter().filter(|b| !b.nodes.is_empty()).collect();
    writeln!(out, "$Nodes")?;
    writeln!(
        out,
        "{} {} {} {}",
        node_blocks.len(),
        mesh.node_count(),
        if mesh.node_count() > 0 { 1 } else { 0 },
        mesh.node_count()
    )?;
    for block in node_blocks {
        writeln!(out, "{} {} 0 {}", block.entity.dim.index(), block.entity.tag, block.nodes.len())?;
        for tag in &block.nodes {
            writeln!(out, "{tag}")?;
        }
        for &tag in &block.nodes {
            if let Some(p) = mesh.node(tag) {
                writeln!(out, "{} {} {}", p.x, p.y, z)?;
            }
        }
    }
    writeln!(out, "$EndNodes")?;

    // Elements
    let filtered = !save_all && !model.physical_groups().is_empty();
    let element_blocks: Vec<&EntityMesh> = mesh
        .blocks()
        .iter()
        .filter(|b| !b.elements.is_empty())
        .filter(|b| !filtered || !model.physical_tags_of(b.entity).is_empty())
        .collect();
    let tags = element_blocks.iter().flat_map(|b| b.elements.iter().map(|e| e.tag));
    let (count, min_tag, max_tag) = tags.fold((0, usize::MAX, 0), |(n, lo, hi), t| (n + 1, lo.min(t), hi.max(t)));
    writeln!(out, "$Elements")?;
    writeln!(
        out,
        "{} {} {} {}",
        element_blocks.len(),
        count,
        if count > 0 { min_tag } else { 0 },
        max_tag
    )?;
    for block in element_blocks {
        // Blocks hold one element kind each
        let kind = block.elements[0].kind;
        writeln!(
            out,
            "{} {} {} {}",
            block.entity.dim.index(),
            block.entity.tag,
            kind.msh_code(),
            block.elements.len()
        )?;
        for element in &block.elements {
            write!(out, "{}", element.tag)?;
            for node in &element.nodes {
                write!(out, " {node}")?;
            }
            writeln!(out)?;
        }
    }
    writeln!(out, "$EndElements")?;
    Ok(())
}

fn physical_suffix(model: &Model, entity: Entity) -> String {
    let tags = model.physical_tags_of(entity);
    let mut text = tags.len().to_string();
    for tag in tags {
        text.push_str(&format!(" {tag}"));
    }
    text
}

fn write_entities<W: Write>(model: &Model, z: f64, out: &mut W) -> std::io::Result<()> {
    let count = |dim| model.entities(dim).len();
    writeln!(out, "$Entities")?;
    writeln!(out, "{} {} {} 0", count(Dim::Point), count(Dim::Curve), count(Dim::Surface))?;

    for point in model.points() {
        let p = point.position;
        let groups = physical_suffix(model, Entity::point(point.tag));
        writeln!(out, "{} {} {} {} {}", point.tag, p.x, p.y, z, groups)?;
    }

    for dim in [Dim::Curve, Dim::Surface] {
        for entity in model.entities(dim) {
            let (Ok(bbox), Ok(bounds)) = (model.bounding_box(entity), model.oriented_boundary(entity)) else {
                continue;
            };
            let groups = physical_suffix(model, entity);
            write!(
                out,
                "{} {} {} {} {} {} {} {} {}",
                entity.tag, bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z, groups, bounds.len()
            )?;
            for tag in bounds {
                write!(out, " {tag}")?;
            }
            writeln!(out)?;
        }
    }
    writeln!(out, "$EndEntities")?;
    Ok(())
}
