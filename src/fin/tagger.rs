// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Physical group tagging for the fin regions
//!
//! Surface regions come from the fragment relation table: the post is
//! every descendant of the post rectangle, and fin `k` is every descendant
//! of fin rectangle `k` that is not part of the post.

use super::builder::FinGeometry;
use super::params::FinParams;
use crate::error::TaggingError;
use crate::geometry::{BoundingBox, Dim, Entity, Tag};
use crate::kernel::Kernel;
use nalgebra::Point3;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Half-width of the box used to find the root curve
pub const ROOT_SEARCH_EPS: f64 = 1e-3;

pub const POST: &str = "Post";
pub const GAMMA_ROOT: &str = "Gamma_root";
pub const GAMMA_EXT: &str = "Gamma_ext";

pub fn fin_name(k: usize) -> String {
    format!("Fin_{k}")
}

/// A physical group created for one region
#[derive(Debug, Clone, Serialize)]
pub struct RegionGroup {
    pub name: String,
    pub dim: Dim,
    pub tag: Tag,
    pub members: Vec<Tag>,
}

/// Every group created by the tagger
#[derive(Debug, Clone, Serialize)]
pub struct FinRegions {
    pub post: RegionGroup,
    pub fins: Vec<RegionGroup>,
    pub gamma_root: RegionGroup,
    pub gamma_ext: RegionGroup,
}

impl FinRegions {
    /// Groups in creation order
    pub fn groups(&self) -> impl Iterator<Item = &RegionGroup> {
        std::iter::once(&self.post)
            .chain(&self.fins)
            .chain([&self.gamma_root, &self.gamma_ext])
    }

    pub fn group(&self, name: &str) -> Option<&RegionGroup> {
        self.groups().find(|g| g.name == name)
    }

    /// Tag of the root curve
    pub fn root_curve(&self) -> Tag {
        self.gamma_root.members[0]
    }
}

fn descendants(geometry: &FinGeometry, parent: Tag) -> Result<Vec<Tag>, TaggingError> {
    match &geometry.fragments {
        None => Ok(vec![parent]),
        Some(result) => result
            .children_of(Entity::surface(parent))
            .map(|children| children.iter().map(|e| e.tag).collect())
            .ok_or(TaggingError::MissingRelation(parent)),
    }
}

/// Box around the bottom edge of the post
pub fn root_search_box(params: &FinParams) -> BoundingBox {
    let [x0, y0, z0] = params.origin;
    BoundingBox::new(Point3::new(x0, y0, z0), Point3::new(x0 + params.post_width, y0, z0)).inflate(ROOT_SEARCH_EPS)
}

/// `exterior` plus `root` must cover `boundary` exactly once
fn check_partition(boundary: &[Tag], root: Tag, exterior: &[Tag]) -> Result<(), TaggingError> {
    let outer: BTreeSet<Tag> = boundary.iter().copied().collect();
    if !outer.contains(&root) {
        return Err(TaggingError::BoundaryPartition(format!(
            "root curve {root} is not on the outer boundary"
        )));
    }
    if exterior.contains(&root) {
        return Err(TaggingError::BoundaryPartition(format!(
            "root curve {root} is also listed as exterior"
        )));
    }

    let mut tagged: BTreeSet<Tag> = BTreeSet::from([root]);
    for &tag in exterior {
        if !tagged.insert(tag) {
            return Err(TaggingError::BoundaryPartition(format!("curve {tag} is tagged twice")));
        }
    }
    if tagged != outer {
        let missing: Vec<Tag> = outer.difference(&tagged).copied().collect();
        let extra: Vec<Tag> = tagged.difference(&outer).copied().collect();
        return Err(TaggingError::BoundaryPartition(format!(
            "untagged boundary curves {missing:?}, tagged interior curves {extra:?}"
        )));
    }
    Ok(())
}

/// Surface regions with their members, checked non-empty and pairwise disjoint
fn surface_regions(geometry: &FinGeometry) -> Result<Vec<(String, Vec<Tag>)>, TaggingError> {
    let post = descendants(geometry, geometry.root)?;
    let post_set: BTreeSet<Tag> = post.iter().copied().collect();

    let mut regions = vec![(POST.to_string(), post)];
    for (k, &fin) in geometry.fins.iter().enumerate() {
        let members: Vec<Tag> = descendants(geometry, fin)?
            .into_iter()
            .filter(|t| !post_set.contains(t))
            .collect();
        regions.push((fin_name(k + 1), members));
    }

    let mut owner: Vec<(Tag, usize)> = Vec::new();
    for (index, (name, members)) in regions.iter().enumerate() {
        if members.is_empty() {
            return Err(TaggingError::EmptyRegion(name.clone()));
        }
        for &tag in members {
            if let Some(&(_, first)) = owner.iter().find(|(t, _)| *t == tag) {
                return Err(TaggingError::OverlappingRegions {
                    tag,
                    first: regions[first].0.clone(),
                    second: name.clone(),
                });
            }
            owner.push((tag, index));
        }
    }
    Ok(regions)
}

/// Create the `Post`, `Fin_<k>`, `Gamma_root` and `Gamma_ext` groups
pub fn tag_regions(kernel: &mut Kernel, geometry: &FinGeometry, params: &FinParams) -> Result<FinRegions, TaggingError> {
    let regions = surface_regions(geometry)?;

    let search = root_search_box(params);
    let root = kernel
        .entities_in_bounding_box(&search, Dim::Curve)?
        .first()
        .map(|e| e.tag)
        .ok_or(TaggingError::RootCurveNotFound {
            xmin: search.min.x,
            xmax: search.max.x,
            ymin: search.min.y,
            ymax: search.max.y,
        })?;

    let surfaces = kernel.entities(Dim::Surface)?;
    let boundary: Vec<Tag> = kernel.boundary(&surfaces, true)?.iter().map(|e| e.tag).collect();
    let exterior: Vec<Tag> = boundary.iter().copied().filter(|&t| t != root).collect();

    check_partition(&boundary, root, &exterior)?;
    if exterior.is_empty() {
        return Err(TaggingError::EmptyRegion(GAMMA_EXT.to_string()));
    }
    debug!(root, exterior = exterior.len(), "classified boundary curves");

    let mut create = |name: &str, dim: Dim, members: Vec<Tag>| -> Result<RegionGroup, TaggingError> {
        let tag = kernel.add_physical_group(dim, &members, Some(name))?;
        Ok(RegionGroup {
            name: name.to_string(),
            dim,
            tag,
            members,
        })
    };

    let mut surface_groups = regions
        .into_iter()
        .map(|(name, members)| create(&name, Dim::Surface, members))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();
    let post = surface_groups.next().ok_or_else(|| TaggingError::EmptyRegion(POST.to_string()))?;
    let fins: Vec<RegionGroup> = surface_groups.collect();
    let gamma_root = create(GAMMA_ROOT, Dim::Curve, vec![root])?;
    let gamma_ext = create(GAMMA_EXT, Dim::Curve, exterior)?;

    info!(
        post = post.members.len(),
        fins = fins.len(),
        exterior = gamma_ext.members.len(),
        "tagged fin regions"
    );
    Ok(FinRegions {
        post,
        fins,
        gamma_root,
        gamma_ext,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(n_fins: usize, fragment: bool) -> (Kernel, FinRegions) {
        let mut kernel = Kernel::acquire();
        kernel.add_model("fin");
        let params = FinParams {
            n_fins,
            ..FinParams::default()
        };
        let mut geometry = FinGeometry::build(&mut kernel, &params).unwrap();
        if fragment {
            geometry.fragment(&mut kernel).unwrap();
        }
        let regions = tag_regions(&mut kernel, &geometry, &params).unwrap();
        (kernel, regions)
    }

    #[test]
    fn test_fragmented_regions() {
        let (kernel, regions) = tagged(1, true);
        // Post: free span and crossing; fin: left and right parts
        assert_eq!(regions.post.members.len(), 2);
        assert_eq!(regions.fins[0].members.len(), 2);
        assert_eq!(regions.gamma_root.members.len(), 1);

        let groups: Vec<&str> = regions.groups().map(|g| g.name.as_str()).collect();
        assert_eq!(groups, vec!["Post", "Fin_1", "Gamma_root", "Gamma_ext"]);
        let tags: Vec<Tag> = regions.groups().map(|g| g.tag).collect();
        assert_eq!(tags, vec![1, 2, 3, 4]);
        assert_eq!(kernel.physical_groups().unwrap().len(), 4);

        let (a, b) = kernel
            .model()
            .unwrap()
            .curve_endpoints(regions.root_curve())
            .unwrap();
        assert_eq!((a.y, b.y), (0.0, 0.0));
    }

    #[test]
    fn test_unfragmented_regions() {
        let (_kernel, regions) = tagged(2, false);
        assert_eq!(regions.post.members, vec![1]);
        assert_eq!(regions.fins[1].members, vec![3]);
        // Three rectangles with four curves each, minus the root curve
        assert_eq!(regions.gamma_ext.members.len(), 11);
        assert!(!regions.gamma_ext.members.contains(&regions.root_curve()));
    }

    #[test]
    fn test_missing_root_curve() {
        let mut kernel = Kernel::acquire();
        kernel.add_model("fin");
        let params = FinParams {
            origin: [0.0, 0.0, 0.0],
            ..FinParams::default()
        };
        let geometry = FinGeometry::build(&mut kernel, &params).unwrap();
        let shifted = FinParams {
            origin: [10.0, 10.0, 0.0],
            ..params
        };
        assert!(matches!(
            tag_regions(&mut kernel, &geometry, &shifted),
            Err(TaggingError::RootCurveNotFound { .. })
        ));
    }

    #[test]
    fn test_boundary_partition_check() {
        let boundary = [3, 5, 8, 9];
        assert!(check_partition(&boundary, 5, &[3, 8, 9]).is_ok());

        // Root off the boundary, root listed twice, missing curve, duplicate and interior curve
        for (root, exterior) in [
            (4, vec![3, 5, 8, 9]),
            (5, vec![3, 5, 8, 9]),
            (5, vec![3, 8]),
            (5, vec![3, 8, 8, 9]),
            (5, vec![3, 8, 9, 12]),
        ] {
            assert!(
                matches!(
                    check_partition(&boundary, root, &exterior),
                    Err(TaggingError::BoundaryPartition(_))
                ),
                "root {root}, exterior {exterior:?}"
            );
        }
    }

    #[test]
    fn test_overlapping_regions_rejected() {
        let mut kernel = Kernel::acquire();
        kernel.add_model("fin");
        let params = FinParams::default();
        let mut geometry = FinGeometry::build(&mut kernel, &params).unwrap();
        geometry.fragment(&mut kernel).unwrap();

        // List the same fin twice
        let first = geometry.fins[0];
        geometry.fins.push(first);
        assert!(matches!(
            tag_regions(&mut kernel, &geometry, &params),
            Err(TaggingError::OverlappingRegions { .. })
        ));
    }
}
