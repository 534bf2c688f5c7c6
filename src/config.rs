// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Run configuration

use crate::fin::FinParams;
use crate::mesh::MeshAlgorithm;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "finmesh.toml";

/// Meshing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Characteristic element size
    pub lc: f64,
    /// Default 2D algorithm
    pub algorithm: MeshAlgorithm,
    /// Algorithm override for the first post surface
    pub root_algorithm: Option<MeshAlgorithm>,
    /// Mesh output path
    pub output: PathBuf,
    /// Samples per curve in the distance field
    pub sampling: usize,
    /// Smallest size near the exterior boundary, relative to `lc`
    pub size_min_ratio: f64,
    /// Distance below which the smallest size applies, relative to fin thickness
    pub dist_min_ratio: f64,
    /// Distance above which `lc` applies, relative to fin thickness
    pub dist_max_ratio: f64,
    /// Write elements of entities outside physical groups too
    pub save_all: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            lc: 0.2,
            algorithm: MeshAlgorithm::FrontalDelaunay,
            root_algorithm: Some(MeshAlgorithm::MeshAdapt),
            output: PathBuf::from("fin.msh"),
            sampling: 100,
            size_min_ratio: 0.1,
            dist_min_ratio: 0.25,
            dist_max_ratio: 0.5,
            save_all: false,
        }
    }
}

/// Values given on the command line. `None` and `false` keep the file value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub lc: Option<f64>,
    pub output: Option<PathBuf>,
    pub algorithm: Option<MeshAlgorithm>,
    pub fragment: bool,
    pub generate_mesh: bool,
    pub view: bool,
}

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinConfig {
    /// Fragment the post against the fins
    pub fragment: bool,
    /// Generate and write the mesh
    pub generate_mesh: bool,
    /// Render a preview and wait for the user
    pub view: bool,
    pub geometry: FinParams,
    pub mesh: MeshConfig,
}

impl FinConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: FinConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `path`, or the default file when present, or the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Merge command line values over this configuration
    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(lc) = cli.lc {
            self.mesh.lc = lc;
        }
        if let Some(output) = &cli.output {
            self.mesh.output = output.clone();
        }
        if let Some(algorithm) = cli.algorithm {
            self.mesh.algorithm = algorithm;
        }
        self.fragment |= cli.fragment;
        self.generate_mesh |= cli.generate_mesh;
        self.view |= cli.view;
    }

    /// Preview image written next to the mesh output
    pub fn preview_path(&self) -> PathBuf {
        self.mesh.output.with_extension("png")
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Reject values no mesh can be built from
    pub fn validate(&self) -> Result<()> {
        let g = &self.geometry;
        let lengths = [
            ("fin_length", g.fin_length),
            ("thickness", g.thickness),
            ("spacing", g.spacing),
            ("post_width", g.post_width),
            ("lc", self.mesh.lc),
            ("size_min_ratio", self.mesh.size_min_ratio),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value <= 0.0 {
                bail!("{name} must be finite and positive, got {value}");
            }
        }
        if g.origin.iter().any(|v| !v.is_finite()) {
            bail!("origin must be finite, got {:?}", g.origin);
        }
        if self.mesh.dist_min_ratio < 0.0 || self.mesh.dist_max_ratio <= self.mesh.dist_min_ratio {
            bail!(
                "distance ratios must satisfy 0 <= dist_min_ratio < dist_max_ratio, got {} and {}",
                self.mesh.dist_min_ratio,
                self.mesh.dist_max_ratio
            );
        }
        if self.mesh.size_min_ratio > 1.0 {
            bail!("size_min_ratio must not exceed 1, got {}", self.mesh.size_min_ratio);
        }
        if self.mesh.sampling < 2 {
            bail!("sampling must be at least 2, got {}", self.mesh.sampling);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = FinConfig::default();
        assert_eq!(config.geometry.n_fins, 4);
        assert_eq!(config.mesh.lc, 0.2);
        assert_eq!(config.mesh.output, PathBuf::from("fin.msh"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: FinConfig = toml::from_str(
            r#"
            fragment = true

            [geometry]
            n_fins = 6

            [mesh]
            lc = 0.1
            algorithm = "delaunay"
            "#,
        )
        .unwrap();
        assert!(config.fragment);
        assert_eq!(config.geometry.n_fins, 6);
        assert_eq!(config.geometry.fin_length, 2.5);
        assert_eq!(config.mesh.algorithm, MeshAlgorithm::Delaunay);
        assert_eq!(config.mesh.sampling, 100);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fin.toml");
        let mut config = FinConfig::default();
        config.geometry.thickness = 0.5;
        config.mesh.root_algorithm = Some(MeshAlgorithm::Bamg);
        config.save(&path).unwrap();

        assert_eq!(FinConfig::from_file(&path).unwrap(), config);
        assert!(FinConfig::from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_load_reads_only_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fin.toml");
        std::fs::write(&path, "[mesh]\nlc = 0.3\n").unwrap();

        std::env::set_var("FINMESH_LC", "9.0");
        let config = FinConfig::load(Some(&path)).unwrap();
        std::env::remove_var("FINMESH_LC");

        assert_eq!(config.mesh.lc, 0.3);
        assert_eq!(config.mesh.output, PathBuf::from("fin.msh"));
        assert!(FinConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config = FinConfig {
            fragment: true,
            ..FinConfig::default()
        };
        config.apply_cli(&CliOverrides {
            lc: Some(0.05),
            output: Some(PathBuf::from("out/fin.msh")),
            generate_mesh: true,
            ..CliOverrides::default()
        });
        assert!(config.fragment);
        assert!(config.generate_mesh);
        assert!(!config.view);
        assert_eq!(config.mesh.lc, 0.05);
        assert_eq!(config.mesh.algorithm, MeshAlgorithm::FrontalDelaunay);
        assert_eq!(config.preview_path(), PathBuf::from("out/fin.png"));
    }

    #[test]
    fn test_validation() {
        let mut config = FinConfig::default();
        config.mesh.lc = -1.0;
        assert!(config.validate().is_err());

        let mut config = FinConfig::default();
        config.mesh.dist_max_ratio = 0.1;
        assert!(config.validate().is_err());
    }
}
