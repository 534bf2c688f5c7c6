// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 2D meshing algorithm selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 2D meshing algorithm, with the numeric codes used by MSH tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeshAlgorithm {
    MeshAdapt,
    Automatic,
    Initial,
    Delaunay,
    #[default]
    FrontalDelaunay,
    Bamg,
}

impl MeshAlgorithm {
    pub const ALL: [MeshAlgorithm; 6] = [
        Self::MeshAdapt,
        Self::Automatic,
        Self::Initial,
        Self::Delaunay,
        Self::FrontalDelaunay,
        Self::Bamg,
    ];

    pub fn code(self) -> u8 {
        match self {
            Self::MeshAdapt => 1,
            Self::Automatic => 2,
            Self::Initial => 3,
            Self::Delaunay => 5,
            Self::FrontalDelaunay => 6,
            Self::Bamg => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MeshAdapt => "mesh-adapt",
            Self::Automatic => "automatic",
            Self::Initial => "initial",
            Self::Delaunay => "delaunay",
            Self::FrontalDelaunay => "frontal-delaunay",
            Self::Bamg => "bamg",
        }
    }
}

impl fmt::Display for MeshAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for MeshAlgorithm {
    type Err = String;

    /// Accepts a name (case and separator insensitive) or a numeric code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| format!("unknown algorithm code {code}"));
        }
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|a| a.name().replace('-', "") == key)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|a| a.name()).collect();
                format!("unknown algorithm '{s}' (expected one of {})", names.join(", "))
            })
    }
}
