//! Reads the dependency-bearing fields of a project's `pyproject.toml`:
//! `build-system.requires`, `project.dependencies`, and
//! `project.optional-dependencies`. Specifiers are passed to pip verbatim.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::Error;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PyProjectToml {
    pub build_system: Option<BuildSystem>,
    pub project: Option<Project>,
}

/// PEP 518 `[build-system]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildSystem {
    pub requires: Option<Vec<String>>,
    pub build_backend: Option<String>,
}

/// The PEP 621 `[project]` fields we consume.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Project {
    pub name: Option<String>,
    pub dependencies: Option<Vec<String>>,
    pub optional_dependencies: Option<BTreeMap<String, Vec<String>>>,
}

impl PyProjectToml {
    /// Read the manifest at `path`.
    ///
    /// A missing file is a precondition error ([`Error::MissingManifest`]),
    /// raised before any environment work happens.
    pub fn read(path: &Path) -> Result<Self, Error> {
        if !path.is_file() {
            return Err(Error::MissingManifest(path.to_path_buf()));
        }
        fs_err::read_to_string(path)?.parse()
    }
}

impl FromStr for PyProjectToml {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(raw)?)
    }
}
