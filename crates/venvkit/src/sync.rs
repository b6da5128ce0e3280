//! Deploy a project-local environment from its manifest.

use std::path::Path;

use tracing::info;

use crate::manifest::PyProjectToml;
use crate::{Error, InstallOptions, VenvSpec, VirtualEnv};

/// Create a fresh `venv/` under `directory` and populate it with the
/// dependencies its `pyproject.toml` declares: build requirements first,
/// then the runtime dependencies, then every optional group.
///
/// The manifest is read before any environment work, so a missing file
/// fails without touching the filesystem.
pub fn sync_project(
    directory: &Path,
    system_site_packages: bool,
) -> Result<(VirtualEnv, PyProjectToml), Error> {
    let manifest = PyProjectToml::read(&directory.join("pyproject.toml"))?;

    let venv = VirtualEnv::new(
        VenvSpec::at(directory.join("venv"))
            .overwrite(true)
            .system_site_packages(system_site_packages),
    )?;

    if let Some(requires) = manifest
        .build_system
        .as_ref()
        .and_then(|build_system| build_system.requires.as_deref())
    {
        info!("Installing build requirements");
        venv.install(requires, InstallOptions::default())?;
    }

    if let Some(dependencies) = manifest
        .project
        .as_ref()
        .and_then(|project| project.dependencies.as_deref())
    {
        info!("Installing dependencies");
        venv.install(dependencies, InstallOptions::default())?;
    }

    if let Some(groups) = manifest
        .project
        .as_ref()
        .and_then(|project| project.optional_dependencies.as_ref())
    {
        for (group, packages) in groups {
            info!("Installing optional dependencies: {group}");
            venv.install(packages, InstallOptions::default())?;
        }
    }

    Ok((venv, manifest))
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::sync_project;

    #[test]
    fn missing_manifest_fails_before_any_environment_work() {
        let project = tempfile::tempdir().unwrap();
        let err = sync_project(project.path(), false).unwrap_err();
        assert!(matches!(err, Error::MissingManifest(_)));
        // In particular, no venv directory was created.
        assert!(!project.path().join("venv").exists());
    }
}
