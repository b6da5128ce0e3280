//! Manage local Python virtual environments over subprocess: create or
//! reuse an environment on disk, install the dependencies a `pyproject.toml`
//! declares, run entry points inside it, and check whether a wheel is
//! usable on the current platform.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

pub use environment::{InstallOptions, ListFormat, OnScopeError, PipListFormat, VenvSpec, VirtualEnv};
pub use manifest::{BuildSystem, Project, PyProjectToml};
pub use run::{OutputMode, RunOptions, RunOutput};
pub use state::DerivedProperty;
pub use sync::sync_project;

mod environment;
mod interpreter;
mod manifest;
mod run;
mod state;
mod sync;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The requested program is not installed in the environment's scripts
    /// directory. Raised before anything is spawned.
    #[error("Unsupported program: {}", _0.display())]
    UnsupportedProgram(PathBuf),
    /// A spawned program exited with a non-zero status.
    #[error("`{}` failed ({status}){}", program.display(), output.as_deref().map(|output| format!("\n{output}")).unwrap_or_default())]
    CommandFailed {
        program: PathBuf,
        status: ExitStatus,
        output: Option<String>,
    },
    /// Overwriting this environment would delete the interpreter the
    /// environment operations themselves run on.
    #[error("Refusing to remove `{}`: it contains the running base interpreter", _0.display())]
    SelfDelete(PathBuf),
    #[error("Failed to find a base Python interpreter")]
    NoInterpreter(#[source] which::Error),
    #[error("Querying tags from the interpreter at `{}` returned unexpected data", interpreter.display())]
    TagQuery {
        interpreter: PathBuf,
        #[source]
        err: serde_json::Error,
    },
    #[error("Missing `{}` file", _0.display())]
    MissingManifest(PathBuf),
    #[error("Invalid `pyproject.toml`")]
    Manifest(#[from] toml::de::Error),
    #[error("`pip list` returned unexpected data")]
    PipList(#[source] serde_json::Error),
    /// A derived-property lookup by name that is not part of the
    /// environment's recognized set.
    #[error("No such derived property: {0}")]
    UnknownProperty(String),
    #[error("Invalid environment spec: {0}")]
    InvalidSpec(String),
    /// The name could not be parsed as a wheel filename, so there is no
    /// compatibility to evaluate.
    #[error("Cannot evaluate compatibility of an unparsed name")]
    InvalidWheel(#[from] wheel_filename::WheelFilenameError),
}
