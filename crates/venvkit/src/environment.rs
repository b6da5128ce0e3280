//! Environment lifecycle: create, reuse, or overwrite the on-disk virtual
//! environment, and the pip-composed operations on top of it.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use wheel_filename::SupportedTags;

use crate::run::{invoke, resolve_program};
use crate::state::{scripts_dir, DerivedProperty, EnvironmentState};
use crate::{interpreter, Error, RunOptions, RunOutput};

/// The construction parameters of a [`VirtualEnv`], in a form that can be
/// rendered to text and parsed back to recreate an equivalent instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VenvSpec {
    /// Root directory of the environment, or `None` for a temporary one
    /// rooted in a fresh scratch directory.
    pub root: Option<PathBuf>,
    /// Delete any existing environment at the root before creating.
    pub overwrite: bool,
    /// Pass `--system-site-packages` to the creation command.
    pub system_site_packages: bool,
}

impl VenvSpec {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    pub fn temporary() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn system_site_packages(mut self, system_site_packages: bool) -> Self {
        self.system_site_packages = system_site_packages;
        self
    }
}

impl Display for VenvSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.root {
            Some(root) => write!(f, "{}", root.display())?,
            None => f.write_str("temporary")?,
        }
        if self.overwrite {
            f.write_str(" --overwrite")?;
        }
        if self.system_site_packages {
            f.write_str(" --system-site-packages")?;
        }
        Ok(())
    }
}

impl FromStr for VenvSpec {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        // The flags are stripped off the tail so that a root path may
        // itself contain whitespace.
        let mut rest = spec.trim();
        let mut parsed = Self::default();
        loop {
            if let Some(head) = rest.strip_suffix(" --overwrite") {
                parsed.overwrite = true;
                rest = head;
            } else if let Some(head) = rest.strip_suffix(" --system-site-packages") {
                parsed.system_site_packages = true;
                rest = head;
            } else {
                break;
            }
        }
        if rest.is_empty() || rest.contains(" --") {
            return Err(Error::InvalidSpec(spec.to_string()));
        }
        if rest != "temporary" {
            parsed.root = Some(PathBuf::from(rest));
        }
        Ok(parsed)
    }
}

/// One virtual environment on disk.
///
/// Construction creates the environment if it is missing (or unconditionally
/// when overwrite was requested); an existing environment is otherwise
/// reused without re-running creation or the pip bootstrap.
#[derive(Debug)]
pub struct VirtualEnv {
    root: PathBuf,
    spec: VenvSpec,
    /// Owns the scratch directory of a temporary environment; removing it
    /// (best-effort, errors ignored) happens when the instance is dropped.
    temp_dir: Option<TempDir>,
    state: EnvironmentState,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InstallOptions {
    pub upgrade: bool,
    pub no_index: bool,
    pub no_deps: bool,
}

/// Which listing of installed packages to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// `pip freeze`: pinned requirement lines.
    Freeze,
    /// `pip list --format <format>`.
    List(PipListFormat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipListFormat {
    Columns,
    Json,
}

impl PipListFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Columns => "columns",
            Self::Json => "json",
        }
    }
}

/// What to do with an error raised inside [`VirtualEnv::scoped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnScopeError {
    Propagate,
    /// Log the error and discard it; the scope returns `Ok(None)`.
    LogAndSuppress,
}

#[derive(Debug, Deserialize)]
struct InstalledPackage {
    name: String,
    version: String,
}

impl VirtualEnv {
    /// Create, overwrite, or reuse the environment described by `spec`.
    pub fn new(spec: VenvSpec) -> Result<Self, Error> {
        let (root, temp_dir) = match &spec.root {
            Some(root) => (std::path::absolute(root)?, None),
            None => {
                let scratch = tempfile::tempdir()?;
                (scratch.path().join("venv"), Some(scratch))
            }
        };
        let venv = Self {
            root,
            spec,
            temp_dir,
            state: EnvironmentState::default(),
        };

        if venv.root.exists() {
            if !venv.spec.overwrite {
                debug!(
                    "Reusing existing virtual environment at {}",
                    venv.root.display()
                );
                return Ok(venv);
            }
            let base_python = interpreter::find_base_python()?;
            ensure_not_interpreter_prefix(&venv.root, &base_python)?;
            debug!(
                "Removing existing virtual environment at {}",
                venv.root.display()
            );
            fs_err::remove_dir_all(&venv.root)?;
        }
        venv.create()?;
        Ok(venv)
    }

    /// Run the creation command with the base interpreter, then bootstrap
    /// pip itself through the gateway.
    fn create(&self) -> Result<(), Error> {
        let base_python = interpreter::find_base_python()?;
        info!("Creating virtual environment at {}", self.root.display());
        let mut arguments = vec![
            OsString::from("-m"),
            OsString::from("venv"),
            self.root.clone().into_os_string(),
        ];
        if self.spec.system_site_packages {
            arguments.push(OsString::from("--system-site-packages"));
        }
        invoke(&base_python, &arguments, RunOptions::capture())?;
        self.python(["-m", "pip", "install", "--upgrade", "pip"], RunOptions::default())?;
        Ok(())
    }

    /// The root directory of the environment.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the environment lives in a scratch directory that is removed
    /// when this instance is dropped.
    pub fn is_temporary(&self) -> bool {
        self.temp_dir.is_some()
    }

    /// The construction parameters, rendering to a reconstructable
    /// description of this environment.
    pub fn spec(&self) -> &VenvSpec {
        &self.spec
    }

    /// The scripts directory (`bin`, or `Scripts` on Windows). Computed on
    /// first access and cached for the life of the instance.
    pub fn scripts(&self) -> &Path {
        self.state.scripts.get_or_compute(|| scripts_dir(&self.root))
    }

    /// The environment's own Python executable.
    pub fn python_executable(&self) -> PathBuf {
        let python = if cfg!(windows) { "python.exe" } else { "python" };
        self.scripts().join(python)
    }

    /// Every tag triple the environment's interpreter can execute. Queried
    /// once per instance and cached.
    pub fn supported_tags(&self) -> Result<&SupportedTags, Error> {
        self.state
            .supported_tags
            .get_or_try_compute(|| interpreter::query_supported_tags(&self.python_executable()))
    }

    /// Look up a derived property by name, for callers holding only a
    /// textual name. Unknown names fail with [`Error::UnknownProperty`].
    pub fn property(&self, name: &str) -> Result<String, Error> {
        match DerivedProperty::from_str(name)? {
            DerivedProperty::ScriptDirectory => Ok(self.scripts().display().to_string()),
            DerivedProperty::SupportedTags => {
                let mut tags: Vec<&str> = self.supported_tags()?.iter().collect();
                tags.sort_unstable();
                Ok(tags.join("\n"))
            }
        }
    }

    /// Run a program from the environment's scripts directory.
    pub fn run<S: AsRef<OsStr>>(
        &self,
        program: &str,
        arguments: impl IntoIterator<Item = S>,
        options: RunOptions,
    ) -> Result<RunOutput, Error> {
        let program_path = resolve_program(self.scripts(), program)?;
        let arguments: Vec<OsString> = arguments
            .into_iter()
            .map(|argument| argument.as_ref().to_os_string())
            .collect();
        invoke(&program_path, &arguments, options)
    }

    /// Run the environment's Python with the given arguments.
    pub fn python<S: AsRef<OsStr>>(
        &self,
        arguments: impl IntoIterator<Item = S>,
        options: RunOptions,
    ) -> Result<RunOutput, Error> {
        self.run("python", arguments, options)
    }

    /// `pip install` the given package specifiers.
    pub fn install<S: AsRef<OsStr>>(
        &self,
        packages: impl IntoIterator<Item = S>,
        options: InstallOptions,
    ) -> Result<RunOutput, Error> {
        let mut arguments = vec![OsString::from("install")];
        if options.upgrade {
            arguments.push(OsString::from("--upgrade"));
        }
        if options.no_index {
            arguments.push(OsString::from("--no-index"));
        }
        if options.no_deps {
            arguments.push(OsString::from("--no-deps"));
        }
        arguments.extend(
            packages
                .into_iter()
                .map(|package| package.as_ref().to_os_string()),
        );
        self.run("pip", arguments, RunOptions::default())
    }

    /// `pip download` the given package specifiers into `dest`.
    pub fn download<S: AsRef<OsStr>>(
        &self,
        packages: impl IntoIterator<Item = S>,
        dest: impl AsRef<Path>,
        no_deps: bool,
    ) -> Result<RunOutput, Error> {
        let mut arguments = vec![
            OsString::from("download"),
            OsString::from("--dest"),
            dest.as_ref().as_os_str().to_os_string(),
        ];
        if no_deps {
            arguments.push(OsString::from("--no-deps"));
        }
        arguments.extend(
            packages
                .into_iter()
                .map(|package| package.as_ref().to_os_string()),
        );
        self.run("pip", arguments, RunOptions::default())
    }

    /// The installed-package listing, as captured text.
    pub fn freeze(&self, format: ListFormat) -> Result<String, Error> {
        let result = match format {
            ListFormat::Freeze => self.run("pip", ["freeze"], RunOptions::capture())?,
            ListFormat::List(format) => self.run(
                "pip",
                ["list", "--format", format.as_str()],
                RunOptions::capture(),
            )?,
        };
        Ok(result.output.unwrap_or_default())
    }

    /// The installed packages as a name-to-version mapping.
    ///
    /// Always runs a fresh `pip list`; unlike the derived properties, the
    /// result is not cached.
    pub fn modules(&self) -> Result<BTreeMap<String, String>, Error> {
        parse_pip_list(&self.freeze(ListFormat::List(PipListFormat::Json))?)
    }

    /// Run caller logic against this environment with an explicit choice of
    /// what happens to errors raised inside the scope.
    pub fn scoped<T>(
        &self,
        on_error: OnScopeError,
        scope: impl FnOnce(&Self) -> Result<T, Error>,
    ) -> Result<Option<T>, Error> {
        match scope(self) {
            Ok(value) => Ok(Some(value)),
            Err(err) => match on_error {
                OnScopeError::Propagate => Err(err),
                OnScopeError::LogAndSuppress => {
                    warn!("Ignoring error in environment scope: {err}");
                    Ok(None)
                }
            },
        }
    }
}

impl Display for VirtualEnv {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root.display())
    }
}

/// Refuse to delete `root` if the interpreter we would use to recreate it
/// lives inside it.
fn ensure_not_interpreter_prefix(root: &Path, interpreter: &Path) -> Result<(), Error> {
    if interpreter.starts_with(root) {
        return Err(Error::SelfDelete(root.to_path_buf()));
    }
    Ok(())
}

fn parse_pip_list(listing: &str) -> Result<BTreeMap<String, String>, Error> {
    let packages: Vec<InstalledPackage> =
        serde_json::from_str(listing).map_err(Error::PipList)?;
    Ok(packages
        .into_iter()
        .map(|package| (package.name, package.version))
        .collect())
}
