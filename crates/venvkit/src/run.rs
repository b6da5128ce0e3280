//! The single path through which programs inside an environment are
//! invoked: resolve the program in the scripts directory, spawn it, and
//! normalize output capture.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::Error;

/// Where an invoked program's output goes.
///
/// `Capture` and `Sink` merge stderr into stdout by handing both streams
/// the same underlying handle.
#[derive(Debug, Default)]
pub enum OutputMode {
    /// Inherit the caller's stdout and stderr; nothing is captured.
    #[default]
    Inherit,
    /// Capture the merged stream in memory and return it as text.
    Capture,
    /// Write the merged stream to the given file instead of capturing it.
    Sink(File),
}

#[derive(Debug, Default)]
pub struct RunOptions {
    /// Working directory for the invocation.
    pub cwd: Option<PathBuf>,
    /// If set, replaces (not merges with) the ambient process environment.
    pub env: Option<BTreeMap<String, String>>,
    pub output: OutputMode,
}

impl RunOptions {
    pub fn capture() -> Self {
        Self {
            output: OutputMode::Capture,
            ..Self::default()
        }
    }
}

/// The result of a completed invocation. The status is always zero, since
/// non-zero exits are surfaced as [`Error::CommandFailed`].
#[derive(Debug)]
pub struct RunOutput {
    pub status: ExitStatus,
    /// The merged output text, when [`OutputMode::Capture`] was requested.
    pub output: Option<String>,
}

/// Resolve `program` to its path inside the scripts directory, with the
/// native executable suffix on Windows.
///
/// Errors with [`Error::UnsupportedProgram`] if the resolved path does not
/// exist; nothing is spawned in that case.
pub(crate) fn resolve_program(scripts: &Path, program: &str) -> Result<PathBuf, Error> {
    let mut program_path = scripts.join(program);
    if cfg!(windows) {
        program_path.set_extension("exe");
    }
    if !program_path.exists() {
        return Err(Error::UnsupportedProgram(program_path));
    }
    Ok(program_path)
}

/// Spawn `program` with `arguments` and block until it exits.
///
/// A non-zero exit status is an error carrying the status and, when
/// captured, the merged output.
pub(crate) fn invoke(
    program: &Path,
    arguments: &[OsString],
    options: RunOptions,
) -> Result<RunOutput, Error> {
    let mut command = Command::new(program);
    command.args(arguments);
    if let Some(cwd) = &options.cwd {
        command.current_dir(cwd);
    }
    if let Some(env) = &options.env {
        command.env_clear();
        command.envs(env);
    }
    debug!("Running `{}` with {arguments:?}", program.display());

    match options.output {
        OutputMode::Inherit => {
            let status = command.status()?;
            check_status(program, status, None)?;
            Ok(RunOutput {
                status,
                output: None,
            })
        }
        OutputMode::Capture => {
            let mut merged = tempfile::tempfile()?;
            command.stdout(Stdio::from(merged.try_clone()?));
            command.stderr(Stdio::from(merged.try_clone()?));
            let status = command.status()?;
            merged.seek(SeekFrom::Start(0))?;
            let mut output = String::new();
            merged.read_to_string(&mut output)?;
            check_status(program, status, Some(&output))?;
            Ok(RunOutput {
                status,
                output: Some(output),
            })
        }
        OutputMode::Sink(sink) => {
            command.stdout(Stdio::from(sink.try_clone()?));
            command.stderr(Stdio::from(sink));
            let status = command.status()?;
            check_status(program, status, None)?;
            Ok(RunOutput {
                status,
                output: None,
            })
        }
    }
}

fn check_status(program: &Path, status: ExitStatus, output: Option<&str>) -> Result<(), Error> {
    if status.success() {
        Ok(())
    } else {
        Err(Error::CommandFailed {
            program: program.to_path_buf(),
            status,
            output: output.map(str::trim).map(ToString::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::Path;

    use crate::{Error, RunOptions};

    use super::{invoke, resolve_program};

    #[test]
    fn missing_program_is_a_precondition_error() {
        let scripts = tempfile::tempdir().unwrap();
        match resolve_program(scripts.path(), "no-such-program") {
            Err(Error::UnsupportedProgram(path)) => assert!(path.starts_with(scripts.path())),
            result => panic!("expected UnsupportedProgram, got {result:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn capture_merges_stderr_into_stdout() {
        let sh = which::which("sh").unwrap();
        let arguments = vec![
            OsString::from("-c"),
            OsString::from("echo out; echo err >&2"),
        ];
        let result = invoke(&sh, &arguments, RunOptions::capture()).unwrap();
        let output = result.output.unwrap();
        assert!(output.contains("out"), "{output}");
        assert!(output.contains("err"), "{output}");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_an_error() {
        let sh = which::which("sh").unwrap();
        let arguments = vec![OsString::from("-c"), OsString::from("echo boom; exit 3")];
        match invoke(&sh, &arguments, RunOptions::capture()) {
            Err(Error::CommandFailed { status, output, .. }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(output.as_deref(), Some("boom"));
            }
            result => panic!("expected CommandFailed, got {result:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn env_replaces_ambient_environment() {
        let sh = which::which("sh").unwrap();
        let arguments = vec![OsString::from("-c"), OsString::from("echo \"$VENVKIT_PROBE\"")];
        let options = RunOptions {
            env: Some(
                [("VENVKIT_PROBE".to_string(), "isolated".to_string())]
                    .into_iter()
                    .collect(),
            ),
            ..RunOptions::capture()
        };
        let result = invoke(&sh, &arguments, options).unwrap();
        assert_eq!(result.output.unwrap().trim(), "isolated");
    }

    #[test]
    fn unsupported_program_message() {
        let err = Error::UnsupportedProgram(Path::new("/venv/bin/missing").to_path_buf());
        insta::assert_snapshot!(err, @"Unsupported program: /venv/bin/missing");
    }
}
