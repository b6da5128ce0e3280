//! Discovery of the base Python interpreter and the tag-enumeration query.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;
use wheel_filename::SupportedTags;

use crate::Error;

/// Find the base interpreter used for environment creation, via `PATH`.
pub(crate) fn find_base_python() -> Result<PathBuf, Error> {
    let python = which::which("python3")
        .or_else(|_| which::which("python"))
        .map_err(Error::NoInterpreter)?;
    debug!("Resolved base interpreter to {}", python.display());
    Ok(python)
}

/// Ask the interpreter at `python` for every interpreter/ABI/platform tag
/// combination it can execute.
///
/// The enumeration lives in the interpreter (`packaging.tags`); we only
/// consume its output as opaque strings.
pub(crate) fn query_supported_tags(python: &Path) -> Result<SupportedTags, Error> {
    debug!("Querying supported tags from {}", python.display());
    let output = Command::new(python)
        .args(["-c", include_str!("query_tags.py")])
        .output()?;
    if !output.status.success() {
        return Err(Error::CommandFailed {
            program: python.to_path_buf(),
            status: output.status,
            output: Some(
                format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                )
                .trim()
                .to_string(),
            ),
        });
    }
    let tags: Vec<String> =
        serde_json::from_slice(&output.stdout).map_err(|err| Error::TagQuery {
            interpreter: python.to_path_buf(),
            err,
        })?;
    Ok(tags.into_iter().collect())
}
