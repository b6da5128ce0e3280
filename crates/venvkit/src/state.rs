use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::Error;

/// A derived property of an environment, computed on first access and
/// stored for the life of the instance.
///
/// The cache is monotonic: the first computed value wins and is never
/// invalidated, even if the on-disk environment changes afterwards.
#[derive(Debug, Default)]
pub(crate) struct CachedProperty<T>(OnceLock<T>);

impl<T> CachedProperty<T> {
    /// Returns the stored value, computing it with `compute` if this is the
    /// first access.
    pub(crate) fn get_or_compute(&self, compute: impl FnOnce() -> T) -> &T {
        self.0.get_or_init(compute)
    }

    /// Fallible variant of [`CachedProperty::get_or_compute`]. A failed
    /// computation stores nothing, so the next access retries.
    pub(crate) fn get_or_try_compute<E>(
        &self,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        if let Some(value) = self.0.get() {
            return Ok(value);
        }
        let value = compute()?;
        Ok(self.0.get_or_init(|| value))
    }
}

/// The lazily computed state of one environment: exactly the properties
/// that are expensive enough to warrant memoization.
#[derive(Debug, Default)]
pub(crate) struct EnvironmentState {
    pub(crate) scripts: CachedProperty<PathBuf>,
    pub(crate) supported_tags: CachedProperty<wheel_filename::SupportedTags>,
}

/// The platform-dependent scripts directory of an environment rooted at
/// `root`.
pub(crate) fn scripts_dir(root: &Path) -> PathBuf {
    if cfg!(windows) {
        root.join("Scripts")
    } else {
        root.join("bin")
    }
}

/// The recognized set of derived-property names.
///
/// Lookups by name outside this set fail with [`Error::UnknownProperty`],
/// carrying the attempted name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedProperty {
    ScriptDirectory,
    SupportedTags,
}

impl FromStr for DerivedProperty {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "script_directory" => Ok(Self::ScriptDirectory),
            "supported_tags" => Ok(Self::SupportedTags),
            _ => Err(Error::UnknownProperty(name.to_string())),
        }
    }
}

impl Display for DerivedProperty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScriptDirectory => f.write_str("script_directory"),
            Self::SupportedTags => f.write_str("supported_tags"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::Path;
    use std::str::FromStr;

    use crate::Error;

    use super::{scripts_dir, CachedProperty, DerivedProperty};

    #[test]
    fn computes_at_most_once() {
        let computations = Cell::new(0);
        let property = CachedProperty::default();
        for _ in 0..3 {
            let value = property.get_or_compute(|| {
                computations.set(computations.get() + 1);
                42
            });
            assert_eq!(*value, 42);
        }
        assert_eq!(computations.get(), 1);
    }

    #[test]
    fn failed_computation_stores_nothing() {
        let property = CachedProperty::default();
        let result: Result<&i32, &str> = property.get_or_try_compute(|| Err("probe failed"));
        assert!(result.is_err());
        let value = property.get_or_try_compute(|| Ok::<_, &str>(7)).unwrap();
        assert_eq!(*value, 7);
    }

    #[test]
    fn scripts_subpath() {
        let dir = scripts_dir(Path::new("/tmp/venv"));
        if cfg!(windows) {
            assert!(dir.ends_with("Scripts"));
        } else {
            assert!(dir.ends_with("bin"));
        }
    }

    #[test]
    fn property_names() {
        assert_eq!(
            DerivedProperty::from_str("script_directory").unwrap(),
            DerivedProperty::ScriptDirectory
        );
        assert_eq!(
            DerivedProperty::from_str("supported_tags").unwrap(),
            DerivedProperty::SupportedTags
        );
        let err = DerivedProperty::from_str("bin_scripts").unwrap_err();
        assert!(matches!(err, Error::UnknownProperty(name) if name == "bin_scripts"));
    }
}
