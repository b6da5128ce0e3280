use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use crate::SupportedTags;

/// The structural decomposition of a wheel filename.
///
/// A wheel is named `<dist>-<version>[-<build>]-<python>-<abi>-<platform>.whl`
/// (PEP 427), where each of the three trailing tag fields may carry multiple
/// `.`-separated alternatives (PEP 425 compressed tag sets).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WheelFilename {
    pub distribution: String,
    pub version: String,
    pub build_tag: Option<String>,
    pub python_tag: Vec<String>,
    pub abi_tag: Vec<String>,
    pub platform_tag: Vec<String>,
}

impl WheelFilename {
    /// Match `filename` against the wheel naming convention.
    ///
    /// Returns `None` for anything that doesn't fit the grammar, never a
    /// partially populated value. Every field is a non-empty non-`-` run,
    /// and every `.`-separated tag alternative is non-empty. Purely
    /// structural: the version is kept as-is and not validated.
    pub fn parse(filename: &str) -> Option<Self> {
        let basename = filename.strip_suffix(".whl")?;
        let fields = basename.split('-').collect::<Vec<_>>();
        if fields.iter().any(|field| field.is_empty()) {
            return None;
        }
        let split = |tag: &str| {
            let alternatives: Vec<String> = tag.split('.').map(String::from).collect();
            alternatives
                .iter()
                .all(|alternative| !alternative.is_empty())
                .then_some(alternatives)
        };
        match fields.as_slice() {
            &[distribution, version, build_tag, python_tag, abi_tag, platform_tag] => {
                Some(Self {
                    distribution: distribution.to_string(),
                    version: version.to_string(),
                    build_tag: Some(build_tag.to_string()),
                    python_tag: split(python_tag)?,
                    abi_tag: split(abi_tag)?,
                    platform_tag: split(platform_tag)?,
                })
            }
            &[distribution, version, python_tag, abi_tag, platform_tag] => Some(Self {
                distribution: distribution.to_string(),
                version: version.to_string(),
                build_tag: None,
                python_tag: split(python_tag)?,
                abi_tag: split(abi_tag)?,
                platform_tag: split(platform_tag)?,
            }),
            _ => None,
        }
    }

    /// Returns `true` if any combination of the wheel's tag alternatives is
    /// in the supported set.
    pub fn is_compatible(&self, supported: &SupportedTags) -> bool {
        self.compatible_tags()
            .iter()
            .any(|tag| supported.contains(tag))
    }

    /// The full cross-product of the wheel's tag alternatives, one combined
    /// `{python}-{abi}-{platform}` string per combination.
    pub fn compatible_tags(&self) -> Vec<String> {
        let mut tags =
            Vec::with_capacity(self.python_tag.len() * self.abi_tag.len() * self.platform_tag.len());
        for python_tag in &self.python_tag {
            for abi_tag in &self.abi_tag {
                for platform_tag in &self.platform_tag {
                    tags.push(format!("{python_tag}-{abi_tag}-{platform_tag}"));
                }
            }
        }
        tags
    }

    /// The compressed tag set of this wheel, e.g. `cp39.cp310-abi3-linux_x86_64`.
    pub fn get_tag(&self) -> String {
        format!(
            "{}-{}-{}",
            self.python_tag.join("."),
            self.abi_tag.join("."),
            self.platform_tag.join(".")
        )
    }
}

impl FromStr for WheelFilename {
    type Err = WheelFilenameError;

    fn from_str(filename: &str) -> Result<Self, Self::Err> {
        if filename.strip_suffix(".whl").is_none() {
            return Err(WheelFilenameError::InvalidWheelFileName(
                filename.to_string(),
                "Must end with .whl".to_string(),
            ));
        }
        Self::parse(filename).ok_or_else(|| {
            WheelFilenameError::InvalidWheelFileName(
                filename.to_string(),
                "Expected four or five \"-\" in the filename".to_string(),
            )
        })
    }
}

impl Display for WheelFilename {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.distribution, self.version)?;
        if let Some(build_tag) = &self.build_tag {
            write!(f, "-{build_tag}")?;
        }
        write!(f, "-{}.whl", self.get_tag())
    }
}

#[derive(Error, Debug)]
pub enum WheelFilenameError {
    #[error("The wheel filename \"{0}\" is invalid: {1}")]
    InvalidWheelFileName(String, String),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::{SupportedTags, WheelFilename};

    fn tags(tags: &[&str]) -> SupportedTags {
        tags.iter().copied().collect()
    }

    #[test]
    fn pure_wheel() {
        let wheel = WheelFilename::parse("mypkg-1.0.0-py3-none-any.whl").unwrap();
        assert_eq!(wheel.distribution, "mypkg");
        assert_eq!(wheel.version, "1.0.0");
        assert_eq!(wheel.build_tag, None);
        assert_eq!(wheel.python_tag, ["py3"]);
        assert_eq!(wheel.abi_tag, ["none"]);
        assert_eq!(wheel.platform_tag, ["any"]);
    }

    #[test]
    fn build_tag() {
        let wheel = WheelFilename::parse("mypkg-1.0.0-1-py3-none-any.whl").unwrap();
        assert_eq!(wheel.build_tag.as_deref(), Some("1"));
        assert_eq!(wheel.python_tag, ["py3"]);
    }

    #[test]
    fn compressed_tag_sets() {
        let wheel =
            WheelFilename::parse("mypkg-1.0.0-cp39.cp310-abi3-manylinux_2_17_x86_64.whl").unwrap();
        assert_eq!(wheel.python_tag, ["cp39", "cp310"]);
        assert_eq!(wheel.abi_tag, ["abi3"]);
        assert_eq!(wheel.platform_tag, ["manylinux_2_17_x86_64"]);
        assert_eq!(
            wheel.compatible_tags(),
            [
                "cp39-abi3-manylinux_2_17_x86_64",
                "cp310-abi3-manylinux_2_17_x86_64"
            ]
        );
    }

    #[test]
    fn cross_product_cardinality() {
        let wheel =
            WheelFilename::parse("mypkg-1.0.0-cp39.cp310-abi3-linux_x86_64.macosx_11_0_arm64.win_amd64.whl")
                .unwrap();
        // 2 x 1 x 3 alternatives.
        assert_eq!(wheel.compatible_tags().len(), 6);
    }

    #[test]
    fn no_match() {
        assert_eq!(WheelFilename::parse(""), None);
        assert_eq!(WheelFilename::parse("mypkg-1.0.0-py3-none-any"), None);
        assert_eq!(WheelFilename::parse("mypkg-1.0.0-py3-none.whl"), None);
        assert_eq!(WheelFilename::parse("mypkg.whl"), None);
        assert_eq!(
            WheelFilename::parse("mypkg-1.0.0-1-extra-py3-none-any.whl"),
            None
        );
    }

    #[test]
    fn empty_fields_do_not_match() {
        // An empty version field.
        assert_eq!(WheelFilename::parse("mypkg--py3-none-any.whl"), None);
        // An empty distribution field.
        assert_eq!(WheelFilename::parse("-1.0-py3-none-any.whl"), None);
        // An empty tag alternative.
        assert_eq!(WheelFilename::parse("mypkg-1.0-py3.-none-any.whl"), None);
        assert_eq!(WheelFilename::parse("mypkg-1.0-py3-none-.any.whl"), None);
    }

    #[test]
    fn from_str_errors() {
        let err = WheelFilename::from_str("mypkg-1.0.0-py3-none-any.zip").unwrap_err();
        insta::assert_snapshot!(
            err,
            @r###"The wheel filename "mypkg-1.0.0-py3-none-any.zip" is invalid: Must end with .whl"###
        );
        let err = WheelFilename::from_str("mypkg-py3-none-any.whl").unwrap_err();
        insta::assert_snapshot!(
            err,
            @r###"The wheel filename "mypkg-py3-none-any.whl" is invalid: Expected four or five "-" in the filename"###
        );
    }

    #[test]
    fn round_trip() {
        for filename in [
            "mypkg-1.0.0-py3-none-any.whl",
            "mypkg-1.0.0-1-py3-none-any.whl",
            "mypkg-1.0.0-cp39.cp310-abi3-manylinux_2_17_x86_64.whl",
        ] {
            let wheel = WheelFilename::parse(filename).unwrap();
            assert_eq!(WheelFilename::parse(&wheel.to_string()), Some(wheel));
        }
    }

    #[test]
    fn compatibility() {
        let wheel = WheelFilename::parse("mypkg-1.0.0-cp39.cp310-abi3-linux_x86_64.whl").unwrap();
        assert!(!wheel.is_compatible(&tags(&[])));
        assert!(!wheel.is_compatible(&tags(&["cp311-abi3-linux_x86_64"])));
        assert!(wheel.is_compatible(&tags(&["cp310-abi3-linux_x86_64"])));
    }

    #[test]
    fn compatibility_is_monotonic() {
        let wheel = WheelFilename::parse("mypkg-1.0.0-py3-none-any.whl").unwrap();
        let small = tags(&["py3-none-any"]);
        let large = tags(&["py3-none-any", "cp310-cp310-linux_x86_64"]);
        assert!(wheel.is_compatible(&small));
        assert!(wheel.is_compatible(&large));
    }
}
