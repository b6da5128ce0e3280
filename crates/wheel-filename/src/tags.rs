use rustc_hash::FxHashSet;

/// The set of `{python}-{abi}-{platform}` tag triples the running system
/// can execute.
///
/// The enumeration itself happens in the interpreter (`packaging.tags`);
/// this type only holds its output as opaque strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedTags(FxHashSet<String>);

impl SupportedTags {
    /// Returns `true` if the given combined tag is supported.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SupportedTags {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
