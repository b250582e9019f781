//! Qualified symbol paths.

use std::fmt;

use smol_str::SmolStr;

#[cfg(feature = "interchange")]
use serde::{Deserialize, Serialize};

/// An ordered sequence of namespace/class segments, e.g. `pxr::UsdPrim::GetName`.
///
/// Matching is exact: segments are compared case-sensitively and one by one,
/// so `pxr::UsdPrim` never matches `PXR::UsdPrim` or `UsdPrim`.
/// The empty name is the global scope.
#[derive(Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "interchange", serde(into = "String", from = "String"))]
pub struct QualifiedName {
    segments: Vec<SmolStr>,
}

impl QualifiedName {
    /// The global scope.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse `a::b::c`. A leading `::` (global qualifier) is ignored and
    /// empty segments are dropped.
    pub fn parse(path: &str) -> Self {
        Self::from_segments(
            path.split("::")
                .map(str::trim)
                .filter(|segment| !segment.is_empty()),
        )
    }

    pub fn segments(&self) -> &[SmolStr] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(SmolStr::as_str)
    }

    /// The unqualified name (last segment).
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(SmolStr::as_str)
    }

    /// `a::b::c` -> `a::b`; the root has no parent.
    pub fn parent(&self) -> Option<QualifiedName> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn push(&mut self, segment: impl Into<SmolStr>) {
        self.segments.push(segment.into());
    }

    pub fn child(&self, segment: impl Into<SmolStr>) -> QualifiedName {
        let mut child = self.clone();
        child.push(segment);
        child
    }

    /// Concatenate two paths.
    pub fn join(&self, other: &QualifiedName) -> QualifiedName {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn starts_with(&self, prefix: &QualifiedName) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Replace a leading `from` with `to`. Returns `None` when `from` is not
    /// a prefix.
    pub fn replace_prefix(&self, from: &QualifiedName, to: &QualifiedName) -> Option<QualifiedName> {
        if !self.starts_with(from) {
            return None;
        }
        let mut segments = to.segments.clone();
        segments.extend(self.segments[from.len()..].iter().cloned());
        Some(Self { segments })
    }

    /// This scope followed by every enclosing scope, ending with the root.
    ///
    /// `a::b` yields `a::b`, `a`, then the root: the order in which C++ name lookup
    /// walks outwards.
    pub fn ancestors(&self) -> impl Iterator<Item = QualifiedName> + '_ {
        (0..=self.segments.len())
            .rev()
            .map(move |len| Self {
                segments: self.segments[..len].to_vec(),
            })
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QualifiedName({})", self)
    }
}

impl From<&str> for QualifiedName {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for QualifiedName {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_global_qualifier() {
        let name = QualifiedName::parse("::PXR_INTERNAL_NS::UsdPrim");
        assert_eq!(name.len(), 2);
        assert_eq!(name.first(), Some("PXR_INTERNAL_NS"));
        assert_eq!(name.to_string(), "PXR_INTERNAL_NS::UsdPrim");
    }

    #[test]
    fn test_match_is_case_and_segment_exact() {
        assert_ne!(QualifiedName::parse("pxr::UsdPrim"), QualifiedName::parse("PXR::UsdPrim"));
        assert_ne!(QualifiedName::parse("pxr::UsdPrim"), QualifiedName::parse("UsdPrim"));
        assert_eq!(QualifiedName::parse("pxr::UsdPrim"), QualifiedName::parse("pxr :: UsdPrim"));
    }

    #[test]
    fn test_parent_and_last() {
        let name = QualifiedName::parse("a::b::c");
        assert_eq!(name.last(), Some("c"));
        assert_eq!(name.parent(), Some(QualifiedName::parse("a::b")));
        assert_eq!(QualifiedName::root().parent(), None);
    }

    #[test]
    fn test_replace_prefix() {
        let name = QualifiedName::parse("pxr::UsdPrim::GetName");
        let rewritten = name
            .replace_prefix(&QualifiedName::parse("pxr"), &QualifiedName::parse("PXR_INTERNAL_NS"))
            .unwrap();
        assert_eq!(rewritten.to_string(), "PXR_INTERNAL_NS::UsdPrim::GetName");
        assert!(name.replace_prefix(&QualifiedName::parse("Usd"), &QualifiedName::root()).is_none());
    }

    #[test]
    fn test_ancestors_walk_outwards() {
        let scopes: Vec<String> = QualifiedName::parse("a::b")
            .ancestors()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(scopes, vec!["a::b", "a", ""]);
    }
}
