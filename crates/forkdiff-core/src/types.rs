use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a file-level change between the fork point and the
/// feature tip.
///
/// # Examples
///
/// ```
/// use forkdiff_core::ChangeKind;
///
/// let kind = ChangeKind::Renamed;
/// assert_eq!(format!("{kind}"), "renamed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Path exists only on the feature side.
    Added,
    /// Path exists only at the fork point.
    Deleted,
    /// Path exists on both sides with different content.
    Modified,
    /// Content moved from one path to another.
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Deleted => write!(f, "deleted"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Renamed => write!(f, "renamed"),
        }
    }
}

/// Path identity used for deduplication and block labels.
///
/// Ordinary changes are identified by their single path; renames collapse
/// to `old -> new`.
///
/// # Examples
///
/// ```
/// use forkdiff_core::EffectivePath;
///
/// let single = EffectivePath::single("src/lib.rs");
/// assert_eq!(single.as_str(), "src/lib.rs");
///
/// let renamed = EffectivePath::rename("a.py", "b.py");
/// assert_eq!(renamed.to_string(), "a.py -> b.py");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectivePath(String);

impl EffectivePath {
    /// Identity of a change touching exactly one path.
    pub fn single(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Identity of a rename from `old` to `new`.
    pub fn rename(old: &str, new: &str) -> Self {
        Self(format!("{old} -> {new}"))
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EffectivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
