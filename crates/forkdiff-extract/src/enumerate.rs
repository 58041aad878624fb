//! Tree-to-tree change enumeration between the fork point and the feature tip.

use forkdiff_core::{ChangeKind, EffectivePath, ForkdiffError};
use git2::{Blob, Delta, DiffDelta, DiffFindOptions, DiffOptions, Oid, Repository, Tree};

use crate::resolve::ForkPoint;

/// Default similarity percentage for rename detection.
pub const DEFAULT_RENAME_THRESHOLD: u16 = 50;

/// Handle to a file's content in one commit. Nothing is read until
/// [`ContentBlob::read`] is called.
///
/// # Examples
///
/// ```
/// use forkdiff_extract::enumerate::ContentBlob;
/// use git2::Oid;
///
/// let blob = ContentBlob::new(Oid::zero(), "assets/logo.PNG", Oid::zero());
/// assert_eq!(blob.extension().as_deref(), Some("png"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlob {
    /// Commit the blob was taken from.
    pub commit: Oid,
    /// Repository-relative path within that commit.
    pub path: String,
    /// Blob object id.
    pub id: Oid,
}

impl ContentBlob {
    /// Create a handle for `path` at `commit` backed by blob `id`.
    pub fn new(commit: Oid, path: impl Into<String>, id: Oid) -> Self {
        Self {
            commit,
            path: path.into(),
            id,
        }
    }

    /// Lowercased file extension, if the path has one.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.path)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Look the blob up in `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Git`] if the object is missing or is not a
    /// blob (for example a submodule entry).
    pub fn read<'r>(&self, repo: &'r Repository) -> Result<Blob<'r>, ForkdiffError> {
        repo.find_blob(self.id).map_err(|e| {
            ForkdiffError::Git(format!(
                "failed to read {} at {}: {e}",
                self.path,
                short_id(self.commit)
            ))
        })
    }
}

/// One path-level change between the fork point and the feature tip.
///
/// Built only through the constructors, which keep paths, blobs and kind
/// consistent: an added record has no old side, a deleted record has no new
/// side, and a rename always carries two different paths.
///
/// # Examples
///
/// ```
/// use forkdiff_core::ChangeKind;
/// use forkdiff_extract::enumerate::{ChangeRecord, ContentBlob};
/// use git2::Oid;
///
/// let old = ContentBlob::new(Oid::zero(), "a.py", Oid::zero());
/// let new = ContentBlob::new(Oid::zero(), "b.py", Oid::zero());
/// let record = ChangeRecord::renamed(old, new);
/// assert_eq!(record.kind(), ChangeKind::Renamed);
/// assert_eq!(record.effective_path().as_str(), "a.py -> b.py");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    kind: ChangeKind,
    old_blob: Option<ContentBlob>,
    new_blob: Option<ContentBlob>,
}

impl ChangeRecord {
    /// A path that exists only on the feature side.
    pub fn added(new: ContentBlob) -> Self {
        Self {
            kind: ChangeKind::Added,
            old_blob: None,
            new_blob: Some(new),
        }
    }

    /// A path that exists only at the fork point.
    pub fn deleted(old: ContentBlob) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            old_blob: Some(old),
            new_blob: None,
        }
    }

    /// A path whose content changed in place.
    pub fn modified(old: ContentBlob, new: ContentBlob) -> Self {
        Self {
            kind: ChangeKind::Modified,
            old_blob: Some(old),
            new_blob: Some(new),
        }
    }

    /// Content that moved from `old.path` to `new.path`.
    ///
    /// Degrades to [`ChangeRecord::modified`] if both paths are equal.
    pub fn renamed(old: ContentBlob, new: ContentBlob) -> Self {
        if old.path == new.path {
            return Self::modified(old, new);
        }
        Self {
            kind: ChangeKind::Renamed,
            old_blob: Some(old),
            new_blob: Some(new),
        }
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn old_path(&self) -> Option<&str> {
        self.old_blob.as_ref().map(|b| b.path.as_str())
    }

    pub fn new_path(&self) -> Option<&str> {
        self.new_blob.as_ref().map(|b| b.path.as_str())
    }

    pub fn old_blob(&self) -> Option<&ContentBlob> {
        self.old_blob.as_ref()
    }

    pub fn new_blob(&self) -> Option<&ContentBlob> {
        self.new_blob.as_ref()
    }

    /// Path identity used for deduplication and as the block label.
    pub fn effective_path(&self) -> EffectivePath {
        match (self.kind, self.old_path(), self.new_path()) {
            (ChangeKind::Renamed, Some(old), Some(new)) => EffectivePath::rename(old, new),
            (_, _, Some(new)) => EffectivePath::single(new),
            (_, Some(old), None) => EffectivePath::single(old),
            // Constructors always set at least one side.
            (_, None, None) => EffectivePath::single(""),
        }
    }
}

/// A tree entry that could not become a [`ChangeRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDelta {
    /// Path as recorded in the tree, lossily decoded for display.
    pub path: String,
    /// Why the entry was rejected.
    pub reason: String,
}

/// Output of [`enumerate_changes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    /// Records in tree-diff order.
    pub records: Vec<ChangeRecord>,
    /// Entries left out, in the same order.
    pub rejected: Vec<RejectedDelta>,
}

/// Enumerate the changes from `fork_point.commit` to `fork_point.feature_tip`.
///
/// Records come back in git's tree-diff order, which is stable for a given
/// pair of commits. Delete/add pairs at least `rename_threshold` percent
/// similar are merged into a single [`ChangeKind::Renamed`] record.
///
/// Entries whose path is not valid UTF-8, or that git reports as
/// unreadable or conflicted, are logged and returned in
/// [`Enumeration::rejected`] instead.
///
/// # Errors
///
/// Returns [`ForkdiffError::TreeResolution`] if either commit cannot be
/// resolved to a tree, or [`ForkdiffError::Git`] if the diff fails.
///
/// # Examples
///
/// ```no_run
/// use forkdiff_extract::enumerate::{enumerate_changes, DEFAULT_RENAME_THRESHOLD};
/// use forkdiff_extract::resolve::resolve_fork_point;
///
/// let repo = git2::Repository::open(".").unwrap();
/// let fp = resolve_fork_point(&repo, "main", "feature").unwrap();
/// for record in enumerate_changes(&repo, &fp, DEFAULT_RENAME_THRESHOLD).unwrap().records {
///     println!("{} {}", record.kind(), record.effective_path());
/// }
/// ```
pub fn enumerate_changes(
    repo: &Repository,
    fork_point: &ForkPoint,
    rename_threshold: u16,
) -> Result<Enumeration, ForkdiffError> {
    let old_tree = commit_tree(repo, fork_point.commit)?;
    let new_tree = commit_tree(repo, fork_point.feature_tip)?;

    let mut diff_opts = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut diff_opts))
        .map_err(|e| ForkdiffError::Git(format!("failed to compute diff: {e}")))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    find_opts.rename_threshold(rename_threshold);
    diff.find_similar(Some(&mut find_opts))
        .map_err(|e| ForkdiffError::Git(format!("failed to find renames: {e}")))?;

    let mut enumeration = Enumeration::default();
    for delta in diff.deltas() {
        match record_from_delta(&delta, fork_point) {
            Ok(Some(record)) => {
                tracing::debug!(kind = %record.kind(), path = %record.effective_path(), "change");
                enumeration.records.push(record);
            }
            Ok(None) => tracing::debug!(status = ?delta.status(), "ignoring delta"),
            Err(rejected) => {
                tracing::warn!(path = %rejected.path, reason = %rejected.reason, "skipping tree entry");
                enumeration.rejected.push(rejected);
            }
        }
    }

    Ok(enumeration)
}

fn commit_tree(repo: &Repository, oid: Oid) -> Result<Tree<'_>, ForkdiffError> {
    repo.find_commit(oid)
        .and_then(|commit| commit.tree())
        .map_err(|e| {
            ForkdiffError::TreeResolution(format!(
                "failed to get tree of commit {}: {e}",
                short_id(oid)
            ))
        })
}

fn record_from_delta(
    delta: &DiffDelta<'_>,
    fork_point: &ForkPoint,
) -> Result<Option<ChangeRecord>, RejectedDelta> {
    let old = || side_blob(fork_point.commit, delta.old_file());
    let new = || side_blob(fork_point.feature_tip, delta.new_file());

    let record = match delta.status() {
        Delta::Added | Delta::Copied => ChangeRecord::added(new()?),
        Delta::Deleted => ChangeRecord::deleted(old()?),
        Delta::Modified | Delta::Typechange => ChangeRecord::modified(old()?, new()?),
        Delta::Renamed => ChangeRecord::renamed(old()?, new()?),
        status @ (Delta::Unreadable | Delta::Conflicted) => {
            return Err(RejectedDelta {
                path: display_path(delta),
                reason: format!("git reports the entry as {status:?}"),
            })
        }
        Delta::Unmodified | Delta::Ignored | Delta::Untracked => return Ok(None),
    };
    Ok(Some(record))
}

fn side_blob(commit: Oid, file: git2::DiffFile<'_>) -> Result<ContentBlob, RejectedDelta> {
    let bytes = file.path_bytes().ok_or_else(|| RejectedDelta {
        path: String::new(),
        reason: "entry has no path".into(),
    })?;
    let path = std::str::from_utf8(bytes).map_err(|_| RejectedDelta {
        path: String::from_utf8_lossy(bytes).into_owned(),
        reason: "path is not valid UTF-8".into(),
    })?;
    Ok(ContentBlob::new(commit, path, file.id()))
}

fn display_path(delta: &DiffDelta<'_>) -> String {
    delta
        .new_file()
        .path_bytes()
        .or_else(|| delta.old_file().path_bytes())
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}

fn short_id(oid: Oid) -> String {
    let hash = oid.to_string();
    hash[..hash.len().min(8)].to_string()
}
