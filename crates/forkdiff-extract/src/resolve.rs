//! Fork-point resolution between a base and a feature revision.
//!
//! The fork point is the merge base of the two revisions. When git reports
//! several merge bases (criss-cross merges), the first one returned by
//! [`git2::Repository::merge_bases`] is used. Callers may rely on that
//! choice being stable within a run, nothing more.

use forkdiff_core::ForkdiffError;
use git2::{ErrorCode, Oid, Repository};

/// The nearest common ancestor of two revisions, plus both resolved tips.
///
/// # Examples
///
/// ```
/// use forkdiff_extract::resolve::ForkPoint;
/// use git2::Oid;
///
/// let fp = ForkPoint {
///     commit: Oid::zero(),
///     base_tip: Oid::zero(),
///     feature_tip: Oid::zero(),
/// };
/// assert!(fp.is_feature_tip());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkPoint {
    /// The merge-base commit.
    pub commit: Oid,
    /// Commit the base revision resolved to.
    pub base_tip: Oid,
    /// Commit the feature revision resolved to.
    pub feature_tip: Oid,
}

impl ForkPoint {
    /// `true` when the feature branch has no commits of its own.
    pub fn is_feature_tip(&self) -> bool {
        self.commit == self.feature_tip
    }
}

/// Resolve a branch, tag, or commit name to a commit id.
///
/// # Errors
///
/// Returns [`ForkdiffError::RevisionNotFound`] if `name` does not parse as a
/// revision or does not peel to a commit.
pub fn resolve_revision(repo: &Repository, name: &str) -> Result<Oid, ForkdiffError> {
    let object = repo
        .revparse_single(name)
        .map_err(|e| ForkdiffError::RevisionNotFound {
            name: name.to_string(),
            reason: e.message().to_string(),
        })?;
    let commit = object
        .peel_to_commit()
        .map_err(|e| ForkdiffError::RevisionNotFound {
            name: name.to_string(),
            reason: e.message().to_string(),
        })?;
    Ok(commit.id())
}

/// Find the fork point of `feature` relative to `base`.
///
/// # Errors
///
/// Returns [`ForkdiffError::NoCommonAncestor`] when the histories are
/// disjoint. That error is recoverable: callers treat it as "no diff
/// available". Returns [`ForkdiffError::RevisionNotFound`] if either name
/// does not resolve, or [`ForkdiffError::Git`] if the ancestor search itself
/// fails.
///
/// # Examples
///
/// ```no_run
/// use forkdiff_extract::resolve::resolve_fork_point;
///
/// let repo = git2::Repository::open(".").unwrap();
/// match resolve_fork_point(&repo, "main", "feature") {
///     Ok(fp) => println!("forked at {}", fp.commit),
///     Err(e) if e.is_recoverable() => println!("nothing to compare"),
///     Err(e) => panic!("{e}"),
/// }
/// ```
pub fn resolve_fork_point(
    repo: &Repository,
    base: &str,
    feature: &str,
) -> Result<ForkPoint, ForkdiffError> {
    let base_tip = resolve_revision(repo, base)?;
    let feature_tip = resolve_revision(repo, feature)?;

    let no_common_ancestor = || ForkdiffError::NoCommonAncestor {
        base: base.to_string(),
        feature: feature.to_string(),
    };

    let bases = match repo.merge_bases(base_tip, feature_tip) {
        Ok(bases) => bases,
        Err(e) if e.code() == ErrorCode::NotFound => {
            tracing::debug!(base, feature, "no merge base");
            return Err(no_common_ancestor());
        }
        Err(e) => {
            return Err(ForkdiffError::Git(format!(
                "failed to compute merge base of '{base}' and '{feature}': {e}"
            )))
        }
    };

    if bases.len() > 1 {
        tracing::debug!(
            candidates = bases.len(),
            chosen = %bases[0],
            "multiple merge bases, taking the first"
        );
    }

    let commit = *bases.first().ok_or_else(no_common_ancestor)?;
    Ok(ForkPoint {
        commit,
        base_tip,
        feature_tip,
    })
}
