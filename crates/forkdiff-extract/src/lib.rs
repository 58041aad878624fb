//! Divergence extraction: the changes unique to a feature branch.
//!
//! Resolves the fork point of two revisions, enumerates the file changes
//! from there to the feature tip, decodes both sides of each change, and
//! renders everything into one deterministic document. Uses git2 for all
//! repository access and `similar` for line diffs.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//! use forkdiff_extract::{extract_divergence, ExtractOptions};
//!
//! let extraction = extract_divergence(Path::new("."), "main", "feature", &ExtractOptions::default())?;
//! print!("{}", extraction.document);
//! # Ok::<(), forkdiff_core::ForkdiffError>(())
//! ```

pub mod decode;
pub mod document;
pub mod enumerate;
pub mod filter;
pub mod render;
pub mod resolve;

#[cfg(test)]
mod testutil;

use std::fmt;
use std::path::Path;

use forkdiff_core::{ChangeKind, EffectivePath, ExtractConfig, ForkdiffError};
use git2::Repository;
use serde::Serialize;

use crate::decode::{ContentDecoder, Decoded};
use crate::document::{Document, DocumentAssembler};
use crate::enumerate::{enumerate_changes, ChangeRecord, DEFAULT_RENAME_THRESHOLD};
use crate::filter::PathFilter;
use crate::render::{render_block, RenderOptions};
use crate::resolve::{resolve_fork_point, ForkPoint};

/// Everything that shapes an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Binary classification and encoding chain.
    pub decoder: ContentDecoder,
    /// Line comparison settings.
    pub render: RenderOptions,
    /// Similarity percentage for rename detection.
    pub rename_threshold: u16,
    /// Paths left out of the document.
    pub filter: PathFilter,
    /// Drop modified files whose diff body is empty.
    pub omit_empty_modifications: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            decoder: ContentDecoder::default(),
            render: RenderOptions::default(),
            rename_threshold: DEFAULT_RENAME_THRESHOLD,
            filter: PathFilter::default(),
            omit_empty_modifications: false,
        }
    }
}

impl ExtractOptions {
    /// Build options from the `[extract]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Config`] for unknown encodings or invalid
    /// skip patterns.
    ///
    /// # Examples
    ///
    /// ```
    /// use forkdiff_core::ExtractConfig;
    /// use forkdiff_extract::ExtractOptions;
    ///
    /// let options = ExtractOptions::from_config(&ExtractConfig::default()).unwrap();
    /// assert_eq!(options.rename_threshold, 50);
    /// ```
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ForkdiffError> {
        Ok(Self {
            decoder: ContentDecoder::from_config(config)?,
            render: RenderOptions::from(config),
            rename_threshold: config.rename_threshold,
            filter: PathFilter::new(&config.skip_patterns)?,
            omit_empty_modifications: config.omit_empty_modifications,
        })
    }
}

/// Why a change did not make it into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// The path identity already produced a block.
    Duplicate,
    /// Matched a configured skip pattern.
    Pattern(String),
    /// Modification with nothing left after whitespace suppression.
    EmptyModification,
    /// Reading one side of the change failed.
    Unreadable(String),
    /// The tree entry could not become a change record.
    InvalidEntry(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Duplicate => write!(f, "duplicate path"),
            SkipReason::Pattern(p) => write!(f, "matches pattern: {p}"),
            SkipReason::EmptyModification => write!(f, "no meaningful change"),
            SkipReason::Unreadable(e) => write!(f, "unreadable: {e}"),
            SkipReason::InvalidEntry(e) => write!(f, "invalid entry: {e}"),
        }
    }
}

/// A change left out of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedPath {
    /// Identity of the change.
    pub path: EffectivePath,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Counters for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractStats {
    /// Records produced by enumeration.
    pub changes: usize,
    /// Blocks that made it into the document.
    pub rendered: usize,
    /// Sides classified as binary.
    pub binary_sides: usize,
    /// Sides decoded with the fallback encoding.
    pub lossy_sides: usize,
}

/// Result of [`extract_divergence`].
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Base revision name as requested.
    pub base: String,
    /// Feature revision name as requested.
    pub feature: String,
    /// Fork point, or `None` for disjoint histories.
    pub fork_point: Option<ForkPoint>,
    /// The assembled document; empty for disjoint histories.
    pub document: Document,
    /// Changes left out of the document.
    pub skipped: Vec<SkippedPath>,
    /// Run counters.
    pub stats: ExtractStats,
}

impl Extraction {
    /// The fork point, or [`ForkdiffError::NoCommonAncestor`].
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::NoCommonAncestor`] when the histories are
    /// disjoint.
    pub fn require_fork_point(&self) -> Result<&ForkPoint, ForkdiffError> {
        self.fork_point
            .as_ref()
            .ok_or_else(|| ForkdiffError::NoCommonAncestor {
                base: self.base.clone(),
                feature: self.feature.clone(),
            })
    }
}

/// Open the repository at `repo_path` and run [`extract_from_repo`].
///
/// # Errors
///
/// Returns [`ForkdiffError::Git`] if the repository cannot be opened, plus
/// every error [`extract_from_repo`] can return.
pub fn extract_divergence(
    repo_path: &Path,
    base: &str,
    feature: &str,
    options: &ExtractOptions,
) -> Result<Extraction, ForkdiffError> {
    let repo = Repository::open(repo_path).map_err(|e| {
        ForkdiffError::Git(format!(
            "failed to open repository at {}: {e}",
            repo_path.display()
        ))
    })?;
    extract_from_repo(&repo, base, feature, options)
}

/// Extract the changes unique to `feature` relative to `base`.
///
/// Disjoint histories produce an empty document rather than an error. A
/// change whose content cannot be read is recorded in
/// [`Extraction::skipped`] and the run continues.
///
/// # Errors
///
/// Returns [`ForkdiffError::RevisionNotFound`] if either revision does not
/// resolve, and [`ForkdiffError::TreeResolution`] or [`ForkdiffError::Git`]
/// if the tree comparison fails.
pub fn extract_from_repo(
    repo: &Repository,
    base: &str,
    feature: &str,
    options: &ExtractOptions,
) -> Result<Extraction, ForkdiffError> {
    let mut extraction = Extraction::empty(base, feature);

    let fork_point = match resolve_fork_point(repo, base, feature) {
        Ok(fork_point) => fork_point,
        Err(e) if e.is_recoverable() => {
            tracing::warn!(base, feature, "{e}, nothing to extract");
            return Ok(extraction);
        }
        Err(e) => return Err(e),
    };
    extraction.fork_point = Some(fork_point);
    if fork_point.is_feature_tip() {
        tracing::info!(feature, "feature has no commits past the fork point");
    }

    let enumeration = enumerate_changes(repo, &fork_point, options.rename_threshold)?;
    for rejected in enumeration.rejected {
        extraction.skip(
            EffectivePath::single(rejected.path),
            SkipReason::InvalidEntry(rejected.reason),
        );
    }
    let records = enumeration.records;
    extraction.stats.changes = records.len();

    extraction.assemble(repo, &records, options);
    tracing::info!(
        fork_point = %fork_point.commit,
        changes = extraction.stats.changes,
        rendered = extraction.stats.rendered,
        skipped = extraction.skipped.len(),
        "extraction finished"
    );
    Ok(extraction)
}

impl Extraction {
    fn empty(base: &str, feature: &str) -> Self {
        Self {
            base: base.to_string(),
            feature: feature.to_string(),
            fork_point: None,
            document: Document::default(),
            skipped: Vec::new(),
            stats: ExtractStats::default(),
        }
    }

    /// Decode, render and assemble `records` into the document.
    ///
    /// Only a block that actually lands in the document claims its path
    /// identity. A record dropped by a skip pattern, a read failure, or
    /// `omit_empty_modifications` leaves the identity free for a later
    /// record.
    fn assemble(
        &mut self,
        repo: &Repository,
        records: &[ChangeRecord],
        options: &ExtractOptions,
    ) {
        let mut assembler = DocumentAssembler::new();
        for record in records {
            let path = record.effective_path();

            if assembler.has_seen(&path) {
                self.skip(path, SkipReason::Duplicate);
                continue;
            }
            if let Some(pattern) = options.filter.matches_record(record) {
                self.skip(path, SkipReason::Pattern(pattern.to_string()));
                continue;
            }

            let (old, new) = match decode_sides(repo, record, &options.decoder) {
                Ok(sides) => sides,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "skipping unreadable change");
                    self.skip(path, SkipReason::Unreadable(e.to_string()));
                    continue;
                }
            };
            for side in [&old, &new].into_iter().flatten() {
                match side {
                    Decoded::Binary => self.stats.binary_sides += 1,
                    Decoded::Text(t) if t.lossy => self.stats.lossy_sides += 1,
                    Decoded::Text(_) => {}
                }
            }

            let block = render_block(record, old.as_ref(), new.as_ref(), &options.render);
            if !block.has_changes && options.omit_empty_modifications {
                self.skip(path, SkipReason::EmptyModification);
                continue;
            }
            assembler.push(block);
        }

        self.document = assembler.finish();
        self.stats.rendered = self.document.blocks().len();
    }

    fn skip(&mut self, path: EffectivePath, reason: SkipReason) {
        tracing::debug!(path = %path, reason = %reason, "skipped");
        self.skipped.push(SkippedPath { path, reason });
    }
}

/// Decode the sides a record's block needs. Deleted content is never read.
fn decode_sides(
    repo: &Repository,
    record: &ChangeRecord,
    decoder: &ContentDecoder,
) -> Result<(Option<Decoded>, Option<Decoded>), ForkdiffError> {
    let needs_old = matches!(record.kind(), ChangeKind::Modified | ChangeKind::Renamed);
    let old = match record.old_blob() {
        Some(blob) if needs_old => Some(decoder.decode(repo, blob)?),
        _ => None,
    };
    let new = match record.new_blob() {
        Some(blob) => Some(decoder.decode(repo, blob)?),
        None => None,
    };
    Ok((old, new))
}
