//! First-wins assembly of rendered blocks into the final document.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use forkdiff_core::{EffectivePath, ForkdiffError};

use crate::render::RenderedBlock;

/// Incrementally collects blocks, dropping any whose path identity was
/// already taken.
///
/// # Examples
///
/// ```
/// use forkdiff_core::{ChangeKind, EffectivePath};
/// use forkdiff_extract::document::DocumentAssembler;
/// use forkdiff_extract::render::RenderedBlock;
///
/// let block = |text: &str| RenderedBlock {
///     path: EffectivePath::single("a.txt"),
///     kind: ChangeKind::Added,
///     text: text.into(),
///     has_changes: true,
/// };
///
/// let mut assembler = DocumentAssembler::new();
/// assert!(assembler.push(block("first\n\n")));
/// assert!(!assembler.push(block("second\n\n")));
/// assert_eq!(assembler.finish().as_str(), "first\n\n");
/// ```
#[derive(Debug, Default)]
pub struct DocumentAssembler {
    seen: HashSet<EffectivePath>,
    blocks: Vec<RenderedBlock>,
}

impl DocumentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a block for `path` has already been accepted.
    pub fn has_seen(&self, path: &EffectivePath) -> bool {
        self.seen.contains(path)
    }

    /// Append `block` unless its path was seen before. Returns whether the
    /// block was kept.
    pub fn push(&mut self, block: RenderedBlock) -> bool {
        if !self.seen.insert(block.path.clone()) {
            tracing::debug!(path = %block.path, "duplicate path, keeping first occurrence");
            return false;
        }
        self.blocks.push(block);
        true
    }

    /// Concatenate the accepted blocks in insertion order.
    pub fn finish(self) -> Document {
        let text = self.blocks.iter().map(|b| b.text.as_str()).collect();
        Document {
            blocks: self.blocks,
            text,
        }
    }
}

/// The assembled divergence document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<RenderedBlock>,
    text: String,
}

impl Document {
    /// Assemble `blocks` in order with first-wins deduplication.
    pub fn assemble<I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = RenderedBlock>,
    {
        let mut assembler = DocumentAssembler::new();
        for block in blocks {
            assembler.push(block);
        }
        assembler.finish()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn blocks(&self) -> &[RenderedBlock] {
        &self.blocks
    }

    /// `true` when there is nothing worth writing or sending.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Write the document to `path` as UTF-8, replacing any existing file.
    ///
    /// An empty document is not written and the destination is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Io`] if the write fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use forkdiff_extract::document::{Document, PersistOutcome};
    ///
    /// let dir = std::env::temp_dir().join("forkdiff-doc-example");
    /// let outcome = Document::default().persist(&dir.join("diff.txt")).unwrap();
    /// assert_eq!(outcome, PersistOutcome::NothingToPersist);
    /// ```
    pub fn persist(&self, path: &Path) -> Result<PersistOutcome, ForkdiffError> {
        if self.is_empty() {
            return Ok(PersistOutcome::NothingToPersist);
        }
        std::fs::write(path, self.text.as_bytes())?;
        Ok(PersistOutcome::Written {
            path: path.to_path_buf(),
            bytes: self.text.len(),
        })
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Result of [`Document::persist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The document was written.
    Written {
        /// Destination path.
        path: PathBuf,
        /// Bytes written.
        bytes: usize,
    },
    /// The document was empty; no file was created or truncated.
    NothingToPersist,
}
