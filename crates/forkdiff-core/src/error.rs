use std::path::PathBuf;

/// Errors that can occur while extracting or reviewing a branch divergence.
///
/// Library crates return this type directly; the binary reports it through
/// `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use forkdiff_core::ForkdiffError;
///
/// let err = ForkdiffError::RevisionNotFound {
///     name: "feat".into(),
///     reason: "reference not found".into(),
/// };
/// assert!(err.to_string().contains("feat"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ForkdiffError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A named revision does not resolve to a commit.
    #[error("revision '{name}' not found: {reason}")]
    #[diagnostic(help("check the branch, tag, or commit name with `git rev-parse`"))]
    RevisionNotFound {
        /// Revision name as given by the caller.
        name: String,
        /// Underlying git message.
        reason: String,
    },

    /// The two revisions share no history.
    #[error("revisions '{base}' and '{feature}' have no common ancestor")]
    NoCommonAncestor {
        /// Base revision name.
        base: String,
        /// Feature revision name.
        feature: String,
    },

    /// A commit could not be resolved to its tree.
    #[error("tree resolution error: {0}")]
    TreeResolution(String),

    /// Any other git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// LLM API or response error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl ForkdiffError {
    /// Whether the pipeline may treat this error as an empty result.
    ///
    /// Only [`ForkdiffError::NoCommonAncestor`] is recoverable; everything
    /// else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ForkdiffError::NoCommonAncestor { .. })
    }
}
