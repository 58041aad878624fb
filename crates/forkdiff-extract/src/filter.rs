//! Path filtering before anything is decoded or rendered.
//!
//! Lets users keep vendored code, lock files and fixtures out of the
//! document that goes to the LLM.

use forkdiff_core::ForkdiffError;

use crate::enumerate::ChangeRecord;

/// Glob-based path filter.
///
/// # Examples
///
/// ```
/// use forkdiff_extract::filter::PathFilter;
///
/// let filter = PathFilter::new(&["vendor/**".to_string(), "*.lock".to_string()]).unwrap();
/// assert_eq!(filter.matching_pattern("vendor/lib/x.c"), Some("vendor/**"));
/// assert_eq!(filter.matching_pattern("Cargo.lock"), Some("*.lock"));
/// assert_eq!(filter.matching_pattern("src/main.rs"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<glob::Pattern>,
}

impl PathFilter {
    /// Compile `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Config`] naming the first invalid pattern.
    pub fn new(patterns: &[String]) -> Result<Self, ForkdiffError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| ForkdiffError::Config(format!("invalid skip pattern '{p}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The first pattern matching `path`, if any.
    pub fn matching_pattern(&self, path: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.matches(path))
            .map(|p| p.as_str())
    }

    /// The first pattern matching either side of `record`.
    pub fn matches_record(&self, record: &ChangeRecord) -> Option<&str> {
        record
            .new_path()
            .and_then(|p| self.matching_pattern(p))
            .or_else(|| record.old_path().and_then(|p| self.matching_pattern(p)))
    }
}
