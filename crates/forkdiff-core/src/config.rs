use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ForkdiffError;

/// Extensions treated as binary without reading the blob.
///
/// Images, archives, executables, shared libraries, object code, fonts and
/// PDFs. Compared case-insensitively, without the leading dot.
pub const DEFAULT_BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tif", "tiff", "psd",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "jar", "war",
    // executables and libraries
    "exe", "dll", "so", "dylib", "a", "lib", "o", "obj", "bin", "class", "pyc", "wasm",
    // documents and fonts
    "pdf", "ttf", "otf", "woff", "woff2",
];

/// Top-level configuration loaded from `.forkdiff.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use forkdiff_core::ForkdiffConfig;
///
/// let config = ForkdiffConfig::default();
/// assert_eq!(config.llm.model, "deepseek-chat");
/// assert_eq!(config.extract.encodings, vec!["utf-8", "gbk"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForkdiffConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Diff extraction settings.
    #[serde(default)]
    pub extract: ExtractConfig,
}

impl ForkdiffConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Io`] if the file cannot be read, or
    /// [`ForkdiffError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use forkdiff_core::ForkdiffConfig;
    /// use std::path::Path;
    ///
    /// let config = ForkdiffConfig::from_file(Path::new(".forkdiff.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ForkdiffError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use forkdiff_core::ForkdiffConfig;
    ///
    /// let toml = r#"
    /// [extract]
    /// rename_threshold = 80
    /// "#;
    /// let config = ForkdiffConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.extract.rename_threshold, 80);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ForkdiffError> {
        let config: Self = toml::from_str(content)?;
        if config.extract.rename_threshold > 100 {
            return Err(ForkdiffError::Config(format!(
                "extract.rename_threshold must be between 0 and 100, got {}",
                config.extract.rename_threshold
            )));
        }
        Ok(config)
    }
}

/// LLM provider configuration for an OpenAI-compatible endpoint.
///
/// # Examples
///
/// ```
/// use forkdiff_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.timeout_secs, 90);
/// assert_eq!(config.temperature, 0.3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider. Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "deepseek-chat".into()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    90
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Diff extraction configuration.
///
/// # Examples
///
/// ```
/// use forkdiff_core::ExtractConfig;
///
/// let config = ExtractConfig::default();
/// assert_eq!(config.fallback_encoding, "latin1");
/// assert_eq!(config.rename_threshold, 50);
/// assert!(config.ignore_blank_lines);
/// assert!(!config.omit_empty_modifications);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Encodings tried in order with strict decoding (default: utf-8, gbk).
    #[serde(default = "default_encodings")]
    pub encodings: Vec<String>,
    /// Single-byte encoding used with lossy substitution when every
    /// candidate fails (default: latin1).
    #[serde(default = "default_fallback_encoding")]
    pub fallback_encoding: String,
    /// File extensions classified as binary without reading content.
    #[serde(default = "default_binary_extensions")]
    pub binary_extensions: Vec<String>,
    /// Similarity percentage above which a delete/add pair is a rename (default: 50).
    #[serde(default = "default_rename_threshold")]
    pub rename_threshold: u16,
    /// Ignore trailing whitespace when comparing lines (default: true).
    #[serde(default = "default_true")]
    pub ignore_whitespace_eol: bool,
    /// Ignore added or removed blank lines (default: true).
    #[serde(default = "default_true")]
    pub ignore_blank_lines: bool,
    /// Leave out modified files whose diff body is empty (default: false).
    #[serde(default)]
    pub omit_empty_modifications: bool,
    /// Glob patterns for paths to leave out of the document.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
}

fn default_encodings() -> Vec<String> {
    vec!["utf-8".into(), "gbk".into()]
}

fn default_fallback_encoding() -> String {
    "latin1".into()
}

fn default_binary_extensions() -> Vec<String> {
    DEFAULT_BINARY_EXTENSIONS
        .iter()
        .map(|e| (*e).to_string())
        .collect()
}

fn default_rename_threshold() -> u16 {
    50
}

fn default_true() -> bool {
    true
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            encodings: default_encodings(),
            fallback_encoding: default_fallback_encoding(),
            binary_extensions: default_binary_extensions(),
            rename_threshold: default_rename_threshold(),
            ignore_whitespace_eol: true,
            ignore_blank_lines: true,
            omit_empty_modifications: false,
            skip_patterns: Vec::new(),
        }
    }
}
