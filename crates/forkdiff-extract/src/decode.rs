//! Binary classification and robust text decoding of historical blobs.
//!
//! Known-binary extensions short-circuit before any I/O. Everything else is
//! read once and decoded with the first candidate encoding that accepts the
//! bytes strictly, falling back to a single-byte encoding that never fails.

use std::collections::HashSet;

use encoding_rs::{Encoding, GBK, UTF_8, WINDOWS_1252};
use forkdiff_core::{ExtractConfig, ForkdiffError, DEFAULT_BINARY_EXTENSIONS};
use git2::Repository;

use crate::enumerate::ContentBlob;

/// Text recovered from a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// Decoded content.
    pub text: String,
    /// Name of the encoding that produced `text`.
    pub encoding: &'static str,
    /// `true` when the fallback encoding was used.
    pub lossy: bool,
}

/// Outcome of decoding one side of a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Textual content.
    Text(DecodedText),
    /// Classified as binary; content was not read.
    Binary,
}

impl Decoded {
    /// The decoded text, or `None` for binary content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Decoded::Text(t) => Some(&t.text),
            Decoded::Binary => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Decoded::Binary)
    }
}

/// Classifies and decodes blob content.
///
/// # Examples
///
/// ```
/// use forkdiff_extract::decode::ContentDecoder;
///
/// let decoder = ContentDecoder::default();
/// assert!(decoder.is_binary_path("img/Logo.PNG"));
/// assert!(!decoder.is_binary_path("src/main.rs"));
///
/// let text = decoder.decode_bytes("héllo".as_bytes());
/// assert_eq!(text.text, "héllo");
/// assert_eq!(text.encoding, "UTF-8");
/// ```
#[derive(Debug, Clone)]
pub struct ContentDecoder {
    binary_extensions: HashSet<String>,
    candidates: Vec<&'static Encoding>,
    fallback: &'static Encoding,
}

impl Default for ContentDecoder {
    fn default() -> Self {
        Self::new(
            DEFAULT_BINARY_EXTENSIONS.iter().copied(),
            vec![UTF_8, GBK],
            WINDOWS_1252,
        )
    }
}

impl ContentDecoder {
    /// Build a decoder from an extension denylist and an encoding chain.
    ///
    /// Extensions are matched case-insensitively and may be given with or
    /// without a leading dot.
    pub fn new<I, S>(
        binary_extensions: I,
        candidates: Vec<&'static Encoding>,
        fallback: &'static Encoding,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let binary_extensions = binary_extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            binary_extensions,
            candidates,
            fallback,
        }
    }

    /// Build a decoder from the `[extract]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Config`] if an encoding label is unknown or
    /// the fallback encoding is not single-byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use forkdiff_core::ExtractConfig;
    /// use forkdiff_extract::decode::ContentDecoder;
    ///
    /// let decoder = ContentDecoder::from_config(&ExtractConfig::default()).unwrap();
    /// assert!(decoder.is_binary_path("a.zip"));
    /// ```
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ForkdiffError> {
        let candidates = config
            .encodings
            .iter()
            .map(|label| encoding_for_label(label))
            .collect::<Result<Vec<_>, _>>()?;

        let fallback = encoding_for_label(&config.fallback_encoding)?;
        if !fallback.is_single_byte() {
            return Err(ForkdiffError::Config(format!(
                "fallback encoding '{}' is not a single-byte encoding",
                config.fallback_encoding
            )));
        }

        Ok(Self::new(&config.binary_extensions, candidates, fallback))
    }

    /// Whether `path` carries a denylisted extension.
    pub fn is_binary_path(&self, path: &str) -> bool {
        std::path::Path::new(path)
            .extension()
            .map(|e| {
                self.binary_extensions
                    .contains(&e.to_string_lossy().to_ascii_lowercase())
            })
            .unwrap_or(false)
    }

    /// Classify and decode `blob`, reading it from `repo` only when its
    /// extension is not denylisted.
    ///
    /// # Errors
    ///
    /// Returns [`ForkdiffError::Git`] if the blob cannot be read. Decoding
    /// itself never fails.
    pub fn decode(&self, repo: &Repository, blob: &ContentBlob) -> Result<Decoded, ForkdiffError> {
        if self.is_binary_path(&blob.path) {
            return Ok(Decoded::Binary);
        }
        let object = blob.read(repo)?;
        let decoded = self.decode_bytes(object.content());
        if decoded.lossy {
            tracing::warn!(
                path = %blob.path,
                encoding = decoded.encoding,
                "no candidate encoding matched, decoded lossily"
            );
        }
        Ok(Decoded::Text(decoded))
    }

    /// Decode raw bytes. Total over every input.
    pub fn decode_bytes(&self, bytes: &[u8]) -> DecodedText {
        for &encoding in &self.candidates {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
            {
                return DecodedText {
                    text: text.into_owned(),
                    encoding: encoding.name(),
                    lossy: false,
                };
            }
        }

        let (text, _had_errors) = self.fallback.decode_without_bom_handling(bytes);
        DecodedText {
            text: text.into_owned(),
            encoding: self.fallback.name(),
            lossy: true,
        }
    }
}

fn encoding_for_label(label: &str) -> Result<&'static Encoding, ForkdiffError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ForkdiffError::Config(format!("unknown encoding '{label}'")))
}
