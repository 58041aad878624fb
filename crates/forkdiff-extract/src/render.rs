//! Per-path text blocks for the divergence document.
//!
//! Block layout:
//!
//! ```text
//! 新文件: <path>\n<content>\n\n
//! 删除的文件: <path>\n\n
//! 修改文件: <path or old -> new>\n<diff lines>\n\n
//! ```
//!
//! Modified and renamed files get a context-free unified diff: only changed
//! line groups, each under a zero-context `@@` header.

use std::fmt::Write as _;

use forkdiff_core::{ChangeKind, EffectivePath, ExtractConfig};
use serde::Serialize;
use similar::{capture_diff_slices, group_diff_ops, Algorithm, DiffOp, DiffTag};

use crate::decode::Decoded;
use crate::enumerate::ChangeRecord;

/// Printed in place of content that was classified as binary.
pub const BINARY_NOTICE: &str = "[二进制文件，内容已省略]";

const ADDED_HEADER: &str = "新文件";
const DELETED_HEADER: &str = "删除的文件";
const MODIFIED_HEADER: &str = "修改文件";

/// Line comparison settings.
///
/// # Examples
///
/// ```
/// use forkdiff_extract::render::RenderOptions;
///
/// let opts = RenderOptions::default();
/// assert!(opts.ignore_whitespace_eol);
/// assert!(opts.ignore_blank_lines);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Compare lines with trailing whitespace removed.
    pub ignore_whitespace_eol: bool,
    /// Leave blank lines out of the comparison entirely.
    pub ignore_blank_lines: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            ignore_whitespace_eol: true,
            ignore_blank_lines: true,
        }
    }
}

impl From<&ExtractConfig> for RenderOptions {
    fn from(config: &ExtractConfig) -> Self {
        Self {
            ignore_whitespace_eol: config.ignore_whitespace_eol,
            ignore_blank_lines: config.ignore_blank_lines,
        }
    }
}

/// One rendered path block, ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedBlock {
    /// Identity used for deduplication.
    pub path: EffectivePath,
    /// Change classification.
    pub kind: ChangeKind,
    /// Block text, including its trailing blank line.
    pub text: String,
    /// `false` for a modification whose diff body came out empty.
    pub has_changes: bool,
}

/// Render the block for `record` from its decoded sides.
///
/// `old` and `new` are ignored where the record has no such side; deleted
/// records never need either.
///
/// # Examples
///
/// ```
/// use forkdiff_extract::decode::ContentDecoder;
/// use forkdiff_extract::enumerate::{ChangeRecord, ContentBlob};
/// use forkdiff_extract::render::{render_block, RenderOptions};
/// use git2::Oid;
///
/// let record = ChangeRecord::added(ContentBlob::new(Oid::zero(), "foo.txt", Oid::zero()));
/// let new = forkdiff_extract::decode::Decoded::Text(
///     ContentDecoder::default().decode_bytes(b"hello\n"),
/// );
/// let block = render_block(&record, None, Some(&new), &RenderOptions::default());
/// assert_eq!(block.text, "新文件: foo.txt\nhello\n\n\n");
/// ```
pub fn render_block(
    record: &ChangeRecord,
    old: Option<&Decoded>,
    new: Option<&Decoded>,
    options: &RenderOptions,
) -> RenderedBlock {
    let path = record.effective_path();
    let kind = record.kind();

    let (text, has_changes) = match kind {
        ChangeKind::Added => {
            let body = match new {
                Some(Decoded::Text(t)) => t.text.as_str(),
                Some(Decoded::Binary) => BINARY_NOTICE,
                None => "",
            };
            (format!("{ADDED_HEADER}: {path}\n{body}\n\n"), true)
        }
        ChangeKind::Deleted => (format!("{DELETED_HEADER}: {path}\n\n"), true),
        ChangeKind::Modified | ChangeKind::Renamed => {
            let old_text = old.and_then(Decoded::as_text);
            let new_text = new.and_then(Decoded::as_text);
            let binary = old.is_some_and(Decoded::is_binary) || new.is_some_and(Decoded::is_binary);

            if binary {
                (format!("{MODIFIED_HEADER}: {path}\n{BINARY_NOTICE}\n\n"), true)
            } else {
                let body = unified_diff(
                    record.old_path().unwrap_or_default(),
                    record.new_path().unwrap_or_default(),
                    old_text.unwrap_or_default(),
                    new_text.unwrap_or_default(),
                    options,
                );
                let has_changes = !body.is_empty();
                (format!("{MODIFIED_HEADER}: {path}\n{body}\n\n"), has_changes)
            }
        }
    };

    RenderedBlock {
        path,
        kind,
        text,
        has_changes,
    }
}

/// A line kept for comparison, with its original 1-based number.
struct Line<'a> {
    number: usize,
    text: &'a str,
    key: &'a str,
}

/// Splits on `\n` only. A trailing `\r` stays in the key unless EOL
/// whitespace is ignored, so CRLF to LF counts as a change; it is never
/// printed.
fn significant_lines<'a>(content: &'a str, options: &RenderOptions) -> Vec<Line<'a>> {
    content
        .split_inclusive('\n')
        .enumerate()
        .filter_map(|(i, segment)| {
            let raw = segment.strip_suffix('\n').unwrap_or(segment);
            let text = raw.strip_suffix('\r').unwrap_or(raw);
            let key = if options.ignore_whitespace_eol {
                raw.trim_end()
            } else {
                raw
            };
            if options.ignore_blank_lines && key.trim().is_empty() {
                return None;
            }
            Some(Line {
                number: i + 1,
                text,
                key,
            })
        })
        .collect()
}

/// Context-free unified diff of `old` against `new`.
///
/// Returns an empty string when no significant line differs; otherwise the
/// `---`/`+++` file header followed by one `@@` hunk per changed group.
/// Every emitted line ends in `\n`.
///
/// # Examples
///
/// ```
/// use forkdiff_extract::render::{unified_diff, RenderOptions};
///
/// let diff = unified_diff("a.txt", "a.txt", "x\ny\n", "x\nz\n", &RenderOptions::default());
/// assert_eq!(diff, "--- a/a.txt\n+++ b/a.txt\n@@ -2 +2 @@\n-y\n+z\n");
/// ```
pub fn unified_diff(
    old_path: &str,
    new_path: &str,
    old: &str,
    new: &str,
    options: &RenderOptions,
) -> String {
    let old_lines = significant_lines(old, options);
    let new_lines = significant_lines(new, options);
    let old_keys: Vec<&str> = old_lines.iter().map(|l| l.key).collect();
    let new_keys: Vec<&str> = new_lines.iter().map(|l| l.key).collect();

    let ops = capture_diff_slices(Algorithm::Myers, &old_keys, &new_keys);

    let mut out = String::new();
    for group in group_diff_ops(ops, 0) {
        let changes: Vec<&DiffOp> = group
            .iter()
            .filter(|op| op.tag() != DiffTag::Equal)
            .collect();
        let (Some(first), Some(last)) = (changes.first(), changes.last()) else {
            continue;
        };

        if out.is_empty() {
            let _ = writeln!(out, "--- a/{old_path}");
            let _ = writeln!(out, "+++ b/{new_path}");
        }

        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            hunk_range(&old_lines, old_range),
            hunk_range(&new_lines, new_range)
        );

        for op in changes {
            let (tag, old_r, new_r) = op.as_tag_tuple();
            if matches!(tag, DiffTag::Delete | DiffTag::Replace) {
                for line in &old_lines[old_r] {
                    let _ = writeln!(out, "-{}", line.text);
                }
            }
            if matches!(tag, DiffTag::Insert | DiffTag::Replace) {
                for line in &new_lines[new_r] {
                    let _ = writeln!(out, "+{}", line.text);
                }
            }
        }
    }
    out
}

/// `start[,len]` in original line numbers. An empty range points at the
/// last significant line before the insertion point, so skipped blank lines
/// in between are not counted.
fn hunk_range(lines: &[Line<'_>], range: std::ops::Range<usize>) -> String {
    let len = range.len();
    if len == 0 {
        let before = match range.start {
            0 => 0,
            i => lines[i - 1].number,
        };
        return format!("{before},0");
    }
    let start = lines[range.start].number;
    if len == 1 {
        format!("{start}")
    } else {
        format!("{start},{len}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ContentDecoder;
    use crate::enumerate::ContentBlob;
    use git2::Oid;

    fn blob(path: &str) -> ContentBlob {
        ContentBlob::new(Oid::zero(), path, Oid::zero())
    }

    fn text(s: &str) -> Decoded {
        Decoded::Text(ContentDecoder::default().decode_bytes(s.as_bytes()))
    }

    fn has_diff_markers(block: &str) -> bool {
        block
            .lines()
            .skip(1)
            .any(|l| l.starts_with('+') || l.starts_with('-'))
    }

    #[test]
    fn added_block_carries_full_content() {
        let record = ChangeRecord::added(blob("foo.txt"));
        let block = render_block(&record, None, Some(&text("hello\n")), &RenderOptions::default());
        assert_eq!(block.text, "新文件: foo.txt\nhello\n\n\n");
        assert_eq!(block.kind, ChangeKind::Added);
        assert!(block.has_changes);
    }

    #[test]
    fn added_block_has_no_diff_markers() {
        let record = ChangeRecord::added(blob("notes.md"));
        let new = text("plain line\nanother\n");
        let block = render_block(&record, None, Some(&new), &RenderOptions::default());
        assert!(!has_diff_markers(&block.text));
    }

    #[test]
    fn added_binary_shows_notice() {
        let record = ChangeRecord::added(blob("bar.png"));
        let block = render_block(&record, None, Some(&Decoded::Binary), &RenderOptions::default());
        assert_eq!(block.text, format!("新文件: bar.png\n{BINARY_NOTICE}\n\n"));
    }

    #[test]
    fn deleted_block_has_no_body() {
        let record = ChangeRecord::deleted(blob("old/gone.rs"));
        let block = render_block(&record, Some(&text("secret\n")), None, &RenderOptions::default());
        assert_eq!(block.text, "删除的文件: old/gone.rs\n\n");
        assert!(!block.text.contains("secret"));
    }

    #[test]
    fn modified_block_shows_only_changed_lines() {
        let record = ChangeRecord::modified(blob("src/lib.rs"), blob("src/lib.rs"));
        let old = text("a\nb\nc\nd\ne\n");
        let new = text("a\nB\nc\nd\ne\nf\n");
        let block = render_block(&record, Some(&old), Some(&new), &RenderOptions::default());
        assert_eq!(
            block.text,
            "修改文件: src/lib.rs\n\
             --- a/src/lib.rs\n\
             +++ b/src/lib.rs\n\
             @@ -2 +2 @@\n\
             -b\n\
             +B\n\
             @@ -5,0 +6 @@\n\
             +f\n\
             \n\n"
        );
        assert!(block.has_changes);
    }

    #[test]
    fn identical_rename_renders_empty_hunk() {
        let record = ChangeRecord::renamed(blob("a.py"), blob("b.py"));
        let body = text("print('hi')\n");
        let block = render_block(&record, Some(&body), Some(&body), &RenderOptions::default());
        assert_eq!(block.text, "修改文件: a.py -> b.py\n\n\n");
        assert!(!has_diff_markers(&block.text));
        assert!(!block.has_changes);
    }

    #[test]
    fn edited_rename_uses_both_paths_in_file_header() {
        let record = ChangeRecord::renamed(blob("a.py"), blob("b.py"));
        let block = render_block(
            &record,
            Some(&text("x = 1\n")),
            Some(&text("x = 2\n")),
            &RenderOptions::default(),
        );
        assert!(block.text.starts_with("修改文件: a.py -> b.py\n--- a/a.py\n+++ b/b.py\n"));
    }

    #[test]
    fn binary_side_skips_line_diff() {
        let record = ChangeRecord::modified(blob("icon.ico"), blob("icon.ico"));
        let block = render_block(
            &record,
            Some(&Decoded::Binary),
            Some(&Decoded::Binary),
            &RenderOptions::default(),
        );
        assert_eq!(block.text, format!("修改文件: icon.ico\n{BINARY_NOTICE}\n\n"));
    }

    #[test]
    fn whitespace_only_changes_are_suppressed() {
        let old = "fn f() {\n    1\n}\n";
        let new = "fn f() {   \n\n    1\n\n}\n";
        assert_eq!(unified_diff("f.rs", "f.rs", old, new, &RenderOptions::default()), "");
    }

    #[test]
    fn whitespace_is_significant_when_configured() {
        let opts = RenderOptions {
            ignore_whitespace_eol: false,
            ignore_blank_lines: false,
        };
        let diff = unified_diff("f.txt", "f.txt", "a\n", "a \n\n", &opts);
        assert_eq!(diff, "--- a/f.txt\n+++ b/f.txt\n@@ -1 +1,2 @@\n-a\n+a \n+\n");
    }

    #[test]
    fn printed_lines_keep_original_text() {
        let diff = unified_diff("t", "t", "keep\nold  \n", "keep\nnew  \n", &RenderOptions::default());
        assert!(diff.contains("-old  \n"));
        assert!(diff.contains("+new  \n"));
    }

    #[test]
    fn hunk_numbers_refer_to_original_lines() {
        let old = "a\n\n\nb\n";
        let new = "a\n\n\nc\n";
        let diff = unified_diff("f", "f", old, new, &RenderOptions::default());
        assert!(diff.contains("@@ -4 +4 @@\n"));
    }

    #[test]
    fn deletion_at_start_points_before_first_line() {
        let diff = unified_diff("f", "f", "x\ny\n", "y\n", &RenderOptions::default());
        assert_eq!(diff, "--- a/f\n+++ b/f\n@@ -1 +0,0 @@\n-x\n");
    }

    #[test]
    fn crlf_content_compares_by_line() {
        let diff = unified_diff("w", "w", "a\r\nb\r\n", "a\nb\n", &RenderOptions::default());
        assert_eq!(diff, "");
    }

    #[test]
    fn line_ending_change_is_visible_when_eol_whitespace_counts() {
        let opts = RenderOptions {
            ignore_whitespace_eol: false,
            ignore_blank_lines: true,
        };
        let diff = unified_diff("w", "w", "a\r\nx\r\n", "a\r\nx\n", &opts);
        assert_eq!(diff, "--- a/w\n+++ b/w\n@@ -2 +2 @@\n-x\n+x\n");
    }

    #[test]
    fn insertion_after_blank_lines_anchors_on_last_significant_line() {
        let diff = unified_diff("f", "f", "a\n\nb\n", "a\n\nX\nb\n", &RenderOptions::default());
        assert_eq!(diff, "--- a/f\n+++ b/f\n@@ -1,0 +3 @@\n+X\n");
    }

    #[test]
    fn rendering_is_idempotent() {
        let record = ChangeRecord::modified(blob("m.txt"), blob("m.txt"));
        let old = text("1\n2\n3\n");
        let new = text("1\n3\n4\n");
        let opts = RenderOptions::default();
        let first = render_block(&record, Some(&old), Some(&new), &opts);
        let second = render_block(&record, Some(&old), Some(&new), &opts);
        assert_eq!(first, second);
    }
}
