use std::path::Path;

use forkdiff_core::{ChangeKind, ForkdiffError};
use forkdiff_extract::document::PersistOutcome;
use forkdiff_extract::render::BINARY_NOTICE;
use forkdiff_extract::{extract_divergence, ExtractOptions};
use git2::{Oid, Repository, Signature};

/// Create a repo in a temp dir and commit full snapshots onto named branches.
struct Fixture {
    dir: tempfile::TempDir,
    repo: Repository,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    fn commit(&self, branch: &str, files: &[(&str, &[u8])], parents: &[Oid]) -> Oid {
        let mut index = self.repo.index().unwrap();
        index.clear().unwrap();
        for (path, content) in files {
            let full = self.dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Fixture", "fixture@example.com").unwrap();
        let parents: Vec<_> = parents
            .iter()
            .map(|p| self.repo.find_commit(*p).unwrap())
            .collect();
        let parent_refs: Vec<_> = parents.iter().collect();
        let oid = self
            .repo
            .commit(None, &sig, &sig, branch, &tree, &parent_refs)
            .unwrap();
        self.repo
            .branch(branch, &self.repo.find_commit(oid).unwrap(), true)
            .unwrap();
        oid
    }

    fn extract(&self, base: &str, feature: &str) -> forkdiff_extract::Extraction {
        extract_divergence(self.dir.path(), base, feature, &ExtractOptions::default()).unwrap()
    }
}

#[test]
fn added_file_produces_single_block() {
    let fx = Fixture::new();
    let x = fx.commit("main", &[("README", b"readme\n")], &[]);
    fx.commit("feat", &[("README", b"readme\n"), ("foo.txt", b"hello\n")], &[x]);

    let extraction = fx.extract("main", "feat");
    assert_eq!(extraction.document.as_str(), "新文件: foo.txt\nhello\n\n\n");
    assert_eq!(extraction.document.blocks().len(), 1);
}

#[test]
fn added_png_is_replaced_by_notice() {
    let fx = Fixture::new();
    let x = fx.commit("main", &[("README", b"readme\n")], &[]);
    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0xFF];
    fx.commit("feat", &[("README", b"readme\n"), ("bar.png", &png)], &[x]);

    let doc = fx.extract("main", "feat").document;
    assert_eq!(doc.as_str(), format!("新文件: bar.png\n{BINARY_NOTICE}\n\n"));
    assert!(!doc.as_str().contains("PNG"));
}

#[test]
fn unchanged_rename_has_empty_hunk() {
    let fx = Fixture::new();
    let body: String = (0..30).map(|i| format!("print({i})\n")).collect();
    let x = fx.commit("main", &[("a.py", body.as_bytes())], &[]);
    fx.commit("feat", &[("b.py", body.as_bytes())], &[x]);

    let doc = fx.extract("main", "feat").document;
    assert_eq!(doc.blocks().len(), 1);
    let block = &doc.blocks()[0];
    assert_eq!(block.kind, ChangeKind::Renamed);
    assert!(block.text.starts_with("修改文件: a.py -> b.py\n"));
    assert!(!block
        .text
        .lines()
        .any(|l| l.starts_with('+') || l.starts_with('-')));
}

#[test]
fn disjoint_branches_persist_nothing() {
    let fx = Fixture::new();
    fx.commit("main", &[("a.txt", b"a\n")], &[]);
    fx.commit("orphan", &[("b.txt", b"b\n")], &[]);

    let extraction = fx.extract("main", "orphan");
    assert!(extraction.fork_point.is_none());
    assert!(extraction.document.is_empty());

    let out = tempfile::tempdir().unwrap();
    let dest = out.path().join("diff.txt");
    let outcome = extraction.document.persist(&dest).unwrap();
    assert_eq!(outcome, PersistOutcome::NothingToPersist);
    assert!(!dest.exists());
}

#[test]
fn deleted_and_modified_files_render_in_tree_order() {
    let fx = Fixture::new();
    let x = fx.commit(
        "main",
        &[("docs/old.md", b"old docs\n"), ("src/lib.rs", b"fn a() {}\nfn b() {}\n")],
        &[],
    );
    fx.commit(
        "feat",
        &[("src/lib.rs", b"fn a() {}\nfn c() {}\n")],
        &[x],
    );

    let doc = fx.extract("main", "feat").document;
    assert_eq!(
        doc.as_str(),
        "删除的文件: docs/old.md\n\n\
         修改文件: src/lib.rs\n\
         --- a/src/lib.rs\n\
         +++ b/src/lib.rs\n\
         @@ -2 +2 @@\n\
         -fn b() {}\n\
         +fn c() {}\n\
         \n\n"
    );
    assert!(!doc.as_str().contains("old docs"));
}

#[test]
fn only_feature_side_changes_are_reported() {
    let fx = Fixture::new();
    let x = fx.commit("base-root", &[("shared.txt", b"v1\n")], &[]);
    fx.commit("main", &[("shared.txt", b"v2 from main\n")], &[x]);
    fx.commit("feat", &[("shared.txt", b"v1\n"), ("feature.txt", b"f\n")], &[x]);

    let doc = fx.extract("main", "feat").document;
    assert_eq!(doc.as_str(), "新文件: feature.txt\nf\n\n\n");
}

#[test]
fn gbk_content_is_decoded() {
    let fx = Fixture::new();
    let x = fx.commit("main", &[("README", b"r\n")], &[]);
    // "你好" in GBK
    fx.commit(
        "feat",
        &[("README", b"r\n"), ("greeting.txt", &[0xC4, 0xE3, 0xBA, 0xC3, b'\n'])],
        &[x],
    );

    let extraction = fx.extract("main", "feat");
    assert_eq!(
        extraction.document.as_str(),
        "新文件: greeting.txt\n你好\n\n\n"
    );
    assert_eq!(extraction.stats.lossy_sides, 0);
}

#[test]
fn unknown_revision_is_fatal() {
    let fx = Fixture::new();
    fx.commit("main", &[("a.txt", b"a\n")], &[]);

    let err = extract_divergence(
        fx.dir.path(),
        "main",
        "no-such-branch",
        &ExtractOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ForkdiffError::RevisionNotFound { .. }));
}

#[test]
fn missing_repository_is_a_git_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = extract_divergence(dir.path(), "main", "feat", &ExtractOptions::default())
        .unwrap_err();
    assert!(matches!(err, ForkdiffError::Git(_)));
}

#[test]
fn extraction_is_deterministic() {
    let fx = Fixture::new();
    let x = fx.commit("main", &[("a.txt", b"1\n2\n3\n")], &[]);
    fx.commit(
        "feat",
        &[("a.txt", b"1\n3\n4\n"), ("b/c.txt", b"c\n"), ("d.bin", b"\x00\x01")],
        &[x],
    );

    let first = fx.extract("main", "feat").document;
    let second = fx.extract("main", "feat").document;
    assert_eq!(first.as_str(), second.as_str());
}
