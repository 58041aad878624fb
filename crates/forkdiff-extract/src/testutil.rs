//! Throwaway repositories for unit tests.

use std::path::Path;

use git2::{IndexEntry, IndexTime, Oid, Repository, Signature};
use tempfile::TempDir;

pub(crate) struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    /// Commit a full snapshot containing exactly `files` on top of `parents`.
    ///
    /// HEAD is left untouched; use [`TestRepo::branch`] to name the commit.
    pub fn commit(&self, files: &[(&str, &[u8])], parents: &[Oid]) -> Oid {
        self.commit_with_gitlinks(files, &[], parents)
    }

    /// Like [`TestRepo::commit`], plus submodule entries pointing at commits
    /// that do not exist in this repository.
    pub fn commit_with_gitlinks(
        &self,
        files: &[(&str, &[u8])],
        gitlinks: &[&str],
        parents: &[Oid],
    ) -> Oid {
        let missing = Oid::from_str("1111111111111111111111111111111111111111").unwrap();
        let entries = gitlinks
            .iter()
            .map(|path| raw_entry(path.as_bytes(), missing, 0o160000))
            .collect();
        self.commit_snapshot(files, entries, parents)
    }

    /// Like [`TestRepo::commit`], plus blobs stored under raw byte paths
    /// that need not be valid UTF-8.
    pub fn commit_with_raw_paths(
        &self,
        files: &[(&str, &[u8])],
        raw: &[(&[u8], &[u8])],
        parents: &[Oid],
    ) -> Oid {
        let entries = raw
            .iter()
            .map(|(path, content)| raw_entry(path, self.repo.blob(content).unwrap(), 0o100644))
            .collect();
        self.commit_snapshot(files, entries, parents)
    }

    fn commit_snapshot(
        &self,
        files: &[(&str, &[u8])],
        extra: Vec<IndexEntry>,
        parents: &[Oid],
    ) -> Oid {
        let mut index = self.repo.index().unwrap();
        index.clear().unwrap();
        for (path, content) in files {
            let full = self.dir.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&full, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        for entry in &extra {
            index.add(entry).unwrap();
        }
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent_commits: Vec<_> = parents
            .iter()
            .map(|p| self.repo.find_commit(*p).unwrap())
            .collect();
        let parent_refs: Vec<_> = parent_commits.iter().collect();
        self.repo
            .commit(None, &sig, &sig, "test commit", &tree, &parent_refs)
            .unwrap()
    }

    pub fn branch(&self, name: &str, target: Oid) {
        let commit = self.repo.find_commit(target).unwrap();
        self.repo.branch(name, &commit, true).unwrap();
    }
}

fn raw_entry(path: &[u8], id: Oid, mode: u32) -> IndexEntry {
    IndexEntry {
        ctime: IndexTime::new(0, 0),
        mtime: IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode,
        uid: 0,
        gid: 0,
        file_size: 0,
        id,
        flags: 0,
        flags_extended: 0,
        path: path.to_vec(),
    }
}
