// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Artifact store
//!
//! Manages the staging area: one file per stage output, plus the
//! screenshot and response-body side directories. All stage-output
//! writes go through here and are atomic — content lands in a temp file
//! next to its destination and is renamed into place, so a crash or
//! kill mid-write never leaves a half-written artifact that a later
//! resume would mistake for a completed stage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{ReconflowError, ReconflowResult};
use crate::pipeline::ArtifactKey;

/// Subdirectories created beneath the staging root
const LAYOUT_DIRS: &[&str] = &["output", "screenshots", "output/js_out"];

/// Filesystem-backed artifact store rooted at the staging directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. The path should be absolute so
    /// artifact paths stay valid for child processes with a different cwd.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the staging layout (`output/`, `screenshots/`, `output/js_out/`)
    pub fn ensure_layout(&self) -> ReconflowResult<()> {
        for dir in LAYOUT_DIRS {
            let path = self.root.join(dir);
            std::fs::create_dir_all(&path).map_err(|e| ReconflowError::io(&path, e))?;
        }
        Ok(())
    }

    /// Absolute path of an artifact
    pub fn path(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.rel_path())
    }

    pub fn exists(&self, key: &ArtifactKey) -> bool {
        self.path(key).is_file()
    }

    /// Freshness is purely existence-based: an artifact present on disk
    /// means its stage already ran, unless a forced re-run overrides it.
    pub fn is_fresh(&self, key: &ArtifactKey, force: bool) -> bool {
        !force && self.exists(key)
    }

    /// Time since the artifact was last written
    pub fn age(&self, key: &ArtifactKey) -> Option<Duration> {
        let modified = std::fs::metadata(self.path(key)).ok()?.modified().ok()?;
        modified.elapsed().ok()
    }

    pub fn size(&self, key: &ArtifactKey) -> Option<u64> {
        std::fs::metadata(self.path(key)).ok().map(|m| m.len())
    }

    /// Read an artifact as lines
    pub fn read_lines(&self, key: &ArtifactKey) -> ReconflowResult<Vec<String>> {
        let path = self.path(key);

        if !path.is_file() {
            return Err(ReconflowError::ArtifactNotFound {
                key: key.key().to_string(),
                path,
            });
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| ReconflowError::io(&path, e))?;
        Ok(content.lines().map(str::to_string).collect())
    }

    /// Atomically write an artifact from a line sequence
    pub fn write_lines(&self, key: &ArtifactKey, lines: &[String]) -> ReconflowResult<()> {
        let staged = self.begin_write(key)?;

        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        std::fs::write(staged.tmp_path(), content)
            .map_err(|e| ReconflowError::io(staged.tmp_path(), e))?;
        staged.commit()?;
        Ok(())
    }

    /// Open a staged write for streaming producers. The caller writes to
    /// `tmp_path()` and calls `commit()`; dropping without commit removes
    /// the temp file, leaving any previous artifact untouched.
    pub fn begin_write(&self, key: &ArtifactKey) -> ReconflowResult<StagedWrite> {
        let dest = self.path(key);

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ReconflowError::io(parent, e))?;
        }

        let file_name = dest
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact");
        let tmp = dest.with_file_name(format!(".{}.tmp", file_name));

        Ok(StagedWrite {
            tmp,
            dest,
            committed: false,
        })
    }
}

/// In-flight artifact write; rename-on-commit keeps the destination
/// either absent or complete.
#[derive(Debug)]
pub struct StagedWrite {
    tmp: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl StagedWrite {
    pub fn tmp_path(&self) -> &Path {
        &self.tmp
    }

    pub fn dest_path(&self) -> &Path {
        &self.dest
    }

    /// Rename the temp file over the destination
    pub fn commit(mut self) -> ReconflowResult<PathBuf> {
        std::fs::rename(&self.tmp, &self.dest).map_err(|e| ReconflowError::io(&self.dest, e))?;
        self.committed = true;
        Ok(self.dest.clone())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed && self.tmp.exists() {
            let _ = std::fs::remove_file(&self.tmp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: ArtifactKey = ArtifactKey::new("01_subfinder", "output/01_subfinder.txt");

    fn make_store() -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_layout().unwrap();
        (dir, store)
    }

    #[test]
    fn test_layout_created() {
        let (dir, _store) = make_store();
        assert!(dir.path().join("output").is_dir());
        assert!(dir.path().join("screenshots").is_dir());
        assert!(dir.path().join("output/js_out").is_dir());
    }

    #[test]
    fn test_write_read_round_trip() {
        let (_dir, store) = make_store();

        store
            .write_lines(&KEY, &["a.example.com".into(), "b.example.com".into()])
            .unwrap();

        assert!(store.exists(&KEY));
        assert_eq!(
            store.read_lines(&KEY).unwrap(),
            vec!["a.example.com", "b.example.com"]
        );
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, store) = make_store();

        let result = store.read_lines(&KEY);
        assert!(matches!(
            result,
            Err(ReconflowError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn test_freshness_is_existence_based() {
        let (_dir, store) = make_store();

        assert!(!store.is_fresh(&KEY, false));

        store.write_lines(&KEY, &[]).unwrap();
        assert!(store.is_fresh(&KEY, false));
        // force ignores existing artifacts
        assert!(!store.is_fresh(&KEY, true));
    }

    #[test]
    fn test_empty_artifact_counts_as_present() {
        let (_dir, store) = make_store();

        store.write_lines(&KEY, &[]).unwrap();
        assert!(store.exists(&KEY));
        assert_eq!(store.size(&KEY), Some(0));
        assert!(store.read_lines(&KEY).unwrap().is_empty());
    }

    #[test]
    fn test_uncommitted_write_leaves_no_trace() {
        let (dir, store) = make_store();

        {
            let staged = store.begin_write(&KEY).unwrap();
            std::fs::write(staged.tmp_path(), "partial").unwrap();
            // dropped without commit
        }

        assert!(!store.exists(&KEY));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("output"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_commit_replaces_previous_artifact() {
        let (_dir, store) = make_store();

        store.write_lines(&KEY, &["old".into()]).unwrap();
        store.write_lines(&KEY, &["new".into()]).unwrap();

        assert_eq!(store.read_lines(&KEY).unwrap(), vec!["new"]);
    }
}
