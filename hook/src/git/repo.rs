//! libgit2-backed [`Repository`].

use std::path::{Path, PathBuf};

use git2::{ErrorCode, ObjectType, Oid};
use tracing::debug;

use super::Repository;
use crate::error::Error;

/// A repository opened with libgit2.
pub struct GitRepo {
    repo: git2::Repository,
}

impl GitRepo {
    /// Open the repository at exactly `path`.
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            repo: git2::Repository::open(path)?,
        })
    }

    /// Find the repository containing `dir`, searching parent directories.
    pub fn discover(dir: &Path) -> Result<Self, Error> {
        match git2::Repository::discover(dir) {
            Ok(repo) => Ok(Self { repo }),
            Err(e) if e.code() == ErrorCode::NotFound => {
                Err(Error::NotARepository(dir.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Working tree root, or the git dir for bare repositories.
    pub fn root(&self) -> &Path {
        self.repo.workdir().unwrap_or_else(|| self.repo.path())
    }

    /// Directory git runs hooks from, honouring `core.hooksPath` and shared
    /// worktree git dirs.
    pub fn hooks_dir(&self) -> Result<PathBuf, Error> {
        let config = self.repo.config()?;
        match config.get_path("core.hooksPath") {
            Ok(path) if path.is_absolute() => Ok(path),
            Ok(path) => Ok(self.root().join(path)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(self.repo.commondir().join("hooks")),
            Err(e) => Err(e.into()),
        }
    }
}

impl Repository for GitRepo {
    fn list_tags(&self) -> Result<Vec<String>, Error> {
        let names = self.repo.tag_names(None)?;
        let mut tags: Vec<String> = names.iter().flatten().map(str::to_string).collect();
        // `git tag` lists by refname; libgit2 yields loose refs before packed ones.
        tags.sort();
        debug!(count = tags.len(), "Listed tags");
        Ok(tags)
    }

    fn resolve_ref(&self, rev: &str) -> Result<Oid, Error> {
        let commit = self.repo.revparse_single(rev)?.peel_to_commit()?;
        debug!(rev, commit = %commit.id(), "Resolved revision");
        Ok(commit.id())
    }

    fn read_root_file(&self, commit: Oid, name: &str) -> Result<Option<Vec<u8>>, Error> {
        let tree = self.repo.find_commit(commit)?.tree()?;
        let Some(entry) = tree.get_name(name) else {
            return Ok(None);
        };
        if entry.kind() != Some(ObjectType::Blob) {
            debug!(%commit, name, kind = ?entry.kind(), "Root entry is not a blob");
            return Ok(None);
        }
        let blob = self.repo.find_blob(entry.id())?;
        Ok(Some(blob.content().to_vec()))
    }
}
