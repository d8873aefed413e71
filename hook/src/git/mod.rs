//! Read-only access to a git object store.
//!
//! The comparator only ever needs three queries: list tags, peel a revision
//! to a commit, and read a file from a commit's root tree. They live behind
//! [`Repository`] so the hook logic can be driven by an in-memory store in
//! tests.

mod repo;

pub use git2::Oid;

use crate::error::Error;

pub use repo::GitRepo;
#[cfg(test)]
pub(crate) use repo::tests as testing;

/// Read-only repository queries.
pub trait Repository {
    /// Tag names in `git tag` listing order.
    fn list_tags(&self) -> Result<Vec<String>, Error>;

    /// Peel a revision (tag name, tag object or commit id) to a commit id.
    fn resolve_ref(&self, rev: &str) -> Result<Oid, Error>;

    /// Raw bytes of the blob named `name` in the root tree of `commit`.
    ///
    /// Only top-level blob entries match, and names are compared exactly.
    fn read_root_file(&self, commit: Oid, name: &str) -> Result<Option<Vec<u8>>, Error>;
}
