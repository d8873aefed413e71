//! Compare the version marker at the latest tag with the commit being pushed.

use tracing::debug;

use crate::error::Error;
use crate::git::{Oid, Repository};
use crate::push::PushNotice;

/// How a check ended. Only [`Outcome::Unchanged`] produces a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The repository has no tags.
    NoTags,
    /// The latest tag's commit has no marker file.
    TagMarkerMissing { tag: String },
    /// The push deletes a ref; there is no local commit.
    Deletion,
    /// The pushed commit has no marker file.
    PushMarkerMissing { commit: Oid },
    /// The marker differs from the tagged one.
    Changed,
    /// The marker is the same as at the latest tag.
    Unchanged { tag: String },
}

impl Outcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged { .. })
    }
}

/// Bytes stripped from both ends of a marker: ASCII whitespace and NUL.
const TRIMMED: &[u8] = b" \t\n\x0b\x0c\r\0";

/// Strip surrounding whitespace from raw marker bytes.
pub fn trim_marker(content: &[u8]) -> &[u8] {
    let start = content
        .iter()
        .position(|b| !TRIMMED.contains(b))
        .unwrap_or(content.len());
    let end = content
        .iter()
        .rposition(|b| !TRIMMED.contains(b))
        .map_or(start, |i| i + 1);
    &content[start..end]
}

/// Marker contents are equal when their bytes match after trimming
/// surrounding whitespace. No decoding is attempted.
pub fn compare(a: &[u8], b: &[u8]) -> bool {
    trim_marker(a) == trim_marker(b)
}

/// Looks up a root-level marker file in two commits and compares it.
pub struct VersionComparator<'a, R: Repository> {
    repo: &'a R,
    marker: String,
}

impl<'a, R: Repository> VersionComparator<'a, R> {
    pub fn new(repo: &'a R, marker: impl Into<String>) -> Self {
        Self {
            repo,
            marker: marker.into(),
        }
    }

    /// Last tag of the repository's default listing.
    pub fn resolve_latest_tag(&self) -> Result<Option<String>, Error> {
        let tags = self.repo.list_tags()?;
        debug!(count = tags.len(), last = ?tags.last(), "Listed tags");
        Ok(tags.into_iter().last())
    }

    /// Commit a tag (lightweight or annotated) ultimately points at.
    pub fn resolve_commit_for_tag(&self, tag: &str) -> Result<Oid, Error> {
        self.repo.resolve_ref(tag)
    }

    /// Marker file contents at the root of `commit`, if present.
    pub fn read_marker_file(&self, commit: Oid) -> Result<Option<Vec<u8>>, Error> {
        let content = self.repo.read_root_file(commit, &self.marker)?;
        debug!(
            %commit,
            marker = %self.marker,
            found = content.is_some(),
            "Read marker"
        );
        Ok(content)
    }

    /// Run the whole check.
    ///
    /// `push` is only consulted once the tagged side has a marker, so a
    /// repository without tags never reads stdin.
    pub fn check(
        &self,
        push: impl FnOnce() -> Result<PushNotice, Error>,
    ) -> Result<Outcome, Error> {
        let Some(tag) = self.resolve_latest_tag()? else {
            return Ok(Outcome::NoTags);
        };

        let tag_commit = self.resolve_commit_for_tag(&tag)?;
        let Some(tagged) = self.read_marker_file(tag_commit)? else {
            return Ok(Outcome::TagMarkerMissing { tag });
        };

        let notice = push()?;
        debug!(
            local_ref = %notice.local_ref,
            local_sha = %notice.local_sha,
            remote_ref = ?notice.remote_ref,
            remote_sha = ?notice.remote_sha,
            "Read push notice"
        );
        if notice.is_deletion() {
            return Ok(Outcome::Deletion);
        }

        // Peel in case an annotated tag object is being pushed.
        let pushed_commit = self.repo.resolve_ref(&notice.local_sha.to_string())?;
        let Some(pushed) = self.read_marker_file(pushed_commit)? else {
            return Ok(Outcome::PushMarkerMissing {
                commit: pushed_commit,
            });
        };

        if compare(&tagged, &pushed) {
            Ok(Outcome::Unchanged { tag })
        } else {
            Ok(Outcome::Changed)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::git::{testing, GitRepo};

    /// In-memory store: each commit is a flat map of root-level blobs.
    #[derive(Default)]
    struct MemoryRepo {
        tags: Vec<(String, Oid)>,
        commits: HashMap<Oid, HashMap<String, Vec<u8>>>,
        next: u64,
    }

    impl MemoryRepo {
        fn commit_bytes(&mut self, files: &[(&str, &[u8])]) -> Oid {
            self.next += 1;
            let id = Oid::from_str(&format!("{:040x}", self.next)).unwrap();
            let tree = files
                .iter()
                .map(|&(name, content)| (name.to_string(), content.to_vec()))
                .collect();
            self.commits.insert(id, tree);
            id
        }

        fn commit(&mut self, files: &[(&str, &str)]) -> Oid {
            let files: Vec<(&str, &[u8])> = files
                .iter()
                .map(|&(name, content)| (name, content.as_bytes()))
                .collect();
            self.commit_bytes(&files)
        }

        fn tag(&mut self, name: &str, commit: Oid) {
            self.tags.push((name.to_string(), commit));
        }
    }

    impl Repository for MemoryRepo {
        fn list_tags(&self) -> Result<Vec<String>, Error> {
            Ok(self.tags.iter().map(|(name, _)| name.clone()).collect())
        }

        fn resolve_ref(&self, rev: &str) -> Result<Oid, Error> {
            if let Some((_, id)) = self.tags.iter().find(|(name, _)| name == rev) {
                return Ok(*id);
            }
            match Oid::from_str(rev) {
                Ok(id) if self.commits.contains_key(&id) => Ok(id),
                _ => Err(git2::Error::from_str("revspec not found").into()),
            }
        }

        fn read_root_file(&self, commit: Oid, name: &str) -> Result<Option<Vec<u8>>, Error> {
            let tree = self
                .commits
                .get(&commit)
                .ok_or_else(|| git2::Error::from_str("object not found"))?;
            Ok(tree.get(name).cloned())
        }
    }

    fn push_of(commit: Oid) -> impl FnOnce() -> Result<PushNotice, Error> {
        let line = format!(
            "refs/heads/main {} refs/heads/main {}",
            commit,
            "0".repeat(40)
        );
        move || PushNotice::parse(&line)
    }

    fn unread_push() -> impl FnOnce() -> Result<PushNotice, Error> {
        || -> Result<PushNotice, Error> { panic!("push notice should not be read") }
    }

    #[test]
    fn test_compare_trims_whitespace() {
        assert!(compare(b"1.2.0", b"1.2.0"));
        assert!(compare(b"1.2.0\n", b"  1.2.0\t\n"));
        assert!(compare(b"\x0b1.2.0\r\n", b"1.2.0\x0c"));
        assert!(!compare(b"1.2.0", b"1.3.0"));
        assert!(!compare(b"1.2.0", b"1. 2.0"));
    }

    #[test]
    fn test_compare_strips_nul_padding() {
        assert!(compare(b"1.2.0\0\n", b"1.2.0"));
        assert!(compare(b"\01.2.0", b"1.2.0"));
    }

    #[test]
    fn test_compare_leaves_unicode_spaces() {
        // U+00A0 is not stripped.
        assert!(!compare("1.2.0\u{a0}".as_bytes(), b"1.2.0"));
    }

    #[test]
    fn test_compare_raw_bytes() {
        // Both decode lossily to "\u{fffd}1.0" but are different files.
        assert!(!compare(b"\xff1.0", b"\xfe1.0"));
        assert!(compare(b"\xff1.0\n", b"\xff1.0"));
    }

    #[test]
    fn test_trim_marker() {
        assert_eq!(trim_marker(b"  1.0 \n"), b"1.0");
        assert_eq!(trim_marker(b" \n\t"), b"");
        assert_eq!(trim_marker(b""), b"");
    }

    #[test]
    fn test_no_tags_is_silent_without_reading_push() {
        let mut repo = MemoryRepo::default();
        repo.commit(&[("VERSION", "1.2.0")]);

        let outcome = VersionComparator::new(&repo, "VERSION")
            .check(unread_push())
            .unwrap();
        assert_eq!(outcome, Outcome::NoTags);
    }

    #[test]
    fn test_no_tags_ignores_malformed_push() {
        let repo = MemoryRepo::default();
        let outcome = VersionComparator::new(&repo, "VERSION")
            .check(|| PushNotice::parse(""))
            .unwrap();
        assert_eq!(outcome, Outcome::NoTags);
    }

    #[test]
    fn test_marker_missing_at_tag() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit(&[("README", "hello")]);
        repo.tag("v1.0", tagged);

        let outcome = VersionComparator::new(&repo, "VERSION")
            .check(unread_push())
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::TagMarkerMissing {
                tag: "v1.0".to_string()
            }
        );
    }

    #[test]
    fn test_marker_missing_at_push() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit(&[("VERSION", "1.2.0")]);
        repo.tag("v1.2.0", tagged);
        let pushed = repo.commit(&[("README", "gone")]);

        let outcome = VersionComparator::new(&repo, "VERSION")
            .check(push_of(pushed))
            .unwrap();
        assert_eq!(outcome, Outcome::PushMarkerMissing { commit: pushed });
    }

    #[test]
    fn test_unchanged_version() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit(&[("VERSION", "1.2.0\n")]);
        repo.tag("v1.2.0", tagged);
        let pushed = repo.commit(&[("VERSION", "1.2.0"), ("README", "more")]);

        let outcome = VersionComparator::new(&repo, "VERSION")
            .check(push_of(pushed))
            .unwrap();
        assert!(outcome.is_unchanged());
    }

    #[test]
    fn test_changed_version() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit(&[("VERSION", "1.2.0")]);
        repo.tag("v1.2.0", tagged);
        let pushed = repo.commit(&[("VERSION", "1.3.0")]);

        let outcome = VersionComparator::new(&repo, "VERSION")
            .check(push_of(pushed))
            .unwrap();
        assert_eq!(outcome, Outcome::Changed);
    }

    #[test]
    fn test_non_utf8_markers_that_differ_are_changed() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit_bytes(&[("VERSION", &b"\xff1.0"[..])]);
        repo.tag("v1.0", tagged);
        let pushed = repo.commit_bytes(&[("VERSION", &b"\xfe1.0"[..])]);

        let outcome = VersionComparator::new(&repo, "VERSION")
            .check(push_of(pushed))
            .unwrap();
        assert_eq!(outcome, Outcome::Changed);
    }

    #[test]
    fn test_last_listed_tag_is_used() {
        let mut repo = MemoryRepo::default();
        let c1 = repo.commit(&[("VERSION", "1.0")]);
        let c2 = repo.commit(&[("VERSION", "1.1")]);
        let c3 = repo.commit(&[("VERSION", "2.0")]);
        repo.tag("v1.0", c1);
        repo.tag("v2.0", c3);
        repo.tag("v1.1", c2);
        let pushed = repo.commit(&[("VERSION", "1.1")]);

        let comparator = VersionComparator::new(&repo, "VERSION");
        assert_eq!(
            comparator.resolve_latest_tag().unwrap().as_deref(),
            Some("v1.1")
        );
        assert_eq!(
            comparator.check(push_of(pushed)).unwrap(),
            Outcome::Unchanged {
                tag: "v1.1".to_string()
            }
        );
    }

    #[test]
    fn test_marker_name_is_case_sensitive() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit(&[("version", "1.0")]);
        repo.tag("v1.0", tagged);

        let outcome = VersionComparator::new(&repo, "VERSION")
            .check(unread_push())
            .unwrap();
        assert!(matches!(outcome, Outcome::TagMarkerMissing { .. }));
    }

    #[test]
    fn test_custom_marker_name() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit(&[("RELEASE", "3")]);
        repo.tag("r3", tagged);
        let pushed = repo.commit(&[("RELEASE", "3")]);

        let outcome = VersionComparator::new(&repo, "RELEASE")
            .check(push_of(pushed))
            .unwrap();
        assert!(outcome.is_unchanged());
    }

    #[test]
    fn test_deletion_push() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit(&[("VERSION", "1.0")]);
        repo.tag("v1.0", tagged);

        let outcome = VersionComparator::new(&repo, "VERSION")
            .check(push_of(Oid::zero()))
            .unwrap();
        assert_eq!(outcome, Outcome::Deletion);
    }

    #[test]
    fn test_unknown_pushed_commit_is_an_error() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit(&[("VERSION", "1.0")]);
        repo.tag("v1.0", tagged);
        let unknown = Oid::from_str(&"f".repeat(40)).unwrap();

        let result = VersionComparator::new(&repo, "VERSION").check(push_of(unknown));
        assert!(matches!(result, Err(Error::Git(_))));
    }

    #[test]
    fn test_malformed_push_propagates() {
        let mut repo = MemoryRepo::default();
        let tagged = repo.commit(&[("VERSION", "1.0")]);
        repo.tag("v1.0", tagged);

        let result = VersionComparator::new(&repo, "VERSION").check(|| PushNotice::parse("\n"));
        assert!(matches!(result, Err(Error::MalformedPush(_))));
    }

    #[test]
    fn test_against_real_repository() {
        let (dir, raw) = testing::init_repo();
        let c1 = testing::commit(&raw, &[("VERSION", "1.0\n")], "one");
        testing::tag(&raw, "v1.0", c1);
        let c2 = testing::commit(&raw, &[("VERSION", "1.1\n")], "two");
        testing::tag_annotated(&raw, "v1.1", c2);
        let c3 = testing::commit(&raw, &[("VERSION", "2.0\n")], "three");
        testing::tag(&raw, "v2.0", c3);
        let same = testing::commit(&raw, &[("README", "docs")], "docs only");

        let repo = GitRepo::open(dir.path()).unwrap();
        let comparator = VersionComparator::new(&repo, "VERSION");
        assert_eq!(
            comparator.resolve_latest_tag().unwrap().as_deref(),
            Some("v2.0")
        );
        assert!(comparator.check(push_of(same)).unwrap().is_unchanged());

        let bumped = testing::commit(&raw, &[("VERSION", "2.1\n")], "bump");
        assert_eq!(comparator.check(push_of(bumped)).unwrap(), Outcome::Changed);
    }

    #[test]
    fn test_pushed_annotated_tag_is_peeled() {
        let (dir, raw) = testing::init_repo();
        let c1 = testing::commit(&raw, &[("VERSION", "1.0")], "one");
        testing::tag(&raw, "v1.0", c1);
        let c2 = testing::commit(&raw, &[("CHANGES", "fix")], "two");
        let pushed_tag = testing::tag_annotated(&raw, "v1.0-hotfix", c2);

        let repo = GitRepo::open(dir.path()).unwrap();
        let comparator = VersionComparator::new(&repo, "VERSION");
        // "v1.0" sorts before "v1.0-hotfix", so the hotfix tag is latest.
        assert_eq!(
            comparator.check(push_of(pushed_tag)).unwrap(),
            Outcome::Unchanged {
                tag: "v1.0-hotfix".to_string()
            }
        );
    }
}
