//! Pre-push stdin parsing.
//!
//! git feeds one line per ref being pushed:
//! `<local ref> <local sha1> <remote ref> <remote sha1>`.

use std::io::BufRead;

use crate::error::Error;
use crate::git::Oid;

/// Length of a SHA-1 object id in hex digits.
const HEX_LEN: usize = 40;

/// The first ref update of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotice {
    pub local_ref: String,
    pub local_sha: Oid,
    pub remote_ref: Option<String>,
    /// Kept as sent; git reports all zeros when the remote ref does not exist.
    pub remote_sha: Option<String>,
}

impl PushNotice {
    /// Parse a single stdin line. Only the first two fields are required.
    pub fn parse(line: &str) -> Result<Self, Error> {
        let mut fields = line.split_whitespace();
        let (Some(local_ref), Some(local_sha)) = (fields.next(), fields.next()) else {
            return Err(Error::MalformedPush(line.trim_end().to_string()));
        };
        let local_sha = parse_sha(local_sha)
            .ok_or_else(|| Error::MalformedPush(line.trim_end().to_string()))?;

        Ok(Self {
            local_ref: local_ref.to_string(),
            local_sha,
            remote_ref: fields.next().map(str::to_string),
            remote_sha: fields.next().map(str::to_string),
        })
    }

    /// Read the first line from `reader`; later lines are left unread.
    pub fn read_first(mut reader: impl BufRead) -> Result<Self, Error> {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        Self::parse(&line)
    }

    /// `git push --delete` sends a null local sha.
    pub fn is_deletion(&self) -> bool {
        self.local_sha.is_zero()
    }
}

/// Full-length hex ids only; libgit2 would accept a prefix.
fn parse_sha(s: &str) -> Option<Oid> {
    if s.len() != HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Oid::from_str(s).ok()
}
