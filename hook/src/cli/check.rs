//! The pre-push hook itself.

use std::io::{BufRead, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::comparator::{Outcome, VersionComparator};
use crate::config::Config;
use crate::error::Error;
use crate::git::{GitRepo, Repository};
use crate::push::PushNotice;

/// Compare and report, returning the process exit code.
///
/// `remote` and `url` are what git passes to the hook; they are only logged.
/// The notice goes to `out`, diagnostics to stderr. No error escapes: each
/// one is reported and mapped to an exit code here.
pub fn run(
    dir: &Path,
    remote: &str,
    url: &str,
    input: impl BufRead,
    out: &mut impl Write,
) -> i32 {
    debug!(remote, url, dir = %dir.display(), "pre-push check");

    let repo = match GitRepo::discover(dir) {
        Ok(repo) => repo,
        Err(e) => return repository_error(&Config::from_env(), &e),
    };
    let config = load_config(repo.root());

    report(&repo, &config, input, out)
}

/// Effective config; an unparsable file is reported and defaults are used.
fn load_config(root: &Path) -> Config {
    match Config::load(root) {
        Ok(config) => config,
        Err(e) => {
            let config = Config::from_env();
            eprintln!("{} {}; using defaults", config.notice.prefix, e);
            warn!(error = %e, "Ignoring unreadable config");
            config
        }
    }
}

/// Run the comparison against any repository and map the result to an exit code.
pub fn report<R: Repository>(
    repo: &R,
    config: &Config,
    input: impl BufRead,
    out: &mut impl Write,
) -> i32 {
    let comparator = VersionComparator::new(repo, config.marker.file_name.as_str());
    let outcome = comparator
        .check(|| PushNotice::read_first(input))
        .and_then(|outcome| {
            if outcome.is_unchanged() {
                writeln!(out, "{}", config.notice())?;
            }
            Ok(outcome)
        });

    match outcome {
        Ok(outcome) => {
            log_outcome(&outcome);
            0
        }
        Err(e) if e.is_input_error() => {
            eprintln!("{} cannot read push details: {}", config.notice.prefix, e);
            0
        }
        Err(e) => repository_error(config, &e),
    }
}

fn repository_error(config: &Config, e: &Error) -> i32 {
    eprintln!("{} {}", config.notice.prefix, e);
    if config.hook.block_on_error {
        1
    } else {
        warn!("Repository error ignored (hook.block_on_error = false)");
        0
    }
}

fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::NoTags => debug!("No tags, nothing to compare"),
        Outcome::TagMarkerMissing { tag } => debug!(tag = %tag, "Marker missing at tag"),
        Outcome::Deletion => debug!("Ref deletion, nothing to compare"),
        Outcome::PushMarkerMissing { commit } => {
            debug!(commit = %commit, "Marker missing at pushed commit")
        }
        Outcome::Changed => debug!("Version changed since last tag"),
        Outcome::Unchanged { tag } => debug!(tag = %tag, "Version unchanged since last tag"),
    }
}
