//! Show hook, tag and config state for the current repository.

use std::io::Write;
use std::path::Path;

use crate::cli::hooks;
use crate::comparator::{trim_marker, VersionComparator};
use crate::config::Config;
use crate::error::Error;
use crate::git::GitRepo;

/// Run the status command.
pub fn run(dir: &Path, out: &mut impl Write) -> Result<(), Error> {
    let repo = GitRepo::discover(dir)?;
    let config = Config::load(repo.root())?;
    let hooks_dir = repo.hooks_dir()?;

    writeln!(out, "Repository: {}", repo.root().display())?;
    if hooks::hook_installed(&hooks_dir) {
        writeln!(out, "Hook: installed ({})", hooks_dir.join(hooks::HOOK_NAME).display())?;
    } else {
        writeln!(out, "Hook: not installed (run 'version-guard install')")?;
    }

    let comparator = VersionComparator::new(&repo, config.marker.file_name.as_str());
    match comparator.resolve_latest_tag()? {
        None => writeln!(out, "Latest tag: none")?,
        Some(tag) => {
            let commit = comparator.resolve_commit_for_tag(&tag)?;
            writeln!(out, "Latest tag: {} ({})", tag, commit)?;
            match comparator.read_marker_file(commit)? {
                Some(content) => writeln!(
                    out,
                    "{} at tag: {}",
                    config.marker.file_name,
                    String::from_utf8_lossy(trim_marker(&content))
                )?,
                None => writeln!(out, "{} at tag: missing", config.marker.file_name)?,
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "Configuration:")?;
    write!(out, "{}", config.to_toml()?)?;

    Ok(())
}
