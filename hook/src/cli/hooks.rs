//! pre-push hook installation and removal.
//!
//! Our part of the hook is a managed block placed right after the shebang, so
//! it runs before anything else in an existing hook. It captures the push
//! lines from stdin, feeds them to `check`, then puts them back on stdin for
//! the rest of the script.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Error;

/// Managed block markers.
const BLOCK_START: &str = "# >>> version-guard >>>";
const BLOCK_END: &str = "# <<< version-guard <<<";

/// Name of the hook file git runs before a push.
pub const HOOK_NAME: &str = "pre-push";

/// Command the installed hook runs.
pub const DEFAULT_COMMAND: &str = "version-guard";

const SHEBANG: &str = "#!/bin/sh";

/// Interpreters the managed block can be spliced into.
const SHELLS: &[&str] = &["sh", "bash", "dash", "ksh", "zsh"];

/// Generate the managed block. `command` is inserted as shell words.
fn managed_block(command: &str) -> String {
    format!(
        r#"{BLOCK_START}
# Warns when VERSION is unchanged since the last tag (auto-installed).
version_guard_input=$(cat)
if [ -n "$version_guard_input" ]; then
    printf '%s\n' "$version_guard_input" | {command} check "$@" || exit $?
    exec <<VERSION_GUARD_INPUT
$version_guard_input
VERSION_GUARD_INPUT
else
    exec </dev/null
fi
{BLOCK_END}"#
    )
}

fn fresh_hook(command: &str) -> String {
    format!("{}\n{}\n", SHEBANG, managed_block(command))
}

/// What `install_hook` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installed {
    Created,
    /// Spliced into an existing shell hook.
    Merged,
    Replaced,
    /// An older block was rewritten.
    Updated,
    AlreadyPresent,
}

/// Check if our hook is present in `hooks_dir`.
pub fn hook_installed(hooks_dir: &Path) -> bool {
    fs::read_to_string(hooks_dir.join(HOOK_NAME))
        .map(|content| find_block(&content).is_some())
        .unwrap_or(false)
}

/// Install the pre-push hook running `command`.
///
/// An existing shell hook keeps its body and exit status; our block runs
/// first. Other existing hooks are only touched with `force`, which replaces
/// them.
pub fn install_hook(hooks_dir: &Path, command: &str, force: bool) -> Result<Installed, Error> {
    fs::create_dir_all(hooks_dir)?;
    let path = hooks_dir.join(HOOK_NAME);

    let (content, installed) = if !path.exists() {
        (fresh_hook(command), Installed::Created)
    } else if force {
        (fresh_hook(command), Installed::Replaced)
    } else {
        let existing = fs::read_to_string(&path)?;
        match find_block(&existing) {
            Some((start, end)) => {
                let block = managed_block(command);
                if existing[start..end] == block {
                    return Ok(Installed::AlreadyPresent);
                }
                let updated = format!("{}{}{}", &existing[..start], block, &existing[end..]);
                (updated, Installed::Updated)
            }
            None => (splice_block(&existing, command)?, Installed::Merged),
        }
    };

    fs::write(&path, content)?;
    make_executable(&path)?;
    info!(path = %path.display(), ?installed, "Installed pre-push hook");

    Ok(installed)
}

/// Insert our block after the shebang of a shell hook.
fn splice_block(existing: &str, command: &str) -> Result<String, Error> {
    let (first, rest) = existing.split_once('\n').unwrap_or((existing, ""));
    if !is_shell_shebang(first) {
        return Err(Error::other(
            "existing pre-push hook is not a shell script; rerun with --force to replace it",
        ));
    }
    Ok(format!("{}\n{}\n{}", first, managed_block(command), rest))
}

/// `#!/bin/sh`, `#!/usr/bin/env bash` and the like.
fn is_shell_shebang(line: &str) -> bool {
    let Some(interpreter) = line.strip_prefix("#!") else {
        return false;
    };
    let mut words = interpreter.split_whitespace();
    let Some(program) = words.next() else {
        return false;
    };
    let mut name = program.rsplit('/').next().unwrap_or(program);
    if name == "env" {
        match words.find(|w| !w.starts_with('-')) {
            Some(next) => name = next,
            None => return false,
        }
    }
    SHELLS.contains(&name)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), Error> {
    Ok(())
}

/// Remove our block from the pre-push hook. Returns whether anything changed.
///
/// The file is deleted when only the shebang would remain.
pub fn uninstall_hook(hooks_dir: &Path) -> Result<bool, Error> {
    let path = hooks_dir.join(HOOK_NAME);
    if !path.exists() {
        return Ok(false);
    }

    let content = fs::read_to_string(&path)?;
    let Some((start, mut end)) = find_block(&content) else {
        return Ok(false);
    };
    if content[end..].starts_with('\n') {
        end += 1;
    }

    let cleaned = format!("{}{}", &content[..start], &content[end..]);
    if cleaned.trim().is_empty() || cleaned.trim() == SHEBANG {
        fs::remove_file(&path)?;
    } else {
        fs::write(&path, cleaned)?;
    }
    info!(path = %path.display(), "Removed pre-push hook");

    Ok(true)
}

/// Byte range of the managed block, markers included.
fn find_block(content: &str) -> Option<(usize, usize)> {
    let start = content.find(BLOCK_START)?;
    let end = start + content[start..].find(BLOCK_END)? + BLOCK_END.len();
    Some((start, end))
}
