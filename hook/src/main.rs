//! version-guard - warn on push when VERSION has not changed since the last tag.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use version_guard::cli::{self, hooks};
use version_guard::git::GitRepo;
use version_guard::Error;

#[derive(Parser)]
#[command(name = "version-guard")]
#[command(about = "Git pre-push hook that warns when VERSION has not changed since the last tag")]
#[command(version)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', global = true, value_name = "PATH")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pre-push check (push lines are read from stdin)
    Check {
        /// Name of the remote being pushed to
        remote: String,

        /// URL of the remote (defaults to the remote name)
        url: Option<String>,
    },

    /// Install the pre-push hook in this repository
    Install {
        /// Replace an existing pre-push hook instead of merging into it
        #[arg(long, short)]
        force: bool,
    },

    /// Remove the pre-push hook from this repository
    Uninstall,

    /// Show hook, latest tag and configuration
    Status,
}

fn main() {
    // Logs go to stderr; stdout carries only the notice.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("version_guard=warn")),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("version-guard: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Cli) -> Result<(), Error> {
    let dir = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match args.command {
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
        Some(Commands::Check { remote, url }) => {
            let url = url.unwrap_or_else(|| remote.clone());
            let code = cli::check::run(&dir, &remote, &url, io::stdin().lock(), &mut io::stdout());
            if code != 0 {
                std::process::exit(code);
            }
        }
        Some(Commands::Install { force }) => {
            let repo = GitRepo::discover(&dir)?;
            let hooks_dir = repo.hooks_dir()?;
            let installed = hooks::install_hook(&hooks_dir, hooks::DEFAULT_COMMAND, force)?;
            match installed {
                hooks::Installed::AlreadyPresent => println!("pre-push hook already installed."),
                hooks::Installed::Merged => {
                    println!("Added version-guard to the existing pre-push hook.")
                }
                hooks::Installed::Updated => println!("pre-push hook updated."),
                hooks::Installed::Created | hooks::Installed::Replaced => {
                    println!("pre-push hook installed.")
                }
            }
        }
        Some(Commands::Uninstall) => {
            let repo = GitRepo::discover(&dir)?;
            if hooks::uninstall_hook(&repo.hooks_dir()?)? {
                println!("pre-push hook removed.");
            } else {
                println!("No version-guard pre-push hook found.");
            }
        }
        Some(Commands::Status) => {
            cli::status::run(&dir, &mut io::stdout())?;
        }
    }

    Ok(())
}
