//! Command-line interface for release-helper: argument parsing and thin
//! wrappers around the library operations.
//!
//! - [`Cli`] defines the global options and subcommands.
//! - [`run`] executes a parsed [`Cli`] with already-loaded [`Settings`]; it is
//!   the entrypoint for both `main()` and integration tests.
//!
//! Business logic stays in the library modules; this module only gathers
//! inputs, prints results and maps failures to an error exit.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::externals::parse_externals;
use crate::load_config::token_from_env;
use crate::origin::extract_origin_info;
use crate::release::{release, ReleaseDescriptor};
use crate::state::StateChecker;
use crate::walk::list_files;

/// Build-automation helpers: file manifests, externals, state checks and releases.
#[derive(Parser, Debug)]
#[clap(name = "release-helper", version)]
pub struct Cli {
    /// Path to a YAML settings file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every visible file under a directory, sorted
    Files {
        root: PathBuf,
        /// Maximum depth counting the root as 1; 0 means unlimited
        #[clap(long, default_value_t = 0)]
        depth: usize,
    },
    /// Print the dependency lines of an externals file
    Externals {
        /// Defaults to the settings' externals file
        path: Option<PathBuf>,
    },
    /// Check that the build is up to date and the working tree is clean
    Check {
        #[clap(long, default_value = ".")]
        dir: PathBuf,
        /// Run a local SCons checkout through python instead of `scons`
        #[clap(long)]
        scons_path: Option<String>,
    },
    /// Print repository, organisation and branch from a .git directory
    Origin {
        #[clap(long, default_value = ".git")]
        git_dir: PathBuf,
    },
    /// Create a release and optionally publish files to a drive folder
    Release {
        version: String,
        #[clap(long)]
        org: Option<String>,
        #[clap(long)]
        repo: Option<String>,
        /// Branch or commit to tag; defaults to the current branch
        #[clap(long)]
        target: Option<String>,
        /// File to release to drive (repeatable)
        #[clap(long = "drive-file")]
        drive_files: Vec<PathBuf>,
        /// Local directory mirrored by the drive client, e.g. ~/Dropbox/project
        #[clap(long)]
        local_release: Option<PathBuf>,
        /// Copy drive files individually instead of archiving them
        #[clap(long)]
        no_zip: bool,
        /// API token; falls back to GITHUB_TOKEN, then to a prompt
        #[clap(long)]
        token: Option<String>,
        #[clap(long, default_value = ".git")]
        git_dir: PathBuf,
        /// Skip the build and version-control checks
        #[clap(long)]
        skip_checks: bool,
        #[clap(long)]
        scons_path: Option<String>,
    },
}

fn checker(dir: &Path, settings: &Settings, scons_path: Option<String>) -> StateChecker {
    let mut settings = settings.clone();
    if let Some(script) = scons_path {
        settings.build_tool = settings.build_tool.with_local_scons(script);
    }
    StateChecker::new(dir, &settings)
}

fn ready_for_release(checker: &StateChecker) -> Result<bool> {
    let built = checker
        .build_up_to_date()
        .context("build up-to-date check failed")?;
    let clean = checker
        .version_control_clean()
        .context("version control check failed")?;
    println!("build up to date: {built}");
    println!("working tree clean: {clean}");
    Ok(built && clean)
}

fn resolve_token(flag: Option<String>) -> Result<String> {
    if let Some(token) = flag.filter(|t| !t.is_empty()).or_else(token_from_env) {
        return Ok(token);
    }
    if !std::io::stdin().is_terminal() {
        bail!("no API token: pass --token or set GITHUB_TOKEN");
    }
    let token = dialoguer::Password::new()
        .with_prompt("Enter a GitHub token and then press enter")
        .interact()
        .context("failed to read token")?;
    Ok(token)
}

/// Execute `cli` with `settings`.
pub async fn run(cli: Cli, settings: Settings) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Files { root, depth } => {
            let manifest = list_files(&root, depth)?;
            for path in manifest.paths() {
                println!("{}", path.display());
            }
        }
        Commands::Externals { path } => {
            let path = path.unwrap_or_else(|| settings.externals_file.clone());
            for line in parse_externals(&path)? {
                println!("{line}");
            }
        }
        Commands::Check { dir, scons_path } => {
            if !ready_for_release(&checker(&dir, &settings, scons_path))? {
                bail!("repository is not ready for release");
            }
        }
        Commands::Origin { git_dir } => {
            let info = extract_origin_info(&git_dir)?;
            println!("repo: {}", info.repo);
            println!("org: {}", info.org);
            println!("branch: {}", info.branch);
        }
        Commands::Release {
            version,
            org,
            repo,
            target,
            drive_files,
            local_release,
            no_zip,
            token,
            git_dir,
            skip_checks,
            scons_path,
        } => {
            let (org, repo, target) = match (org, repo, target) {
                (Some(org), Some(repo), Some(target)) => (org, repo, target),
                (org, repo, target) => {
                    let info = extract_origin_info(&git_dir)
                        .context("could not infer release coordinates from the repository")?;
                    (
                        org.unwrap_or(info.org),
                        repo.unwrap_or(info.repo),
                        target.unwrap_or(info.branch),
                    )
                }
            };

            if skip_checks {
                tracing::warn!("Skipping repository state checks");
            } else if !ready_for_release(&checker(Path::new("."), &settings, scons_path))? {
                bail!("refusing to release: build is stale or the working tree has changes");
            }

            let descriptor = ReleaseDescriptor {
                version,
                target_commitish: target,
                org,
                repo,
                drive_files,
                local_release,
                zip: !no_zip,
                token: resolve_token(token)?,
            };
            tracing::info!(command = "release", ?descriptor, "Starting release");
            let report = release(&settings, &descriptor).await?;
            println!("Release complete (id {}).", report.release_id);
            for line in &report.drive_manifest {
                println!("{line}");
            }
        }
    }

    Ok(())
}
