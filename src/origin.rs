//! Read the `origin` remote and current branch straight from a `.git` directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{ReleaseError, Result};

/// Repository coordinates of a clone, as recorded in its `.git` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginInfo {
    pub repo: String,
    pub org: String,
    pub branch: String,
}

impl OriginInfo {
    /// `(repo, org, branch)`, in that order.
    pub fn into_tuple(self) -> (String, String, String) {
        (self.repo, self.org, self.branch)
    }
}

// Handles `git@host:org/repo(.git)`, `ssh://git@host/org/repo(.git)` and
// `https://[user@]host/org/repo(.git)`.
fn remote_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:@|://)[^/:]+[:/]([\w.-]+)/([\w.-]+?)(?:\.git)?/?$")
            .expect("remote url pattern is valid")
    })
}

fn head_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^ref:\s*refs/heads/(.+)$").expect("head ref pattern is valid")
    })
}

fn read(path: PathBuf) -> Result<String> {
    fs::read_to_string(&path).map_err(|e| ReleaseError::FileAccess { path, source: e })
}

fn parse_error(path: &Path, message: impl Into<String>) -> ReleaseError {
    ReleaseError::ConfigParse {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Split a remote URL into `(org, repo)`.
pub fn parse_remote_url(url: &str) -> Option<(String, String)> {
    let caps = remote_url_pattern().captures(url.trim())?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Find the `url =` line of the `[remote "origin"]` section in a git config.
///
/// The search stops at the next section header.
pub fn origin_url(config: &str) -> Option<&str> {
    let mut lines = config.lines().map(str::trim);
    lines.find(|line| *line == r#"[remote "origin"]"#)?;
    lines
        .take_while(|line| !line.starts_with('['))
        .find_map(|line| {
            let rest = line.strip_prefix("url")?.trim_start();
            rest.strip_prefix('=').map(str::trim)
        })
}

/// Extract repository name, organisation and branch from `git_dir`
/// (usually `.git`).
pub fn extract_origin_info(git_dir: impl AsRef<Path>) -> Result<OriginInfo> {
    let git_dir = git_dir.as_ref();
    let config_path = git_dir.join("config");
    let config = read(config_path.clone())?;

    let url = origin_url(&config)
        .ok_or_else(|| parse_error(&config_path, "url for git origin not found"))?;
    debug!(url = %url, "Found origin url");
    let (org, repo) = parse_remote_url(url).ok_or_else(|| {
        parse_error(
            &config_path,
            format!("origin url `{url}` does not name an organisation and repository"),
        )
    })?;

    let head_path = git_dir.join("HEAD");
    let head = read(head_path.clone())?;
    let branch = head
        .lines()
        .next()
        .and_then(|line| head_ref_pattern().captures(line.trim()))
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| parse_error(&head_path, "HEAD does not point at a branch"))?;

    info!(org = %org, repo = %repo, branch = %branch, "Extracted origin info");
    Ok(OriginInfo { repo, org, branch })
}
