//! Externals descriptor parsing.
//!
//! An externals file lists one dependency per line. Header keywords (`rev`,
//! `linkpath`, `url` at the start of a line), comments (`#`, optionally
//! indented) and blank lines are metadata and are dropped. Retained lines are
//! returned verbatim, minus the line terminator, in file order. Splitting a
//! line into its fields is left to the consumer.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, error, info};

use crate::error::{ReleaseError, Result};

/// File name the externals tooling expects by default.
pub const DEFAULT_EXTERNALS_FILE: &str = "externals.txt";

const HEADER_KEYWORDS: [&str; 3] = ["rev", "linkpath", "url"];

/// True when `line` carries a dependency rather than header/comment/blank content.
pub fn is_dependency_line(line: &str) -> bool {
    if HEADER_KEYWORDS.iter().any(|kw| line.starts_with(kw)) {
        return false;
    }
    let trimmed = line.trim_start();
    !(trimmed.is_empty() || trimmed.starts_with('#'))
}

/// Read `path` and return its dependency lines.
pub fn parse_externals(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    if path.file_name().is_some_and(|n| n != DEFAULT_EXTERNALS_FILE) {
        info!(path = %path.display(), "Using a non-default externals file name");
    }

    let file = File::open(path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to open externals file");
        ReleaseError::FileAccess {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| ReleaseError::FileAccess {
            path: path.to_path_buf(),
            source: e,
        })?;
        if is_dependency_line(&line) {
            lines.push(line);
        }
    }
    debug!(path = %path.display(), count = lines.len(), "Parsed externals");
    Ok(lines)
}
