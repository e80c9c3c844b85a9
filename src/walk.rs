//! # walk: bounded-depth directory enumeration
//!
//! [`walk`] produces a lazy, top-down sequence of [`DirEntry`] values (a
//! directory and the visible file names directly inside it). [`list_files`]
//! flattens that sequence into a sorted, deduplicated [`FileManifest`].
//!
//! Hidden entries (names starting with `.`) are never reported and hidden
//! directories are never descended into. A `depth_limit` of `0` means no
//! limit; otherwise the root counts as depth 1 and a directory at depth `d`
//! is only expanded when `d + 1 <= depth_limit`.
//!
//! An unreadable subdirectory is skipped with a warning; only a failure to
//! read the root is an error.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ReleaseError, Result};

/// One visited directory and the non-hidden regular files directly inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub dir: PathBuf,
    /// Bare file names as stored on disk, sorted.
    pub files: Vec<OsString>,
}

type EntryFilter = fn(&walkdir::DirEntry) -> bool;

/// Lazy directory iterator returned by [`walk`].
///
/// Each directory's file list is read only when the iterator reaches it.
/// Calling [`walk`] again starts a fresh traversal.
pub struct DirWalk {
    inner: walkdir::FilterEntry<walkdir::IntoIter, EntryFilter>,
}

impl Iterator for DirWalk {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    if e.depth() > 0 {
                        warn!(dir = %path.display(), error = %e, "Skipping unreadable directory");
                        continue;
                    }
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("directory loop detected"));
                    return Some(Err(ReleaseError::fs(path, source)));
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let depth = entry.depth();
            let dir = entry.into_path();
            match visible_files(&dir) {
                Ok(files) => {
                    debug!(dir = %dir.display(), files = files.len(), "Visited directory");
                    return Some(Ok(DirEntry { dir, files }));
                }
                Err(e) if depth > 0 => {
                    warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Start a traversal of `root`.
///
/// Fails with [`ReleaseError::FileSystem`] when `root` is missing or is not a
/// directory. The root itself is always visited, even if its own name is hidden.
pub fn walk(root: impl AsRef<Path>, depth_limit: usize) -> Result<DirWalk> {
    let root = root.as_ref();
    let metadata = fs::metadata(root).map_err(|e| ReleaseError::fs(root, e))?;
    if !metadata.is_dir() {
        return Err(ReleaseError::fs(
            root,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    let root = if in_current_drive(root) {
        absolutize(root).map_err(|e| ReleaseError::fs(root, e))?
    } else {
        root.to_path_buf()
    };

    let mut walker = WalkDir::new(&root).sort_by_file_name();
    if depth_limit > 0 {
        walker = walker.max_depth(depth_limit - 1);
    }
    debug!(root = %root.display(), depth_limit, "Starting directory walk");

    let filter: EntryFilter = |entry| entry.depth() == 0 || !is_hidden(entry.file_name());
    Ok(DirWalk {
        inner: walker.into_iter().filter_entry(filter),
    })
}

/// Sorted, deduplicated list of absolute file paths produced by [`list_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileManifest {
    paths: Vec<PathBuf>,
}

impl FileManifest {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

impl FromIterator<PathBuf> for FileManifest {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let mut paths: Vec<PathBuf> = iter.into_iter().collect();
        paths.sort();
        paths.dedup();
        FileManifest { paths }
    }
}

impl IntoIterator for FileManifest {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

/// Every visible file under `root`, up to `depth_limit` (0 = unbounded).
pub fn list_files(root: impl AsRef<Path>, depth_limit: usize) -> Result<FileManifest> {
    let root = root.as_ref();
    let mut paths = Vec::new();
    for entry in walk(root, depth_limit)? {
        let DirEntry { dir, files } = entry?;
        paths.extend(files.into_iter().map(|name| dir.join(name)));
    }
    let manifest: FileManifest = paths.into_iter().collect();
    info!(
        root = %root.display(),
        depth_limit,
        count = manifest.len(),
        "Built file manifest"
    );
    Ok(manifest)
}

fn visible_files(dir: &Path) -> Result<Vec<OsString>> {
    let read = fs::read_dir(dir).map_err(|e| ReleaseError::fs(dir, e))?;
    let mut files = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| ReleaseError::fs(dir, e))?;
        let name = entry.file_name();
        if is_hidden(&name) || !entry.path().is_file() {
            continue;
        }
        files.push(name);
    }
    files.sort();
    Ok(files)
}

fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

fn drive_of(path: &Path) -> Option<OsString> {
    match path.components().next() {
        Some(Component::Prefix(prefix)) => Some(prefix.as_os_str().to_os_string()),
        _ => None,
    }
}

/// True when `path` lives on the same volume as the working directory.
///
/// Paths without a drive prefix (every path on Unix) resolve against the
/// working directory and therefore count as local.
pub fn in_current_drive(path: &Path) -> bool {
    let Some(drive) = drive_of(path) else {
        return true;
    };
    match std::env::current_dir() {
        Ok(cwd) => drive_of(&cwd).is_some_and(|current| current.eq_ignore_ascii_case(&drive)),
        Err(_) => false,
    }
}

/// Absolute, lexically normalised form of `path` (no symlink resolution).
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
