//! # drive: stage release files for a shared drive
//!
//! Files released "to drive" are copied under a local release directory that
//! a sync client (Dropbox, Google Drive, ...) mirrors. The last two components
//! of that directory name the drive and the release folder, e.g.
//! `~/Dropbox/widgets` is drive `Dropbox`, folder `widgets`.
//!
//! In zip mode every file is copied into a staging directory, the staging
//! directory is archived as `release.zip` inside the release directory and
//! then removed. Otherwise files are copied straight into the release
//! directory. Either way each file keeps its path relative to the working
//! directory (absolute inputs must lie inside it), and a
//! `drive_assets.txt` manifest is written to a temporary directory so it can be
//! uploaded as a release asset.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, error, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::contract::ReleaseAsset;
use crate::error::{ReleaseError, Result};

pub const ARCHIVE_NAME: &str = "release.zip";
pub const MANIFEST_NAME: &str = "drive_assets.txt";
const STAGING_PREFIX: &str = "release_content";

/// Drive and folder names derived from a local release directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveLayout {
    pub drive_name: String,
    pub dir_name: String,
}

impl DriveLayout {
    pub fn from_release_dir(local_release_dir: &Path) -> Result<Self> {
        let mut names = local_release_dir
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .rev();
        match (names.next(), names.next()) {
            (Some(dir_name), Some(drive_name)) => Ok(Self {
                drive_name,
                dir_name,
            }),
            _ => Err(ReleaseError::fs(
                local_release_dir,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "local release directory must have the form <drive>/<folder>",
                ),
            )),
        }
    }

    /// `release/{dir}/{version}/{name}`
    pub fn release_path(&self, version: &str, name: &str) -> String {
        format!("release/{}/{}/{}", self.dir_name, version, name)
    }
}

/// The manifest written by [`stage_drive_release`].
///
/// The file lives in a private temporary directory that is deleted when
/// this value is dropped or [`StagedManifest::close`]d.
#[derive(Debug)]
pub struct StagedManifest {
    dir: TempDir,
    path: PathBuf,
    lines: Vec<String>,
}

impl StagedManifest {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header line followed by one line per released file.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn asset(&self, content_type: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: MANIFEST_NAME.to_string(),
            path: self.path.clone(),
            content_type: content_type.to_string(),
        }
    }

    /// Remove the manifest and its directory, reporting any failure.
    pub fn close(self) -> Result<()> {
        let dir = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| ReleaseError::fs(dir, e))
    }
}

fn outside_working_dir(file: &Path) -> ReleaseError {
    ReleaseError::fs(
        file,
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "released files must be inside the working directory",
        ),
    )
}

/// Path of a released file relative to the working directory, with `.`
/// components removed.
///
/// Absolute paths must lie under the working directory. This relative path is
/// both where the file lands inside the release directory and what the
/// manifest names.
pub fn release_relative(file: &Path) -> Result<PathBuf> {
    let relative = if file.is_absolute() {
        let cwd = std::env::current_dir().map_err(|e| ReleaseError::fs(file, e))?;
        match file.strip_prefix(&cwd) {
            Ok(rest) => rest.to_path_buf(),
            Err(_) => {
                // The same directory may be reached through a symlink, e.g. /var vs /private/var.
                let file_real = fs::canonicalize(file).map_err(|e| ReleaseError::fs(file, e))?;
                let cwd_real = fs::canonicalize(&cwd).map_err(|e| ReleaseError::fs(&cwd, e))?;
                file_real
                    .strip_prefix(&cwd_real)
                    .map_err(|_| outside_working_dir(file))?
                    .to_path_buf()
            }
        }
    } else {
        file.to_path_buf()
    };

    let mut out = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(outside_working_dir(file))
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(ReleaseError::fs(
            file,
            io::Error::new(io::ErrorKind::InvalidInput, "not a file path"),
        ));
    }
    Ok(out)
}

/// `/`-separated form used in manifest lines and archive entry names.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A file to release and where it goes, relative to the release root.
struct ReleasedFile {
    source: PathBuf,
    relative: PathBuf,
}

fn copy_preserving(files: &[ReleasedFile], destination_base: &Path) -> Result<()> {
    for ReleasedFile { source, relative } in files {
        let destination = destination_base.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| ReleaseError::fs(parent, e))?;
        }
        fs::copy(source, &destination).map_err(|e| {
            error!(error = ?e, file = %source.display(), "Failed to copy release file");
            ReleaseError::fs(source, e)
        })?;
        debug!(file = %source.display(), destination = %destination.display(), "Copied release file");
    }
    Ok(())
}

fn zip_error(path: &Path, e: zip::result::ZipError) -> ReleaseError {
    ReleaseError::fs(path, io::Error::other(e))
}

/// Write every file under `source_dir` into a zip archive at `archive`,
/// with entry names relative to `source_dir`.
fn write_archive(source_dir: &Path, archive: &File, archive_path: &Path) -> Result<usize> {
    let mut writer = ZipWriter::new(archive);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            ReleaseError::fs(path, io::Error::other(e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| ReleaseError::fs(entry.path(), io::Error::other(e)))?;
        let name = slash_path(relative);

        writer
            .start_file(name, options)
            .map_err(|e| zip_error(archive_path, e))?;
        let mut input = File::open(entry.path()).map_err(|e| ReleaseError::fs(entry.path(), e))?;
        io::copy(&mut input, &mut writer).map_err(|e| ReleaseError::fs(archive_path, e))?;
        count += 1;
    }

    writer.finish().map_err(|e| zip_error(archive_path, e))?;
    Ok(count)
}

fn archive_into(files: &[ReleasedFile], local_release_dir: &Path) -> Result<PathBuf> {
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(local_release_dir)
        .map_err(|e| ReleaseError::fs(local_release_dir, e))?;
    copy_preserving(files, staging.path())?;

    let archive_path = local_release_dir.join(ARCHIVE_NAME);
    let pending = NamedTempFile::new_in(local_release_dir)
        .map_err(|e| ReleaseError::fs(local_release_dir, e))?;
    let count = write_archive(staging.path(), pending.as_file(), &archive_path)?;
    pending.as_file().sync_all().map_err(|e| ReleaseError::fs(&archive_path, e))?;
    pending
        .persist(&archive_path)
        .map_err(|e| ReleaseError::fs(&archive_path, e.error))?;

    let staging_path = staging.path().to_path_buf();
    staging
        .close()
        .map_err(|e| ReleaseError::fs(staging_path, e))?;
    info!(archive = %archive_path.display(), files = count, "Wrote release archive");
    Ok(archive_path)
}

/// Copy or archive `files` into `local_release_dir` and write the drive manifest.
pub fn stage_drive_release(
    files: &[PathBuf],
    local_release_dir: &Path,
    version: &str,
    zip: bool,
) -> Result<StagedManifest> {
    let layout = DriveLayout::from_release_dir(local_release_dir)?;
    let released = files
        .iter()
        .map(|file| {
            Ok(ReleasedFile {
                source: file.clone(),
                relative: release_relative(file)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    fs::create_dir_all(local_release_dir).map_err(|e| ReleaseError::fs(local_release_dir, e))?;
    info!(
        release_dir = %local_release_dir.display(),
        drive = %layout.drive_name,
        files = files.len(),
        zip,
        "Staging drive release"
    );

    let mut lines = Vec::with_capacity(files.len() + 1);
    if zip {
        archive_into(&released, local_release_dir)?;
        lines.push(format!(
            "{}: {}",
            layout.drive_name,
            layout.release_path(version, ARCHIVE_NAME)
        ));
        lines.extend(released.iter().map(|f| slash_path(&f.relative)));
    } else {
        copy_preserving(&released, local_release_dir)?;
        lines.push(format!("{}:", layout.drive_name));
        lines.extend(
            released
                .iter()
                .map(|f| layout.release_path(version, &slash_path(&f.relative))),
        );
    }

    let dir = tempfile::Builder::new()
        .prefix("drive_assets")
        .tempdir()
        .map_err(|e| ReleaseError::fs(std::env::temp_dir(), e))?;
    let path = dir.path().join(MANIFEST_NAME);
    let mut manifest = File::create(&path).map_err(|e| ReleaseError::fs(&path, e))?;
    manifest
        .write_all(lines.join("\n").as_bytes())
        .map_err(|e| ReleaseError::fs(&path, e))?;
    debug!(path = %path.display(), lines = lines.len(), "Wrote drive manifest");

    Ok(StagedManifest { dir, path, lines })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_uses_last_two_components() {
        let layout = DriveLayout::from_release_dir(Path::new("/home/me/Dropbox/widgets")).unwrap();
        assert_eq!(layout.drive_name, "Dropbox");
        assert_eq!(layout.dir_name, "widgets");
        assert_eq!(layout.release_path("v1", "a/x.txt"), "release/widgets/v1/a/x.txt");
    }

    #[test]
    fn layout_needs_two_components() {
        assert!(DriveLayout::from_release_dir(Path::new("widgets")).is_err());
    }

    #[test]
    fn destinations_stay_relative() {
        assert_eq!(
            release_relative(Path::new("./a/./x.txt")).unwrap(),
            PathBuf::from("a/x.txt")
        );
        assert!(release_relative(Path::new("../x.txt")).is_err());
        assert!(release_relative(Path::new("a/../../x.txt")).is_err());
    }
}
