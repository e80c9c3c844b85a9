use std::fs::{self, create_dir_all, read_dir, write, File};
use std::path::{Path, PathBuf};

use release_helper::drive::{stage_drive_release, ARCHIVE_NAME, MANIFEST_NAME};
use release_helper::ReleaseError;
use serial_test::serial;
use tempfile::tempdir;

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Run `body` with the working directory set to a fresh repository holding
/// `a/x.txt` and `b/y.txt`.
fn in_repo<T>(body: impl FnOnce(&Path) -> T) -> T {
    let repo = tempdir().unwrap();
    create_dir_all(repo.path().join("a")).unwrap();
    create_dir_all(repo.path().join("b")).unwrap();
    write(repo.path().join("a/x.txt"), "x contents").unwrap();
    write(repo.path().join("b/y.txt"), "y contents").unwrap();

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(repo.path()).unwrap();
    let result = body(repo.path());
    std::env::set_current_dir(previous).unwrap();
    result
}

fn inputs() -> Vec<PathBuf> {
    vec![PathBuf::from("a/x.txt"), PathBuf::from("b/y.txt")]
}

#[test]
#[serial]
fn zip_mode_leaves_only_the_archive() {
    let drive = tempdir().unwrap();
    let release_dir = drive.path().join("Dropbox").join("widgets");

    let staged = in_repo(|_| stage_drive_release(&inputs(), &release_dir, "v1.2", true)).unwrap();

    assert_eq!(entries(&release_dir), vec![ARCHIVE_NAME.to_string()]);
    assert_eq!(
        staged.lines(),
        &[
            "Dropbox: release/widgets/v1.2/release.zip".to_string(),
            "a/x.txt".to_string(),
            "b/y.txt".to_string(),
        ]
    );

    let mut archive = zip::ZipArchive::new(File::open(release_dir.join(ARCHIVE_NAME)).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["a/x.txt".to_string(), "b/y.txt".to_string()]);
    let mut contents = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("b/y.txt").unwrap(), &mut contents).unwrap();
    assert_eq!(contents, "y contents");
}

#[test]
#[serial]
fn copy_mode_preserves_relative_paths() {
    let drive = tempdir().unwrap();
    let release_dir = drive.path().join("GoogleDrive").join("widgets");

    let staged = in_repo(|_| stage_drive_release(&inputs(), &release_dir, "v2", false)).unwrap();

    assert_eq!(entries(&release_dir), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        fs::read_to_string(release_dir.join("a/x.txt")).unwrap(),
        "x contents"
    );
    assert_eq!(
        staged.lines(),
        &[
            "GoogleDrive:".to_string(),
            "release/widgets/v2/a/x.txt".to_string(),
            "release/widgets/v2/b/y.txt".to_string(),
        ]
    );
}

#[test]
#[serial]
fn manifest_lives_outside_the_release_dir_and_is_removed_on_close() {
    let drive = tempdir().unwrap();
    let release_dir = drive.path().join("Dropbox").join("widgets");

    let staged = in_repo(|_| stage_drive_release(&inputs(), &release_dir, "v1", true)).unwrap();
    let manifest = staged.path().to_path_buf();

    assert_eq!(manifest.file_name().unwrap(), MANIFEST_NAME);
    assert!(!manifest.starts_with(&release_dir));
    assert_eq!(
        fs::read_to_string(&manifest).unwrap(),
        "Dropbox: release/widgets/v1/release.zip\na/x.txt\nb/y.txt"
    );

    let asset = staged.asset("text/markdown");
    assert_eq!(asset.name, MANIFEST_NAME);
    assert_eq!(asset.path, manifest);

    staged.close().unwrap();
    assert!(!manifest.exists());
    assert!(!manifest.parent().unwrap().exists());
}

#[test]
#[serial]
fn missing_input_fails_without_leaving_staging_behind() {
    let drive = tempdir().unwrap();
    let release_dir = drive.path().join("Dropbox").join("widgets");
    let files = vec![PathBuf::from("a/x.txt"), PathBuf::from("c/missing.txt")];

    let err = in_repo(|_| stage_drive_release(&files, &release_dir, "v1", true)).unwrap_err();

    assert!(matches!(err, ReleaseError::FileSystem { .. }), "got {err:?}");
    assert!(entries(&release_dir).is_empty(), "left: {:?}", entries(&release_dir));
}

#[test]
#[serial]
fn copy_mode_manifest_names_where_absolute_and_dotted_inputs_land() {
    let drive = tempdir().unwrap();
    let release_dir = drive.path().join("Dropbox").join("widgets");

    let staged = in_repo(|repo| {
        let files = vec![repo.join("a/x.txt"), PathBuf::from("./b/y.txt")];
        stage_drive_release(&files, &release_dir, "v3", false)
    })
    .unwrap();

    assert_eq!(
        staged.lines(),
        &[
            "Dropbox:".to_string(),
            "release/widgets/v3/a/x.txt".to_string(),
            "release/widgets/v3/b/y.txt".to_string(),
        ]
    );
    assert_eq!(entries(&release_dir), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        fs::read_to_string(release_dir.join("a/x.txt")).unwrap(),
        "x contents"
    );
    assert_eq!(
        fs::read_to_string(release_dir.join("b/y.txt")).unwrap(),
        "y contents"
    );
}

#[test]
#[serial]
fn inputs_outside_the_working_directory_are_rejected_before_copying() {
    let drive = tempdir().unwrap();
    let release_dir = drive.path().join("Dropbox").join("widgets");
    let outside = drive.path().join("stray.txt");
    write(&outside, "stray").unwrap();

    let err = in_repo(|_| stage_drive_release(&[outside.clone()], &release_dir, "v1", false))
        .unwrap_err();

    assert!(matches!(err, ReleaseError::FileSystem { .. }), "got {err:?}");
    assert!(!release_dir.exists());
}
