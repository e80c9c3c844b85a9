use std::fs::write;

use release_helper::externals::parse_externals;
use release_helper::ReleaseError;
use tempfile::tempdir;

#[test]
fn keeps_only_dependency_lines() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("externals.txt");
    write(&path, "# comment\n\nurl = x\nrev 1\nfoo/bar 42\n").unwrap();

    assert_eq!(parse_externals(&path).unwrap(), vec!["foo/bar 42".to_string()]);
}

#[test]
fn metadata_only_file_yields_nothing() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("externals.txt");
    write(
        &path,
        "rev 1234\nlinkpath ../data\nurl https://svn.example.org/trunk\n   # note\n\t\n\n",
    )
    .unwrap();

    assert!(parse_externals(&path).unwrap().is_empty());
}

#[test]
fn preserves_order_and_content() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("deps.txt");
    write(
        &path,
        "zeta/lib   7\n# skip\nalpha/tool 3  \n  indented/dep 9\n",
    )
    .unwrap();

    assert_eq!(
        parse_externals(&path).unwrap(),
        vec![
            "zeta/lib   7".to_string(),
            "alpha/tool 3  ".to_string(),
            "  indented/dep 9".to_string(),
        ]
    );
}

#[test]
fn windows_line_endings_are_stripped() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("externals.txt");
    write(&path, "rev 1\r\nfoo/bar 42\r\n").unwrap();

    assert_eq!(parse_externals(&path).unwrap(), vec!["foo/bar 42".to_string()]);
}

#[test]
fn missing_file_is_a_file_access_error() {
    let tmp = tempdir().unwrap();
    let err = parse_externals(tmp.path().join("externals.txt")).unwrap_err();
    assert!(matches!(err, ReleaseError::FileAccess { .. }), "got {err:?}");
}
