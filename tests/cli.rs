use std::fs::{create_dir_all, write};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("release-helper").expect("Binary exists");
    cmd.env_remove("GITHUB_TOKEN").env("RUST_LOG", "off");
    cmd
}

#[test]
fn files_lists_visible_files_up_to_depth() {
    let tmp = tempdir().unwrap();
    create_dir_all(tmp.path().join("src/deep")).unwrap();
    write(tmp.path().join("top.tex"), "").unwrap();
    write(tmp.path().join(".DS_Store"), "").unwrap();
    write(tmp.path().join("src/main.do"), "").unwrap();
    write(tmp.path().join("src/deep/x.do"), "").unwrap();

    bin()
        .arg("files")
        .arg(tmp.path())
        .arg("--depth")
        .arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("top.tex"))
        .stdout(predicate::str::contains("main.do"))
        .stdout(predicate::str::contains("x.do").not())
        .stdout(predicate::str::contains(".DS_Store").not());
}

#[test]
fn externals_prints_dependency_lines() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("externals.txt");
    write(&path, "rev 10\n# data\nraw/survey 10\n").unwrap();

    bin()
        .arg("externals")
        .arg(&path)
        .assert()
        .success()
        .stdout("raw/survey 10\n");
}

#[test]
fn origin_prints_coordinates() {
    let tmp = tempdir().unwrap();
    let git = tmp.path().join(".git");
    create_dir_all(&git).unwrap();
    write(
        git.join("config"),
        "[remote \"origin\"]\n\turl = git@github.com:acme/widgets.git\n",
    )
    .unwrap();
    write(git.join("HEAD"), "ref: refs/heads/develop\n").unwrap();

    bin()
        .arg("origin")
        .arg("--git-dir")
        .arg(&git)
        .assert()
        .success()
        .stdout(predicate::str::contains("repo: widgets"))
        .stdout(predicate::str::contains("org: acme"))
        .stdout(predicate::str::contains("branch: develop"));
}

#[test]
fn missing_root_fails() {
    let tmp = tempdir().unwrap();
    bin()
        .arg("files")
        .arg(tmp.path().join("absent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file system error"));
}

#[test]
fn release_without_token_fails_before_contacting_the_api() {
    let tmp = tempdir().unwrap();
    bin()
        .current_dir(tmp.path())
        .args([
            "release",
            "v1.0",
            "--org",
            "acme",
            "--repo",
            "widgets",
            "--target",
            "main",
            "--skip-checks",
        ])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}
