//! Run the `hubmap` binary against the fixture snapshots.

use assert_cmd::Command;
use hubmap_test_data::{write_fixture_files, FixtureFiles};
use tempfile::TempDir;

fn fixtures() -> (TempDir, FixtureFiles) {
    let dir = tempfile::tempdir().unwrap();
    let files = write_fixture_files(dir.path()).unwrap();
    (dir, files)
}

fn hubmap() -> Command {
    Command::cargo_bin("hubmap").unwrap()
}

fn stdout(command: &mut Command) -> String {
    let output = command.output().unwrap();
    assert!(
        output.status.success(),
        "hubmap failed:\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_inspect() {
    let (_dir, files) = fixtures();
    let output = stdout(hubmap().arg("inspect").arg(&files.iteration));

    assert!(output.contains("hubmap - LOFT"));
    assert!(output.contains("capacity-0"));
    assert!(output.contains("profile-0"));
    assert!(output.contains("ElementDefinition"));
    assert!(output.contains("ValueSet"));
}

#[test]
fn test_load_to_hub() {
    let (_dir, files) = fixtures();
    let output = stdout(
        hubmap()
            .arg("load")
            .arg(&files.iteration)
            .arg(&files.workspace),
    );

    assert!(output.contains("capacity"));
    assert!(output.contains("12.5"));
    assert!(output.contains("Battery"));
    assert!(output.contains("power profile"));
    assert!(!output.contains("mode"));
}

#[test]
fn test_load_to_workspace() {
    let (_dir, files) = fixtures();
    let output = stdout(
        hubmap()
            .arg("load")
            .arg(&files.iteration)
            .arg(&files.workspace)
            .args(["--direction", "to-workspace"]),
    );

    assert!(output.contains("gain matrix"));
    assert!(output.contains("[3x2]"));
    assert!(output.contains("Computed"));
}

#[test]
fn test_decompose_with_time_step() {
    let (_dir, files) = fixtures();
    let output = stdout(hubmap().arg("decompose").arg(&files.workspace).args([
        "--variable",
        "profile",
        "--independent",
        "0",
        "--dependent",
        "1,2",
        "--time-axis",
        "0",
        "--time-step",
        "2",
        "--average",
    ]));

    assert!(output.contains("independent[0] (time)"));
    assert!(output.contains("dependent[2]"));
    assert!(output.contains("Time-tagged values"));
    // buckets [0, 2) and [2, 4) and [4, 6)
    assert!(output.contains("15.0"));
    assert!(output.contains("35.0"));
}

#[test]
fn test_missing_variable_fails() {
    let (_dir, files) = fixtures();
    hubmap()
        .arg("decompose")
        .arg(&files.workspace)
        .args(["--variable", "nope", "--independent", "0", "--dependent", "1"])
        .assert()
        .failure();
}
