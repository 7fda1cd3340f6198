use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

pub fn run_mergediff_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("mergediff").expect("Failed to find mergediff binary");
    cmd.current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("MERGEDIFF_CONTEXT")
        .env_remove("MERGEDIFF_JOBS")
        .env_remove("MERGEDIFF_STRATEGY");
    cmd
}

/// Run a command that must succeed and parse its stdout as JSON
pub fn run_for_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = run_mergediff_command(dir, args)
        .output()
        .expect("Failed to run mergediff");
    assert!(
        output.status.success(),
        "mergediff {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}
