use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn filepatch(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_filepatch"))
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("Failed to run filepatch")
}

fn assert_success(output: &Output, step: &str) {
    assert!(
        output.status.success(),
        "filepatch {} failed:\nstdout: {}\nstderr: {}",
        step,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[cfg(unix)]
fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).unwrap().file_type().is_symlink()
}

#[cfg(unix)]
#[test]
fn test_end_to_end_lifecycle() {
    let temp = tempfile::tempdir().unwrap();
    let cwd = temp.path();
    let live = cwd.join("a.txt");
    fs::write(&live, "hello\n").unwrap();

    // Step 1: track
    let output = filepatch(cwd, &["create", "a.txt"]);
    assert_success(&output, "create");
    let snapshot = cwd.join("patches/a.txt/a.txt");
    assert_eq!(fs::read_to_string(&snapshot).unwrap(), "hello\n");
    let recorded = fs::read_to_string(cwd.join("patches/a.txt/original-path.txt")).unwrap();
    assert_eq!(Path::new(&recorded), live.canonicalize().unwrap());

    // Step 2: edit the snapshot and commit
    fs::write(&snapshot, "hello world\n").unwrap();
    let output = filepatch(cwd, &["commit", "a.txt"]);
    assert_success(&output, "commit");
    let patch = fs::read_to_string(cwd.join("patches/a.txt/a.txt.patch")).unwrap();
    assert!(patch.contains("--- a.txt\toriginal"));
    assert!(patch.contains("+++ a.txt\tmodified"));
    assert!(patch.contains("-hello\n+hello world\n"));
    assert!(!snapshot.exists(), "snapshot should be removed by commit");

    // Step 3: apply
    let output = filepatch(cwd, &["apply", "a.txt"]);
    assert_success(&output, "apply");
    assert!(is_symlink(&live));
    assert_eq!(fs::read_to_string(&live).unwrap(), "hello world\n");
    assert_eq!(
        fs::read_to_string(cwd.join("patches/a.txt/a.txt.original.backup")).unwrap(),
        "hello\n"
    );

    // Step 4: revert
    let output = filepatch(cwd, &["revert", "a.txt"]);
    assert_success(&output, "revert");
    assert!(!is_symlink(&live));
    assert_eq!(fs::read_to_string(&live).unwrap(), "hello\n");
    assert!(!cwd.join("patches/a.txt/a.txt.original.backup").exists());
    assert!(!cwd.join("patches/a.txt/a.txt.patched").exists());
    assert!(cwd.join("patches/a.txt/a.txt.patch").exists());
}

#[cfg(unix)]
#[test]
fn test_apply_conflict_exits_nonzero() {
    let temp = tempfile::tempdir().unwrap();
    let cwd = temp.path();
    let live = cwd.join("notes.md");
    fs::write(&live, "alpha\nbeta\n").unwrap();

    assert_success(&filepatch(cwd, &["create", "notes.md"]), "create");
    fs::write(cwd.join("patches/notes.md/notes.md"), "alpha\nBETA\n").unwrap();
    assert_success(&filepatch(cwd, &["commit", "notes.md"]), "commit");

    fs::write(&live, "completely\ndifferent\n").unwrap();
    let output = filepatch(cwd, &["apply", "notes.md"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not apply"), "stderr: {}", stderr);

    assert!(!is_symlink(&live));
    assert_eq!(fs::read_to_string(&live).unwrap(), "completely\ndifferent\n");
}

#[cfg(unix)]
#[test]
fn test_fuzz_flag_bounds_drift() {
    let temp = tempfile::tempdir().unwrap();
    let cwd = temp.path();
    let live = cwd.join("list.txt");
    let before: String = (1..=12).map(|i| format!("{i}\n")).collect();
    let after = before.replace("6\n", "six\n");
    fs::write(&live, &before).unwrap();

    assert_success(&filepatch(cwd, &["create", "list.txt"]), "create");
    fs::write(cwd.join("patches/list.txt/list.txt"), &after).unwrap();
    assert_success(&filepatch(cwd, &["commit", "list.txt"]), "commit");

    // Two new lines on top move the hunk by two.
    let drifted = format!("header\nsubheader\n{before}");
    fs::write(&live, &drifted).unwrap();

    let output = filepatch(cwd, &["--fuzz", "0", "apply", "list.txt"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not apply"), "stderr: {}", stderr);
    assert!(!is_symlink(&live));
    assert_eq!(fs::read_to_string(&live).unwrap(), drifted);

    let output = filepatch(cwd, &["apply", "list.txt"]);
    assert_success(&output, "apply");
    assert!(is_symlink(&live));
    assert_eq!(
        fs::read_to_string(&live).unwrap(),
        format!("header\nsubheader\n{after}")
    );
}

#[test]
fn test_revert_without_apply_is_silent() {
    let temp = tempfile::tempdir().unwrap();
    let cwd = temp.path();
    fs::write(cwd.join("a.txt"), "hello\n").unwrap();

    let output = filepatch(cwd, &["revert", "a.txt"]);
    assert_success(&output, "revert");
    assert!(output.stdout.is_empty());
    assert_eq!(fs::read_to_string(cwd.join("a.txt")).unwrap(), "hello\n");
}

#[test]
fn test_create_missing_file_fails() {
    let temp = tempfile::tempdir().unwrap();
    let output = filepatch(temp.path(), &["create", "missing.txt"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_apply_without_commit_fails() {
    let temp = tempfile::tempdir().unwrap();
    let cwd = temp.path();
    fs::write(cwd.join("a.txt"), "hello\n").unwrap();
    assert_success(&filepatch(cwd, &["create", "a.txt"]), "create");

    let output = filepatch(cwd, &["apply", "a.txt"]);
    assert!(!output.status.success());
    assert_eq!(fs::read_to_string(cwd.join("a.txt")).unwrap(), "hello\n");
}

#[test]
fn test_custom_store_and_status_json() {
    let temp = tempfile::tempdir().unwrap();
    let cwd = temp.path();
    fs::write(cwd.join("a.txt"), "hello\n").unwrap();

    assert_success(
        &filepatch(cwd, &["--store", "records", "create", "a.txt"]),
        "create",
    );
    assert!(cwd.join("records/a.txt/a.txt").exists());
    assert!(!cwd.join("patches").exists());

    let output = filepatch(cwd, &["status", "--store", "records", "--json"]);
    assert_success(&output, "status");
    let statuses: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(statuses[0]["name"], "a.txt");
    assert_eq!(statuses[0]["state"], "tracked");
}
