use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const MULTI_ACTION_PATCH: &str = "\
*** Begin Patch
*** Add File: src/util.js
+export const two = 2;
*** Update File: src/main.js
@@
 const a = 1;
-const b = 1;
+const b = 2;
*** Delete File: old.js
*** End Patch
";

fn seed_workspace(root: &Path) {
    std::fs::create_dir_all(root.join("src")).expect("src dir should create");
    std::fs::write(root.join("src/main.js"), "const a = 1;\nconst b = 1;\n")
        .expect("main.js write should succeed");
    std::fs::write(root.join("old.js"), "// legacy\n").expect("old.js write should succeed");
}

fn run_cli(args: &[&str], cwd: &Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_regret-cli"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("cli process should start")
}

fn assert_success(output: &std::process::Output) {
    assert!(
        output.status.success(),
        "stdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn apply_command_writes_updates_additions_and_deletions() {
    let temp = TempDir::new().expect("tempdir should create");
    seed_workspace(temp.path());

    let output = run_cli(&["apply", "--patch-source", MULTI_ACTION_PATCH], temp.path());
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Applied patch:"));
    assert!(stdout.contains("A src/util.js"));
    assert!(stdout.contains("M src/main.js"));
    assert!(stdout.contains("D old.js"));

    let main = std::fs::read_to_string(temp.path().join("src/main.js")).expect("main.js readable");
    assert_eq!(main, "const a = 1;\nconst b = 2;\n");
    let util = std::fs::read_to_string(temp.path().join("src/util.js")).expect("util.js readable");
    assert_eq!(util, "export const two = 2;");
    assert!(!temp.path().join("old.js").exists());
}

#[test]
fn apply_command_dry_run_json_leaves_files_untouched() {
    let temp = TempDir::new().expect("tempdir should create");
    seed_workspace(temp.path());
    let patch_file = temp.path().join("change.patch");
    std::fs::write(&patch_file, MULTI_ACTION_PATCH).expect("patch write should succeed");

    let output = run_cli(
        &[
            "apply",
            "--patch-file",
            patch_file.to_str().expect("patch path should be utf8"),
            "--dry-run",
            "--json",
        ],
        temp.path(),
    );
    assert_success(&output);

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(json["updated"]["src/main.js"], "const a = 1;\nconst b = 2;\n");
    assert_eq!(json["added"]["src/util.js"], "export const two = 2;");
    assert_eq!(json["deleted"][0], "old.js");

    assert!(temp.path().join("old.js").exists());
    assert!(!temp.path().join("src/util.js").exists());
}

#[test]
fn apply_command_missing_target_fails_without_writing() {
    let temp = TempDir::new().expect("tempdir should create");
    let patch = "\
*** Begin Patch
*** Add File: new.js
+ok
*** Update File: absent.js
-a
+b
*** End Patch";

    let output = run_cli(&["apply", "--patch-source", patch], temp.path());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("file not found: 'absent.js'"));
    assert!(!temp.path().join("new.js").exists());
}

#[test]
fn apply_command_leaves_no_files_when_a_write_target_is_a_directory() {
    let temp = TempDir::new().expect("tempdir should create");
    std::fs::create_dir(temp.path().join("dir")).expect("dir should create");
    std::fs::write(temp.path().join("keep.txt"), "old\n").expect("seed write should succeed");
    let patch = "\
*** Begin Patch
*** Add File: a.txt
+hello
*** Update File: keep.txt
-old
+new
*** Add File: dir
+boom
*** End Patch";

    let output = run_cli(&["apply", "--patch-source", patch], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("non-file path"));
    assert!(!temp.path().join("a.txt").exists());
    let keep = std::fs::read_to_string(temp.path().join("keep.txt")).expect("keep.txt readable");
    assert_eq!(keep, "old\n");
    let leftovers = std::fs::read_dir(temp.path())
        .expect("root should list")
        .count();
    assert_eq!(leftovers, 2, "only the seeded entries should remain");
}

#[test]
fn apply_command_leaves_no_files_when_a_parent_is_a_file() {
    let temp = TempDir::new().expect("tempdir should create");
    std::fs::write(temp.path().join("blocker"), "plain file").expect("seed write should succeed");
    let patch = "\
*** Begin Patch
*** Add File: a.txt
+hello
*** Add File: blocker/nested.txt
+boom
*** End Patch";

    let output = run_cli(&["apply", "--patch-source", patch], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("is not a directory"));
    assert!(!temp.path().join("a.txt").exists());
}

#[test]
fn apply_command_strict_rejects_fuzzy_hunk() {
    let temp = TempDir::new().expect("tempdir should create");
    std::fs::write(temp.path().join("a.txt"), "one\ntwo\n").expect("seed write should succeed");
    let patch = "\
*** Begin Patch
*** Update File: a.txt
-three
+THREE
*** End Patch";

    let output = run_cli(&["apply", "--patch-source", patch, "--strict"], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("rejected in strict mode"));

    let output = run_cli(&["apply", "--patch-source", patch, "--event-json"], temp.path());
    assert_success(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"kind\":\"fuzzy_recovery\""));
    let content = std::fs::read_to_string(temp.path().join("a.txt")).expect("a.txt readable");
    assert_eq!(content, "one\ntwo\n");
}

#[test]
fn apply_command_refuses_paths_outside_root() {
    let temp = TempDir::new().expect("tempdir should create");
    let patch = "\
*** Begin Patch
*** Add File: ../escape.js
+nope
*** End Patch";

    let output = run_cli(&["apply", "--patch-source", patch], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("outside root"));
}

#[test]
fn check_command_extracts_patch_from_reply() {
    let temp = TempDir::new().expect("tempdir should create");
    let reply = format!("Here you go:\n```\n{MULTI_ACTION_PATCH}```\n");

    let output = run_cli(&["check", "--patch-source", &reply, "--extract"], temp.path());
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("add src/util.js (1 line(s))"));
    assert!(stdout.contains("update src/main.js (1 hunk(s))"));
    assert!(stdout.contains("delete old.js"));

    let output = run_cli(&["check", "--patch-source", &reply], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("patch syntax error at line 1"));
}

#[test]
fn detect_command_reports_target_or_exit_code_two() {
    let temp = TempDir::new().expect("tempdir should create");

    let output = run_cli(&["detect", "--patch-source", MULTI_ACTION_PATCH], temp.path());
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("patch: src/main.js"));

    let output = run_cli(&["detect", "--patch-source", "just prose"], temp.path());
    assert_eq!(output.status.code(), Some(2));
}
