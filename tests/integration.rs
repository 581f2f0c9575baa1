#![allow(
    clippy::implicit_return,
    clippy::indexing_slicing,
    clippy::missing_assert_message,
    clippy::missing_docs_in_private_items,
    clippy::missing_panics_doc,
    clippy::tests_outside_test_module,
    clippy::unwrap_used,
    reason = "tests"
)]

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const SHA: &str = "a5c37853f4ab1f4c4ee7e1a1c5e1e4c5a1d3ff00";

fn ghlink_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ghlink"));
    cmd.current_dir(dir);
    cmd.env_remove("GHLINK_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new("tests/fixtures").join(name)
}

/// Copy a fixture into a fresh temp dir so commands can write to it.
fn scratch(name: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(name);
    for entry in files_under(&src) {
        let relative = entry.strip_prefix(&src).unwrap();
        let dest = dir.path().join(relative);
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::copy(&entry, &dest).unwrap();
    }
    dir
}

fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(root).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(files_under(&path));
        } else {
            files.push(path);
        }
    }
    files
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn apply_discovers_repository_and_rewrites() {
    let dir = scratch("discover");

    let apply = ghlink_cmd(dir.path()).arg("apply").output().unwrap();
    assert!(apply.status.success(), "apply failed: {}", stderr(&apply));
    assert!(stdout(&apply).contains("rewrote readme.md"));

    let readme = std::fs::read_to_string(dir.path().join("readme.md")).unwrap();
    assert!(readme.contains("([#26](https://github.com/wooorm/remark/issues/26), [GH-27](https://github.com/wooorm/remark/issues/27))"));
    assert!(readme.contains("Thanks [**@wooorm**](https://github.com/wooorm) for [`a5c3785`](https://github.com/wooorm/remark/commit/a5c3785)"));
    assert!(readme.contains("[remarkjs/remark#1](https://github.com/remarkjs/remark/issues/1)"));
    assert!(readme.contains("echo #26 stays code"));

    let links = std::fs::read_to_string(dir.path().join("docs/links.md")).unwrap();
    assert!(links.contains("See [#26](https://github.com/wooorm/remark/issues/26) and"));
    assert!(links.contains(&format!("[`a5c3785`](https://github.com/wooorm/remark/commit/{SHA})")));
}

#[test]
fn check_reports_then_passes_after_apply() {
    let dir = scratch("discover");

    let before = ghlink_cmd(dir.path()).arg("check").output().unwrap();
    assert_eq!(before.status.code(), Some(1), "stderr: {}", stderr(&before));
    assert!(stdout(&before).contains("UNLINKED  readme.md"));

    let apply = ghlink_cmd(dir.path()).arg("apply").output().unwrap();
    assert!(apply.status.success(), "apply failed: {}", stderr(&apply));

    let after = ghlink_cmd(dir.path()).arg("check").output().unwrap();
    assert!(after.status.success(), "check failed: {}", stdout(&after));
    assert!(stdout(&after).contains("All 2 markdown files linked"));
}

#[test]
fn apply_is_idempotent() {
    let dir = scratch("discover");

    let first = ghlink_cmd(dir.path()).arg("apply").output().unwrap();
    assert!(first.status.success());
    let once = std::fs::read_to_string(dir.path().join("readme.md")).unwrap();

    let second = ghlink_cmd(dir.path()).arg("apply").output().unwrap();
    assert!(second.status.success());
    assert!(!stdout(&second).contains("rewrote"));
    assert_eq!(std::fs::read_to_string(dir.path().join("readme.md")).unwrap(), once);
}

#[test]
fn repository_flag_overrides_discovery() {
    let output = ghlink_cmd(&fixture("discover"))
        .args(["--repository", "github:remarkjs/remark-github", "render", "readme.md"])
        .output()
        .unwrap();
    assert!(output.status.success(), "render failed: {}", stderr(&output));
    assert!(stdout(&output).contains("[#26](https://github.com/remarkjs/remark-github/issues/26)"));
}

#[test]
fn missing_repository_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("readme.md"), "Fixed in #1\n").unwrap();

    let output = ghlink_cmd(dir.path()).arg("check").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("Missing `repository`"));
}

#[test]
fn no_discover_ignores_metadata() {
    let output = ghlink_cmd(&fixture("discover"))
        .args(["--no-discover", "check", "readme.md"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("Missing `repository`"));
}

#[test]
fn documents_without_references_need_no_repository() {
    let output = ghlink_cmd(&fixture("linked")).arg("check").output().unwrap();
    assert!(output.status.success(), "check failed: {}", stderr(&output));
    assert!(stdout(&output).contains("All 1 markdown files linked"));
}

#[test]
fn render_reads_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = ghlink_cmd(dir.path())
        .args(["--repository", "wooorm/remark", "--no-mention-strong", "render", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"Hi @wooorm, see GH-1\n").unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success(), "render failed: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "Hi [@wooorm](https://github.com/wooorm), see [GH-1](https://github.com/wooorm/remark/issues/1)\n"
    );
}

#[test]
fn base_url_flag_targets_enterprise_host() {
    let output = ghlink_cmd(&fixture("discover"))
        .args(["--base-url", "https://ghe.example.com", "render", "readme.md"])
        .output()
        .unwrap();
    assert!(output.status.success(), "render failed: {}", stderr(&output));
    assert!(stdout(&output).contains("[#26](https://ghe.example.com/wooorm/remark/issues/26)"));
}

#[test]
fn scan_json_lists_references() {
    let output = ghlink_cmd(&fixture("discover")).args(["scan", "--json", "readme.md"]).output().unwrap();
    assert!(output.status.success(), "scan failed: {}", stderr(&output));

    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let kinds: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["issue_or_pr", "issue_or_pr", "mention", "sha", "user_issue_or_pr"]);
    assert_eq!(rows[0]["line"], 3);
    assert_eq!(rows[4]["user"], "remarkjs");
}

#[test]
fn init_writes_config_preserving_other_keys() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join(".ghlink.toml");
    std::fs::write(&config_path, "# project links\nmention_strong = false\n").unwrap();

    let init = ghlink_cmd(dir.path()).args(["init", "https://github.com/wooorm/remark.git"]).output().unwrap();
    assert!(init.status.success(), "init failed: {}", stderr(&init));

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("# project links"));
    assert!(content.contains("mention_strong = false"));
    assert!(content.contains("repository = \"https://github.com/wooorm/remark.git\""));

    std::fs::write(dir.path().join("notes.md"), "@wooorm\n").unwrap();
    let render = ghlink_cmd(dir.path()).args(["render", "notes.md"]).output().unwrap();
    assert_eq!(stdout(&render), "[@wooorm](https://github.com/wooorm)\n");
}

#[test]
fn init_rejects_invalid_repository() {
    let dir = tempfile::tempdir().unwrap();
    let init = ghlink_cmd(dir.path()).args(["init", "not a repository"]).output().unwrap();
    assert_eq!(init.status.code(), Some(3));
    assert!(stderr(&init).contains("Invalid Repository"));
    assert!(!dir.path().join(".ghlink.toml").exists());
}

#[test]
fn info_json_reports_state() {
    let dir = tempfile::tempdir().unwrap();
    let output = ghlink_cmd(dir.path()).args(["info", "--json"]).output().unwrap();
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(info["current_state"]["config_found"], false);
    assert!(info["current_state"]["repository"].is_null());
    assert_eq!(info["exit_codes"][1]["code"], 1);
}
