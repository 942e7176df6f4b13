use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

/// Small `git`-like definition shared by the tests.
const GIT_YAML: &str = r#"
use: git
version: 2.44.0
global_flags:
  - name: quiet
    shorthand: q
    usage: suppress output
commands:
  - use: remote
    short: Manage remotes
    commands:
      - use: add <name> <url>
        short: Add a remote
        args: {kind: exact, n: 2}
        flags:
          - name: fetch
            shorthand: f
            usage: fetch after adding
  - use: status
    aliases: [st]
    short: Show the working tree status
  - use: stash
    short: Stash changes
  - use: start
    hidden: true
"#;

fn write_tree(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("failed to write tree definition");
    path
}

fn cmdtree(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_cmdtree"))
        .args(args)
        .output()
        .expect("failed to run cmdtree")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

#[test]
fn resolve_prints_matched_command() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&[
        "resolve",
        "--tree",
        tree.to_str().unwrap(),
        "remote",
        "-q",
        "add",
        "origin",
        "url",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("command: git remote add\n"));
    assert!(text.contains("positionals: origin url\n"));
}

#[test]
fn resolve_json_reports_alias() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&["resolve", "--tree", tree.to_str().unwrap(), "--format", "json", "st"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["command"], "git status");
    assert_eq!(report["called_as"], "st");
}

#[test]
fn resolve_unknown_command_suggests() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&["resolve", "--tree", tree.to_str().unwrap(), "stat"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("error: unknown command \"stat\" for \"git\""));
    assert!(err.contains("Did you mean this?\n\tstatus\n"));
    assert!(!err.contains("\tstash"));
    assert!(!err.contains("\tstart"));
}

// ---------------------------------------------------------------------------
// flags, suggest, complete
// ---------------------------------------------------------------------------

#[test]
fn flags_lists_inherited_and_default_flags() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&[
        "flags",
        "--tree",
        tree.to_str().unwrap(),
        "--format",
        "json",
        "remote",
        "add",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let origin_of = |name: &str| {
        rows.iter()
            .find(|row| row["name"] == name)
            .map(|row| row["origin"].as_str().unwrap_or_default().to_string())
    };
    assert_eq!(origin_of("fetch").as_deref(), Some("local"));
    assert_eq!(origin_of("quiet").as_deref(), Some("inherited from git"));
    assert_eq!(origin_of("help").as_deref(), Some("default"));
}

#[test]
fn suggest_respects_threshold_override() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);
    let path = tree.to_str().unwrap();

    let output = cmdtree(&["suggest", "--tree", path, "stat"]);
    assert_eq!(stdout(&output), "status\n");

    let output = cmdtree(&["suggest", "--tree", path, "--min-distance", "3", "stat"]);
    assert_eq!(stdout(&output), "status\nstash\n");

    let output = cmdtree(&["suggest", "--tree", path, "--min-distance", "0", "stat"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("must be positive"));
}

#[test]
fn complete_prints_shell_format() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&["complete", "--tree", tree.to_str().unwrap(), "st"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "status\tShow the working tree status\nst\tShow the working tree status\nstash\tStash changes\n:4\n"
    );
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_clean_definition() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&["validate", "--tree", tree.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("Validated 6 command(s)"));
}

#[test]
fn validate_reports_collisions() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(
        dir.path(),
        "bad.json",
        r#"{"use": "app", "commands": [{"use": "list", "aliases": ["ls"]}, {"use": "ls"}]}"#,
    );

    let output = cmdtree(&["validate", "--tree", tree.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("\"ls\" is used by more than one child of \"app\""));
    assert!(stderr(&output).contains("error: 1 issue(s) found"));
}

#[test]
fn unsupported_extension_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.toml", "use = 'git'");

    let output = cmdtree(&["validate", "--tree", tree.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unsupported definition format"));
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_echoes_leaf_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&[
        "run",
        "--tree",
        tree.to_str().unwrap(),
        "remote",
        "add",
        "-f",
        "origin",
        "url",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "command: git remote add\nargs: origin url\nflags: fetch=true\n"
    );
}

#[test]
fn run_group_prints_help() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&["run", "--tree", tree.to_str().unwrap(), "remote"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("Manage remotes\n\nUsage:\n  git remote [command]\n"));
    assert!(text.contains("Available Commands:\n  add  Add a remote\n"));
}

#[test]
fn run_reports_argument_errors() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&["run", "--tree", tree.to_str().unwrap(), "remote", "add", "origin"]);
    assert!(!output.status.success());
    assert_eq!(stderr(&output).trim_end(), "error: accepts 2 arg(s), received 1");
}

#[test]
fn run_prints_version() {
    let dir = tempfile::tempdir().unwrap();
    let tree = write_tree(dir.path(), "git.yaml", GIT_YAML);

    let output = cmdtree(&["run", "--tree", tree.to_str().unwrap(), "--", "--version"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "git version 2.44.0\n");
}
