mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{module, read};
use predicates::prelude::*;

const SOURCE: &str = concat!(
    "package main\n",
    "\n",
    "import \"os\"\n",
    "\n",
    "func main() {\n",
    "\tos.Remove(\"tmp\")\n",
    "}\n",
);

#[test]
fn check_fails_while_errors_are_discarded() {
    let dir = module(&[("main.go", SOURCE)]);
    cargo_bin_cmd!("errfix")
        .arg(dir.path())
        .arg("--check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("main.go:6:2: discarded error from os.Remove (bare call)"))
        .stdout(predicate::str::contains("1 discarded errors"));
    assert_eq!(read(dir.path(), "main.go"), SOURCE);
}

#[test]
fn check_passes_on_clean_code() {
    let clean = "package main\n\nfunc main() {\n}\n";
    let dir = module(&[("main.go", clean)]);
    cargo_bin_cmd!("errfix").arg(dir.path()).arg("--check").assert().success();
}

#[test]
fn dry_run_prints_a_diff_without_writing() {
    let dir = module(&[("main.go", SOURCE)]);
    cargo_bin_cmd!("errfix")
        .arg(dir.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("--- a/main.go"))
        .stdout(predicate::str::contains("+\tif err := os.Remove(\"tmp\"); err != nil {"))
        .stdout(predicate::str::contains("-\tos.Remove(\"tmp\")"));
    assert_eq!(read(dir.path(), "main.go"), SOURCE);
}

#[test]
fn json_summary_lists_modified_files() {
    let dir = module(&[("main.go", SOURCE)]);
    let output = cargo_bin_cmd!("errfix")
        .arg(dir.path())
        .args(["--json", "--terminal", "panic"])
        .output()
        .expect("run errfix");
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json summary");
    assert_eq!(summary["handled"], 1);
    assert_eq!(summary["converged"], true);
    assert_eq!(summary["modified"].as_array().map(Vec::len), Some(1));
    assert!(read(dir.path(), "main.go").contains("\t\tpanic(err)\n"));
}

#[test]
fn conflicting_flags_are_rejected() {
    let dir = module(&[("main.go", SOURCE)]);
    cargo_bin_cmd!("errfix")
        .arg(dir.path())
        .args(["--safe", "--aggressive"])
        .assert()
        .failure();
    assert_eq!(read(dir.path(), "main.go"), SOURCE);
}

#[test]
fn parse_errors_are_reported_and_nothing_is_written() {
    let dir = module(&[("main.go", SOURCE), ("broken.go", "package main\n\nfunc broken( {\n")]);
    cargo_bin_cmd!("errfix")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.go"));
    assert_eq!(read(dir.path(), "main.go"), SOURCE);
}
