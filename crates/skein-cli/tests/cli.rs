//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const GRAPH: &str = r#"{"$id":0,"$type":"demo.Link","params":{"name":"a","next":{"$id":1,"$kind":"seq","items":[1,{"$ref":0},{"$id":2,"$kind":"map","items":["k",{"$ref":1}]}]}}}"#;

/// Command with an isolated config file
fn skein(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("skein").unwrap();
    cmd.env("SKEIN_CONFIG", dir.join("config.toml"));
    cmd
}

fn write_graph(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    skein(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_inspect_text() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "graph.json", GRAPH);

    skein(dir.path())
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Definitions: 3"))
        .stdout(predicate::str::contains("References:  2"))
        .stdout(predicate::str::contains("demo.Link x1"));
}

#[test]
fn test_inspect_json() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "graph.json", GRAPH);

    let output = skein(dir.path())
        .args(["--format", "json", "inspect"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["definitions"], 3);
    assert_eq!(stats["maps"], 1);
    assert_eq!(stats["types"]["demo.Link"], 1);
}

#[test]
fn test_validate_ok() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "graph.json", GRAPH);

    skein(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid (3 definitions, 2 references)"));
}

#[test]
fn test_validate_dangling_reference_fails() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "bad.json", r#"{"$id":0,"$kind":"seq","items":[{"$ref":9}]}"#);

    skein(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dangling reference"));
}

#[test]
fn test_validate_malformed_fails() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "bad.json", r#"{"$id":0,"$kind":"list","items":[]}"#);

    skein(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed node"));
}

#[test]
fn test_params() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "graph.json", GRAPH);

    skein(dir.path())
        .arg("params")
        .arg(&file)
        .arg("name")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo.Link (id 0)"))
        .stdout(predicate::str::contains(r#"name = "a""#))
        .stdout(predicate::str::contains("next").not());

    skein(dir.path())
        .arg("params")
        .arg(&file)
        .arg("missing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parameter 'missing' not found"));
}

#[test]
fn test_params_requires_object_root() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "seq.json", r#"{"$id":0,"$kind":"seq","items":[]}"#);

    skein(dir.path())
        .arg("params")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a typed object"));
}

#[test]
fn test_fmt_pretty_to_file() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "graph.json", GRAPH);
    let out = dir.path().join("pretty.json");

    skein(dir.path())
        .args(["fmt", "--pretty", "-o"])
        .arg(&out)
        .arg(&file)
        .assert()
        .success();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.lines().count() > 1);
    let reparsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(reparsed, serde_json::from_str::<serde_json::Value>(GRAPH).unwrap());
}

#[test]
fn test_fmt_compact_roundtrips_exactly() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "graph.json", GRAPH);

    skein(dir.path())
        .arg("fmt")
        .arg(&file)
        .assert()
        .success()
        .stdout(format!("{}\n", GRAPH));
}

#[test]
fn test_config_set_get_and_limit() {
    let dir = TempDir::new().unwrap();
    let file = write_graph(&dir, "graph.json", GRAPH);

    skein(dir.path())
        .args(["config", "set", "max_nesting_depth", "3"])
        .assert()
        .success();
    skein(dir.path())
        .args(["config", "get", "max_nesting_depth"])
        .assert()
        .success()
        .stdout("3\n");

    skein(dir.path())
        .arg("inspect")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds the limit of 3"));
}

#[test]
fn test_config_init_and_path() {
    let dir = TempDir::new().unwrap();

    skein(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
    skein(dir.path()).args(["config", "init"]).assert().success();
    skein(dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    skein(dir.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    skein(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("skein"));
}
