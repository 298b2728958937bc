//! Declare and status command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, touch};

const LIBRARY_PROJECT: &str = r#"[
  {"name": "support", "type": "staticlib", "sources": ["support.c"]},
  {"name": "widget", "type": "sharedlib", "sources": ["one.c", "two.c"], "deps": ["support"]},
  {"name": "demo", "type": "program", "sources": ["demo.c"], "libs": ["widget"]}
]"#;

#[test]
fn declare_prints_outputs_per_target() {
  let env = TestEnv::new(LIBRARY_PROJECT);
  env
    .cairn_cmd()
    .args(["declare", "cairn.json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Declared 3 target(s)"))
    .stdout(predicate::str::contains("libwidget.so"))
    .stdout(predicate::str::contains("libsupport.a"));
}

#[test]
fn declare_json_lists_targets() {
  let env = TestEnv::new(LIBRARY_PROJECT);
  let json = env.json(&["declare", "cairn.json"]);

  let targets = json["targets"].as_array().unwrap();
  assert_eq!(targets.len(), 3);
  let widget = targets.iter().find(|t| t["name"] == "widget").unwrap();
  assert_eq!(widget["type"], "sharedlib");
  assert!(widget["outputs"][0].as_str().unwrap().ends_with("lib/libwidget.so"));
  assert_eq!(json["outputs"], 3);
  assert!(json["failures"].as_array().unwrap().is_empty());
}

#[test]
fn declare_reports_per_target_failures() {
  let env = TestEnv::new(
    r#"[
      {"name": "broken", "type": "gizmo", "sources": ["a.c"]},
      {"name": "fine", "type": "program", "sources": ["b.c"]}
    ]"#,
  );
  let json = env.json(&["declare", "cairn.json"]);
  assert_eq!(json["failures"][0]["name"], "broken");
  assert_eq!(json["targets"][0]["name"], "fine");
}

#[test]
fn declare_survives_a_mistyped_descriptor() {
  let env = TestEnv::new(
    r#"[
      {"name": "bad", "type": "program", "sources": "main.c"},
      {"name": "typo", "type": "sharedlib", "sources": ["t.c"], "shared": {"verison": "1"}},
      {"name": "good", "type": "program", "sources": ["main.c"]}
    ]"#,
  );
  let json = env.json(&["declare", "cairn.json"]);

  let failures = json["failures"].as_array().unwrap();
  assert_eq!(failures.len(), 2);
  assert_eq!(failures[0]["name"], "bad");
  assert_eq!(failures[1]["name"], "typo");
  assert!(failures[1]["reason"].as_str().unwrap().contains("verison"));
  let targets = json["targets"].as_array().unwrap();
  assert_eq!(targets.len(), 1);
  assert_eq!(targets[0]["name"], "good");
}

#[test]
fn declare_honors_settings() {
  let env = TestEnv::new(LIBRARY_PROJECT);
  let json = env.json(&["declare", "cairn.json", "debug=1", "no-arch=1"]);
  let widget = json["targets"].as_array().unwrap().iter().find(|t| t["name"] == "widget").unwrap();
  let path = widget["outputs"][0].as_str().unwrap();
  assert!(path.ends_with("out/debug/lib/libwidget.so"), "{path}");
}

#[test]
fn declare_missing_file_fails() {
  let env = TestEnv::new("[]");
  env
    .cairn_cmd()
    .args(["declare", "nope.json"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn status_counts_existing_outputs() {
  let env = TestEnv::new(LIBRARY_PROJECT);
  let base = env.out_base();
  touch(&base.join("lib/libsupport.a"));

  let json = env.json(&["status", "cairn.json"]);
  assert_eq!(json["completed"], 1);
  assert_eq!(json["total"], 3);
  assert_eq!(json["targets"]["support"]["completed"], 1);

  env
    .cairn_cmd()
    .args(["status", "cairn.json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("[ 33%] (1/3) support"));
}
