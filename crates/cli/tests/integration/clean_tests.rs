//! Clean command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, touch};

const PROJECT: &str = r#"[
  {"name": "core", "type": "staticlib", "alias": "corelib", "sources": ["core.c"]},
  {"name": "app", "type": "program", "sources": ["app.c"]}
]"#;

#[test]
fn clean_named_target_keeps_the_rest() {
  let env = TestEnv::new(PROJECT);
  let base = env.out_base();
  let archive = base.join("lib/libcore.a");
  let program = base.join("bin/app");
  touch(&archive);
  touch(&program);

  let json = env.json(&["clean", "corelib"]);
  assert_eq!(json["removed"].as_array().unwrap().len(), 1);
  assert_eq!(json["preserved"], 1);
  assert!(!archive.exists());
  assert!(program.exists());
}

#[test]
fn clean_everything_requires_force() {
  let env = TestEnv::new(PROJECT);
  let base = env.out_base();
  touch(&base.join("lib/libcore.a"));
  touch(&base.join("bin/app"));

  env
    .cairn_cmd()
    .arg("clean")
    .assert()
    .failure()
    .stderr(predicate::str::contains("--force"));

  env
    .cairn_cmd()
    .args(["clean", "--force"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed 2 file(s)"));
  assert!(!base.join("bin/app").exists());
}

#[test]
fn clean_unknown_target_warns() {
  let env = TestEnv::new(PROJECT);
  env
    .cairn_cmd()
    .args(["clean", "ghost"])
    .assert()
    .success()
    .stderr(predicate::str::contains("ghost"));
}
