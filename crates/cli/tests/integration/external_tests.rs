//! External sub-project integration tests, with a shell script standing in
//! for cmake.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use predicates::prelude::*;

use super::common::TestEnv;

const FAKE_CMAKE: &str = r#"#!/bin/sh
if [ "$1" = "-S" ]; then
  work="$4"
  mkdir -p "$work"
  for arg in "$@"; do
    case "$arg" in
      -DCMAKE_INSTALL_PREFIX=*) echo "${arg#-DCMAKE_INSTALL_PREFIX=}" > "$work/prefix" ;;
    esac
  done
  touch "$work/CMakeCache.txt"
  echo configured >> "$work/../runs"
  exit 0
fi
work="$2"
prefix=$(cat "$work/prefix")
for f in include/zlib.h lib/libz.a lib/pkgconfig/zlib.pc; do
  mkdir -p "$prefix/$(dirname "$f")"
  touch "$prefix/$f"
  echo "-- Installing: $prefix/$f"
done
"#;

const PROJECT: &str = r#"[
  {"name": "zlib", "type": "custom", "external": {"tool": "cmake", "source_dir": "third_party/zlib", "options": {"X": "1"}}},
  {"name": "app", "type": "program", "sources": ["app.c"], "deps": ["zlib"]}
]"#;

fn project() -> (TestEnv, String) {
  let env = TestEnv::new(PROJECT);
  let script = env.write_file("tools/cmake", FAKE_CMAKE);
  std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
  env.write_file("third_party/zlib/CMakeLists.txt", "");
  (env, format!("cmake={}", script.display()))
}

fn installed(json: &serde_json::Value, key: &str) -> Vec<PathBuf> {
  json[key]
    .as_array()
    .unwrap()
    .iter()
    .map(|v| PathBuf::from(v.as_str().unwrap()))
    .collect()
}

#[test]
fn build_then_clean_round_trip() {
  let (env, cmake) = project();

  let json = env.json(&["external", "build", "zlib", &cmake]);
  let files = installed(&json, "installed");
  assert_eq!(files.len(), 3);
  assert!(files.iter().all(|f| f.is_file()));

  let status = env.json(&["external", "status", "zlib"]);
  assert_eq!(status["state"], "built");
  assert_eq!(installed(&status, "installed").len(), 3);

  let json = env.json(&["external", "clean", "zlib"]);
  assert_eq!(installed(&json, "removed").len(), 3);
  assert!(files.iter().all(|f| !f.exists()));

  let status = env.json(&["external", "status", "zlib"]);
  assert_eq!(status["state"], "unconfigured");
}

#[test]
fn configure_runs_once_for_the_same_options() {
  let (env, cmake) = project();

  let first = env.json(&["external", "configure", "zlib", &cmake]);
  assert_eq!(first["configured"], true);
  let second = env.json(&["external", "configure", "zlib"]);
  assert_eq!(second["configured"], false);

  let again = env.json(&["external", "configure", "zlib", "reconfigure=1"]);
  assert_eq!(again["configured"], true);
}

#[test]
fn declare_builds_externals_and_wires_dependents() {
  let (env, cmake) = project();

  let json = env.json(&["declare", "cairn.json", &cmake]);
  let zlib = json["targets"].as_array().unwrap().iter().find(|t| t["name"] == "zlib").unwrap();
  assert_eq!(zlib["type"], "custom");
  assert_eq!(zlib["outputs"].as_array().unwrap().len(), 3);

  env
    .cairn_cmd()
    .args(["clean", "zlib"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed 3 file(s)"));
  let status = env.json(&["external", "status", "zlib"]);
  assert_eq!(installed(&status, "installed").len(), 0);
}

#[test]
fn non_external_target_is_rejected() {
  let (env, _) = project();
  env
    .cairn_cmd()
    .args(["external", "build", "app"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not an external target"));
}
