//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// A project directory with a descriptor file and its own output root.
pub struct TestEnv {
  pub temp: TempDir,
  pub descriptors: PathBuf,
}

impl TestEnv {
  pub fn new(descriptors: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cairn.json");
    std::fs::write(&path, descriptors).unwrap();
    Self {
      temp,
      descriptors: path,
    }
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn output(&self) -> PathBuf {
    self.temp.path().join("out")
  }

  /// `<output>/release/<arch>` of a build without `no-arch`.
  pub fn out_base(&self) -> PathBuf {
    let json = self.json(&["info"]);
    PathBuf::from(json["out_base"].as_str().unwrap())
  }

  pub fn cairn_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("cairn");
    cmd
      .current_dir(self.temp.path())
      .arg("--output")
      .arg(self.output())
      .env_remove("RUST_LOG");
    cmd
  }

  /// Run with `--format json` and parse stdout.
  pub fn json(&self, args: &[&str]) -> serde_json::Value {
    let output = self.cairn_cmd().args(["--format", "json"]).args(args).output().unwrap();
    assert!(
      output.status.success(),
      "cairn {:?} failed: {}",
      args,
      String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
  }
}

pub fn touch(path: &Path) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, "").unwrap();
}
