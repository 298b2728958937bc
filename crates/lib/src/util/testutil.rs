//! Test utilities for cairn-lib.
//!
//! Helpers for building contexts with injected flags and environment, and a
//! shell-script stand-in for external build tools.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::context::{BuildContext, EnvSnapshot};
use crate::external::runner::ToolCommand;
use crate::external::{ExternalTool, Invocation};
use crate::platform::Platform;
use crate::platform::arch::Arch;
use crate::platform::os::Os;

/// Flag table from `key=value` pairs.
pub fn flags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
  pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// A 64-bit Linux context rooted at `root` with no environment.
pub fn linux_context(root: &Path, pairs: &[(&str, &str)]) -> BuildContext {
  BuildContext::new(
    Platform::new(Arch::X86_64, Os::Linux),
    root,
    flags(pairs),
    EnvSnapshot::default(),
  )
}

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// External tool whose configure and build steps are shell scripts.
///
/// Both scripts run in the working directory with the install prefix as `$1`.
#[derive(Debug, Clone)]
pub struct ScriptTool {
  configure: String,
  build: String,
}

impl ScriptTool {
  pub fn new(configure: impl Into<String>, build: impl Into<String>) -> Self {
    Self {
      configure: configure.into(),
      build: build.into(),
    }
  }

  fn command(&self, script: &str, step: &str, inv: &Invocation) -> ToolCommand {
    let (program, args) = shell_cmd(script);
    let mut cmd = ToolCommand::new(program)
      .args(args)
      .arg(step)
      .arg(inv.prefix.display().to_string())
      .cwd(&inv.work_dir);
    cmd.env = inv.env.clone();
    cmd
  }
}

impl ExternalTool for ScriptTool {
  fn name(&self) -> &str {
    "script"
  }

  fn configure(&self, inv: &Invocation) -> ToolCommand {
    self.command(&self.configure, "configure", inv)
  }

  fn build(&self, inv: &Invocation, _target: Option<&str>) -> ToolCommand {
    self.command(&self.build, "build", inv)
  }

  fn configure_artifacts(&self, work_dir: &Path) -> Vec<PathBuf> {
    vec![work_dir.join("configured")]
  }
}
