//! Shared helpers for library integration tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use cairn_lib::external::runner::ToolCommand;
#[cfg(unix)]
use cairn_lib::external::{ExternalTool, Invocation};
use cairn_lib::platform::Platform;
use cairn_lib::platform::arch::Arch;
use cairn_lib::platform::os::Os;
use cairn_lib::target::TargetDescriptor;
use cairn_lib::{BuildContext, EnvSnapshot};

pub fn flags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
  pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Context for a 64-bit Linux build rooted at `root`.
pub fn context(root: &Path, pairs: &[(&str, &str)]) -> BuildContext {
  context_with_env(root, pairs, &[])
}

pub fn context_with_env(root: &Path, pairs: &[(&str, &str)], env: &[(&str, &str)]) -> BuildContext {
  BuildContext::new(
    Platform::new(Arch::X86_64, Os::Linux),
    root,
    flags(pairs),
    EnvSnapshot::from_pairs(env.iter().copied()),
  )
}

pub fn descriptors(json: &str) -> Vec<TargetDescriptor> {
  serde_json::from_str(json).unwrap()
}

/// Create `dir` and every directory below it named in `subdirs`.
pub fn make_dirs(dir: &Path, subdirs: &[&str]) -> PathBuf {
  for sub in subdirs {
    std::fs::create_dir_all(dir.join(sub)).unwrap();
  }
  dir.to_path_buf()
}

/// Stand-in build tool running `/bin/sh` scripts with the install prefix as `$1`.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct ShellTool {
  pub configure: String,
  pub build: String,
}

#[cfg(unix)]
impl ShellTool {
  /// A tool whose build step installs `files` under the prefix and logs
  /// each one the way CMake does.
  pub fn installing(configure: &str, files: &[&str]) -> Self {
    let mut build = String::new();
    for file in files {
      build.push_str(&format!(
        "mkdir -p \"$1/$(dirname {file})\" && touch \"$1/{file}\" && echo \"-- Installing: $1/{file}\"; "
      ));
    }
    Self {
      configure: configure.to_string(),
      build,
    }
  }

  fn command(&self, script: &str, step: &str, inv: &Invocation) -> ToolCommand {
    let mut cmd = ToolCommand::new("/bin/sh")
      .arg("-c")
      .arg(script)
      .arg(step)
      .arg(inv.prefix.display().to_string())
      .cwd(&inv.work_dir);
    cmd.env = inv.env.clone();
    cmd
  }
}

#[cfg(unix)]
impl ExternalTool for ShellTool {
  fn name(&self) -> &str {
    "shell"
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
