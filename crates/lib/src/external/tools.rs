//! Adapters for build systems driven as sub-builds.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::fingerprint::{ConfigOptions, OptionValue};
use super::runner::ToolCommand;
use super::scrape::{ScrapedEntry, scrape_line};
use crate::context::{BuildMode, EnvSnapshot};

/// Toolchain variables forwarded from the build's environment to every
/// external invocation.
pub const FORWARDED_ENV: &[&str] = &[
  "PATH",
  "CC",
  "CXX",
  "CPP",
  "AR",
  "RANLIB",
  "LD",
  "CFLAGS",
  "CXXFLAGS",
  "CPPFLAGS",
  "LDFLAGS",
  "PKG_CONFIG_PATH",
  "MACOSX_DEPLOYMENT_TARGET",
  "SDKROOT",
  "INCLUDE",
  "LIB",
];

/// Everything a tool needs to produce its command lines.
#[derive(Debug, Clone)]
pub struct Invocation {
  pub name: String,
  pub source_dir: PathBuf,
  /// Private working directory of the sub-project.
  pub work_dir: PathBuf,
  /// Install prefix handed to the tool.
  pub prefix: PathBuf,
  pub options: ConfigOptions,
  pub mode: BuildMode,
  pub jobs: u32,
  pub verbose: bool,
  pub env: BTreeMap<String, String>,
}

/// Select the toolchain variables of `env` that are passed through.
pub fn forwarded_env(env: &EnvSnapshot) -> BTreeMap<String, String> {
  FORWARDED_ENV
    .iter()
    .filter_map(|key| env.get(key).map(|value| (key.to_string(), value.to_string())))
    .collect()
}

/// A build system that can be configured, built and installed from cairn.
pub trait ExternalTool: std::fmt::Debug {
  /// Short name, also the directory the tool's sub-projects live under.
  fn name(&self) -> &str;

  fn configure(&self, inv: &Invocation) -> ToolCommand;

  /// Command that builds `target` and installs the results.
  fn build(&self, inv: &Invocation, target: Option<&str>) -> ToolCommand;

  /// Install facts announced by one line of the build log.
  fn scrape(&self, line: &str) -> Vec<ScrapedEntry> {
    scrape_line(line)
  }

  /// Files the configure step leaves in the working directory.
  fn configure_artifacts(&self, work_dir: &Path) -> Vec<PathBuf>;
}

/// CMake, driven through `cmake -S/-B` and `cmake --build`.
#[derive(Debug, Clone)]
pub struct CMakeTool {
  program: String,
}

impl CMakeTool {
  pub fn new() -> Self {
    Self::with_program("cmake")
  }

  pub fn with_program(program: impl Into<String>) -> Self {
    Self { program: program.into() }
  }
}

impl Default for CMakeTool {
  fn default() -> Self {
    Self::new()
  }
}

fn cmake_value(value: &OptionValue) -> String {
  match value {
    OptionValue::Bool(true) => "ON".to_string(),
    OptionValue::Bool(false) => "OFF".to_string(),
    other => other.to_string(),
  }
}

impl ExternalTool for CMakeTool {
  fn name(&self) -> &str {
    "cmake"
  }

  fn configure(&self, inv: &Invocation) -> ToolCommand {
    let build_type = match inv.mode {
      BuildMode::Debug => "Debug",
      BuildMode::Release => "Release",
    };
    let mut cmd = ToolCommand::new(&self.program)
      .arg("-S")
      .arg(inv.source_dir.display().to_string())
      .arg("-B")
      .arg(inv.work_dir.display().to_string())
      .arg(format!("-DCMAKE_INSTALL_PREFIX={}", inv.prefix.display()))
      .arg(format!("-DCMAKE_BUILD_TYPE={build_type}"));
    for (key, value) in &inv.options {
      cmd = cmd.arg(format!("-D{}={}", key, cmake_value(value)));
    }
    cmd.env = inv.env.clone();
    cmd.cwd(&inv.work_dir)
  }

  fn build(&self, inv: &Invocation, target: Option<&str>) -> ToolCommand {
    let mut cmd = ToolCommand::new(&self.program)
      .arg("--build")
      .arg(inv.work_dir.display().to_string())
      .arg("--target")
      .arg(target.unwrap_or("install"));
    if inv.jobs > 1 {
      cmd = cmd.arg("--parallel").arg(inv.jobs.to_string());
    }
    if inv.verbose {
      cmd = cmd.arg("--verbose");
    }
    cmd.env = inv.env.clone();
    cmd.cwd(&inv.work_dir)
  }

  fn configure_artifacts(&self, work_dir: &Path) -> Vec<PathBuf> {
    vec![work_dir.join("CMakeCache.txt"), work_dir.join("CMakeFiles")]
  }
}

/// GNU Autotools, driven through `configure` and `make install`.
#[derive(Debug, Clone)]
pub struct AutotoolsTool {
  make: String,
}

impl AutotoolsTool {
  pub fn new() -> Self {
    Self::with_make("make")
  }

  pub fn with_make(make: impl Into<String>) -> Self {
    Self { make: make.into() }
  }
}

impl Default for AutotoolsTool {
  fn default() -> Self {
    Self::new()
  }
}

impl ExternalTool for AutotoolsTool {
  fn name(&self) -> &str {
    "autotools"
  }

  fn configure(&self, inv: &Invocation) -> ToolCommand {
    let script = inv.source_dir.join("configure");
    let mut cmd = ToolCommand::new(script.display().to_string()).arg(format!("--prefix={}", inv.prefix.display()));
    for (key, value) in &inv.options {
      match value {
        OptionValue::Bool(true) => cmd = cmd.arg(format!("--{key}")),
        OptionValue::Bool(false) => {}
        other => cmd = cmd.arg(format!("--{key}={other}")),
      }
    }
    cmd.env = inv.env.clone();
    cmd.cwd(&inv.work_dir)
  }

  fn build(&self, inv: &Invocation, target: Option<&str>) -> ToolCommand {
    let mut cmd = ToolCommand::new(&self.make)
      .arg("-C")
      .arg(inv.work_dir.display().to_string())
      .arg(target.unwrap_or("install"));
    if inv.jobs > 1 {
      cmd = cmd.arg(format!("-j{}", inv.jobs));
    }
    if inv.verbose {
      cmd = cmd.arg("V=1");
    }
    cmd.env = inv.env.clone();
    cmd.cwd(&inv.work_dir)
  }

  fn configure_artifacts(&self, work_dir: &Path) -> Vec<PathBuf> {
    ["config.status", "config.log", "Makefile", "libtool"]
      .iter()
      .map(|name| work_dir.join(name))
      .collect()
  }
}
